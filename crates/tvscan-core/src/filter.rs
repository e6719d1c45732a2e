//! Minimum absolute change filtering.

use serde::Serialize;

use crate::{MatchedEntry, Symbol, ValidationError};

pub const DEFAULT_MIN_CHANGE_PERCENT: f64 = 5.0;
/// Moves beyond this are treated as bad feed data rather than real movers.
pub const DEFAULT_MAX_CHANGE_PERCENT: f64 = 1000.0;

/// Validated minimum absolute percent change (finite, non-negative).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ChangeThreshold(f64);

impl ChangeThreshold {
    pub const DEFAULT: Self = Self(DEFAULT_MIN_CHANGE_PERCENT);

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteThreshold { value });
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeThreshold { value });
        }
        if value > 100.0 {
            tracing::warn!(
                threshold = value,
                "very high minimum change threshold, this may result in no symbols being found"
            );
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for ChangeThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for ChangeThreshold {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Entries split by the change filter. Input order is kept in every list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOutcome {
    pub retained: Vec<MatchedEntry>,
    pub missing_change: Vec<Symbol>,
    pub extreme_change: Vec<Symbol>,
}

/// Keeps matched entries whose absolute change reaches the threshold.
///
/// Does not sort and does not truncate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeFilter {
    threshold: ChangeThreshold,
    ceiling: Option<f64>,
}

impl ChangeFilter {
    /// Filter with the default sanity ceiling. A threshold above that
    /// ceiling asks for moves the ceiling would discard, so the ceiling is
    /// left off.
    pub fn new(threshold: ChangeThreshold) -> Self {
        let ceiling = Some(DEFAULT_MAX_CHANGE_PERCENT)
            .filter(|ceiling| check_ceiling(*ceiling, threshold).is_ok());
        if ceiling.is_none() {
            tracing::debug!(
                threshold = threshold.value(),
                "threshold above default ceiling, ceiling disabled"
            );
        }
        Self { threshold, ceiling }
    }

    /// Replace the sanity ceiling; `None` disables it.
    pub fn with_ceiling(mut self, ceiling: Option<f64>) -> Result<Self, ValidationError> {
        if let Some(value) = ceiling {
            check_ceiling(value, self.threshold)?;
        }
        self.ceiling = ceiling;
        Ok(self)
    }

    pub const fn threshold(&self) -> ChangeThreshold {
        self.threshold
    }

    pub const fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    pub fn apply(&self, matched: &[MatchedEntry]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let min = self.threshold.value();

        for entry in matched {
            let Some(change) = entry.record.change_percent else {
                tracing::debug!(symbol = %entry.symbol, "skipped: no change data");
                outcome.missing_change.push(entry.symbol.clone());
                continue;
            };

            let magnitude = change.abs();
            if let Some(ceiling) = self.ceiling {
                if magnitude > ceiling {
                    tracing::warn!(symbol = %entry.symbol, change, "extreme change value, skipping");
                    outcome.extreme_change.push(entry.symbol.clone());
                    continue;
                }
            }

            if magnitude >= min {
                tracing::debug!(symbol = %entry.symbol, change, "added to high change list");
                outcome.retained.push(entry.clone());
            }
        }

        if !outcome.missing_change.is_empty() {
            tracing::warn!(
                count = outcome.missing_change.len(),
                "matched symbols without change data were skipped"
            );
        }

        outcome
    }
}

fn check_ceiling(ceiling: f64, threshold: ChangeThreshold) -> Result<(), ValidationError> {
    if !ceiling.is_finite() || ceiling < threshold.value() {
        return Err(ValidationError::InvalidCeiling {
            ceiling,
            threshold: threshold.value(),
        });
    }
    Ok(())
}

/// Threshold-only filter over matched entries, without a sanity ceiling.
pub fn filter(
    matched: &[MatchedEntry],
    min_abs_change_percent: f64,
) -> Result<Vec<MatchedEntry>, ValidationError> {
    let threshold = ChangeThreshold::new(min_abs_change_percent)?;
    let filter = ChangeFilter::new(threshold).with_ceiling(None)?;
    Ok(filter.apply(matched).retained)
}
