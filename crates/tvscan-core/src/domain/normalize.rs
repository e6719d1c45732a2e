use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Perpetual-futures marker appended by TradingView style feeds (`XUSDT.P`).
pub const PERPETUAL_SUFFIX: &str = ".P";

/// Canonical matching key for a raw symbol.
///
/// Two raw symbols refer to the same instrument iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the key back into a listing symbol, re-appending the perpetual
    /// suffix when the source carried one.
    pub fn render(&self, perpetual: bool) -> String {
        if perpetual {
            format!("{}{PERPETUAL_SUFFIX}", self.0)
        } else {
            self.0.clone()
        }
    }
}

impl Display for NormalizedKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analysing a raw symbol: the key plus what was stripped off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSymbol {
    pub key: NormalizedKey,
    pub perpetual: bool,
    pub exchange: Option<String>,
}

/// Canonicalizes raw symbols independent of exchange prefix and contract
/// suffix conventions.
///
/// The suffix is deliberately not part of the key: upstream sources disagree
/// on whether perpetuals carry `.P`, and a near-miss match is preferred over a
/// missed one. Input that would normalize to nothing falls back to its
/// trimmed, uppercased form, so malformed symbols simply fail to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNormalizer {
    suffixes: Vec<String>,
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        Self::with_suffixes([PERPETUAL_SUFFIX])
    }
}

impl SymbolNormalizer {
    /// Normalizer recognising a custom set of contract suffixes.
    ///
    /// Empty suffixes are ignored.
    pub fn with_suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|suffix| suffix.as_ref().trim().to_ascii_uppercase())
            .filter(|suffix| !suffix.is_empty())
            .collect();
        Self { suffixes }
    }

    pub fn normalize(&self, raw: &str) -> NormalizedKey {
        self.analyze(raw).key
    }

    pub fn analyze(&self, raw: &str) -> NormalizedSymbol {
        let canonical = raw.trim().to_ascii_uppercase();

        let (exchange, mut body) = match canonical.rsplit_once(':') {
            Some((prefix, rest)) => (Some(prefix.trim()), rest.trim()),
            None => (None, canonical.as_str()),
        };

        let mut perpetual = false;
        while let Some(suffix) = self
            .suffixes
            .iter()
            .find(|suffix| body.ends_with(suffix.as_str()))
        {
            body = body[..body.len() - suffix.len()].trim_end();
            perpetual = true;
        }

        if body.is_empty() {
            return NormalizedSymbol {
                key: NormalizedKey(canonical),
                perpetual: false,
                exchange: None,
            };
        }

        NormalizedSymbol {
            key: NormalizedKey(body.to_owned()),
            perpetual,
            exchange: exchange
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_owned),
        }
    }
}

/// Normalize with the default suffix set.
pub fn normalize(raw: &str) -> NormalizedKey {
    SymbolNormalizer::default().normalize(raw)
}
