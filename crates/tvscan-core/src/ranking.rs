//! Ranking of filtered entries and assembly of run statistics.

use serde::Serialize;

use crate::{
    ChangeThreshold, HighChangeResult, KeyCollision, MatchedEntry, ProcessingStats, Symbol,
};

/// Ranked output rows with the statistics of the run that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReport {
    pub results: Vec<HighChangeResult>,
    pub stats: ProcessingStats,
}

/// Sorts surviving entries by descending absolute change and packages them
/// with the counts observed at each stage.
#[derive(Debug, Clone)]
pub struct RankedResultBuilder {
    threshold: ChangeThreshold,
    collisions: Vec<KeyCollision>,
    missing_change: Vec<Symbol>,
    extreme_change: Vec<Symbol>,
}

impl RankedResultBuilder {
    pub fn new(threshold: ChangeThreshold) -> Self {
        Self {
            threshold,
            collisions: Vec::new(),
            missing_change: Vec::new(),
            extreme_change: Vec::new(),
        }
    }

    pub fn with_collisions(mut self, collisions: Vec<KeyCollision>) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn with_filter_diagnostics(
        mut self,
        missing_change: Vec<Symbol>,
        extreme_change: Vec<Symbol>,
    ) -> Self {
        self.missing_change = missing_change;
        self.extreme_change = extreme_change;
        self
    }

    /// Equal magnitudes keep their relative input order.
    pub fn build(
        self,
        filtered: &[MatchedEntry],
        all_matched: &[MatchedEntry],
        unmatched: &[Symbol],
    ) -> RankedReport {
        let mut results: Vec<HighChangeResult> = filtered
            .iter()
            .filter_map(HighChangeResult::from_entry)
            .collect();

        // `sort_by` is stable, which is what gives the tie-break rule.
        results.sort_by(|a, b| b.change_percent.abs().total_cmp(&a.change_percent.abs()));

        let stats = ProcessingStats {
            total_symbols: all_matched.len() + unmatched.len(),
            matched: all_matched.len(),
            unmatched: unmatched.len(),
            unmatched_symbols: unmatched.to_vec(),
            qualifying: results.len(),
            threshold: self.threshold.value(),
            missing_change_symbols: self.missing_change,
            extreme_change_symbols: self.extreme_change,
            collisions: self.collisions,
        };

        tracing::info!(
            qualifying = stats.qualifying,
            threshold = stats.threshold,
            "symbols meeting change threshold"
        );
        if !results.is_empty() {
            let top_movers: Vec<(&str, f64)> = results
                .iter()
                .take(5)
                .map(|r| (r.symbol.as_str(), r.change_percent))
                .collect();
            tracing::info!(top_movers = ?top_movers, "top movers");
        }

        RankedReport { results, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize, ScreenerRecord};

    fn entry(symbol: &str, change: f64) -> MatchedEntry {
        let symbol = Symbol::parse(symbol).expect("valid");
        MatchedEntry {
            key: normalize(symbol.as_str()),
            record: ScreenerRecord::new(symbol.clone(), Some(change), Some(2.0), Some(3.0)),
            symbol,
        }
    }

    #[test]
    fn ranks_by_descending_absolute_change() {
        let filtered = vec![entry("A", 6.0), entry("B", -30.0), entry("C", 12.0)];
        let report = RankedResultBuilder::new(ChangeThreshold::DEFAULT).build(
            &filtered,
            &filtered,
            &[],
        );

        let order: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(report.results[0].change_percent, -30.0);
    }

    #[test]
    fn equal_magnitudes_keep_input_order() {
        let filtered = vec![
            entry("LOW", 6.0),
            entry("UP", 10.0),
            entry("DOWN", -10.0),
            entry("UP2", 10.0),
        ];
        let report = RankedResultBuilder::new(ChangeThreshold::DEFAULT).build(
            &filtered,
            &filtered,
            &[],
        );

        let order: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["UP", "DOWN", "UP2", "LOW"]);
    }

    #[test]
    fn stats_reflect_each_stage() {
        let all_matched = vec![entry("A", 12.0), entry("B", 3.0)];
        let filtered = vec![all_matched[0].clone()];
        let unmatched = vec![Symbol::parse("C").expect("valid")];

        let report = RankedResultBuilder::new(ChangeThreshold::DEFAULT)
            .with_filter_diagnostics(vec![Symbol::parse("X").expect("valid")], Vec::new())
            .build(&filtered, &all_matched, &unmatched);

        assert_eq!(report.stats.total_symbols, 3);
        assert_eq!(report.stats.matched, 2);
        assert_eq!(report.stats.unmatched, 1);
        assert_eq!(report.stats.unmatched_symbols, unmatched);
        assert_eq!(report.stats.qualifying, 1);
        assert_eq!(report.stats.threshold, 5.0);
        assert_eq!(report.stats.missing_change_symbols.len(), 1);
    }

    #[test]
    fn empty_input_is_a_valid_outcome() {
        let report = RankedResultBuilder::new(ChangeThreshold::DEFAULT).build(&[], &[], &[]);
        assert!(report.results.is_empty());
        assert_eq!(report.stats, ProcessingStats::empty(5.0));
    }
}
