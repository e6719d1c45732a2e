//! Screener lookup keyed by normalized symbol.

use std::collections::HashMap;

use crate::{KeyCollision, NormalizedKey, ScreenerRecord, SymbolNormalizer};

/// Lookup table from [`NormalizedKey`] to the screener row for that instrument.
///
/// Screener batches are assumed to be ordered by recency, so when two rows
/// share a key the later one wins and the collision is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScreenerIndex {
    entries: HashMap<NormalizedKey, ScreenerRecord>,
    collisions: Vec<KeyCollision>,
}

impl ScreenerIndex {
    pub fn build<I>(records: I, normalizer: &SymbolNormalizer) -> Self
    where
        I: IntoIterator<Item = ScreenerRecord>,
    {
        let records = records.into_iter();
        let mut entries = HashMap::with_capacity(records.size_hint().0);
        let mut collisions = Vec::new();

        for record in records {
            let key = normalizer.normalize(record.symbol.as_str());
            let kept_symbol = record.symbol.clone();

            if let Some(discarded) = entries.insert(key.clone(), record) {
                tracing::warn!(
                    key = %key,
                    discarded = %discarded.symbol,
                    kept = %kept_symbol,
                    "screener key collision, keeping later record"
                );
                collisions.push(KeyCollision {
                    key,
                    discarded_symbol: discarded.symbol,
                    kept_symbol,
                });
            }
        }

        tracing::debug!(
            keys = entries.len(),
            collisions = collisions.len(),
            "screener index built"
        );

        Self {
            entries,
            collisions,
        }
    }

    pub fn lookup(&self, key: &NormalizedKey) -> Option<&ScreenerRecord> {
        self.entries.get(key)
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
