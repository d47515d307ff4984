//! Structural deduplication of records

use needle_domain::{DedupKey, Record};
use std::collections::HashSet;

/// Remembers every dedup key seen so far
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
    removed: usize,
}

impl Deduplicator {
    /// Create an empty deduplicator
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is offered
    pub fn insert(&mut self, record: &Record) -> bool {
        let fresh = self.seen.insert(record.dedup_key());
        if !fresh {
            self.removed += 1;
        }
        fresh
    }

    /// Number of duplicates rejected so far
    pub fn removed(&self) -> usize {
        self.removed
    }
}

/// Drop records whose full value tuple was already seen, keeping first occurrences in order
pub fn dedupe<I>(records: I) -> Vec<Record>
where
    I: IntoIterator<Item = Record>,
{
    let mut deduplicator = Deduplicator::new();
    records
        .into_iter()
        .filter(|record| deduplicator.insert(record))
        .collect()
}
