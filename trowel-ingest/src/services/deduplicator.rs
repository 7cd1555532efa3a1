//! Composite-key deduplication
//!
//! Two separate steps, applied in this order by the pipeline:
//! 1. [`collapse_in_run`]: identical keys within one run, first-seen wins
//! 2. [`delta`]: drop candidates whose key the store already holds
//!
//! Both hash the key derived by [`CanonicalRecord::key`], the same derivation
//! the key store reader and the loader use.

use crate::models::{CanonicalRecord, CompositeKey};
use std::collections::HashSet;

/// Keys persisted in the store when the run started
///
/// Read once, to completion, before any comparison. Never updated in place.
#[derive(Debug, Clone, Default)]
pub struct ExistingKeySet {
    keys: HashSet<CompositeKey>,
}

impl ExistingKeySet {
    pub fn new(keys: HashSet<CompositeKey>) -> Self {
        Self { keys }
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<CompositeKey> for ExistingKeySet {
    fn from_iter<I: IntoIterator<Item = CompositeKey>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of collapsing in-run duplicates
#[derive(Debug, Default)]
pub struct Collapsed {
    pub records: Vec<CanonicalRecord>,
    /// Later occurrences of an already-seen key
    pub dropped: usize,
}

/// Keep the first record of every key, in input order
pub fn collapse_in_run(candidates: Vec<CanonicalRecord>) -> Collapsed {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut collapsed = Collapsed::default();

    for record in candidates {
        if seen.insert(record.key()) {
            collapsed.records.push(record);
        } else {
            tracing::debug!(key = %record.key(), "Dropping in-run duplicate");
            collapsed.dropped += 1;
        }
    }

    collapsed
}

/// Candidates whose key is not in `existing`, order preserved
pub fn delta(candidates: Vec<CanonicalRecord>, existing: &ExistingKeySet) -> Vec<CanonicalRecord> {
    candidates
        .into_iter()
        .filter(|record| !existing.contains(&record.key()))
        .collect()
}
