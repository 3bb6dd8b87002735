//! Latest metric set per target.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::metrics::MetricSet;
use crate::Target;

/// Thread-safe store holding the most recent successful scrape per target.
///
/// One mutex guards every read and write and is never held across I/O.
/// Writes replace a target's entry wholesale, so a reader sees either the old
/// set or the new one.
#[derive(Debug, Default)]
pub struct Cache {
    data: Mutex<HashMap<Target, MetricSet>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored metric set for `target`.
    pub fn write(&self, target: Target, metrics: MetricSet) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.insert(target, metrics);
    }

    /// Returns a copy of every cached entry, ordered by target.
    ///
    /// The snapshot is detached from the cache; changing it has no effect on
    /// later reads.
    pub fn read_all(&self) -> BTreeMap<Target, MetricSet> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.iter()
            .map(|(target, metrics)| (target.clone(), metrics.clone()))
            .collect()
    }
}
