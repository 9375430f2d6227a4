use std::collections::BTreeMap;

use formats::SourceKind;

/// What happened to one completed poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PollOutcome {
    Replaced,
    /// Upstream answered with nothing while a batch was held.
    KeptStale,
    Failed,
    /// Completed after the store was closed.
    Discarded,
}

/// Per-source poll counters.
///
/// Keyed by sorted maps so snapshots iterate in a stable order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    counters: BTreeMap<(SourceKind, PollOutcome), u64>,
}

impl PollStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: SourceKind, outcome: PollOutcome) {
        *self.counters.entry((kind, outcome)).or_insert(0) += 1;
    }

    pub fn count(&self, kind: SourceKind, outcome: PollOutcome) -> u64 {
        self.counters.get(&(kind, outcome)).copied().unwrap_or(0)
    }

    /// Completed polls for `kind` regardless of outcome.
    pub fn total(&self, kind: SourceKind) -> u64 {
        self.counters
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| *n)
            .sum()
    }

    pub fn snapshot(&self) -> Vec<(SourceKind, PollOutcome, u64)> {
        self.counters
            .iter()
            .map(|((k, o), n)| (*k, *o, *n))
            .collect()
    }
}
