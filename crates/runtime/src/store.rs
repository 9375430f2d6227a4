//! Latest batch per source, shared between the pollers and the composer.
//!
//! Each source owns one slot. A batch is an `Arc<Vec<GeoEvent>>` that is
//! swapped whole under the slot lock, so a reader holding a snapshot never
//! sees a half-written batch and a failed poll leaves the old `Arc` in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use foundation::{now_ms, EpochMs};
use formats::{GeoEvent, SourceKind};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::metrics::{PollOutcome, PollStats};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PollState {
    #[default]
    Idle,
    Fetching,
    Ready,
    Error,
}

#[derive(Debug, Default)]
struct Slot {
    state: PollState,
    batch: Arc<Vec<GeoEvent>>,
    /// Bumped on every batch replacement.
    generation: u64,
    last_error: Option<String>,
    updated_at: Option<EpochMs>,
}

/// Point-in-time view of one source.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub kind: SourceKind,
    pub state: PollState,
    pub batch: Arc<Vec<GeoEvent>>,
    pub generation: u64,
    pub last_error: Option<String>,
    pub updated_at: Option<EpochMs>,
}

pub struct EventStore {
    slots: [RwLock<Slot>; 5],
    closed: AtomicBool,
    revision: watch::Sender<u64>,
    stats: Mutex<PollStats>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            slots: Default::default(),
            closed: AtomicBool::new(false),
            revision,
            stats: Mutex::new(PollStats::new()),
        }
    }

    fn slot(&self, kind: SourceKind) -> &RwLock<Slot> {
        let idx = match kind {
            SourceKind::Seismic => 0,
            SourceKind::Hazard => 1,
            SourceKind::Thermal => 2,
            SourceKind::Conflict => 3,
            SourceKind::News => 4,
        };
        &self.slots[idx]
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting writes. Batches already held stay readable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Mark `kind` as fetching. Returns `false` once the store is closed.
    pub fn begin_fetch(&self, kind: SourceKind) -> bool {
        if self.is_closed() {
            return false;
        }
        self.slot(kind).write().state = PollState::Fetching;
        true
    }

    /// Install a freshly parsed batch.
    ///
    /// An empty batch while a non-empty one is held means the upstream has
    /// nothing right now: the old batch stays and the state becomes `Error`.
    pub fn replace(&self, kind: SourceKind, events: Vec<GeoEvent>) -> PollOutcome {
        if self.is_closed() {
            return self.finish(kind, PollOutcome::Discarded);
        }

        let outcome = {
            let mut slot = self.slot(kind).write();
            if events.is_empty() && !slot.batch.is_empty() {
                slot.state = PollState::Error;
                slot.last_error = Some("upstream returned no records".to_string());
                PollOutcome::KeptStale
            } else {
                slot.batch = Arc::new(events);
                slot.generation += 1;
                slot.state = PollState::Ready;
                slot.last_error = None;
                slot.updated_at = Some(now_ms());
                PollOutcome::Replaced
            }
        };

        if outcome == PollOutcome::Replaced {
            self.revision.send_modify(|rev| *rev += 1);
        }
        self.finish(kind, outcome)
    }

    /// Record a failed poll. The held batch is left untouched.
    pub fn fail(&self, kind: SourceKind, reason: impl Into<String>) -> PollOutcome {
        if self.is_closed() {
            return self.finish(kind, PollOutcome::Discarded);
        }
        {
            let mut slot = self.slot(kind).write();
            slot.state = PollState::Error;
            slot.last_error = Some(reason.into());
        }
        self.finish(kind, PollOutcome::Failed)
    }

    fn finish(&self, kind: SourceKind, outcome: PollOutcome) -> PollOutcome {
        self.stats.lock().record(kind, outcome);
        outcome
    }

    pub fn state(&self, kind: SourceKind) -> PollState {
        self.slot(kind).read().state
    }

    pub fn batch(&self, kind: SourceKind) -> Arc<Vec<GeoEvent>> {
        Arc::clone(&self.slot(kind).read().batch)
    }

    pub fn snapshot(&self, kind: SourceKind) -> Snapshot {
        let slot = self.slot(kind).read();
        Snapshot {
            kind,
            state: slot.state,
            batch: Arc::clone(&slot.batch),
            generation: slot.generation,
            last_error: slot.last_error.clone(),
            updated_at: slot.updated_at,
        }
    }

    /// Revision counter, bumped whenever any batch is replaced.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn stats(&self) -> PollStats {
        self.stats.lock().clone()
    }
}
