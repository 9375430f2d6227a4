//! One periodic fetch task per source.
//!
//! Every source ticks on its own `tokio::time::interval`; the first tick fires
//! immediately so a freshly mounted view fetches at once. Tasks are collected
//! in a [`JoinSet`] so teardown can stop all of them together.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use formats::{GeoEvent, IngestError, NewsTimespan, SourceKind};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::metrics::PollOutcome;
use crate::store::EventStore;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("poller closed")]
    Closed,
}

/// Parameters a fetch may depend on. Read at every tick.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    pub news_timespan: NewsTimespan,
}

/// Something that can produce the current batch for a source.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait FeedFetcher: Send + Sync {
    fn fetch(
        &self,
        kind: SourceKind,
        params: FetchParams,
    ) -> BoxFuture<'_, Result<Vec<GeoEvent>, FetchError>>;
}

pub struct PollerSet {
    store: Arc<EventStore>,
    params: Arc<RwLock<FetchParams>>,
    tasks: JoinSet<()>,
}

impl PollerSet {
    /// Spawn a poller for every source on the current runtime.
    pub fn start(
        store: Arc<EventStore>,
        fetcher: Arc<dyn FeedFetcher>,
        params: FetchParams,
    ) -> Self {
        Self::start_sources(store, fetcher, params, &SourceKind::ALL)
    }

    pub fn start_sources(
        store: Arc<EventStore>,
        fetcher: Arc<dyn FeedFetcher>,
        params: FetchParams,
        sources: &[SourceKind],
    ) -> Self {
        let params = Arc::new(RwLock::new(params));
        let mut tasks = JoinSet::new();
        for &kind in sources {
            tasks.spawn(poll_source(
                kind,
                kind.cadence(),
                Arc::clone(&store),
                Arc::clone(&fetcher),
                Arc::clone(&params),
            ));
        }
        info!(sources = sources.len(), "pollers started");
        Self {
            store,
            params,
            tasks,
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn params(&self) -> FetchParams {
        *self.params.read()
    }

    /// Picked up by the next news tick; never triggers a fetch by itself.
    pub fn set_news_timespan(&self, timespan: NewsTimespan) {
        self.params.write().news_timespan = timespan;
    }

    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Close the store and stop every poller. In-flight fetches are dropped
    /// and anything that still completes is discarded by the closed store.
    pub async fn teardown(mut self) {
        self.store.close();
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        debug!("pollers stopped");
    }
}

async fn poll_source(
    kind: SourceKind,
    cadence: Duration,
    store: Arc<EventStore>,
    fetcher: Arc<dyn FeedFetcher>,
    params: Arc<RwLock<FetchParams>>,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !store.begin_fetch(kind) {
            break;
        }
        let current = *params.read();

        let outcome = match fetcher.fetch(kind, current).await {
            Ok(events) => {
                let len = events.len();
                let outcome = store.replace(kind, events);
                match outcome {
                    PollOutcome::Replaced => info!(source = %kind, events = len, "batch replaced"),
                    PollOutcome::KeptStale => {
                        warn!(source = %kind, "empty response, keeping previous batch")
                    }
                    _ => {}
                }
                outcome
            }
            Err(FetchError::Closed) => break,
            Err(err) => {
                warn!(source = %kind, "poll failed: {err}");
                store.fail(kind, err.to_string())
            }
        };

        if outcome == PollOutcome::Discarded {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxFuture, FeedFetcher, FetchError, FetchParams, PollerSet};
    use crate::store::{EventStore, PollState};
    use formats::{
        EventPayload, GeoEvent, NewsMention, NewsTimespan, SeismicEvent, SourceKind,
    };
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn quake(id: &str) -> GeoEvent {
        GeoEvent {
            id: id.to_string(),
            latitude: 1.0,
            longitude: 2.0,
            time: 0,
            payload: EventPayload::Seismic(SeismicEvent {
                magnitude: 5.0,
                place: String::new(),
                depth: 0.0,
            }),
        }
    }

    fn mention(id: &str) -> GeoEvent {
        GeoEvent {
            id: id.to_string(),
            latitude: 1.0,
            longitude: 2.0,
            time: 0,
            payload: EventPayload::News(NewsMention {
                title: "t".to_string(),
                source: "s".to_string(),
                url: String::new(),
                tone: 0.0,
                count: None,
            }),
        }
    }

    /// Counts calls per source and records the params each call saw.
    #[derive(Default)]
    struct CountingFetcher {
        calls: Mutex<HashMap<SourceKind, usize>>,
        seen: Mutex<Vec<(SourceKind, FetchParams)>>,
        fail: Option<SourceKind>,
    }

    impl CountingFetcher {
        fn calls(&self, kind: SourceKind) -> usize {
            self.calls.lock().get(&kind).copied().unwrap_or(0)
        }
    }

    impl FeedFetcher for CountingFetcher {
        fn fetch(
            &self,
            kind: SourceKind,
            params: FetchParams,
        ) -> BoxFuture<'_, Result<Vec<GeoEvent>, FetchError>> {
            Box::pin(async move {
                let n = {
                    let mut calls = self.calls.lock();
                    let n = calls.entry(kind).or_insert(0);
                    *n += 1;
                    *n
                };
                self.seen.lock().push((kind, params));
                if self.fail == Some(kind) && n > 1 {
                    return Err(FetchError::Transport("connection refused".to_string()));
                }
                Ok(match kind {
                    SourceKind::News => vec![mention(&format!("n{n}"))],
                    _ => vec![quake(&format!("{kind}-{n}"))],
                })
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sources_poll_on_independent_cadences() {
        let store = Arc::new(EventStore::new());
        let fetcher = Arc::new(CountingFetcher::default());
        let pollers = PollerSet::start(
            Arc::clone(&store),
            fetcher.clone(),
            FetchParams::default(),
        );

        tokio::time::sleep(Duration::from_secs(60 * 60 + 1)).await;

        // Ticks at t = 0 and every cadence after, up to and including 60 min.
        assert_eq!(fetcher.calls(SourceKind::Seismic), 13);
        assert_eq!(fetcher.calls(SourceKind::Hazard), 5);
        assert_eq!(fetcher.calls(SourceKind::News), 5);
        assert_eq!(fetcher.calls(SourceKind::Thermal), 2);
        assert_eq!(fetcher.calls(SourceKind::Conflict), 2);

        pollers.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_happens_at_mount() {
        let store = Arc::new(EventStore::new());
        let fetcher = Arc::new(CountingFetcher::default());
        let pollers = PollerSet::start_sources(
            Arc::clone(&store),
            fetcher.clone(),
            FetchParams::default(),
            &[SourceKind::Conflict],
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetcher.calls(SourceKind::Conflict), 1);
        assert_eq!(store.state(SourceKind::Conflict), PollState::Ready);
        assert_eq!(store.batch(SourceKind::Conflict)[0].id, "conflict-1");

        pollers.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_keeps_stale_batch() {
        let store = Arc::new(EventStore::new());
        let fetcher = Arc::new(CountingFetcher {
            fail: Some(SourceKind::Seismic),
            ..Default::default()
        });
        let pollers = PollerSet::start_sources(
            Arc::clone(&store),
            fetcher.clone(),
            FetchParams::default(),
            &[SourceKind::Seismic],
        );

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        assert_eq!(fetcher.calls(SourceKind::Seismic), 2);
        let snap = store.snapshot(SourceKind::Seismic);
        assert_eq!(snap.state, PollState::Error);
        assert_eq!(snap.batch[0].id, "seismic-1");
        assert!(snap.last_error.unwrap().contains("connection refused"));

        pollers.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timespan_change_waits_for_next_news_tick() {
        let store = Arc::new(EventStore::new());
        let fetcher = Arc::new(CountingFetcher::default());
        let pollers = PollerSet::start_sources(
            Arc::clone(&store),
            fetcher.clone(),
            FetchParams::default(),
            &[SourceKind::News],
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        pollers.set_news_timespan(NewsTimespan::SixHours);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.calls(SourceKind::News), 1);

        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        let seen: Vec<_> = fetcher
            .seen
            .lock()
            .iter()
            .map(|(_, p)| p.news_timespan)
            .collect();
        assert_eq!(seen, vec![NewsTimespan::OneDay, NewsTimespan::SixHours]);

        pollers.teardown().await;
    }

    /// Blocks every fetch until released.
    struct GatedFetcher {
        gate: Arc<Notify>,
        started: Arc<Notify>,
    }

    impl FeedFetcher for GatedFetcher {
        fn fetch(
            &self,
            _kind: SourceKind,
            _params: FetchParams,
        ) -> BoxFuture<'_, Result<Vec<GeoEvent>, FetchError>> {
            Box::pin(async move {
                self.started.notify_one();
                self.gate.notified().await;
                Ok(vec![quake("late")])
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_in_flight_fetches() {
        let store = Arc::new(EventStore::new());
        let gate = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());
        let pollers = PollerSet::start_sources(
            Arc::clone(&store),
            Arc::new(GatedFetcher {
                gate: Arc::clone(&gate),
                started: Arc::clone(&started),
            }),
            FetchParams::default(),
            &[SourceKind::Seismic],
        );

        started.notified().await;
        assert_eq!(store.state(SourceKind::Seismic), PollState::Fetching);

        pollers.teardown().await;
        gate.notify_waiters();
        tokio::time::advance(Duration::from_secs(10 * 60)).await;

        assert!(store.is_closed());
        assert!(store.batch(SourceKind::Seismic).is_empty());
    }
}
