//! A mounted dashboard: pollers feeding the store, and the composed layer
//! stack pushed through the overlay handle.
//!
//! View changes recompose from the batches already held. Only the poll timers
//! fetch.

use std::sync::Arc;

use formats::{NewsTimespan, SourceKind};
use foundation::LonLat;
use layers::{compose, Batches, ComposeInput, MapSurface, OverlayHandle, Tooltip, TooltipController};
use runtime::{EventStore, FeedFetcher, FetchParams, PollerSet};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ViewConfig;

pub struct Session<S: MapSurface> {
    pollers: PollerSet,
    overlay: OverlayHandle<S>,
    view: ViewConfig,
    tooltips: TooltipController,
}

impl<S: MapSurface> Session<S> {
    /// Start every poller and take the surface. Must run inside a tokio
    /// runtime.
    pub fn mount(fetcher: Arc<dyn FeedFetcher>, surface: S, view: ViewConfig) -> Self {
        let params = FetchParams {
            news_timespan: view.news_timespan(),
        };
        let pollers = PollerSet::start(Arc::new(EventStore::new()), fetcher, params);
        info!(
            sources = pollers.running(),
            news_timespan = params.news_timespan.as_query(),
            "session mounted"
        );

        Self {
            pollers,
            overlay: OverlayHandle::acquire(surface),
            view,
            tooltips: TooltipController::new(),
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        self.pollers.store()
    }

    /// Bumps whenever any source's batch is replaced.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store().subscribe()
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    pub fn overlay(&self) -> &OverlayHandle<S> {
        &self.overlay
    }

    pub fn news_timespan(&self) -> NewsTimespan {
        self.pollers.params().news_timespan
    }

    /// Filter and compose the current batches and commit the result.
    /// Returns whether the surface received a new stack; a new stack clears
    /// the tooltip.
    pub fn recompose(&mut self) -> bool {
        let store = self.pollers.store();
        let seismic = store.batch(SourceKind::Seismic);
        let hazard = store.batch(SourceKind::Hazard);
        let thermal = store.batch(SourceKind::Thermal);
        let conflict = store.batch(SourceKind::Conflict);
        let news = store.batch(SourceKind::News);

        let filters = self.view.filters();
        let stack = compose(&ComposeInput {
            batches: Batches {
                seismic: &seismic,
                hazard: &hazard,
                thermal: &thermal,
                conflict: &conflict,
                news: &news,
            },
            filters: &filters,
            visibility: self.view.visibility(),
            encoding: self.view.encoding(),
        });
        let committed = self.overlay.commit(stack);
        if committed {
            // The hovered record may no longer be drawn.
            self.tooltips.clear();
        }
        debug!(committed, revision = store.revision(), "recomposed");
        committed
    }

    /// Apply a new panel state. A new news timespan is handed to the pollers
    /// for the next news tick.
    pub fn set_view(&mut self, view: ViewConfig) -> bool {
        let timespan = view.news_timespan();
        if timespan != self.news_timespan() {
            info!(timespan = timespan.as_query(), "news timespan changed");
            self.pollers.set_news_timespan(timespan);
        }
        self.view = view;
        self.recompose()
    }

    pub fn hover<F>(
        &mut self,
        x_px: f64,
        y_px: f64,
        unproject: F,
        metres_per_px: f64,
    ) -> Option<&Tooltip>
    where
        F: FnMut(f64, f64) -> Option<LonLat>,
    {
        match self.overlay.committed() {
            Some(stack) => self.tooltips.hover(stack, x_px, y_px, unproject, metres_per_px),
            None => {
                self.tooltips.clear();
                None
            }
        }
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltips.current()
    }

    /// Stop the pollers, close the store and hand the released surface back.
    pub async fn teardown(self) -> Option<S> {
        let Session {
            pollers,
            mut overlay,
            mut tooltips,
            ..
        } = self;
        tooltips.clear();
        pollers.teardown().await;
        overlay.release()
    }
}
