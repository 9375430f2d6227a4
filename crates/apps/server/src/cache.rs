//! Freshness cache for upstream responses.
//!
//! One entry per key. A fresh entry is served without touching upstream; a
//! stale or missing one is refreshed while holding the key's lock, so
//! concurrent requests for the same key wait on a single fetch. Only
//! successful refreshes are stored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::upstream::UpstreamError;

#[derive(Debug, Clone)]
struct Entry {
    body: Arc<str>,
    fetched_at: Instant,
}

/// Where a served body came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Served {
    Fresh,
    Refreshed,
    /// Refresh failed; an older body was served instead.
    Stale,
}

#[derive(Default)]
pub struct FreshCache {
    entries: DashMap<String, Arc<Mutex<Option<Entry>>>>,
}

impl FreshCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_refresh<F, Fut>(
        &self,
        key: &str,
        window: Duration,
        refresh: F,
    ) -> Result<(Arc<str>, Served), UpstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<str>, UpstreamError>>,
    {
        // Clone the slot out so no map guard is held across an await.
        let slot = self.entries.entry(key.to_string()).or_default().clone();
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < window {
                debug!(key, "cache hit");
                return Ok((Arc::clone(&cached.body), Served::Fresh));
            }
        }

        match refresh().await {
            Ok(body) => {
                *entry = Some(Entry {
                    body: Arc::clone(&body),
                    fetched_at: Instant::now(),
                });
                Ok((body, Served::Refreshed))
            }
            Err(err) => match entry.as_ref() {
                Some(stale) => {
                    warn!(key, "refresh failed, serving stale body: {err}");
                    Ok((Arc::clone(&stale.body), Served::Stale))
                }
                None => Err(err),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
