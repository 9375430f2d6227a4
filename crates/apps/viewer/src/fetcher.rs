//! Polls the feeds proxy over HTTP.

use std::time::Duration;

use formats::{decode_batch, GeoEvent, IngestContext, SourceKind};
use runtime::{BoxFuture, FeedFetcher, FetchError, FetchParams};
use tracing::debug;

/// Client-side ceiling; the proxy applies its own upstream limits.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpFeedFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedFetcher {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Proxy URL for one poll of `kind`.
pub fn request_url(base_url: &str, kind: SourceKind, params: FetchParams) -> String {
    let base = base_url.trim_end_matches('/');
    match kind {
        SourceKind::News => format!(
            "{base}{}?timespan={}",
            kind.route(),
            params.news_timespan.as_query()
        ),
        _ => format!("{base}{}", kind.route()),
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(
        &self,
        kind: SourceKind,
        params: FetchParams,
    ) -> BoxFuture<'_, Result<Vec<GeoEvent>, FetchError>> {
        Box::pin(async move {
            let url = request_url(&self.base_url, kind, params);
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Transport(format!("{url} returned {status}")));
            }
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let out = decode_batch(kind, &body, &IngestContext::now());
            debug!(
                source = %kind,
                kept = out.events.len(),
                dropped = out.dropped,
                "decoded proxy response"
            );
            Ok(out.into_result()?)
        })
    }
}
