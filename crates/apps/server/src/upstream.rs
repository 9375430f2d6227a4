//! Upstream HTTP access.
//!
//! Handlers talk to an [`Upstream`] rather than to `reqwest` directly so the
//! router can be exercised without network access.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Largest upstream body accepted. The global 24h thermal CSV is the biggest.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("upstream HTTP {0}")]
    Status(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("bad body: {0}")]
    Body(String),
}

/// Source of raw upstream text.
///
/// Implementations must be `Send + Sync` for use across handlers.
pub trait Upstream: Send + Sync {
    fn get_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>>;
}

pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Upstream for HttpUpstream {
    fn get_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| UpstreamError::Request(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(UpstreamError::Status(status.as_u16()));
            }

            let mut body = Vec::new();
            let mut chunks = resp.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| UpstreamError::Request(e.to_string()))?;
                if body.len() + chunk.len() > MAX_BODY_BYTES {
                    return Err(UpstreamError::Body(format!(
                        "payload larger than {MAX_BODY_BYTES} bytes"
                    )));
                }
                body.extend_from_slice(&chunk);
            }

            String::from_utf8(body)
                .map_err(|_| UpstreamError::Body("response was not valid UTF-8".to_string()))
        })
    }
}

/// Fetch `url`, failing with [`UpstreamError::Timeout`] once `timeout` elapses.
pub async fn fetch_text(
    upstream: &dyn Upstream,
    url: &str,
    timeout: Option<Duration>,
) -> Result<String, UpstreamError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, upstream.get_text(url))
            .await
            .map_err(|_| UpstreamError::Timeout(limit))?,
        None => upstream.get_text(url).await,
    }
}
