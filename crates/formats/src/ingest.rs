//! Shared ingestion contract for the source adapters.
//!
//! Adapters never fail outright: a payload that cannot be read at all yields
//! an [`Ingest`] with no events and `error` set, while individual bad records
//! are dropped and counted.

use foundation::{EpochMs, LonLat, now_ms};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{GeoEvent, SourceKind};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid XML: {0}")]
    Xml(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("expected a feature collection or feature array")]
    NotACollection,
    #[error("expected a JSON array of records")]
    NotAnArray,
    #[error("expected an RSS document")]
    NotRss,
}

/// Ambient inputs an adapter may need besides the raw payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IngestContext {
    /// Fallback timestamp for records without a resolvable time.
    pub now_ms: EpochMs,
}

impl IngestContext {
    pub fn new(now_ms: EpochMs) -> Self {
        Self { now_ms }
    }

    pub fn now() -> Self {
        Self::new(now_ms())
    }
}

/// Result of one adapter run.
#[derive(Debug, Default)]
pub struct Ingest {
    pub events: Vec<GeoEvent>,
    /// Records skipped for being malformed, sentinel-located or excluded.
    pub dropped: usize,
    /// Set only when the whole payload was unreadable.
    pub error: Option<IngestError>,
}

impl Ingest {
    pub fn ok(events: Vec<GeoEvent>, dropped: usize) -> Self {
        Self {
            events,
            dropped,
            error: None,
        }
    }

    pub fn failed(error: IngestError) -> Self {
        Self {
            events: Vec::new(),
            dropped: 0,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Vec<GeoEvent>, IngestError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.events),
        }
    }
}

/// A parser from one upstream wire format to normalized events.
pub trait SourceAdapter {
    fn kind(&self) -> SourceKind;

    /// Parse a whole payload. Per-record problems are reported through
    /// `Ingest::dropped`; only payload-level problems are errors.
    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError>;
}

/// Run an adapter, folding payload errors into the returned [`Ingest`].
pub fn ingest<A: SourceAdapter + ?Sized>(adapter: &A, raw: &str, ctx: &IngestContext) -> Ingest {
    match adapter.parse(raw, ctx) {
        Ok(out) => {
            if out.dropped > 0 {
                debug!(
                    source = %adapter.kind(),
                    kept = out.events.len(),
                    dropped = out.dropped,
                    "dropped records during ingest"
                );
            }
            out
        }
        Err(err) => {
            warn!(source = %adapter.kind(), "payload rejected: {err}");
            Ingest::failed(err)
        }
    }
}

/// Coordinates accepted into a batch for `kind`.
pub(crate) fn accept_position(kind: SourceKind, pos: LonLat) -> bool {
    if !pos.is_valid() {
        return false;
    }
    !(kind.uses_null_island_sentinel() && pos.is_null_island())
}

/// Numbers that may arrive as JSON numbers or numeric strings.
pub(crate) fn lenient_f64(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

pub(crate) fn lenient_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a numeric field, coercing anything unreadable to 0.
pub(crate) fn coerce_f64(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::{coerce_f64, lenient_f64};
    use serde_json::json;

    #[test]
    fn coerce_never_yields_nan() {
        assert_eq!(coerce_f64("12.5"), 12.5);
        assert_eq!(coerce_f64("abc"), 0.0);
        assert_eq!(coerce_f64(""), 0.0);
        assert_eq!(coerce_f64("NaN"), 0.0);
        assert_eq!(coerce_f64("inf"), 0.0);
    }

    #[test]
    fn lenient_reads_strings_and_numbers() {
        assert_eq!(lenient_f64(Some(&json!("3.5"))), Some(3.5));
        assert_eq!(lenient_f64(Some(&json!(2))), Some(2.0));
        assert_eq!(lenient_f64(Some(&json!(null))), None);
        assert_eq!(lenient_f64(None), None);
    }
}
