//! Client-side decoding of proxy responses.
//!
//! The earthquake route passes the upstream GeoJSON through untouched, so it
//! goes through the seismic adapter here. Every other route already returns
//! normalized events, which are re-validated against the route's kind.

use serde_json::Value;

use crate::event::{GeoEvent, SourceKind};
use crate::ingest::{Ingest, IngestContext, IngestError, accept_position, ingest};
use crate::seismic::SeismicAdapter;

pub fn decode_batch(kind: SourceKind, body: &str, ctx: &IngestContext) -> Ingest {
    if kind == SourceKind::Seismic {
        return ingest(&SeismicAdapter, body, ctx);
    }
    match decode_events(kind, body) {
        Ok(out) => out,
        Err(err) => {
            tracing::warn!(source = %kind, "proxy response rejected: {err}");
            Ingest::failed(err)
        }
    }
}

fn decode_events(kind: SourceKind, body: &str) -> Result<Ingest, IngestError> {
    let root: Value = serde_json::from_str(body)?;
    let Value::Array(items) = root else {
        return Err(IngestError::NotAnArray);
    };

    let mut events = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match serde_json::from_value::<GeoEvent>(item) {
            Ok(ev) if ev.kind() == kind && accept_position(kind, ev.position()) => {
                events.push(ev)
            }
            _ => dropped += 1,
        }
    }
    Ok(Ingest::ok(events, dropped))
}
