//! Armed-conflict incidents: a flat JSON array of records.
//!
//! Records may use the upstream field names (`data_id`, `event_type`,
//! `event_date`, numbers as strings) or the normalized wire names; both map
//! to the same [`ConflictIncident`].

use chrono::{DateTime, NaiveDate};
use foundation::LonLat;
use serde_json::{Map, Value};

use crate::event::{ConflictCategory, ConflictIncident, EventPayload, GeoEvent, SourceKind};
use crate::ingest::{
    Ingest, IngestContext, IngestError, SourceAdapter, accept_position, lenient_f64,
    lenient_string,
};

#[derive(Debug, Default, Copy, Clone)]
pub struct ConflictAdapter;

impl SourceAdapter for ConflictAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Conflict
    }

    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError> {
        let root: Value = serde_json::from_str(raw)?;
        let records = match &root {
            Value::Array(items) => items.as_slice(),
            // Upstream envelope: {"status": 200, "data": [...]}
            Value::Object(obj) => obj
                .get("data")
                .and_then(|v| v.as_array())
                .map(|v| v.as_slice())
                .ok_or(IngestError::NotAnArray)?,
            _ => return Err(IngestError::NotAnArray),
        };

        let mut events = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for (index, value) in records.iter().enumerate() {
            match value.as_object().and_then(|obj| normalize_record(index, obj, ctx)) {
                Some(ev) => events.push(ev),
                None => dropped += 1,
            }
        }
        Ok(Ingest::ok(events, dropped))
    }
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn normalize_record(
    index: usize,
    obj: &Map<String, Value>,
    ctx: &IngestContext,
) -> Option<GeoEvent> {
    let category = first(obj, &["event_type", "eventType", "category"])
        .and_then(|v| v.as_str())
        .and_then(ConflictCategory::from_label)?;

    let lat = lenient_f64(obj.get("latitude"))?;
    let lon = lenient_f64(obj.get("longitude"))?;
    if !accept_position(SourceKind::Conflict, LonLat::new(lon, lat)) {
        return None;
    }

    let time = match first(obj, &["event_date", "eventDate"]) {
        Some(Value::String(s)) => parse_date_ms(s),
        _ => first(obj, &["time"]).and_then(|v| v.as_i64()),
    }
    .unwrap_or(ctx.now_ms);

    let fatalities = lenient_f64(obj.get("fatalities"))
        .filter(|f| *f >= 0.0)
        .map(|f| f.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0);

    let text = |keys: &[&str]| {
        first(obj, keys)
            .and_then(|v| lenient_string(Some(v)))
            .unwrap_or_default()
    };

    let id = first(obj, &["data_id", "id", "event_id_cnty"])
        .and_then(|v| lenient_string(Some(v)))
        .unwrap_or_else(|| format!("acled-{index}"));

    Some(GeoEvent {
        id,
        latitude: lat,
        longitude: lon,
        time,
        payload: EventPayload::Conflict(ConflictIncident {
            category,
            sub_category: text(&["sub_event_type", "subEventType", "subCategory"]),
            country: text(&["country"]),
            fatalities,
            notes: text(&["notes"]),
        }),
    })
}

/// ISO calendar date (`2024-03-09`) at UTC midnight, or a full RFC 3339 stamp.
fn parse_date_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
