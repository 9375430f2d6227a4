//! Active-fire thermal detections: CSV with a header row.
//!
//! Column positions are looked up by header name on every payload since the
//! upstream product has reordered columns before.

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use foundation::LonLat;

use crate::event::{Confidence, DayNight, EventPayload, GeoEvent, SourceKind, ThermalDetection};
use crate::ingest::{
    Ingest, IngestContext, IngestError, SourceAdapter, accept_position, coerce_f64,
};

#[derive(Debug, Default, Copy, Clone)]
pub struct ThermalAdapter;

/// Header offsets for one payload.
#[derive(Debug, Copy, Clone)]
struct Columns {
    latitude: usize,
    longitude: usize,
    frp: Option<usize>,
    confidence: Option<usize>,
    acq_date: Option<usize>,
    acq_time: Option<usize>,
    daynight: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Self {
            latitude: find("latitude").ok_or(IngestError::MissingColumn("latitude"))?,
            longitude: find("longitude").ok_or(IngestError::MissingColumn("longitude"))?,
            frp: find("frp"),
            confidence: find("confidence"),
            acq_date: find("acq_date"),
            acq_time: find("acq_time"),
            daynight: find("daynight"),
        })
    }
}

impl SourceAdapter for ThermalAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Thermal
    }

    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw.as_bytes());
        let columns = Columns::resolve(reader.headers()?)?;

        let mut events = Vec::new();
        let mut dropped = 0usize;

        for (row, record) in reader.records().enumerate() {
            let Ok(record) = record else {
                dropped += 1;
                continue;
            };
            match normalize_row(row, &record, columns, ctx) {
                Some(ev) => events.push(ev),
                None => dropped += 1,
            }
        }

        Ok(Ingest::ok(events, dropped))
    }
}

fn normalize_row(
    row: usize,
    record: &StringRecord,
    columns: Columns,
    ctx: &IngestContext,
) -> Option<GeoEvent> {
    let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

    // A missing confidence column keeps the row; an explicit low one does not.
    let confidence = match columns.confidence {
        None => Confidence::Nominal,
        Some(_) => Confidence::parse(cell(columns.confidence)).unwrap_or(Confidence::Nominal),
    };
    if confidence == Confidence::Low {
        return None;
    }

    let lat = record.get(columns.latitude)?.parse::<f64>().ok()?;
    let lon = record.get(columns.longitude)?.parse::<f64>().ok()?;
    if !accept_position(SourceKind::Thermal, LonLat::new(lon, lat)) {
        return None;
    }

    let acq_date = cell(columns.acq_date).to_string();
    let acq_time = cell(columns.acq_time).to_string();
    let time = acquisition_ms(&acq_date, &acq_time).unwrap_or(ctx.now_ms);

    Some(GeoEvent {
        id: format!("thermal-{row}"),
        latitude: lat,
        longitude: lon,
        time,
        payload: EventPayload::Thermal(ThermalDetection {
            frp: coerce_f64(cell(columns.frp)).max(0.0),
            confidence,
            acq_date,
            acq_time,
            day_night: DayNight::parse(cell(columns.daynight)),
        }),
    })
}

/// `acq_date` is `YYYY-MM-DD`; `acq_time` is UTC `HHMM` with leading zeros
/// sometimes stripped (`"5"` is 00:05).
fn acquisition_ms(date: &str, time: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let hhmm: u32 = time.trim().parse().unwrap_or(0);
    let clock = NaiveTime::from_hms_opt(hhmm / 100, hhmm % 100, 0).unwrap_or_default();
    Some(date.and_time(clock).and_utc().timestamp_millis())
}
