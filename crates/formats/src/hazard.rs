//! Multi-hazard alert feed: RSS 2.0 with `gdacs:` and `geo:` namespaced fields.
//!
//! Earthquake items are excluded because the seismic feed already covers
//! them, and items located at exactly (0, 0) are treated as unlocated.

use std::collections::HashMap;

use chrono::DateTime;
use foundation::LonLat;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::event::{AlertLevel, EventPayload, GeoEvent, HazardAlert, HazardType, SourceKind};
use crate::ingest::{Ingest, IngestContext, IngestError, SourceAdapter, accept_position};

/// Event code of items left to the seismic feed.
const EXCLUDED_EVENT_TYPE: &str = "EQ";

#[derive(Debug, Default, Copy, Clone)]
pub struct HazardAdapter;

type RawItem = HashMap<String, String>;

impl SourceAdapter for HazardAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Hazard
    }

    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError> {
        let items = read_items(raw)?;

        let mut events = Vec::with_capacity(items.len());
        let mut dropped = 0usize;
        for (index, item) in items.iter().enumerate() {
            match normalize_item(index, item, ctx) {
                Some(ev) => events.push(ev),
                None => dropped += 1,
            }
        }
        Ok(Ingest::ok(events, dropped))
    }
}

fn normalize_item(index: usize, item: &RawItem, ctx: &IngestContext) -> Option<GeoEvent> {
    let field = |key: &str| item.get(key).map(|s| s.trim()).filter(|s| !s.is_empty());

    let code = field("gdacs:eventtype").unwrap_or("");
    if code.eq_ignore_ascii_case(EXCLUDED_EVENT_TYPE) {
        return None;
    }
    let hazard_type = HazardType::from_code(code)?;

    let (lat, lon) = item_position(item);
    if !accept_position(SourceKind::Hazard, LonLat::new(lon, lat)) {
        return None;
    }

    let alert_level = field("gdacs:alertlevel")
        .and_then(AlertLevel::parse)
        .unwrap_or_default();

    let time = field("pubDate")
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(ctx.now_ms);

    Some(GeoEvent {
        id: field("guid")
            .map(str::to_string)
            .unwrap_or_else(|| format!("gdacs-{index}")),
        latitude: lat,
        longitude: lon,
        time,
        payload: EventPayload::Hazard(HazardAlert {
            hazard_type,
            alert_level,
            title: field("title").unwrap_or("").to_string(),
            description: field("description").unwrap_or("").to_string(),
        }),
    })
}

/// `geo:lat`/`geo:long`, falling back to `georss:point` ("lat lon").
/// Absent values read as 0 so they land on the sentinel and get dropped.
fn item_position(item: &RawItem) -> (f64, f64) {
    let num = |key: &str| item.get(key).and_then(|s| s.trim().parse::<f64>().ok());

    if let (Some(lat), Some(lon)) = (num("geo:lat"), num("geo:long")) {
        return (lat, lon);
    }
    if let Some(point) = item.get("georss:point") {
        let mut parts = point.split_whitespace().map(|p| p.parse::<f64>().ok());
        if let (Some(Some(lat)), Some(Some(lon))) = (parts.next(), parts.next()) {
            return (lat, lon);
        }
    }
    (num("geo:lat").unwrap_or(0.0), num("geo:long").unwrap_or(0.0))
}

/// Collect the leaf text of every `<item>` keyed by qualified element name.
fn read_items(raw: &str) -> Result<Vec<RawItem>, IngestError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut saw_rss = false;
    let mut items: Vec<RawItem> = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event() {
            Err(e) => return Err(IngestError::Xml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "rss" => saw_rss = true,
                    "item" => current = Some(RawItem::new()),
                    _ if current.is_some() => field = Some(name),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"rss" {
                    saw_rss = true;
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(key)) = (current.as_mut(), field.as_ref()) {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    item.entry(key.clone()).or_default().push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(item), Some(key)) = (current.as_mut(), field.as_ref()) {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    item.entry(key.clone()).or_default().push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
                field = None;
            }
            Ok(_) => {}
        }
    }

    if !saw_rss {
        return Err(IngestError::NotRss);
    }
    Ok(items)
}
