//! Geolocated news mentions: a GeoJSON-like FeatureCollection whose feature
//! properties come in one of two shapes depending on the upstream API
//! variant.
//!
//! - Structured: `url`, `title`, `domain`, `tone`/`urltone` as plain fields.
//! - Markup: an `html` fragment holding `<a href="..." title="...">` links.
//!
//! Each feature is classified once, structured first, and every field of the
//! resulting record comes from that one shape. `name` (the location label)
//! and `count` are common to both.

use std::sync::OnceLock;

use foundation::LonLat;
use regex_lite::Regex;
use serde_json::{Map, Value};

use crate::event::{EventPayload, GeoEvent, NewsMention, SourceKind};
use crate::geojson::{feature_values, point_feature};
use crate::ingest::{
    Ingest, IngestContext, IngestError, SourceAdapter, accept_position, lenient_f64,
};

const DEFAULT_TITLE: &str = "News event";

/// Look-back window requested from the news upstream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum NewsTimespan {
    OneHour,
    SixHours,
    #[default]
    OneDay,
    TwoDays,
}

impl NewsTimespan {
    pub const ALL: [NewsTimespan; 4] = [
        NewsTimespan::OneHour,
        NewsTimespan::SixHours,
        NewsTimespan::OneDay,
        NewsTimespan::TwoDays,
    ];

    /// Query value accepted by the proxy (`1h`, `6h`, `24h`, `48h`).
    /// Anything else falls back to the 24h default.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1h" => NewsTimespan::OneHour,
            "6h" => NewsTimespan::SixHours,
            "24h" => NewsTimespan::OneDay,
            "48h" => NewsTimespan::TwoDays,
            _ => NewsTimespan::default(),
        }
    }

    pub fn as_query(self) -> &'static str {
        match self {
            NewsTimespan::OneHour => "1h",
            NewsTimespan::SixHours => "6h",
            NewsTimespan::OneDay => "24h",
            NewsTimespan::TwoDays => "48h",
        }
    }

    /// The upstream's own timespan token (minutes).
    pub fn upstream_token(self) -> &'static str {
        match self {
            NewsTimespan::OneHour => "60min",
            NewsTimespan::SixHours => "360min",
            NewsTimespan::OneDay => "1440min",
            NewsTimespan::TwoDays => "2880min",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NewsShape {
    Structured {
        title: String,
        url: String,
        source: String,
        tone: f64,
    },
    Markup {
        title: String,
        url: String,
        source: String,
    },
}

impl NewsShape {
    fn classify(props: &Map<String, Value>, label: &str) -> Self {
        if let Some(shape) = Self::structured(props, label) {
            return shape;
        }
        Self::markup(props, label)
    }

    fn structured(props: &Map<String, Value>, label: &str) -> Option<Self> {
        let url = props
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let title = props
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(if label.is_empty() { DEFAULT_TITLE } else { label });
        let source = props
            .get("domain")
            .and_then(|v| v.as_str())
            .unwrap_or(label);
        let tone = lenient_f64(props.get("tone").or_else(|| props.get("urltone"))).unwrap_or(0.0);

        Some(NewsShape::Structured {
            title: title.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            tone,
        })
    }

    fn markup(props: &Map<String, Value>, label: &str) -> Self {
        let html = props.get("html").and_then(|v| v.as_str()).unwrap_or("");
        let url = capture(href_pattern(), html).unwrap_or_default();
        let title = capture(title_pattern(), html)
            .or_else(|| (!label.is_empty()).then(|| label.to_string()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        NewsShape::Markup {
            title,
            url,
            source: label.to_string(),
        }
    }

    fn into_mention(self, count: Option<u32>) -> NewsMention {
        match self {
            NewsShape::Structured {
                title,
                url,
                source,
                tone,
            } => NewsMention {
                title,
                source,
                url,
                tone,
                count,
            },
            NewsShape::Markup { title, url, source } => NewsMention {
                title,
                source,
                url,
                tone: 0.0,
                count,
            },
        }
    }
}

fn href_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]+)""#).ok()).as_ref()
}

fn title_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"title="([^"]+)""#).ok()).as_ref()
}

fn capture(re: Option<&Regex>, haystack: &str) -> Option<String> {
    re?.captures(haystack)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Default, Copy, Clone)]
pub struct NewsAdapter;

impl SourceAdapter for NewsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError> {
        let root: Value = serde_json::from_str(raw)?;
        let features = feature_values(&root)?;

        let mut events = Vec::with_capacity(features.len());
        let mut dropped = 0usize;

        for value in features {
            let Some(feature) = point_feature(value) else {
                dropped += 1;
                continue;
            };
            if !accept_position(SourceKind::News, LonLat::new(feature.lon, feature.lat)) {
                dropped += 1;
                continue;
            }
            let props = feature.properties;
            let label = props.get("name").and_then(|v| v.as_str()).unwrap_or("");
            if label.to_lowercase().contains("error") {
                dropped += 1;
                continue;
            }

            let count = lenient_f64(props.get("count"))
                .filter(|c| *c >= 0.0)
                .map(|c| c.min(f64::from(u32::MAX)) as u32);
            let mention = NewsShape::classify(props, label).into_mention(count);

            events.push(GeoEvent {
                id: format!("gdelt-{}-{},{}", events.len(), feature.lon, feature.lat),
                latitude: feature.lat,
                longitude: feature.lon,
                time: ctx.now_ms,
                payload: EventPayload::News(mention),
            });
        }

        Ok(Ingest::ok(events, dropped))
    }
}
