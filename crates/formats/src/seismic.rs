//! Earthquake feed: GeoJSON FeatureCollection of Point features.

use foundation::LonLat;
use serde_json::Value;

use crate::event::{EventPayload, GeoEvent, SeismicEvent, SourceKind};
use crate::geojson::{feature_values, point_feature};
use crate::ingest::{Ingest, IngestContext, IngestError, SourceAdapter, accept_position};

#[derive(Debug, Default, Copy, Clone)]
pub struct SeismicAdapter;

impl SourceAdapter for SeismicAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Seismic
    }

    fn parse(&self, raw: &str, ctx: &IngestContext) -> Result<Ingest, IngestError> {
        let root: Value = serde_json::from_str(raw)?;
        let features = feature_values(&root)?;

        let mut events = Vec::with_capacity(features.len());
        let mut dropped = 0usize;

        for (index, value) in features.iter().enumerate() {
            let Some(feature) = point_feature(value) else {
                dropped += 1;
                continue;
            };
            if !accept_position(SourceKind::Seismic, LonLat::new(feature.lon, feature.lat)) {
                dropped += 1;
                continue;
            }

            let props = feature.properties;
            // Upstream nulls pass through as 0 / "".
            let magnitude = props
                .get("mag")
                .and_then(|v| v.as_f64())
                .filter(|m| m.is_finite())
                .unwrap_or(0.0)
                .max(0.0);
            let place = props
                .get("place")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let time = props
                .get("time")
                .and_then(|v| v.as_i64())
                .unwrap_or(ctx.now_ms);

            events.push(GeoEvent {
                id: feature.id.unwrap_or_else(|| format!("usgs-{index}")),
                latitude: feature.lat,
                longitude: feature.lon,
                time,
                payload: EventPayload::Seismic(SeismicEvent {
                    magnitude,
                    place,
                    depth: feature.z.filter(|d| d.is_finite()).unwrap_or(0.0),
                }),
            });
        }

        Ok(Ingest::ok(events, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::SeismicAdapter;
    use crate::event::EventPayload;
    use crate::ingest::{IngestContext, ingest};

    const FEED: &str = r#"{
        "type": "FeatureCollection",
        "metadata": {"title": "USGS Magnitude 4.5+ Earthquakes, Past Month"},
        "features": [
            {"type": "Feature", "id": "us7000m9g4",
             "properties": {"mag": 7.2, "place": "Kermadec Islands", "time": 1700000000000},
             "geometry": {"type": "Point", "coordinates": [-177.9, -29.5, 35.2]}},
            {"type": "Feature", "id": "us7000m9g5",
             "properties": {"mag": null, "place": null, "time": null},
             "geometry": {"type": "Point", "coordinates": [120.1, 14.3]}},
            {"type": "Feature", "id": "broken",
             "properties": {"mag": 5.0},
             "geometry": null}
        ]
    }"#;

    #[test]
    fn normalizes_features_and_tolerates_nulls() {
        let ctx = IngestContext::new(42);
        let out = ingest(&SeismicAdapter, FEED, &ctx);
        assert!(out.error.is_none());
        assert_eq!(out.events.len(), 2);
        assert_eq!(out.dropped, 1);

        let first = &out.events[0];
        assert_eq!(first.id, "us7000m9g4");
        assert_eq!(first.time, 1_700_000_000_000);
        let EventPayload::Seismic(s) = &first.payload else {
            panic!("expected seismic payload");
        };
        assert_eq!(s.magnitude, 7.2);
        assert_eq!(s.depth, 35.2);

        let second = &out.events[1];
        assert_eq!(second.time, 42);
        let EventPayload::Seismic(s) = &second.payload else {
            panic!("expected seismic payload");
        };
        assert_eq!(s.magnitude, 0.0);
        assert_eq!(s.place, "");
        assert_eq!(s.depth, 0.0);
    }

    #[test]
    fn garbage_payload_is_an_empty_failed_ingest() {
        let out = ingest(&SeismicAdapter, "<html>503</html>", &IngestContext::new(0));
        assert!(out.is_failure());
        assert!(out.events.is_empty());
    }

    #[test]
    fn degraded_empty_array_is_not_a_failure() {
        let out = ingest(&SeismicAdapter, "[]", &IngestContext::new(0));
        assert!(!out.is_failure());
        assert!(out.events.is_empty());
    }
}
