//! Filtered batches + visibility + encoding parameters -> [`LayerStack`].
//!
//! Composition is a pure function of its inputs: the same batches, filters
//! and parameters always yield an equal stack. Each visible source produces
//! exactly one layer, even when its filtered batch is empty.

use formats::{EventPayload, GeoEvent, SourceKind};
use serde::{Deserialize, Serialize};

use crate::filter::FilterSet;
use crate::layer::{
    HeatLayer, HeatPoint, LayerId, LayerStack, RenderLayer, ScatterLayer, ScatterPoint,
};
use crate::symbology::{
    CONFLICT_CLAMP, DEFAULT_INTENSITY, HAZARD_CLAMP, HEAT_RADIUS_PX, HEAT_RAMP, NEWS_CLAMP,
    NEWS_COLOR, NEWS_RADIUS_M, SEISMIC_CLAMP, clamp_intensity, conflict_color, conflict_radius_m,
    hazard_color, hazard_radius_m, seismic_color, seismic_radius_m, thermal_weight,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub seismic: bool,
    pub hazard: bool,
    pub thermal: bool,
    pub conflict: bool,
    pub news: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::all()
    }
}

impl Visibility {
    pub const fn all() -> Self {
        Self {
            seismic: true,
            hazard: true,
            thermal: true,
            conflict: true,
            news: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            seismic: false,
            hazard: false,
            thermal: false,
            conflict: false,
            news: false,
        }
    }

    pub fn is_visible(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Seismic => self.seismic,
            SourceKind::Hazard => self.hazard,
            SourceKind::Thermal => self.thermal,
            SourceKind::Conflict => self.conflict,
            SourceKind::News => self.news,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodingParams {
    /// Heat-surface intensity; clamped to `[0.5, 3.0]` at composition.
    pub thermal_intensity: f64,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            thermal_intensity: DEFAULT_INTENSITY,
        }
    }
}

/// Latest batch per source, borrowed from the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Batches<'a> {
    pub seismic: &'a [GeoEvent],
    pub hazard: &'a [GeoEvent],
    pub thermal: &'a [GeoEvent],
    pub conflict: &'a [GeoEvent],
    pub news: &'a [GeoEvent],
}

impl<'a> Batches<'a> {
    pub fn get(&self, kind: SourceKind) -> &'a [GeoEvent] {
        match kind {
            SourceKind::Seismic => self.seismic,
            SourceKind::Hazard => self.hazard,
            SourceKind::Thermal => self.thermal,
            SourceKind::Conflict => self.conflict,
            SourceKind::News => self.news,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    pub batches: Batches<'a>,
    pub filters: &'a FilterSet,
    pub visibility: Visibility,
    pub encoding: EncodingParams,
}

pub fn compose(input: &ComposeInput<'_>) -> LayerStack {
    let mut layers = Vec::with_capacity(LayerId::DRAW_ORDER.len());
    for id in LayerId::DRAW_ORDER {
        let kind = id.source();
        if !input.visibility.is_visible(kind) {
            continue;
        }
        let records = input.filters.apply(kind, input.batches.get(kind));
        let layer = match id {
            LayerId::Thermal => RenderLayer::Heat(heat_layer(&records, input.encoding)),
            _ => RenderLayer::Scatter(scatter_layer(id, &records)),
        };
        layers.push(layer);
    }
    LayerStack::from_layers(layers)
}

fn scatter_layer(id: LayerId, records: &[&GeoEvent]) -> ScatterLayer {
    let clamp = match id {
        LayerId::Seismic => SEISMIC_CLAMP,
        LayerId::Hazard => HAZARD_CLAMP,
        LayerId::Conflict => CONFLICT_CLAMP,
        _ => NEWS_CLAMP,
    };

    let mut points = Vec::with_capacity(records.len());
    let mut data = Vec::with_capacity(records.len());
    for ev in records {
        let (radius_m, color) = match &ev.payload {
            EventPayload::Seismic(s) => (seismic_radius_m(s.magnitude), seismic_color(s.magnitude)),
            EventPayload::Hazard(h) => {
                (hazard_radius_m(h.alert_level), hazard_color(h.alert_level))
            }
            EventPayload::Conflict(c) => {
                (conflict_radius_m(c.fatalities), conflict_color(c.category))
            }
            EventPayload::News(_) => (NEWS_RADIUS_M, NEWS_COLOR),
            // Heat-only source; never routed here.
            EventPayload::Thermal(_) => continue,
        };
        points.push(ScatterPoint {
            position: ev.position(),
            radius_m,
            color,
        });
        data.push((*ev).clone());
    }

    ScatterLayer {
        id,
        points,
        data,
        clamp,
    }
}

fn heat_layer(records: &[&GeoEvent], encoding: EncodingParams) -> HeatLayer {
    let points = records
        .iter()
        .filter_map(|ev| match &ev.payload {
            EventPayload::Thermal(t) => Some(HeatPoint {
                position: ev.position(),
                weight: thermal_weight(t.frp),
            }),
            _ => None,
        })
        .collect();

    HeatLayer {
        id: LayerId::Thermal,
        points,
        intensity: clamp_intensity(encoding.thermal_intensity),
        radius_px: HEAT_RADIUS_PX,
        ramp: HEAT_RAMP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use foundation::Rgba;
    use formats::{
        AlertLevel, ConflictCategory, ConflictIncident, Confidence, DayNight, HazardAlert,
        HazardType, NewsMention, SeismicEvent, ThermalDetection,
    };
    use pretty_assertions::assert_eq;

    fn at(id: &str, lon: f64, lat: f64, payload: EventPayload) -> GeoEvent {
        GeoEvent {
            id: id.to_string(),
            latitude: lat,
            longitude: lon,
            time: 0,
            payload,
        }
    }

    struct Fixture {
        seismic: Vec<GeoEvent>,
        hazard: Vec<GeoEvent>,
        thermal: Vec<GeoEvent>,
        conflict: Vec<GeoEvent>,
        news: Vec<GeoEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                seismic: vec![
                    at("q1", 142.0, 38.0, EventPayload::Seismic(SeismicEvent {
                        magnitude: 7.2,
                        place: "Honshu".to_string(),
                        depth: 20.0,
                    })),
                    at("q2", 10.0, 10.0, EventPayload::Seismic(SeismicEvent {
                        magnitude: 5.0,
                        place: "small".to_string(),
                        depth: 5.0,
                    })),
                ],
                hazard: vec![at("h1", -65.0, 18.0, EventPayload::Hazard(HazardAlert {
                    hazard_type: HazardType::Cyclone,
                    alert_level: AlertLevel::Orange,
                    title: "TC".to_string(),
                    description: String::new(),
                }))],
                thermal: vec![
                    at("f1", -120.0, 38.0, EventPayload::Thermal(ThermalDetection {
                        frp: 0.4,
                        confidence: Confidence::High,
                        acq_date: String::new(),
                        acq_time: String::new(),
                        day_night: DayNight::Day,
                    })),
                    at("f2", -121.0, 39.0, EventPayload::Thermal(ThermalDetection {
                        frp: 25.0,
                        confidence: Confidence::Nominal,
                        acq_date: String::new(),
                        acq_time: String::new(),
                        day_night: DayNight::Night,
                    })),
                ],
                conflict: vec![at("c1", 25.3, 13.6, EventPayload::Conflict(ConflictIncident {
                    category: ConflictCategory::Protests,
                    sub_category: String::new(),
                    country: "Sudan".to_string(),
                    fatalities: 9,
                    notes: String::new(),
                }))],
                news: vec![at("n1", 30.5, 50.4, EventPayload::News(NewsMention {
                    title: "t".to_string(),
                    source: "s".to_string(),
                    url: String::new(),
                    tone: 0.0,
                    count: None,
                }))],
            }
        }

        fn batches(&self) -> Batches<'_> {
            Batches {
                seismic: &self.seismic,
                hazard: &self.hazard,
                thermal: &self.thermal,
                conflict: &self.conflict,
                news: &self.news,
            }
        }
    }

    #[test]
    fn fixed_bottom_to_top_order() {
        let fx = Fixture::new();
        let filters = FilterSet::default();
        let stack = compose(&ComposeInput {
            batches: fx.batches(),
            filters: &filters,
            visibility: Visibility::all(),
            encoding: EncodingParams::default(),
        });
        assert_eq!(
            stack.ids(),
            vec![
                LayerId::Thermal,
                LayerId::News,
                LayerId::Conflict,
                LayerId::Seismic,
                LayerId::Hazard
            ]
        );
        let top_first: Vec<_> = stack.pick_order().map(|l| l.id).collect();
        assert_eq!(
            top_first,
            vec![LayerId::Hazard, LayerId::Seismic, LayerId::Conflict, LayerId::News]
        );
    }

    #[test]
    fn recomposition_is_idempotent() {
        let fx = Fixture::new();
        let filters = FilterSet::default();
        let input = ComposeInput {
            batches: fx.batches(),
            filters: &filters,
            visibility: Visibility::all(),
            encoding: EncodingParams {
                thermal_intensity: 2.0,
            },
        };
        assert_eq!(compose(&input), compose(&input));
    }

    #[test]
    fn encodes_each_source() {
        let fx = Fixture::new();
        let filters = FilterSet {
            seismic: crate::filter::SeismicFilter::at_step(4.5),
            ..Default::default()
        };
        let stack = compose(&ComposeInput {
            batches: fx.batches(),
            filters: &filters,
            visibility: Visibility::all(),
            encoding: EncodingParams {
                thermal_intensity: 7.0,
            },
        });

        let quakes = stack.get(LayerId::Seismic).and_then(|l| l.as_scatter()).unwrap();
        assert_eq!(quakes.len(), 2);
        assert!((quakes.points[0].radius_m - 14_703.3).abs() < 1.0);
        assert_eq!(quakes.clamp.max_px, 40.0);
        assert_eq!(quakes.data[0].id, "q1");

        let hazard = stack.get(LayerId::Hazard).and_then(|l| l.as_scatter()).unwrap();
        assert_eq!(hazard.points[0].radius_m, 40_000.0);
        assert_eq!(hazard.points[0].color, Rgba::new(249, 115, 22, 220));

        let conflict = stack.get(LayerId::Conflict).and_then(|l| l.as_scatter()).unwrap();
        assert_eq!(conflict.points[0].radius_m, 26_000.0);
        assert_eq!(conflict.points[0].color, Rgba::new(234, 179, 8, 200));

        let news = stack.get(LayerId::News).and_then(|l| l.as_scatter()).unwrap();
        assert_eq!(news.points[0].radius_m, 12_000.0);

        let heat = stack.get(LayerId::Thermal).and_then(|l| l.as_heat()).unwrap();
        assert!(!heat.is_pickable());
        assert_eq!(heat.intensity, 3.0);
        let weights: Vec<_> = heat.points.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![1.0, 25.0]);
    }

    #[test]
    fn hidden_sources_contribute_no_layer_and_empty_ones_still_do() {
        let fx = Fixture::new();
        let filters = FilterSet::default();
        let visibility = Visibility {
            thermal: false,
            news: false,
            ..Visibility::all()
        };
        let mut batches = fx.batches();
        batches.conflict = &[];
        let stack = compose(&ComposeInput {
            batches,
            filters: &filters,
            visibility,
            encoding: EncodingParams::default(),
        });
        assert_eq!(
            stack.ids(),
            vec![LayerId::Conflict, LayerId::Seismic, LayerId::Hazard]
        );
        assert!(stack.get(LayerId::Conflict).unwrap().is_empty());
        // Default M6.0 threshold leaves only the M7.2.
        assert_eq!(stack.get(LayerId::Seismic).unwrap().len(), 1);

        let none = compose(&ComposeInput {
            batches: fx.batches(),
            filters: &filters,
            visibility: Visibility::none(),
            encoding: EncodingParams::default(),
        });
        assert!(none.is_empty());
    }
}
