use foundation::{LonLat, Rgba};
use formats::{GeoEvent, SourceKind};

use crate::symbology::PixelClamp;

/// One render layer per source. Declaration order is draw order, bottom first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerId {
    Thermal,
    News,
    Conflict,
    Seismic,
    Hazard,
}

impl LayerId {
    pub const DRAW_ORDER: [LayerId; 5] = [
        LayerId::Thermal,
        LayerId::News,
        LayerId::Conflict,
        LayerId::Seismic,
        LayerId::Hazard,
    ];

    pub fn for_source(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Thermal => LayerId::Thermal,
            SourceKind::News => LayerId::News,
            SourceKind::Conflict => LayerId::Conflict,
            SourceKind::Seismic => LayerId::Seismic,
            SourceKind::Hazard => LayerId::Hazard,
        }
    }

    pub fn source(self) -> SourceKind {
        match self {
            LayerId::Thermal => SourceKind::Thermal,
            LayerId::News => SourceKind::News,
            LayerId::Conflict => SourceKind::Conflict,
            LayerId::Seismic => SourceKind::Seismic,
            LayerId::Hazard => SourceKind::Hazard,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerId::Thermal => "fires",
            LayerId::News => "news",
            LayerId::Conflict => "conflicts",
            LayerId::Seismic => "earthquakes",
            LayerId::Hazard => "disasters",
        }
    }
}

pub trait Layer {
    fn id(&self) -> LayerId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_pickable(&self) -> bool;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScatterPoint {
    pub position: LonLat,
    pub radius_m: f64,
    pub color: Rgba,
}

/// Discrete points. `points[i]` is the encoding of `data[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterLayer {
    pub id: LayerId,
    pub points: Vec<ScatterPoint>,
    pub data: Vec<GeoEvent>,
    pub clamp: PixelClamp,
}

impl Layer for ScatterLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn is_pickable(&self) -> bool {
        true
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeatPoint {
    pub position: LonLat,
    pub weight: f64,
}

/// Aggregated density surface. Individual points are not addressable.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatLayer {
    pub id: LayerId,
    pub points: Vec<HeatPoint>,
    pub intensity: f64,
    pub radius_px: f64,
    pub ramp: [Rgba; 5],
}

impl Layer for HeatLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn is_pickable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderLayer {
    Scatter(ScatterLayer),
    Heat(HeatLayer),
}

impl RenderLayer {
    fn inner(&self) -> &dyn Layer {
        match self {
            RenderLayer::Scatter(l) => l,
            RenderLayer::Heat(l) => l,
        }
    }

    pub fn as_scatter(&self) -> Option<&ScatterLayer> {
        match self {
            RenderLayer::Scatter(l) => Some(l),
            RenderLayer::Heat(_) => None,
        }
    }

    pub fn as_heat(&self) -> Option<&HeatLayer> {
        match self {
            RenderLayer::Heat(l) => Some(l),
            RenderLayer::Scatter(_) => None,
        }
    }
}

impl Layer for RenderLayer {
    fn id(&self) -> LayerId {
        self.inner().id()
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn is_pickable(&self) -> bool {
        self.inner().is_pickable()
    }
}

/// Ordered layers, bottom first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<RenderLayer>,
}

impl LayerStack {
    /// Callers push in draw order; [`crate::compose`] is the only producer.
    pub(crate) fn from_layers(layers: Vec<RenderLayer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[RenderLayer] {
        &self.layers
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id()).collect()
    }

    pub fn get(&self, id: LayerId) -> Option<&RenderLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Pickable layers, topmost first.
    pub fn pick_order(&self) -> impl Iterator<Item = &ScatterLayer> {
        self.layers.iter().rev().filter_map(RenderLayer::as_scatter)
    }
}
