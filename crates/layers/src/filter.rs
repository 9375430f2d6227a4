//! Per-source record filters.
//!
//! Filters are pure: they borrow a batch and return the admitted records in
//! batch order. They never add records and never touch the store.

use std::collections::BTreeSet;

use formats::{
    AlertLevel, ConflictCategory, Confidence, EventPayload, GeoEvent, HazardType, SourceKind,
};
use serde::{Deserialize, Serialize};

/// Selectable minimum magnitudes, ascending.
pub const MAGNITUDE_STEPS: [f64; 6] = [4.5, 5.0, 5.5, 6.0, 6.5, 7.0];
pub const DEFAULT_MIN_MAGNITUDE: f64 = 6.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeismicFilter {
    pub min_magnitude: f64,
}

impl Default for SeismicFilter {
    fn default() -> Self {
        Self {
            min_magnitude: DEFAULT_MIN_MAGNITUDE,
        }
    }
}

impl SeismicFilter {
    /// Snap `value` down to the nearest step; anything below the first step
    /// (or NaN) lands on the first step.
    pub fn at_step(value: f64) -> Self {
        let min_magnitude = MAGNITUDE_STEPS
            .iter()
            .rev()
            .copied()
            .find(|step| value >= *step)
            .unwrap_or(MAGNITUDE_STEPS[0]);
        Self { min_magnitude }
    }

    pub fn admits(&self, magnitude: f64) -> bool {
        magnitude >= self.min_magnitude
    }
}

/// Conjunction of an alert-level set and a hazard-type set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HazardFilter {
    pub alert_levels: BTreeSet<AlertLevel>,
    pub hazard_types: BTreeSet<HazardType>,
}

impl Default for HazardFilter {
    fn default() -> Self {
        Self {
            alert_levels: AlertLevel::ALL.into_iter().collect(),
            hazard_types: HazardType::ALL.into_iter().collect(),
        }
    }
}

impl HazardFilter {
    pub fn admits(&self, level: AlertLevel, hazard_type: HazardType) -> bool {
        self.alert_levels.contains(&level) && self.hazard_types.contains(&hazard_type)
    }
}

/// Cumulative confidence tiers: `HighOnly` ⊂ `NominalPlus` ⊂ `All`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalTier {
    #[default]
    All,
    #[serde(rename = "nominal")]
    NominalPlus,
    #[serde(rename = "high")]
    HighOnly,
}

impl ThermalTier {
    pub const ALL: [ThermalTier; 3] = [
        ThermalTier::All,
        ThermalTier::NominalPlus,
        ThermalTier::HighOnly,
    ];

    pub fn admits(self, confidence: Confidence) -> bool {
        match self {
            ThermalTier::All => true,
            ThermalTier::NominalPlus => confidence >= Confidence::Nominal,
            ThermalTier::HighOnly => confidence == Confidence::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConflictFilter {
    pub categories: BTreeSet<ConflictCategory>,
}

impl Default for ConflictFilter {
    fn default() -> Self {
        Self {
            categories: ConflictCategory::ALL.into_iter().collect(),
        }
    }
}

/// Filter values for every filterable source. News has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSet {
    pub seismic: SeismicFilter,
    pub hazard: HazardFilter,
    pub thermal: ThermalTier,
    pub conflict: ConflictFilter,
}

impl FilterSet {
    pub fn admits(&self, event: &GeoEvent) -> bool {
        match &event.payload {
            EventPayload::Seismic(s) => self.seismic.admits(s.magnitude),
            EventPayload::Hazard(h) => self.hazard.admits(h.alert_level, h.hazard_type),
            EventPayload::Thermal(t) => self.thermal.admits(t.confidence),
            EventPayload::Conflict(c) => self.conflict.categories.contains(&c.category),
            EventPayload::News(_) => true,
        }
    }

    /// The records of `batch` that belong to `kind` and pass its filter.
    pub fn apply<'a>(&self, kind: SourceKind, batch: &'a [GeoEvent]) -> Vec<&'a GeoEvent> {
        batch
            .iter()
            .filter(|ev| ev.kind() == kind && self.admits(ev))
            .collect()
    }
}
