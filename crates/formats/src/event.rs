//! Normalized geo-event model shared by the proxy, the store and the composer.
//!
//! Every upstream feed is reduced to a [`GeoEvent`]: a stable id, a WGS-84
//! position, an epoch-millisecond timestamp and a per-source payload. On the
//! wire the payload fields are flattened next to the common fields and tagged
//! with `kind`.

use std::fmt;
use std::time::Duration;

use foundation::{EpochMs, LonLat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoEvent {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub time: EpochMs,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl GeoEvent {
    pub fn position(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }

    pub fn kind(&self) -> SourceKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventPayload {
    Seismic(SeismicEvent),
    Hazard(HazardAlert),
    Thermal(ThermalDetection),
    Conflict(ConflictIncident),
    News(NewsMention),
}

impl EventPayload {
    pub fn kind(&self) -> SourceKind {
        match self {
            EventPayload::Seismic(_) => SourceKind::Seismic,
            EventPayload::Hazard(_) => SourceKind::Hazard,
            EventPayload::Thermal(_) => SourceKind::Thermal,
            EventPayload::Conflict(_) => SourceKind::Conflict,
            EventPayload::News(_) => SourceKind::News,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeismicEvent {
    pub magnitude: f64,
    pub place: String,
    /// Kilometres below the surface.
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardAlert {
    pub hazard_type: HazardType,
    pub alert_level: AlertLevel,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HazardType {
    Cyclone,
    Flood,
    Volcano,
    Drought,
    WildfireAlert,
}

impl HazardType {
    pub const ALL: [HazardType; 5] = [
        HazardType::Cyclone,
        HazardType::Flood,
        HazardType::Volcano,
        HazardType::Drought,
        HazardType::WildfireAlert,
    ];

    /// Two-letter event code used by the alert feed (`TC`, `FL`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "TC" => Some(HazardType::Cyclone),
            "FL" => Some(HazardType::Flood),
            "VO" => Some(HazardType::Volcano),
            "DR" => Some(HazardType::Drought),
            "WF" => Some(HazardType::WildfireAlert),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HazardType::Cyclone => "Cyclone",
            HazardType::Flood => "Flood",
            HazardType::Volcano => "Volcano",
            HazardType::Drought => "Drought",
            HazardType::WildfireAlert => "Wildfire",
        }
    }
}

/// Ordered severity: `Green < Orange < Red`.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertLevel {
    #[default]
    Green,
    Orange,
    Red,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 3] = [AlertLevel::Green, AlertLevel::Orange, AlertLevel::Red];

    /// Case-insensitive; anything unrecognised is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "green" => Some(AlertLevel::Green),
            "orange" => Some(AlertLevel::Orange),
            "red" => Some(AlertLevel::Red),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::Green => "Green",
            AlertLevel::Orange => "Orange",
            AlertLevel::Red => "Red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalDetection {
    /// Fire radiative power (MW).
    pub frp: f64,
    pub confidence: Confidence,
    pub acq_date: String,
    pub acq_time: String,
    pub day_night: DayNight,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Nominal,
    High,
}

impl Confidence {
    /// Accepts the letter codes (`l`/`n`/`h`), the words, or a 0-100 percentage.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "l" | "low" => return Some(Confidence::Low),
            "n" | "nominal" => return Some(Confidence::Nominal),
            "h" | "high" => return Some(Confidence::High),
            _ => {}
        }
        let pct: f64 = raw.parse().ok()?;
        if !pct.is_finite() {
            return None;
        }
        Some(if pct < 30.0 {
            Confidence::Low
        } else if pct < 80.0 {
            Confidence::Nominal
        } else {
            Confidence::High
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Nominal => "nominal",
            Confidence::High => "high",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayNight {
    Day,
    Night,
    #[default]
    Unknown,
}

impl DayNight {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "D" | "DAY" => DayNight::Day,
            "N" | "NIGHT" => DayNight::Night,
            _ => DayNight::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictIncident {
    pub category: ConflictCategory,
    pub sub_category: String,
    pub country: String,
    pub fatalities: u32,
    pub notes: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConflictCategory {
    #[serde(rename = "Battles")]
    Battles,
    #[serde(rename = "Explosions/Remote violence")]
    Explosions,
    #[serde(rename = "Violence against civilians")]
    ViolenceAgainstCivilians,
    #[serde(rename = "Protests")]
    Protests,
    #[serde(rename = "Riots")]
    Riots,
    #[serde(rename = "Strategic developments")]
    StrategicDevelopments,
}

impl ConflictCategory {
    pub const ALL: [ConflictCategory; 6] = [
        ConflictCategory::Battles,
        ConflictCategory::Explosions,
        ConflictCategory::ViolenceAgainstCivilians,
        ConflictCategory::Protests,
        ConflictCategory::Riots,
        ConflictCategory::StrategicDevelopments,
    ];

    /// Upstream event-type label, e.g. `"Explosions/Remote violence"`.
    pub fn label(self) -> &'static str {
        match self {
            ConflictCategory::Battles => "Battles",
            ConflictCategory::Explosions => "Explosions/Remote violence",
            ConflictCategory::ViolenceAgainstCivilians => "Violence against civilians",
            ConflictCategory::Protests => "Protests",
            ConflictCategory::Riots => "Riots",
            ConflictCategory::StrategicDevelopments => "Strategic developments",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(raw))
    }

    pub fn group(self) -> ConflictGroup {
        match self {
            ConflictCategory::Battles
            | ConflictCategory::Explosions
            | ConflictCategory::ViolenceAgainstCivilians => ConflictGroup::Violent,
            ConflictCategory::Protests | ConflictCategory::Riots => ConflictGroup::CivilUnrest,
            ConflictCategory::StrategicDevelopments => ConflictGroup::Other,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConflictGroup {
    Violent,
    CivilUnrest,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsMention {
    pub title: String,
    pub source: String,
    pub url: String,
    pub tone: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// The five feeds. Carries the per-source constants every layer agrees on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Seismic,
    Hazard,
    Thermal,
    Conflict,
    News,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Seismic,
        SourceKind::Hazard,
        SourceKind::Thermal,
        SourceKind::Conflict,
        SourceKind::News,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Seismic => "seismic",
            SourceKind::Hazard => "hazard",
            SourceKind::Thermal => "thermal",
            SourceKind::Conflict => "conflict",
            SourceKind::News => "news",
        }
    }

    /// Proxy route serving this source.
    pub fn route(self) -> &'static str {
        match self {
            SourceKind::Seismic => "/api/events/earthquakes",
            SourceKind::Hazard => "/api/events/disasters",
            SourceKind::Thermal => "/api/events/fires",
            SourceKind::Conflict => "/api/events/conflicts",
            SourceKind::News => "/api/events/news",
        }
    }

    /// Client poll cadence.
    pub fn cadence(self) -> Duration {
        match self {
            SourceKind::Seismic => Duration::from_secs(5 * 60),
            SourceKind::Hazard | SourceKind::News => Duration::from_secs(15 * 60),
            SourceKind::Thermal | SourceKind::Conflict => Duration::from_secs(60 * 60),
        }
    }

    /// Server-side revalidation interval for cached upstream bodies.
    pub fn freshness_window(self) -> Duration {
        match self {
            SourceKind::Seismic => Duration::from_secs(5 * 60),
            SourceKind::Hazard | SourceKind::News => Duration::from_secs(15 * 60),
            SourceKind::Thermal | SourceKind::Conflict => Duration::from_secs(60 * 60),
        }
    }

    /// Whether the feed uses exactly (0, 0) to mean "location unknown".
    pub fn uses_null_island_sentinel(self) -> bool {
        matches!(self, SourceKind::Hazard | SourceKind::News)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
