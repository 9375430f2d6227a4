//! Visual encodings: record attributes to radius and colour.
//!
//! Radii are in map units (metres on the ground). The renderer clamps each
//! drawn radius to the layer's [`PixelClamp`] at the current zoom.

use foundation::{Rgba, channel};
use formats::{AlertLevel, ConflictCategory, ConflictGroup};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelClamp {
    pub min_px: f64,
    pub max_px: f64,
}

impl PixelClamp {
    pub const fn new(min_px: f64, max_px: f64) -> Self {
        Self { min_px, max_px }
    }

    /// Drawn radius in pixels for a radius of `radius_m` at `metres_per_px`.
    pub fn apply(&self, radius_m: f64, metres_per_px: f64) -> f64 {
        if metres_per_px <= 0.0 || !metres_per_px.is_finite() {
            return self.min_px;
        }
        (radius_m / metres_per_px).clamp(self.min_px, self.max_px)
    }
}

// Seismic
pub const SEISMIC_CLAMP: PixelClamp = PixelClamp::new(3.0, 40.0);
const SEISMIC_COLOR_FLOOR: f64 = 4.5;
const SEISMIC_COLOR_SPAN: f64 = 4.0;

pub fn seismic_radius_m(magnitude: f64) -> f64 {
    2f64.powf(magnitude) * 100.0
}

/// Orange-yellow at M4.5 shading to deep red at M8.5 and above.
pub fn seismic_color(magnitude: f64) -> Rgba {
    let t = ((magnitude - SEISMIC_COLOR_FLOOR) / SEISMIC_COLOR_SPAN).clamp(0.0, 1.0);
    Rgba::new(
        255,
        channel(255.0 * (1.0 - 0.7 * t)),
        channel(80.0 * (1.0 - t)),
        200,
    )
}

// Hazard
pub const HAZARD_CLAMP: PixelClamp = PixelClamp::new(4.0, 30.0);

pub fn hazard_radius_m(level: AlertLevel) -> f64 {
    match level {
        AlertLevel::Green => 25_000.0,
        AlertLevel::Orange => 40_000.0,
        AlertLevel::Red => 60_000.0,
    }
}

pub fn hazard_color(level: AlertLevel) -> Rgba {
    match level {
        AlertLevel::Green => Rgba::new(34, 197, 94, 200),
        AlertLevel::Orange => Rgba::new(249, 115, 22, 220),
        AlertLevel::Red => Rgba::new(239, 68, 68, 230),
    }
}

// Conflict
pub const CONFLICT_CLAMP: PixelClamp = PixelClamp::new(2.0, 25.0);

pub fn conflict_radius_m(fatalities: u32) -> f64 {
    8_000.0 + f64::from(fatalities).sqrt() * 6_000.0
}

pub fn conflict_color(category: ConflictCategory) -> Rgba {
    match category.group() {
        ConflictGroup::Violent => Rgba::new(239, 68, 68, 200),
        ConflictGroup::CivilUnrest => Rgba::new(234, 179, 8, 200),
        ConflictGroup::Other => Rgba::new(156, 163, 175, 180),
    }
}

// News
pub const NEWS_CLAMP: PixelClamp = PixelClamp::new(2.0, 8.0);
pub const NEWS_RADIUS_M: f64 = 12_000.0;
pub const NEWS_COLOR: Rgba = Rgba::new(6, 182, 212, 160);

// Thermal heat surface
pub const HEAT_RADIUS_PX: f64 = 30.0;
pub const HEAT_RAMP: [Rgba; 5] = [
    Rgba::opaque(255, 255, 178),
    Rgba::opaque(254, 204, 92),
    Rgba::opaque(253, 141, 60),
    Rgba::opaque(240, 59, 32),
    Rgba::opaque(189, 0, 38),
];
pub const MIN_INTENSITY: f64 = 0.5;
pub const MAX_INTENSITY: f64 = 3.0;
pub const DEFAULT_INTENSITY: f64 = 1.0;

pub fn thermal_weight(frp: f64) -> f64 {
    if frp.is_nan() { 1.0 } else { frp.max(1.0) }
}

pub fn clamp_intensity(intensity: f64) -> f64 {
    if intensity.is_nan() {
        return DEFAULT_INTENSITY;
    }
    intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
}

/// Ramp colour for a normalized density in `[0, 1]`.
pub fn heat_color(density: f64) -> Rgba {
    let d = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
    let scaled = d * (HEAT_RAMP.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(HEAT_RAMP.len() - 1);
    HEAT_RAMP[lo].lerp(HEAT_RAMP[hi], scaled - lo as f64)
}
