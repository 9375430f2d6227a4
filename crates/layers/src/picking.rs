use foundation::{LonLat, haversine_m};
use formats::GeoEvent;

use crate::layer::{LayerId, LayerStack};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit<'a> {
    pub layer: LayerId,
    /// Index into the layer's `points`/`data`.
    pub index: usize,
    pub event: &'a GeoEvent,
    pub distance_m: f64,
}

/// Deterministic hover picking.
///
/// Ordering contract:
/// - Layers are tested top-down; the first layer with a hit wins.
/// - Within a layer the last-drawn point (highest index) wins.
///
/// A point covers the ground within its drawn radius: the map radius clamped
/// to the layer's pixel range at `metres_per_px`, converted back to metres.
pub fn pick(stack: &LayerStack, at: LonLat, metres_per_px: f64) -> Option<PickHit<'_>> {
    if !(metres_per_px > 0.0 && metres_per_px.is_finite()) || !at.is_valid() {
        return None;
    }

    for layer in stack.pick_order() {
        for (index, point) in layer.points.iter().enumerate().rev() {
            let reach_m = layer.clamp.apply(point.radius_m, metres_per_px) * metres_per_px;
            let distance_m = haversine_m(at, point.position);
            if distance_m <= reach_m {
                return Some(PickHit {
                    layer: layer.id,
                    index,
                    event: &layer.data[index],
                    distance_m,
                });
            }
        }
    }
    None
}

/// Pick from a screen position. `unproject` maps pixels to a map position
/// and returns `None` off the globe.
pub fn pick_screen<F>(
    stack: &LayerStack,
    x_px: f64,
    y_px: f64,
    mut unproject: F,
    metres_per_px: f64,
) -> Option<PickHit<'_>>
where
    F: FnMut(f64, f64) -> Option<LonLat>,
{
    let at = unproject(x_px, y_px)?;
    pick(stack, at, metres_per_px)
}
