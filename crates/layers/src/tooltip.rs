//! Hover state: pointer position -> optional tooltip.

use chrono::DateTime;
use foundation::{EpochMs, LonLat};
use formats::{EventPayload, GeoEvent, SourceKind};

use crate::layer::{LayerId, LayerStack};
use crate::picking::pick_screen;

/// Conflict notes longer than this are cut for display.
pub const NOTES_DISPLAY_CHARS: usize = 200;
/// Where the tooltip box sits relative to the pointer.
pub const ANCHOR_OFFSET_PX: (f64, f64) = (12.0, -12.0);

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipContent {
    pub kind: SourceKind,
    pub heading: String,
    pub rows: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    /// Pointer position in screen pixels.
    pub x: f64,
    pub y: f64,
    pub layer: LayerId,
    pub event_id: String,
    pub content: TooltipContent,
}

impl Tooltip {
    /// Top-left of the tooltip box in screen pixels.
    pub fn anchor(&self) -> (f64, f64) {
        (self.x + ANCHOR_OFFSET_PX.0, self.y + ANCHOR_OFFSET_PX.1)
    }
}

#[derive(Debug, Default)]
pub struct TooltipController {
    current: Option<Tooltip>,
}

impl TooltipController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-pick under the pointer. Leaving every pickable layer clears the
    /// tooltip.
    pub fn hover<F>(
        &mut self,
        stack: &LayerStack,
        x_px: f64,
        y_px: f64,
        unproject: F,
        metres_per_px: f64,
    ) -> Option<&Tooltip>
    where
        F: FnMut(f64, f64) -> Option<LonLat>,
    {
        self.current = pick_screen(stack, x_px, y_px, unproject, metres_per_px).map(|hit| Tooltip {
            x: x_px,
            y: y_px,
            layer: hit.layer,
            event_id: hit.event.id.clone(),
            content: describe(hit.event),
        });
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&Tooltip> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

pub fn describe(event: &GeoEvent) -> TooltipContent {
    let when = format_time(event.time);
    let (heading, rows) = match &event.payload {
        EventPayload::Seismic(s) => (
            format!("M{:.1}", s.magnitude),
            vec![
                ("Place", s.place.clone()),
                ("Depth", format!("{:.1} km", s.depth)),
                ("Time", when),
            ],
        ),
        EventPayload::Hazard(h) => (
            if h.title.is_empty() {
                h.hazard_type.label().to_string()
            } else {
                h.title.clone()
            },
            vec![
                ("Type", h.hazard_type.label().to_string()),
                ("Alert", h.alert_level.label().to_string()),
                ("Time", when),
            ],
        ),
        EventPayload::Thermal(t) => (
            format!("Fire {:.1} MW", t.frp),
            vec![
                ("Confidence", t.confidence.label().to_string()),
                ("Acquired", format!("{} {}", t.acq_date, t.acq_time).trim().to_string()),
            ],
        ),
        EventPayload::Conflict(c) => {
            let mut rows = vec![
                ("Country", c.country.clone()),
                ("Fatalities", c.fatalities.to_string()),
                ("Date", when),
            ];
            if !c.sub_category.is_empty() {
                rows.insert(0, ("Type", c.sub_category.clone()));
            }
            if !c.notes.is_empty() {
                rows.push(("Notes", truncate_chars(&c.notes, NOTES_DISPLAY_CHARS)));
            }
            (c.category.label().to_string(), rows)
        }
        EventPayload::News(n) => {
            let mut rows = vec![("Source", n.source.clone()), ("Tone", format!("{:.1}", n.tone))];
            if let Some(count) = n.count {
                rows.push(("Mentions", count.to_string()));
            }
            if !n.url.is_empty() {
                rows.push(("Link", n.url.clone()));
            }
            (n.title.clone(), rows)
        }
    };

    TooltipContent {
        kind: event.kind(),
        heading,
        rows,
    }
}

fn format_time(ms: EpochMs) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
