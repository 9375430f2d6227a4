use layers::{Layer, LayerStack, MapSurface};
use tracing::info;

/// Stands in for a map renderer: logs each committed stack.
#[derive(Debug, Default)]
pub struct LogSurface {
    frames: u64,
    released: bool,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl MapSurface for LogSurface {
    fn set_layers(&mut self, stack: &LayerStack) {
        self.frames += 1;
        let summary: Vec<String> = stack
            .layers()
            .iter()
            .map(|layer| format!("{}={}", layer.id().name(), layer.len()))
            .collect();
        info!(frame = self.frames, layers = %summary.join(" "), "layer stack committed");
    }

    fn release(&mut self) {
        self.released = true;
        info!(frames = self.frames, "surface released");
    }
}
