//! Exclusive ownership of the external map surface.

use tracing::debug;

use crate::layer::LayerStack;

/// The external map/overlay that renders layer stacks.
pub trait MapSurface {
    fn set_layers(&mut self, stack: &LayerStack);

    /// Detach from the map. Called exactly once by [`OverlayHandle`].
    fn release(&mut self);
}

/// Acquired on mount, released on teardown or drop. It is the only path to
/// [`MapSurface::set_layers`].
pub struct OverlayHandle<S: MapSurface> {
    surface: Option<S>,
    committed: Option<LayerStack>,
    commits: u64,
}

impl<S: MapSurface> OverlayHandle<S> {
    pub fn acquire(surface: S) -> Self {
        Self {
            surface: Some(surface),
            committed: None,
            commits: 0,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Push `stack` to the surface unless it equals the last committed stack
    /// or the handle was released. Returns whether the surface was updated.
    pub fn commit(&mut self, stack: LayerStack) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if self.committed.as_ref() == Some(&stack) {
            debug!("layer stack unchanged, skipping commit");
            return false;
        }
        surface.set_layers(&stack);
        self.committed = Some(stack);
        self.commits += 1;
        true
    }

    pub fn committed(&self) -> Option<&LayerStack> {
        self.committed.as_ref()
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Detach and hand the surface back. Later commits are no-ops.
    pub fn release(&mut self) -> Option<S> {
        let mut surface = self.surface.take()?;
        surface.release();
        self.committed = None;
        Some(surface)
    }
}

impl<S: MapSurface> Drop for OverlayHandle<S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
