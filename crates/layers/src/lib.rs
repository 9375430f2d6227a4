pub mod composer;
pub mod filter;
pub mod layer;
pub mod overlay;
pub mod picking;
pub mod symbology;
pub mod tooltip;

pub use composer::{Batches, ComposeInput, EncodingParams, Visibility, compose};
pub use filter::*;
pub use layer::*;
pub use overlay::{MapSurface, OverlayHandle};
pub use picking::{PickHit, pick, pick_screen};
pub use tooltip::{Tooltip, TooltipContent, TooltipController, describe};
