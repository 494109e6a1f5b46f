mod component;
mod projection;
mod sync;

pub use component::PanoramaViewer;
pub use projection::{Neighbor, ViewAngles, neighbors};
