mod analytics;
mod component;
mod error;
mod geometry;
mod model;
mod persistence;
mod render;
mod state;
mod types;

pub use component::GraphEditor;
pub use model::GraphModel;
pub use persistence::MemoryStore;
pub use types::{
	Floorplan, FloorplanBounds, GraphSnapshot, MediaAsset, NewArea, NodeAttrs, NodeId, PANORAMA_CATEGORY, Point,
	Position, category,
};
