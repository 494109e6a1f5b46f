use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
	($name:ident) => {
		#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub String);

		impl $name {
			/// Fresh client-side id (UUID v4).
			pub fn generate() -> Self {
				Self(Uuid::new_v4().to_string())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl From<&str> for $name {
			fn from(value: &str) -> Self {
				Self(value.to_owned())
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}
	};
}

string_id!(NodeId);
string_id!(ConnectionId);
string_id!(AreaId);

/// A 2D point. Used for both floor-local and screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance_to(self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}

	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
	pub x: f64,
	pub y: f64,
	#[serde(default)]
	pub z: f64,
}

impl Position {
	pub const fn new(x: f64, y: f64, z: f64) -> Self {
		Self { x, y, z }
	}

	pub fn planar(point: Point) -> Self {
		Self::new(point.x, point.y, 0.0)
	}

	pub fn xy(&self) -> Point {
		Point::new(self.x, self.y)
	}

	/// Euclidean distance in the floor (XY) plane.
	pub fn planar_distance(&self, other: &Position) -> f64 {
		self.xy().distance_to(other.xy())
	}
}

fn default_fov() -> f64 {
	90.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	pub id: NodeId,
	#[serde(default)]
	pub label: Option<String>,
	pub position: Position,
	/// Panorama yaw offset in degrees, `0..360`.
	#[serde(default)]
	pub rotation: f64,
	#[serde(default)]
	pub pitch: f64,
	/// Viewer field of view in degrees. Client-only, never sent to the backend.
	#[serde(skip, default = "default_fov")]
	pub fov: f64,
	#[serde(default)]
	pub locked: bool,
	#[serde(default)]
	pub panorama_asset_id: Option<String>,
	#[serde(default)]
	pub panorama_url: Option<String>,
	#[serde(default)]
	pub connections: BTreeSet<NodeId>,
}

impl GraphNode {
	pub fn has_panorama(&self) -> bool {
		self.panorama_url.is_some() || self.panorama_asset_id.is_some()
	}

	pub fn display_label(&self) -> String {
		match &self.label {
			Some(label) if !label.trim().is_empty() => label.clone(),
			_ => {
				let short: String = self.id.as_str().chars().take(6).collect();
				format!("Node {short}")
			}
		}
	}
}

/// Scalar attributes for a node created by [`GraphModel::add_node`](super::model::GraphModel::add_node).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeAttrs {
	pub label: Option<String>,
	pub rotation: f64,
	pub pitch: f64,
	pub locked: bool,
	pub panorama_asset_id: Option<String>,
	pub panorama_url: Option<String>,
}

/// Partial node update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<Option<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position: Option<Position>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rotation: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pitch: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub locked: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub panorama_asset_id: Option<Option<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub panorama_url: Option<Option<String>>,
}

impl NodePatch {
	pub fn position(position: Position) -> Self {
		Self {
			position: Some(position),
			..Default::default()
		}
	}

	pub fn apply_to(&self, node: &mut GraphNode) {
		if let Some(label) = &self.label {
			node.label = label.clone();
		}
		if let Some(position) = self.position {
			node.position = position;
		}
		if let Some(rotation) = self.rotation {
			node.rotation = rotation.rem_euclid(360.0);
		}
		if let Some(pitch) = self.pitch {
			node.pitch = pitch.clamp(-90.0, 90.0);
		}
		if let Some(locked) = self.locked {
			node.locked = locked;
		}
		if let Some(asset) = &self.panorama_asset_id {
			node.panorama_asset_id = asset.clone();
		}
		if let Some(url) = &self.panorama_url {
			node.panorama_url = url.clone();
		}
	}

	/// The fields this patch touches, with their current values on `node`.
	/// Applying the result undoes the patch and nothing else.
	pub fn inverse(&self, node: &GraphNode) -> NodePatch {
		NodePatch {
			label: self.label.as_ref().map(|_| node.label.clone()),
			position: self.position.map(|_| node.position),
			rotation: self.rotation.map(|_| node.rotation),
			pitch: self.pitch.map(|_| node.pitch),
			locked: self.locked.map(|_| node.locked),
			panorama_asset_id: self.panorama_asset_id.as_ref().map(|_| node.panorama_asset_id.clone()),
			panorama_url: self.panorama_url.as_ref().map(|_| node.panorama_url.clone()),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConnection {
	pub id: ConnectionId,
	pub from_node_id: NodeId,
	pub to_node_id: NodeId,
	/// XY distance between the endpoints, cached at creation.
	pub distance: f64,
	#[serde(default = "default_true")]
	pub bidirectional: bool,
}

fn default_true() -> bool {
	true
}

impl GraphConnection {
	/// True if this connection joins `a` and `b`, in either direction.
	pub fn joins(&self, a: &NodeId, b: &NodeId) -> bool {
		(&self.from_node_id == a && &self.to_node_id == b)
			|| (&self.from_node_id == b && &self.to_node_id == a)
	}

	pub fn touches(&self, id: &NodeId) -> bool {
		&self.from_node_id == id || &self.to_node_id == id
	}

	pub fn other_end(&self, id: &NodeId) -> Option<&NodeId> {
		if &self.from_node_id == id {
			Some(&self.to_node_id)
		} else if &self.to_node_id == id {
			Some(&self.from_node_id)
		} else {
			None
		}
	}
}

/// Well-known area categories. The field itself is a free string.
pub mod category {
	pub const ROOM: &str = "room";
	pub const HALL: &str = "hall";
	pub const EXHIBIT: &str = "exhibit";
	pub const SERVICE: &str = "service";
	pub const OUTDOOR: &str = "outdoor";
	pub const OTHER: &str = "other";

	pub const ALL: &[&str] = &[ROOM, HALL, EXHIBIT, SERVICE, OUTDOOR, OTHER];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
	pub media_id: String,
	pub url: String,
	#[serde(default)]
	pub caption: String,
	#[serde(default = "default_true")]
	pub visible: bool,
	#[serde(default)]
	pub featured: bool,
	#[serde(default)]
	pub sort_order: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
	pub id: AreaId,
	pub name: String,
	pub category: String,
	#[serde(default)]
	pub description: String,
	pub boundary: Vec<Point>,
	#[serde(default)]
	pub start_node_id: Option<NodeId>,
	#[serde(default)]
	pub gallery: Vec<GalleryItem>,
}

impl Area {
	/// Gallery items ordered for display, hidden ones dropped.
	pub fn visible_gallery(&self) -> Vec<&GalleryItem> {
		let mut items: Vec<_> = self.gallery.iter().filter(|item| item.visible).collect();
		items.sort_by_key(|item| (!item.featured, item.sort_order));
		items
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewArea {
	pub name: String,
	pub category: String,
	pub description: String,
	pub boundary: Vec<Point>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaPatch {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub boundary: Option<Vec<Point>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gallery: Option<Vec<GalleryItem>>,
}

impl AreaPatch {
	pub fn boundary(boundary: Vec<Point>) -> Self {
		Self {
			boundary: Some(boundary),
			..Default::default()
		}
	}

	pub fn apply_to(&self, area: &mut Area) {
		if let Some(name) = &self.name {
			area.name = name.clone();
		}
		if let Some(category) = &self.category {
			area.category = category.clone();
		}
		if let Some(description) = &self.description {
			area.description = description.clone();
		}
		if let Some(boundary) = &self.boundary {
			area.boundary = boundary.clone();
		}
		if let Some(gallery) = &self.gallery {
			area.gallery = gallery.clone();
		}
	}

	/// Counterpart of [`NodePatch::inverse`].
	pub fn inverse(&self, area: &Area) -> AreaPatch {
		AreaPatch {
			name: self.name.as_ref().map(|_| area.name.clone()),
			category: self.category.as_ref().map(|_| area.category.clone()),
			description: self.description.as_ref().map(|_| area.description.clone()),
			boundary: self.boundary.as_ref().map(|_| area.boundary.clone()),
			gallery: self.gallery.as_ref().map(|_| area.gallery.clone()),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorplanBounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
	pub width: f64,
	pub height: f64,
}

impl FloorplanBounds {
	pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
		Self {
			min_x,
			min_y,
			max_x,
			max_y,
			width: max_x - min_x,
			height: max_y - min_y,
		}
	}

	/// Bounding box of a point cloud, `None` when empty.
	pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Option<Self> {
		let mut points = points.into_iter();
		let first = points.next()?;
		let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
		for p in points {
			min_x = min_x.min(p.x);
			min_y = min_y.min(p.y);
			max_x = max_x.max(p.x);
			max_y = max_y.max(p.y);
		}
		Some(Self::from_extents(min_x, min_y, max_x, max_y))
	}

	pub fn center(&self) -> Point {
		Point::new(self.min_x + self.width / 2.0, self.min_y + self.height / 2.0)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floorplan {
	pub image_ref: Option<String>,
	/// Metres per floor unit.
	#[serde(default = "default_scale")]
	pub scale: f64,
	pub bounds: FloorplanBounds,
}

fn default_scale() -> f64 {
	1.0
}

/// Payload for the persistence collaborator's `updateFloorplan`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorplanUpdate {
	pub image_ref: Option<String>,
	pub width: f64,
	pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphSettings {
	pub grid_size: f64,
	pub snap_to_grid: bool,
	pub show_grid: bool,
	pub show_labels: bool,
	pub floorplan_opacity: f64,
	pub auto_save: bool,
	pub auto_save_delay_ms: f64,
	pub label_debounce_ms: f64,
}

impl Default for GraphSettings {
	fn default() -> Self {
		Self {
			grid_size: 20.0,
			snap_to_grid: false,
			show_grid: true,
			show_labels: true,
			floorplan_opacity: 0.5,
			auto_save: true,
			auto_save_delay_ms: 5000.0,
			label_debounce_ms: 500.0,
		}
	}
}

pub const PANORAMA_CATEGORY: &str = "panorama";

/// A media record supplied by the media collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
	pub asset_id: String,
	pub url: String,
	pub width: u32,
	pub height: u32,
	pub category: String,
}

impl MediaAsset {
	pub fn is_panorama(&self) -> bool {
		self.category.eq_ignore_ascii_case(PANORAMA_CATEGORY)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
	pub nodes: Vec<GraphNode>,
	pub connections: Vec<GraphConnection>,
	#[serde(default)]
	pub areas: Vec<Area>,
	#[serde(default)]
	pub floorplan: Option<Floorplan>,
	#[serde(default)]
	pub settings: GraphSettings,
}

impl GraphSnapshot {
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}
