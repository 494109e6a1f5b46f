use log::{debug, info};

use super::analytics::{self, LayoutParams};
use super::error::{EditorError, EntityKind, ValidationError};
use super::geometry::{ViewTransform, distance_to_segment, point_in_polygon, snap_point};
use super::model::GraphModel;
use super::persistence::{SaveEvent, SaveScheduler};
use super::types::{
	Area, AreaId, AreaPatch, ConnectionId, FloorplanBounds, GraphSnapshot, MediaAsset, NewArea,
	NodeAttrs, NodeId, NodePatch, Point, Position,
};

// Hit tolerances are screen pixels; divide by zoom for world units.
pub const VERTEX_HIT_PX: f64 = 12.0;
pub const NODE_HIT_PX: f64 = 10.0;
pub const CONNECTION_HIT_PX: f64 = 5.0;
pub const CLOSE_POLYGON_PX: f64 = 20.0;

pub const ZOOM_IN_FACTOR: f64 = 1.1;
pub const ZOOM_OUT_FACTOR: f64 = 0.9;
pub const FIT_MARGIN: f64 = 40.0;

pub const MENU_WIDTH: f64 = 200.0;
pub const MENU_ITEM_HEIGHT: f64 = 28.0;
pub const MENU_PADDING: f64 = 8.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
	#[default]
	Select,
	Move,
	AddNode,
	Connect,
	Pan,
	DrawArea,
}

#[derive(Clone, Copy, Debug)]
struct HitMask {
	vertices: bool,
	areas: bool,
	nodes: bool,
	connections: bool,
}

impl Tool {
	pub const ALL: [Tool; 6] = [
		Tool::Select,
		Tool::Move,
		Tool::AddNode,
		Tool::Connect,
		Tool::Pan,
		Tool::DrawArea,
	];

	pub fn label(self) -> &'static str {
		match self {
			Tool::Select => "Select",
			Tool::Move => "Move",
			Tool::AddNode => "Add node",
			Tool::Connect => "Connect",
			Tool::Pan => "Pan",
			Tool::DrawArea => "Draw area",
		}
	}

	pub fn shortcut(self) -> char {
		match self {
			Tool::Select => 'v',
			Tool::Move => 'm',
			Tool::AddNode => 'n',
			Tool::Connect => 'c',
			Tool::Pan => 'h',
			Tool::DrawArea => 'a',
		}
	}

	pub fn from_shortcut(key: &str) -> Option<Tool> {
		let mut chars = key.chars();
		let c = chars.next()?.to_ascii_lowercase();
		if chars.next().is_some() {
			return None;
		}
		Tool::ALL.into_iter().find(|t| t.shortcut() == c)
	}

	pub fn cursor(self) -> &'static str {
		match self {
			Tool::Select => "default",
			Tool::Move => "move",
			Tool::AddNode | Tool::DrawArea | Tool::Connect => "crosshair",
			Tool::Pan => "grab",
		}
	}

	fn hit_mask(self) -> HitMask {
		let (vertices, areas, nodes, connections) = match self {
			Tool::Select | Tool::Move => (true, true, true, true),
			Tool::AddNode | Tool::Connect => (false, false, true, false),
			Tool::Pan | Tool::DrawArea => (false, false, false, false),
		};
		HitMask {
			vertices,
			areas,
			nodes,
			connections,
		}
	}
}

/// At most one entity is selected at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
	#[default]
	None,
	Node(NodeId),
	Connection(ConnectionId),
	Area(AreaId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum HitTarget {
	AreaVertex { area_id: AreaId, index: usize },
	Area(AreaId),
	Node(NodeId),
	Connection(ConnectionId),
	Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
	Primary,
	Middle,
	Secondary,
}

impl PointerButton {
	pub fn from_dom(button: i16) -> Self {
		match button {
			1 => PointerButton::Middle,
			2 => PointerButton::Secondary,
			_ => PointerButton::Primary,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragTarget {
	Node(NodeId),
	Area(AreaId),
	AreaVertex { area_id: AreaId, index: usize },
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub target: Option<DragTarget>,
	/// Pointer minus entity position at grab time, in world units.
	pub offset: Point,
	pub start_world: Point,
	pub origin_boundary: Vec<Point>,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub target: Option<HitTarget>,
	pub world: Point,
}

#[derive(Clone, Debug, Default)]
pub struct AreaDraft {
	pub vertices: Vec<Point>,
	/// Polygon closed; waiting for the details panel.
	pub awaiting_details: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuCommand {
	SelectNode,
	ToggleLock,
	Duplicate,
	SetPanorama,
	ViewPanorama,
	RouteFrom,
	RouteTo,
	SetAsAreaStart,
	DeleteNode,
	DeleteConnection,
	SelectArea,
	DeleteArea,
	AddNode,
	AddNodeWithPanorama,
	ResetView,
}

impl MenuCommand {
	pub fn label(self) -> &'static str {
		match self {
			MenuCommand::SelectNode => "Select",
			MenuCommand::ToggleLock => "Lock / unlock",
			MenuCommand::Duplicate => "Duplicate",
			MenuCommand::SetPanorama => "Set panorama…",
			MenuCommand::ViewPanorama => "View panorama",
			MenuCommand::RouteFrom => "Route from here",
			MenuCommand::RouteTo => "Route to here",
			MenuCommand::SetAsAreaStart => "Use as area start",
			MenuCommand::DeleteNode => "Delete node",
			MenuCommand::DeleteConnection => "Delete connection",
			MenuCommand::SelectArea => "Select area",
			MenuCommand::DeleteArea => "Delete area",
			MenuCommand::AddNode => "Add node here",
			MenuCommand::AddNodeWithPanorama => "Add node with panorama…",
			MenuCommand::ResetView => "Reset view",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
	pub x: f64,
	pub y: f64,
	pub world: Point,
	pub target: HitTarget,
	pub items: Vec<MenuCommand>,
}

/// Requests for the host that the editor cannot satisfy itself.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorAction {
	/// Leaving the polygon would lose its vertices; ask first, then call
	/// [`EditorState::confirm_discard`] with `next`.
	ConfirmDiscardArea { next: Tool },
	/// Polygon closed; show the name/category panel.
	AreaReadyToClose,
	ChoosePanorama(NodeId),
	ViewPanorama(NodeId),
	ShowContextMenu(ContextMenu),
	Autosave(GraphSnapshot),
}

pub struct EditorState {
	pub model: GraphModel,
	pub tool: Tool,
	pub transform: ViewTransform,
	selection: Selection,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub connecting_from: Option<NodeId>,
	pub drawing: AreaDraft,
	pub context_menu: Option<ContextMenu>,
	pub route_from: Option<NodeId>,
	pub path_preview: Option<Vec<NodeId>>,
	pub saver: SaveScheduler,
	pub width: f64,
	pub height: f64,
	needs_redraw: bool,
}

impl EditorState {
	pub fn new(snapshot: GraphSnapshot, width: f64, height: f64) -> Self {
		let mut state = Self {
			model: GraphModel::from_snapshot(snapshot),
			tool: Tool::default(),
			transform: ViewTransform::default(),
			selection: Selection::None,
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			connecting_from: None,
			drawing: AreaDraft::default(),
			context_menu: None,
			route_from: None,
			path_preview: None,
			saver: SaveScheduler::default(),
			width,
			height,
			needs_redraw: true,
		};
		state.reset_view();
		state
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.needs_redraw = true;
	}

	pub fn request_redraw(&mut self) {
		self.needs_redraw = true;
	}

	/// Returns and clears the redraw flag.
	pub fn take_redraw(&mut self) -> bool {
		std::mem::take(&mut self.needs_redraw)
	}

	// --- Selection ---

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	pub fn select(&mut self, selection: Selection) {
		if self.selection != selection {
			debug!("Selection: {selection:?}");
			self.selection = selection;
			self.needs_redraw = true;
		}
	}

	pub fn selected_node_id(&self) -> Option<&NodeId> {
		match &self.selection {
			Selection::Node(id) => Some(id),
			_ => None,
		}
	}

	pub fn selected_connection_id(&self) -> Option<&ConnectionId> {
		match &self.selection {
			Selection::Connection(id) => Some(id),
			_ => None,
		}
	}

	pub fn selected_area_id(&self) -> Option<&AreaId> {
		match &self.selection {
			Selection::Area(id) => Some(id),
			_ => None,
		}
	}

	// --- Hit testing ---

	fn hit_test_masked(&self, world: Point, mask: HitMask) -> HitTarget {
		let k = self.transform.k;

		if mask.vertices {
			if let Some(area) = self.selected_area_id().and_then(|id| self.model.area(id)) {
				let tolerance = VERTEX_HIT_PX / k;
				if let Some(index) = area.boundary.iter().position(|v| v.distance_to(world) <= tolerance) {
					return HitTarget::AreaVertex {
						area_id: area.id.clone(),
						index,
					};
				}
			}
		}

		if mask.areas {
			if let Some(area) = self
				.model
				.areas()
				.iter()
				.rev()
				.find(|a| point_in_polygon(world, &a.boundary))
			{
				return HitTarget::Area(area.id.clone());
			}
		}

		if mask.nodes {
			if let Some(node) = self.node_near(world) {
				return HitTarget::Node(node);
			}
		}

		if mask.connections {
			if let Some(id) = self.connection_near(world) {
				return HitTarget::Connection(id);
			}
		}

		HitTarget::Empty
	}

	fn node_near(&self, world: Point) -> Option<NodeId> {
		let tolerance = NODE_HIT_PX / self.transform.k;
		self.model
			.nodes()
			.iter()
			.rev()
			.find(|n| n.position.xy().distance_to(world) <= tolerance)
			.map(|n| n.id.clone())
	}

	fn connection_near(&self, world: Point) -> Option<ConnectionId> {
		let tolerance = CONNECTION_HIT_PX / self.transform.k;
		self.model
			.connections()
			.iter()
			.rev()
			.find(|c| {
				match (self.model.node(&c.from_node_id), self.model.node(&c.to_node_id)) {
					(Some(a), Some(b)) => {
						distance_to_segment(world, a.position.xy(), b.position.xy()) <= tolerance
					}
					_ => false,
				}
			})
			.map(|c| c.id.clone())
	}

	/// Resolve what is under `world` for the active tool, in priority order:
	/// selected-area vertex, area interior, node, connection, empty canvas.
	pub fn hit_test(&self, world: Point) -> HitTarget {
		self.hit_test_masked(world, self.tool.hit_mask())
	}

	// --- Tools ---

	/// Switch tools. Pending polygon vertices are never dropped silently.
	pub fn set_tool(&mut self, next: Tool) -> Vec<EditorAction> {
		if next == self.tool {
			return Vec::new();
		}
		if self.tool == Tool::DrawArea && !self.drawing.vertices.is_empty() {
			return vec![EditorAction::ConfirmDiscardArea { next }];
		}
		self.apply_tool(next);
		Vec::new()
	}

	/// The user agreed to lose the in-progress polygon.
	pub fn confirm_discard(&mut self, next: Tool) {
		info!("Discarded area draft with {} vertices", self.drawing.vertices.len());
		self.drawing = AreaDraft::default();
		self.apply_tool(next);
		self.needs_redraw = true;
	}

	fn apply_tool(&mut self, next: Tool) {
		debug!("Tool: {:?} -> {next:?}", self.tool);
		self.cancel_drag();
		self.connecting_from = None;
		self.pan.active = false;
		self.context_menu = None;
		self.tool = next;
		self.needs_redraw = true;
	}

	fn cancel_drag(&mut self) {
		match self.drag.target.take() {
			Some(DragTarget::Node(id)) => self.model.cancel_node_gesture(&id),
			Some(DragTarget::Area(id) | DragTarget::AreaVertex { area_id: id, .. }) => {
				self.model.cancel_area_gesture(&id)
			}
			None => {}
		}
		self.drag = DragState::default();
	}

	fn snap(&self, p: Point) -> Point {
		let settings = self.model.settings();
		if settings.snap_to_grid {
			snap_point(p, settings.grid_size)
		} else {
			p
		}
	}

	// --- Pointer events ---

	pub fn pointer_down(&mut self, sx: f64, sy: f64, button: PointerButton) -> Vec<EditorAction> {
		self.context_menu = None;
		self.needs_redraw = true;

		match button {
			PointerButton::Secondary => return self.open_context_menu(sx, sy),
			PointerButton::Middle => {
				self.start_pan(sx, sy);
				return Vec::new();
			}
			PointerButton::Primary => {}
		}

		let world = self.transform.screen_to_world(sx, sy);
		let hit = self.hit_test(world);
		match self.tool {
			Tool::Select => {
				self.select_hit(&hit);
				Vec::new()
			}
			Tool::Move => {
				self.select_hit(&hit);
				self.start_drag(hit, world);
				Vec::new()
			}
			Tool::AddNode => {
				if let HitTarget::Node(id) = hit {
					self.select(Selection::Node(id));
				} else {
					let node = self.model.add_node(Position::planar(self.snap(world)), NodeAttrs::default());
					self.select(Selection::Node(node.id));
				}
				Vec::new()
			}
			Tool::Connect => {
				self.connect_click(hit);
				Vec::new()
			}
			Tool::Pan => {
				self.start_pan(sx, sy);
				Vec::new()
			}
			Tool::DrawArea => self.draw_area_click(world),
		}
	}

	fn select_hit(&mut self, hit: &HitTarget) {
		let selection = match hit {
			HitTarget::AreaVertex { area_id, .. } | HitTarget::Area(area_id) => Selection::Area(area_id.clone()),
			HitTarget::Node(id) => Selection::Node(id.clone()),
			HitTarget::Connection(id) => Selection::Connection(id.clone()),
			HitTarget::Empty => Selection::None,
		};
		self.select(selection);
	}

	fn start_drag(&mut self, hit: HitTarget, world: Point) {
		let (target, anchor, origin_boundary) = match hit {
			HitTarget::Node(id) => {
				let Some(node) = self.model.node(&id) else {
					return;
				};
				if node.locked {
					debug!("Node {id} is locked");
					return;
				}
				(DragTarget::Node(id), node.position.xy(), Vec::new())
			}
			HitTarget::AreaVertex { area_id, index } => {
				let Some(vertex) = self.model.area(&area_id).and_then(|a| a.boundary.get(index).copied()) else {
					return;
				};
				(DragTarget::AreaVertex { area_id, index }, vertex, Vec::new())
			}
			HitTarget::Area(id) => {
				let Some(area) = self.model.area(&id) else {
					return;
				};
				let boundary = area.boundary.clone();
				(DragTarget::Area(id), world, boundary)
			}
			HitTarget::Connection(_) | HitTarget::Empty => return,
		};
		self.drag = DragState {
			target: Some(target),
			offset: Point::new(world.x - anchor.x, world.y - anchor.y),
			start_world: world,
			origin_boundary,
			moved: false,
		};
	}

	fn start_pan(&mut self, sx: f64, sy: f64) {
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	fn connect_click(&mut self, hit: HitTarget) {
		let HitTarget::Node(id) = hit else {
			if self.connecting_from.take().is_some() {
				debug!("Pending connection cancelled");
			}
			return;
		};
		match self.connecting_from.take() {
			None => {
				self.select(Selection::Node(id.clone()));
				self.connecting_from = Some(id);
			}
			Some(from) if from == id => self.connecting_from = Some(from),
			Some(from) => {
				if let Some(connection) = self.model.add_connection(&from, &id) {
					self.select(Selection::Connection(connection.id));
				}
			}
		}
	}

	fn draw_area_click(&mut self, world: Point) -> Vec<EditorAction> {
		if self.drawing.awaiting_details {
			return Vec::new();
		}
		if self.is_near_first_vertex(world) {
			self.drawing.awaiting_details = true;
			return vec![EditorAction::AreaReadyToClose];
		}
		let vertex = self.snap(world);
		self.drawing.vertices.push(vertex);
		Vec::new()
	}

	/// True once a polygon can be closed by clicking at `world`.
	pub fn is_near_first_vertex(&self, world: Point) -> bool {
		match self.drawing.vertices.first() {
			Some(first) if self.drawing.vertices.len() >= 3 => {
				first.distance_to(world) <= CLOSE_POLYGON_PX / self.transform.k
			}
			_ => false,
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let world = self.transform.screen_to_world(sx, sy);

		let hovered = match self.hit_test(world) {
			HitTarget::Empty => None,
			hit => Some(hit),
		};
		if hovered != self.hover.target
			|| self.tool == Tool::DrawArea
			|| self.connecting_from.is_some()
		{
			self.needs_redraw = true;
		}
		self.hover = HoverState {
			target: hovered,
			world,
		};

		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
			self.needs_redraw = true;
			return;
		}

		let Some(target) = self.drag.target.clone() else {
			return;
		};
		if world != self.drag.start_world {
			self.drag.moved = true;
		}
		if !self.drag.moved {
			return;
		}
		match target {
			DragTarget::Node(id) => {
				let Some(z) = self.model.node(&id).map(|n| n.position.z) else {
					self.drag = DragState::default();
					return;
				};
				let p = self.snap(Point::new(world.x - self.drag.offset.x, world.y - self.drag.offset.y));
				self.model
					.update_node(&id, NodePatch::position(Position::new(p.x, p.y, z)), true);
			}
			DragTarget::AreaVertex { area_id, index } => {
				let Some(mut boundary) = self.model.area(&area_id).map(|a| a.boundary.clone()) else {
					self.drag = DragState::default();
					return;
				};
				if let Some(vertex) = boundary.get_mut(index) {
					*vertex = self.snap(Point::new(world.x - self.drag.offset.x, world.y - self.drag.offset.y));
				}
				self.model.update_area(&area_id, AreaPatch::boundary(boundary), true);
			}
			DragTarget::Area(area_id) => {
				let delta = self.snap(Point::new(
					world.x - self.drag.start_world.x,
					world.y - self.drag.start_world.y,
				));
				let boundary = self
					.drag
					.origin_boundary
					.iter()
					.map(|p| p.offset(delta.x, delta.y))
					.collect();
				self.model.update_area(&area_id, AreaPatch::boundary(boundary), true);
			}
		}
		self.needs_redraw = true;
	}

	/// Ends a gesture. A drag that moved anything commits exactly once.
	pub fn pointer_up(&mut self) {
		if self.pan.active {
			self.pan.active = false;
			return;
		}
		let drag = std::mem::take(&mut self.drag);
		let Some(target) = drag.target else {
			return;
		};
		if !drag.moved {
			return;
		}
		match target {
			DragTarget::Node(id) => {
				if let Some(position) = self.model.node(&id).map(|n| n.position) {
					self.model.update_node(&id, NodePatch::position(position), false);
				}
			}
			DragTarget::Area(id) | DragTarget::AreaVertex { area_id: id, .. } => {
				if let Some(boundary) = self.model.area(&id).map(|a| a.boundary.clone()) {
					self.model.update_area(&id, AreaPatch::boundary(boundary), false);
				}
			}
		}
		self.needs_redraw = true;
	}

	pub fn pointer_leave(&mut self) {
		self.pointer_up();
		if self.hover.target.take().is_some() {
			self.needs_redraw = true;
		}
	}

	/// Anchored zoom: the world point under the cursor stays put.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		if delta_y == 0.0 {
			return;
		}
		let factor = if delta_y > 0.0 {
			ZOOM_OUT_FACTOR
		} else {
			ZOOM_IN_FACTOR
		};
		self.transform.zoom_at(sx, sy, factor);
		self.needs_redraw = true;
	}

	// --- Keyboard ---

	pub fn key_down(&mut self, key: &str, ctrl: bool) -> Vec<EditorAction> {
		match key {
			"Delete" | "Backspace" => {
				self.delete_selection();
				Vec::new()
			}
			"Escape" => {
				self.context_menu = None;
				self.connecting_from = None;
				self.cancel_drag();
				self.needs_redraw = true;
				if !self.drawing.vertices.is_empty() {
					return vec![EditorAction::ConfirmDiscardArea { next: self.tool }];
				}
				self.select(Selection::None);
				Vec::new()
			}
			"d" | "D" if ctrl => {
				self.duplicate_selected();
				Vec::new()
			}
			_ if ctrl => Vec::new(),
			_ => match Tool::from_shortcut(key) {
				Some(tool) => self.set_tool(tool),
				None => Vec::new(),
			},
		}
	}

	// --- Context menu ---

	/// Right-click target. Nodes win over areas here so that nodes inside an
	/// area can still be reached.
	fn context_target(&self, world: Point) -> HitTarget {
		if let Some(id) = self.node_near(world) {
			return HitTarget::Node(id);
		}
		if let Some(id) = self.connection_near(world) {
			return HitTarget::Connection(id);
		}
		match self
			.model
			.areas()
			.iter()
			.rev()
			.find(|a| point_in_polygon(world, &a.boundary))
		{
			Some(area) => HitTarget::Area(area.id.clone()),
			None => HitTarget::Empty,
		}
	}

	pub fn open_context_menu(&mut self, sx: f64, sy: f64) -> Vec<EditorAction> {
		let world = self.transform.screen_to_world(sx, sy);
		let target = self.context_target(world);
		let items = match &target {
			HitTarget::Node(id) => {
				let mut items = vec![MenuCommand::SelectNode, MenuCommand::ToggleLock, MenuCommand::Duplicate];
				items.push(MenuCommand::SetPanorama);
				if self.model.node(id).is_some_and(|n| n.has_panorama()) {
					items.push(MenuCommand::ViewPanorama);
				}
				items.push(MenuCommand::RouteFrom);
				if self.route_from.as_ref().is_some_and(|from| from != id) {
					items.push(MenuCommand::RouteTo);
				}
				if self.selected_area_id().is_some() {
					items.push(MenuCommand::SetAsAreaStart);
				}
				items.push(MenuCommand::DeleteNode);
				items
			}
			HitTarget::Connection(_) => vec![MenuCommand::DeleteConnection],
			HitTarget::Area(_) | HitTarget::AreaVertex { .. } => {
				vec![MenuCommand::SelectArea, MenuCommand::DeleteArea]
			}
			HitTarget::Empty => vec![
				MenuCommand::AddNode,
				MenuCommand::AddNodeWithPanorama,
				MenuCommand::ResetView,
			],
		};

		let menu_height = items.len() as f64 * MENU_ITEM_HEIGHT + 2.0 * MENU_PADDING;
		let menu = ContextMenu {
			x: sx.min(self.width - MENU_WIDTH).max(0.0),
			y: sy.min(self.height - menu_height).max(0.0),
			world,
			target,
			items,
		};
		self.context_menu = Some(menu.clone());
		vec![EditorAction::ShowContextMenu(menu)]
	}

	pub fn run_menu_command(&mut self, command: MenuCommand) -> Vec<EditorAction> {
		let Some(menu) = self.context_menu.take() else {
			return Vec::new();
		};
		self.needs_redraw = true;
		let node_id = match &menu.target {
			HitTarget::Node(id) => Some(id.clone()),
			_ => None,
		};

		match (command, node_id) {
			(MenuCommand::SelectNode, Some(id)) => self.select(Selection::Node(id)),
			(MenuCommand::ToggleLock, Some(id)) => self.toggle_lock(&id),
			(MenuCommand::Duplicate, Some(id)) => {
				self.select(Selection::Node(id));
				self.duplicate_selected();
			}
			(MenuCommand::SetPanorama, Some(id)) => return vec![EditorAction::ChoosePanorama(id)],
			(MenuCommand::ViewPanorama, Some(id)) => {
				self.select(Selection::Node(id.clone()));
				return vec![EditorAction::ViewPanorama(id)];
			}
			(MenuCommand::RouteFrom, Some(id)) => {
				self.route_from = Some(id);
				self.path_preview = None;
			}
			(MenuCommand::RouteTo, Some(id)) => {
				if let Some(from) = self.route_from.clone() {
					self.preview_route(&from, &id);
				}
			}
			(MenuCommand::SetAsAreaStart, Some(id)) => {
				if let Some(area_id) = self.selected_area_id().cloned() {
					self.model.set_area_start_node(&area_id, Some(id));
				}
			}
			(MenuCommand::DeleteNode, Some(id)) => {
				self.select(Selection::Node(id));
				self.delete_selection();
			}
			(MenuCommand::DeleteConnection, _) => {
				if let HitTarget::Connection(id) = &menu.target {
					self.select(Selection::Connection(id.clone()));
					self.delete_selection();
				}
			}
			(MenuCommand::SelectArea | MenuCommand::DeleteArea, _) => {
				if let HitTarget::Area(id) | HitTarget::AreaVertex { area_id: id, .. } = &menu.target {
					self.select(Selection::Area(id.clone()));
					if command == MenuCommand::DeleteArea {
						self.delete_selection();
					}
				}
			}
			(MenuCommand::AddNode, _) => {
				let node = self.model.add_node(Position::planar(self.snap(menu.world)), NodeAttrs::default());
				self.select(Selection::Node(node.id));
			}
			(MenuCommand::AddNodeWithPanorama, _) => {
				let node = self.model.add_node(Position::planar(self.snap(menu.world)), NodeAttrs::default());
				self.select(Selection::Node(node.id.clone()));
				return vec![EditorAction::ChoosePanorama(node.id)];
			}
			(MenuCommand::ResetView, _) => self.reset_view(),
			(command, None) => debug!("{command:?} needs a node target"),
		}
		Vec::new()
	}

	pub fn close_context_menu(&mut self) {
		self.context_menu = None;
	}

	// --- Area drafting ---

	/// Confirm the closed polygon. On error the draft is kept for correction.
	pub fn finish_area(&mut self, name: &str, category: &str, description: &str) -> Result<Area, EditorError> {
		let area = self.model.try_add_area(NewArea {
			name: name.to_owned(),
			category: category.to_owned(),
			description: description.to_owned(),
			boundary: self.drawing.vertices.clone(),
		})?;
		self.drawing = AreaDraft::default();
		self.apply_tool(Tool::Select);
		self.select(Selection::Area(area.id.clone()));
		Ok(area)
	}

	/// Panel dismissed: keep drawing.
	pub fn resume_area_drawing(&mut self) {
		self.drawing.awaiting_details = false;
		self.needs_redraw = true;
	}

	// --- Entity commands ---

	pub fn delete_selection(&mut self) {
		let selection = std::mem::take(&mut self.selection);
		let deleted = match &selection {
			Selection::Node(id) => {
				if self.connecting_from.as_ref() == Some(id) {
					self.connecting_from = None;
				}
				if self.route_from.as_ref() == Some(id) {
					self.route_from = None;
				}
				if self.path_preview.as_ref().is_some_and(|p| p.contains(id)) {
					self.path_preview = None;
				}
				self.model.delete_node(id)
			}
			Selection::Connection(id) => {
				self.path_preview = None;
				self.model.delete_connection(id)
			}
			Selection::Area(id) => self.model.delete_area(id),
			Selection::None => false,
		};
		if deleted {
			self.hover.target = None;
			self.needs_redraw = true;
		}
	}

	pub fn duplicate_selected(&mut self) {
		let Some(id) = self.selected_node_id().cloned() else {
			return;
		};
		let offset = self.model.settings().grid_size;
		if let Some(copy) = self.model.duplicate_node(&id, offset, offset) {
			self.select(Selection::Node(copy.id));
		}
	}

	pub fn toggle_lock(&mut self, id: &NodeId) {
		let Some(locked) = self.model.node(id).map(|n| n.locked) else {
			return;
		};
		let patch = NodePatch {
			locked: Some(!locked),
			..Default::default()
		};
		self.model.update_node(id, patch, false);
		self.needs_redraw = true;
	}

	/// Bind a panorama-category media asset to a node.
	pub fn assign_panorama(&mut self, node_id: &NodeId, asset: &MediaAsset) -> Result<(), EditorError> {
		if !asset.is_panorama() {
			return Err(ValidationError::NotPanorama {
				asset_id: asset.asset_id.clone(),
			}
			.into());
		}
		let patch = NodePatch {
			panorama_asset_id: Some(Some(asset.asset_id.clone())),
			panorama_url: Some(Some(asset.url.clone())),
			..Default::default()
		};
		if !self.model.update_node(node_id, patch, false) {
			return Err(EditorError::not_found(EntityKind::Node, node_id));
		}
		self.needs_redraw = true;
		Ok(())
	}

	pub fn edit_label(&mut self, node_id: &NodeId, label: &str, now_ms: f64) {
		let label = Some(label.to_owned()).filter(|l| !l.trim().is_empty());
		self.saver.edit_label(&mut self.model, node_id, label, now_ms);
		self.needs_redraw = true;
	}

	/// Store a viewer orientation on a node. Live updates stay local.
	pub fn set_node_orientation(&mut self, node_id: &NodeId, yaw: f64, pitch: f64, committed: bool) {
		let patch = NodePatch {
			rotation: Some(yaw),
			pitch: Some(pitch),
			..Default::default()
		};
		self.model.update_node(node_id, patch, !committed);
		self.needs_redraw = true;
	}

	pub fn preview_route(&mut self, from: &NodeId, to: &NodeId) -> Option<&[NodeId]> {
		self.path_preview = analytics::find_path(&self.model, from, to);
		if self.path_preview.is_none() {
			info!("No route from {from} to {to}");
		}
		self.needs_redraw = true;
		self.path_preview.as_deref()
	}

	/// Length of the previewed route in metres, using the floorplan scale.
	pub fn route_length_m(&self) -> Option<f64> {
		let path = self.path_preview.as_deref()?;
		let scale = self.model.floorplan().map_or(1.0, |f| f.scale);
		analytics::path_length(&self.model, path).map(|length| length * scale)
	}

	pub fn clear_route(&mut self) {
		self.route_from = None;
		self.path_preview = None;
		self.needs_redraw = true;
	}

	/// Run the force layout and commit one update per moved node.
	pub fn apply_auto_layout(&mut self) {
		let layout = analytics::auto_layout(&self.model, &LayoutParams::default());
		info!("Auto-layout moved {} nodes", layout.len());
		for (id, position) in layout {
			self.model.update_node(&id, NodePatch::position(position), false);
		}
		self.reset_view();
	}

	/// Camera that fits the floorplan, or the nodes when there is none.
	pub fn reset_view(&mut self) {
		let bounds = self.model.floorplan().map(|f| f.bounds).or_else(|| {
			FloorplanBounds::enclosing(
				self.model
					.nodes()
					.iter()
					.map(|n| n.position.xy())
					.chain(self.model.areas().iter().flat_map(|a| a.boundary.iter().copied())),
			)
		});
		self.transform = match bounds {
			Some(bounds) => ViewTransform::fit(&bounds, self.width, self.height, FIT_MARGIN),
			None => ViewTransform {
				x: self.width / 2.0,
				y: self.height / 2.0,
				k: 1.0,
			},
		};
		self.needs_redraw = true;
	}

	/// Advance session timers. Call once per animation frame.
	pub fn tick(&mut self, now_ms: f64) -> Vec<EditorAction> {
		let revision = self.model.revision();
		let actions: Vec<_> = self
			.saver
			.tick(&mut self.model, now_ms)
			.into_iter()
			.map(|SaveEvent::Autosave(snapshot)| EditorAction::Autosave(snapshot))
			.collect();
		if self.model.revision() != revision {
			self.needs_redraw = true;
		}
		actions
	}

	// --- Render queries ---

	pub fn is_hovered(&self, target: &HitTarget) -> bool {
		self.hover.target.as_ref() == Some(target)
	}

	/// Hovered node that would accept the pending connection.
	pub fn connect_target(&self) -> Option<&NodeId> {
		let from = self.connecting_from.as_ref()?;
		match &self.hover.target {
			Some(HitTarget::Node(id)) if id != from && self.model.connection_between(from, id).is_none() => {
				Some(id)
			}
			_ => None,
		}
	}

	pub fn is_dragging_area(&self, id: &AreaId) -> bool {
		matches!(
			&self.drag.target,
			Some(DragTarget::Area(a) | DragTarget::AreaVertex { area_id: a, .. }) if a == id
		) && self.drag.moved
	}
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;

	use super::*;
	use crate::components::graph_editor::model::Mutation;
	use crate::components::graph_editor::types::{Floorplan, GraphSettings, PANORAMA_CATEGORY};

	fn editor() -> EditorState {
		let mut state = EditorState::new(GraphSnapshot::default(), 800.0, 600.0);
		state.transform = ViewTransform::default();
		state
	}

	fn add(state: &mut EditorState, x: f64, y: f64) -> NodeId {
		let id = state.model.add_node(Position::new(x, y, 0.0), NodeAttrs::default()).id;
		state.model.take_pending();
		id
	}

	fn click(state: &mut EditorState, x: f64, y: f64) -> Vec<EditorAction> {
		let actions = state.pointer_down(x, y, PointerButton::Primary);
		state.pointer_up();
		actions
	}

	fn menu_at(state: &mut EditorState, x: f64, y: f64) -> ContextMenu {
		let actions = state.open_context_menu(x, y);
		match actions.into_iter().next() {
			Some(EditorAction::ShowContextMenu(menu)) => menu,
			other => panic!("expected a menu, got {other:?}"),
		}
	}

	fn square_area(state: &mut EditorState) -> AreaId {
		let id = state
			.model
			.add_area(NewArea {
				name: "Hall".into(),
				category: "hall".into(),
				description: String::new(),
				boundary: vec![
					Point::new(100.0, 100.0),
					Point::new(200.0, 100.0),
					Point::new(200.0, 200.0),
					Point::new(100.0, 200.0),
				],
			})
			.unwrap()
			.id;
		state.model.take_pending();
		id
	}

	#[test]
	fn selection_is_mutually_exclusive() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		let b = add(&mut state, 60.0, 10.0);
		state.model.add_connection(&a, &b);
		let area = square_area(&mut state);

		click(&mut state, 10.0, 10.0);
		assert_eq!(state.selection(), &Selection::Node(a.clone()));
		click(&mut state, 150.0, 150.0);
		assert_eq!(state.selection(), &Selection::Area(area));
		assert!(state.selected_node_id().is_none());
		click(&mut state, 35.0, 11.0);
		assert!(state.selected_connection_id().is_some());
		assert!(state.selected_area_id().is_none());
		click(&mut state, 500.0, 500.0);
		assert_eq!(state.selection(), &Selection::None);
	}

	#[test]
	fn hit_priority_prefers_vertex_then_area_then_node() {
		let mut state = editor();
		let area = square_area(&mut state);
		let inside = add(&mut state, 150.0, 150.0);
		let corner = add(&mut state, 100.0, 100.0);

		assert_eq!(state.hit_test(Point::new(150.0, 150.0)), HitTarget::Area(area.clone()));
		assert_eq!(state.hit_test(Point::new(99.0, 99.0)), HitTarget::Node(corner.clone()));

		state.select(Selection::Area(area.clone()));
		assert_eq!(
			state.hit_test(Point::new(99.0, 99.0)),
			HitTarget::AreaVertex {
				area_id: area.clone(),
				index: 0
			}
		);

		state.set_tool(Tool::Connect);
		assert_eq!(state.hit_test(Point::new(150.0, 150.0)), HitTarget::Node(inside));
	}

	#[test]
	fn select_tool_never_drags() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		state.pointer_down(10.0, 10.0, PointerButton::Primary);
		state.pointer_move(80.0, 80.0);
		state.pointer_up();
		assert_eq!(state.model.node(&a).unwrap().position.x, 10.0);
		assert!(state.model.take_pending().is_empty());
	}

	#[test]
	fn move_drag_snaps_and_commits_once() {
		let mut state = editor();
		let mut settings = GraphSettings::default();
		settings.snap_to_grid = true;
		settings.grid_size = 20.0;
		state.model.set_settings(settings);
		let a = add(&mut state, 3.0, 4.0);
		state.set_tool(Tool::Move);

		state.pointer_down(5.0, 5.0, PointerButton::Primary);
		for (x, y) in [(17.0, 29.0), (33.3, 51.9), (68.2, 75.4)] {
			state.pointer_move(x, y);
			let p = state.model.node(&a).unwrap().position;
			assert_eq!(p.x % 20.0, 0.0);
			assert_eq!(p.y % 20.0, 0.0);
		}
		assert!(state.model.take_pending().is_empty());
		state.pointer_up();

		let ops = state.model.take_pending();
		assert_eq!(ops.len(), 1);
		let p = state.model.node(&a).unwrap().position;
		assert_eq!((p.x, p.y), (60.0, 80.0));
		assert!(matches!(&ops[0].mutation, Mutation::UpdateNode { patch, .. }
			if patch.position.map(|p| (p.x, p.y)) == Some((60.0, 80.0))));
	}

	#[test]
	fn locked_nodes_do_not_move() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		state.toggle_lock(&a);
		state.model.take_pending();
		state.set_tool(Tool::Move);
		state.pointer_down(10.0, 10.0, PointerButton::Primary);
		state.pointer_move(50.0, 50.0);
		state.pointer_up();
		assert_eq!(state.model.node(&a).unwrap().position.x, 10.0);
		assert_eq!(state.selection(), &Selection::Node(a));
		assert!(state.model.take_pending().is_empty());
	}

	#[test]
	fn click_without_motion_commits_nothing() {
		let mut state = editor();
		add(&mut state, 10.0, 10.0);
		state.set_tool(Tool::Move);
		click(&mut state, 10.0, 10.0);
		assert!(state.model.take_pending().is_empty());
	}

	#[test]
	fn area_translate_and_vertex_drag() {
		let mut state = editor();
		let area = square_area(&mut state);
		state.set_tool(Tool::Move);

		state.pointer_down(150.0, 150.0, PointerButton::Primary);
		state.pointer_move(160.0, 155.0);
		state.pointer_up();
		assert_eq!(state.model.area(&area).unwrap().boundary[0], Point::new(110.0, 105.0));

		state.pointer_down(110.0, 105.0, PointerButton::Primary);
		state.pointer_move(90.0, 90.0);
		state.pointer_up();
		let boundary = &state.model.area(&area).unwrap().boundary;
		assert_eq!(boundary[0], Point::new(90.0, 90.0));
		assert_eq!(boundary[1], Point::new(210.0, 105.0));
		assert_eq!(state.model.take_pending().len(), 2);
	}

	#[test]
	fn connect_tool_flow() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		let b = add(&mut state, 100.0, 10.0);
		state.set_tool(Tool::Connect);

		click(&mut state, 10.0, 10.0);
		assert_eq!(state.connecting_from, Some(a.clone()));
		click(&mut state, 10.0, 10.0);
		assert_eq!(state.connecting_from, Some(a.clone()));
		assert!(state.model.connections().is_empty());

		state.pointer_move(100.0, 10.0);
		assert_eq!(state.connect_target(), Some(&b));
		click(&mut state, 100.0, 10.0);
		assert_eq!(state.connecting_from, None);
		assert_eq!(state.model.connections().len(), 1);

		click(&mut state, 10.0, 10.0);
		state.set_tool(Tool::Select);
		assert_eq!(state.connecting_from, None);
		assert_eq!(state.model.connections().len(), 1);
	}

	#[test]
	fn add_node_tool_ignores_areas() {
		let mut state = editor();
		square_area(&mut state);
		state.set_tool(Tool::AddNode);
		click(&mut state, 150.0, 150.0);
		assert_eq!(state.model.nodes().len(), 1);
		assert_eq!(state.model.nodes()[0].position.xy(), Point::new(150.0, 150.0));
		assert!(state.selected_node_id().is_some());
	}

	#[test]
	fn pan_tool_moves_viewport_only() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		state.set_tool(Tool::Pan);
		state.pointer_down(10.0, 10.0, PointerButton::Primary);
		state.pointer_move(40.0, 30.0);
		state.pointer_up();
		assert_eq!((state.transform.x, state.transform.y), (30.0, 20.0));
		assert_eq!(state.model.node(&a).unwrap().position.x, 10.0);
	}

	#[test]
	fn polygon_closes_near_first_vertex_and_waits_for_details() {
		let mut state = editor();
		state.set_tool(Tool::DrawArea);
		click(&mut state, 0.0, 0.0);
		click(&mut state, 100.0, 0.0);
		// too early to close: only two vertices
		assert!(click(&mut state, 5.0, 5.0).is_empty());
		assert_eq!(state.drawing.vertices.len(), 3);
		click(&mut state, 0.0, 100.0);

		assert_eq!(click(&mut state, 10.0, 10.0), vec![EditorAction::AreaReadyToClose]);
		assert!(state.drawing.awaiting_details);
		assert!(click(&mut state, 300.0, 300.0).is_empty());
		assert_eq!(state.drawing.vertices.len(), 4);
		assert!(state.model.areas().is_empty());

		assert!(matches!(
			state.finish_area("", "room", ""),
			Err(EditorError::Validation(ValidationError::EmptyName))
		));
		let area = state.finish_area("Gallery", "exhibit", "").unwrap();
		assert_eq!(area.boundary.len(), 4);
		assert_eq!(state.tool, Tool::Select);
		assert_eq!(state.selection(), &Selection::Area(area.id));
		assert!(state.drawing.vertices.is_empty());
	}

	#[test]
	fn leaving_draw_area_with_vertices_asks_first() {
		let mut state = editor();
		state.set_tool(Tool::DrawArea);
		click(&mut state, 0.0, 0.0);
		assert_eq!(
			state.set_tool(Tool::Select),
			vec![EditorAction::ConfirmDiscardArea { next: Tool::Select }]
		);
		assert_eq!(state.tool, Tool::DrawArea);
		assert_eq!(state.drawing.vertices.len(), 1);

		state.confirm_discard(Tool::Select);
		assert_eq!(state.tool, Tool::Select);
		assert!(state.drawing.vertices.is_empty());
	}

	#[test]
	fn wheel_zoom_keeps_cursor_anchor() {
		let mut state = editor();
		state.transform = ViewTransform {
			x: 37.0,
			y: -18.0,
			k: 1.7,
		};
		let before = state.transform.screen_to_world(412.0, 233.0);
		state.wheel(412.0, 233.0, -120.0);
		assert!(approx_eq!(f64, state.transform.k, 1.7 * 1.1, epsilon = 1e-12));
		let after = state.transform.screen_to_world(412.0, 233.0);
		assert!(approx_eq!(f64, after.x, before.x, epsilon = 1e-9));
		assert!(approx_eq!(f64, after.y, before.y, epsilon = 1e-9));
		state.wheel(412.0, 233.0, 120.0);
		let again = state.transform.screen_to_world(412.0, 233.0);
		assert!(approx_eq!(f64, again.x, before.x, epsilon = 1e-9));
	}

	#[test]
	fn horizontal_swipe_does_not_zoom() {
		let mut state = editor();
		state.wheel(100.0, 100.0, 0.0);
		assert_eq!(state.transform, ViewTransform::default());
	}

	#[test]
	fn hit_radius_scales_with_zoom() {
		let mut state = editor();
		let a = add(&mut state, 0.0, 0.0);
		assert_eq!(state.hit_test(Point::new(8.0, 0.0)), HitTarget::Node(a.clone()));
		state.transform.k = 4.0;
		assert_eq!(state.hit_test(Point::new(8.0, 0.0)), HitTarget::Empty);
		assert_eq!(state.hit_test(Point::new(2.0, 0.0)), HitTarget::Node(a));
	}

	#[test]
	fn context_menu_by_target_and_clamped() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		let b = add(&mut state, 300.0, 10.0);
		state.model.add_connection(&a, &b);

		let menu = menu_at(&mut state, 10.0, 10.0);
		assert_eq!(menu.target, HitTarget::Node(a.clone()));
		assert!(menu.items.contains(&MenuCommand::DeleteNode));
		assert!(!menu.items.contains(&MenuCommand::ViewPanorama));

		let menu = menu_at(&mut state, 150.0, 11.0);
		assert_eq!(menu.items, vec![MenuCommand::DeleteConnection]);

		let menu = menu_at(&mut state, 790.0, 595.0);
		assert_eq!(menu.target, HitTarget::Empty);
		assert!(menu.x + MENU_WIDTH <= 800.0);
		assert!(menu.y + menu.items.len() as f64 * MENU_ITEM_HEIGHT + 2.0 * MENU_PADDING <= 600.0);
	}

	#[test]
	fn menu_commands_mutate_model() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);

		state.open_context_menu(10.0, 10.0);
		state.run_menu_command(MenuCommand::ToggleLock);
		assert!(state.model.node(&a).unwrap().locked);

		state.open_context_menu(400.0, 300.0);
		let actions = state.run_menu_command(MenuCommand::AddNodeWithPanorama);
		assert_eq!(state.model.nodes().len(), 2);
		assert!(matches!(&actions[..], [EditorAction::ChoosePanorama(_)]));

		state.open_context_menu(10.0, 10.0);
		state.run_menu_command(MenuCommand::DeleteNode);
		assert!(state.model.node(&a).is_none());
		assert!(state.context_menu.is_none());
	}

	#[test]
	fn route_preview_from_menu() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		let b = add(&mut state, 100.0, 10.0);
		let c = add(&mut state, 200.0, 10.0);
		state.model.add_connection(&a, &b);
		state.model.add_connection(&b, &c);

		state.open_context_menu(10.0, 10.0);
		state.run_menu_command(MenuCommand::RouteFrom);
		state.open_context_menu(200.0, 10.0);
		state.run_menu_command(MenuCommand::RouteTo);
		assert_eq!(state.path_preview, Some(vec![a, b.clone(), c]));
		assert!(approx_eq!(f64, state.route_length_m().unwrap(), 190.0));

		state.model.set_floorplan(Floorplan {
			image_ref: None,
			scale: 0.05,
			bounds: FloorplanBounds::from_extents(0.0, 0.0, 400.0, 100.0),
		});
		assert!(approx_eq!(f64, state.route_length_m().unwrap(), 9.5));

		state.select(Selection::Node(b));
		state.delete_selection();
		assert_eq!(state.path_preview, None);
	}

	#[test]
	fn keyboard_shortcuts() {
		let mut state = editor();
		let a = add(&mut state, 10.0, 10.0);
		state.key_down("m", false);
		assert_eq!(state.tool, Tool::Move);
		state.select(Selection::Node(a.clone()));
		state.key_down("d", true);
		assert_eq!(state.model.nodes().len(), 2);
		assert_ne!(state.selected_node_id(), Some(&a));
		state.key_down("Delete", false);
		assert_eq!(state.model.nodes().len(), 1);
		state.select(Selection::Node(a));
		state.key_down("Escape", false);
		assert_eq!(state.selection(), &Selection::None);
	}

	#[test]
	fn panorama_assignment_requires_panorama_media() {
		let mut state = editor();
		let a = add(&mut state, 0.0, 0.0);
		let mut asset = MediaAsset {
			asset_id: "m1".into(),
			url: "/m1.jpg".into(),
			width: 4096,
			height: 2048,
			category: "photo".into(),
		};
		assert!(matches!(
			state.assign_panorama(&a, &asset),
			Err(EditorError::Validation(ValidationError::NotPanorama { .. }))
		));
		asset.category = PANORAMA_CATEGORY.into();
		state.assign_panorama(&a, &asset).unwrap();
		assert!(state.model.node(&a).unwrap().has_panorama());
		assert!(matches!(
			state.assign_panorama(&NodeId::from("gone"), &asset),
			Err(EditorError::NotFound { .. })
		));
	}

	#[test]
	fn reset_view_fits_nodes_without_floorplan() {
		let mut state = editor();
		add(&mut state, 0.0, 0.0);
		add(&mut state, 100.0, 50.0);
		state.reset_view();
		let c = state.transform.world_to_screen(Point::new(50.0, 25.0));
		assert!(approx_eq!(f64, c.x, 400.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, c.y, 300.0, epsilon = 1e-9));
	}
}
