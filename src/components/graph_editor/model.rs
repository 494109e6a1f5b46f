//! The in-memory navigation graph and its mutation rules.
//!
//! Every committed mutation is queued as a [`PendingOp`] carrying the call
//! for the persistence collaborator and the [`Undo`] needed to roll it back
//! if that call fails. Transient mutations (`is_dragging == true`) only touch
//! the in-memory state; the first one of a gesture records a baseline so the
//! final committed update can still be undone to the pre-gesture state.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use super::error::{EditorError, EntityKind, ValidationError};
use super::types::{
	Area, AreaId, AreaPatch, ConnectionId, Floorplan, FloorplanUpdate, GraphConnection, GraphNode,
	GraphSettings, GraphSnapshot, NewArea, NodeAttrs, NodeId, NodePatch, Position,
};

/// Field-of-view range accepted for the panorama viewer, in degrees.
pub const MIN_FOV_DEG: f64 = 30.0;
pub const MAX_FOV_DEG: f64 = 120.0;

/// A call to make on the persistence collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
	CreateNode(GraphNode),
	UpdateNode { id: NodeId, patch: NodePatch },
	DeleteNode(NodeId),
	CreateConnection(GraphConnection),
	DeleteConnection(ConnectionId),
	CreateArea(Area),
	UpdateArea { id: AreaId, patch: AreaPatch },
	DeleteArea(AreaId),
	SetAreaStartNode { area_id: AreaId, node_id: Option<NodeId> },
	UpdateFloorplan(FloorplanUpdate),
}

impl Mutation {
	pub fn name(&self) -> &'static str {
		match self {
			Mutation::CreateNode(_) => "createNode",
			Mutation::UpdateNode { .. } => "updateNode",
			Mutation::DeleteNode(_) => "deleteNode",
			Mutation::CreateConnection(_) => "createConnection",
			Mutation::DeleteConnection(_) => "deleteConnection",
			Mutation::CreateArea(_) => "createArea",
			Mutation::UpdateArea { .. } => "updateArea",
			Mutation::DeleteArea(_) => "deleteArea",
			Mutation::SetAreaStartNode { .. } => "setAreaStartNode",
			Mutation::UpdateFloorplan(_) => "updateFloorplan",
		}
	}
}

/// Inverse of a committed mutation, applied if persistence fails.
#[derive(Clone, Debug, PartialEq)]
pub enum Undo {
	RemoveNode(NodeId),
	/// Inverse patch: only the fields the failed update touched.
	RestoreNode { id: NodeId, patch: NodePatch },
	ReinsertNode {
		node: GraphNode,
		index: usize,
		connections: Vec<GraphConnection>,
		area_starts: Vec<AreaId>,
	},
	RemoveConnection(ConnectionId),
	ReinsertConnection(GraphConnection),
	RemoveArea(AreaId),
	RestoreArea { id: AreaId, patch: AreaPatch },
	ReinsertArea { area: Area, index: usize },
	RestoreAreaStart { area_id: AreaId, node_id: Option<NodeId> },
	RestoreFloorplan(Option<Floorplan>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingOp {
	pub mutation: Mutation,
	pub undo: Undo,
}

#[derive(Debug, Default)]
pub struct GraphModel {
	nodes: Vec<GraphNode>,
	connections: Vec<GraphConnection>,
	areas: Vec<Area>,
	floorplan: Option<Floorplan>,
	settings: GraphSettings,
	pending: Vec<PendingOp>,
	node_baselines: HashMap<NodeId, GraphNode>,
	area_baselines: HashMap<AreaId, Area>,
	revision: u64,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load a snapshot, repairing anything that breaks the graph invariants:
	/// dangling or duplicate connections are dropped, neighbor sets are rebuilt
	/// from the connection list, stale area start nodes are cleared and
	/// connection distances are recomputed from the node positions.
	pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
		let GraphSnapshot {
			mut nodes,
			connections,
			mut areas,
			floorplan,
			settings,
		} = snapshot;

		for node in &mut nodes {
			node.connections.clear();
		}
		let mut model = Self {
			nodes,
			floorplan,
			settings,
			..Self::default()
		};

		let mut dropped = 0;
		for connection in connections {
			let valid = connection.from_node_id != connection.to_node_id
				&& model.node(&connection.from_node_id).is_some()
				&& model.node(&connection.to_node_id).is_some()
				&& model
					.connection_between(&connection.from_node_id, &connection.to_node_id)
					.is_none();
			if valid {
				model.link(&connection.from_node_id, &connection.to_node_id);
				model.connections.push(connection);
				if let Some(id) = model.connections.last().map(|c| c.from_node_id.clone()) {
					model.refresh_distances(&id);
				}
			} else {
				dropped += 1;
			}
		}
		if dropped > 0 {
			warn!("Dropped {dropped} invalid connections while loading graph");
		}

		for area in &mut areas {
			if let Some(start) = &area.start_node_id {
				if !model.nodes.iter().any(|n| &n.id == start) {
					area.start_node_id = None;
				}
			}
		}
		model.areas = areas;
		info!(
			"Loaded graph: {} nodes, {} connections, {} areas",
			model.nodes.len(),
			model.connections.len(),
			model.areas.len()
		);
		model
	}

	pub fn snapshot(&self) -> GraphSnapshot {
		GraphSnapshot {
			nodes: self.nodes.clone(),
			connections: self.connections.clone(),
			areas: self.areas.clone(),
			floorplan: self.floorplan.clone(),
			settings: self.settings.clone(),
		}
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| &n.id == id)
	}

	fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
		self.nodes.iter_mut().find(|n| &n.id == id)
	}

	pub fn connections(&self) -> &[GraphConnection] {
		&self.connections
	}

	pub fn connection(&self, id: &ConnectionId) -> Option<&GraphConnection> {
		self.connections.iter().find(|c| &c.id == id)
	}

	pub fn connection_between(&self, a: &NodeId, b: &NodeId) -> Option<&GraphConnection> {
		self.connections.iter().find(|c| c.joins(a, b))
	}

	pub fn areas(&self) -> &[Area] {
		&self.areas
	}

	pub fn area(&self, id: &AreaId) -> Option<&Area> {
		self.areas.iter().find(|a| &a.id == id)
	}

	fn area_mut(&mut self, id: &AreaId) -> Option<&mut Area> {
		self.areas.iter_mut().find(|a| &a.id == id)
	}

	pub fn floorplan(&self) -> Option<&Floorplan> {
		self.floorplan.as_ref()
	}

	pub fn settings(&self) -> &GraphSettings {
		&self.settings
	}

	/// Settings are editor configuration; they ride along with autosave only.
	pub fn set_settings(&mut self, settings: GraphSettings) {
		self.settings = settings;
		self.revision += 1;
	}

	/// Bumped by every committed change and every rollback.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn take_pending(&mut self) -> Vec<PendingOp> {
		std::mem::take(&mut self.pending)
	}

	fn commit(&mut self, mutation: Mutation, undo: Undo) {
		debug!("Queued {}", mutation.name());
		self.pending.push(PendingOp { mutation, undo });
		self.revision += 1;
	}

	fn link(&mut self, a: &NodeId, b: &NodeId) {
		if let Some(node) = self.node_mut(a) {
			node.connections.insert(b.clone());
		}
		if let Some(node) = self.node_mut(b) {
			node.connections.insert(a.clone());
		}
	}

	fn unlink(&mut self, a: &NodeId, b: &NodeId) {
		if let Some(node) = self.node_mut(a) {
			node.connections.remove(b);
		}
		if let Some(node) = self.node_mut(b) {
			node.connections.remove(a);
		}
	}

	// --- Nodes ---

	pub fn add_node(&mut self, position: Position, attrs: NodeAttrs) -> GraphNode {
		let node = GraphNode {
			id: NodeId::generate(),
			label: attrs.label,
			position,
			rotation: attrs.rotation.rem_euclid(360.0),
			pitch: attrs.pitch.clamp(-90.0, 90.0),
			fov: 90.0,
			locked: attrs.locked,
			panorama_asset_id: attrs.panorama_asset_id,
			panorama_url: attrs.panorama_url,
			connections: BTreeSet::new(),
		};
		info!("Added node {} at ({:.1}, {:.1})", node.id, position.x, position.y);
		self.nodes.push(node.clone());
		self.commit(Mutation::CreateNode(node.clone()), Undo::RemoveNode(node.id.clone()));
		node
	}

	/// Copy of a node's scalars and panorama binding, without connections.
	pub fn duplicate_node(&mut self, id: &NodeId, dx: f64, dy: f64) -> Option<GraphNode> {
		let source = self.node(id)?.clone();
		let position = Position::new(source.position.x + dx, source.position.y + dy, source.position.z);
		let label = source.label.map(|l| format!("{l} (copy)"));
		Some(self.add_node(
			position,
			NodeAttrs {
				label,
				rotation: source.rotation,
				pitch: source.pitch,
				locked: false,
				panorama_asset_id: source.panorama_asset_id,
				panorama_url: source.panorama_url,
			},
		))
	}

	/// Apply `patch`. With `is_dragging` the change stays local; otherwise it
	/// is committed. Returns `false` for unknown ids.
	pub fn update_node(&mut self, id: &NodeId, patch: NodePatch, is_dragging: bool) -> bool {
		let Some(current) = self.node(id).cloned() else {
			return false;
		};

		if is_dragging {
			self.node_baselines.entry(id.clone()).or_insert(current);
			if let Some(node) = self.node_mut(id) {
				patch.apply_to(node);
			}
			return true;
		}

		let baseline = self.node_baselines.remove(id).unwrap_or(current);
		let moved = patch.position.is_some_and(|p| p != baseline.position);
		let undo = Undo::RestoreNode {
			id: id.clone(),
			patch: patch.inverse(&baseline),
		};
		if let Some(node) = self.node_mut(id) {
			patch.apply_to(node);
		}
		if moved {
			self.refresh_distances(id);
		}
		self.commit(
			Mutation::UpdateNode {
				id: id.clone(),
				patch,
			},
			undo,
		);
		true
	}

	/// Viewer field of view. A client-side hint: nothing is queued.
	pub fn set_node_fov(&mut self, id: &NodeId, fov: f64) -> bool {
		let Some(node) = self.node_mut(id) else {
			return false;
		};
		node.fov = fov.clamp(MIN_FOV_DEG, MAX_FOV_DEG);
		true
	}

	/// Drop an in-progress gesture, restoring the pre-gesture state.
	pub fn cancel_node_gesture(&mut self, id: &NodeId) {
		if let Some(baseline) = self.node_baselines.remove(id) {
			self.restore_node_scalars(baseline);
		}
	}

	fn refresh_distances(&mut self, id: &NodeId) {
		let positions: HashMap<NodeId, Position> =
			self.nodes.iter().map(|n| (n.id.clone(), n.position)).collect();
		for connection in self.connections.iter_mut().filter(|c| c.touches(id)) {
			if let (Some(a), Some(b)) = (
				positions.get(&connection.from_node_id),
				positions.get(&connection.to_node_id),
			) {
				connection.distance = a.planar_distance(b);
			}
		}
	}

	/// Remove a node and everything that references it. Unknown ids are a no-op.
	pub fn delete_node(&mut self, id: &NodeId) -> bool {
		let Some(index) = self.nodes.iter().position(|n| &n.id == id) else {
			return false;
		};
		let mut node = self.nodes.remove(index);
		node.connections.clear();
		if let Some(baseline) = self.node_baselines.remove(id) {
			node = GraphNode {
				connections: BTreeSet::new(),
				..baseline
			};
		}

		let (incident, kept): (Vec<_>, Vec<_>) =
			std::mem::take(&mut self.connections).into_iter().partition(|c| c.touches(id));
		self.connections = kept;
		for other in &mut self.nodes {
			other.connections.remove(id);
		}

		let mut area_starts = Vec::new();
		for area in &mut self.areas {
			if area.start_node_id.as_ref() == Some(id) {
				area.start_node_id = None;
				area_starts.push(area.id.clone());
			}
		}

		info!("Deleted node {id} ({} connections)", incident.len());
		self.commit(
			Mutation::DeleteNode(id.clone()),
			Undo::ReinsertNode {
				node,
				index,
				connections: incident,
				area_starts,
			},
		);
		true
	}

	// --- Connections ---

	/// Bidirectional connection between `a` and `b`, or `None` if rejected.
	pub fn add_connection(&mut self, a: &NodeId, b: &NodeId) -> Option<GraphConnection> {
		match self.try_add_connection(a, b, true) {
			Ok(connection) => Some(connection),
			Err(err) => {
				debug!("Connection {a} -> {b} rejected: {err}");
				None
			}
		}
	}

	pub fn try_add_connection(
		&mut self,
		a: &NodeId,
		b: &NodeId,
		bidirectional: bool,
	) -> Result<GraphConnection, EditorError> {
		if a == b {
			return Err(ValidationError::SelfConnection.into());
		}
		let from = self
			.node(a)
			.ok_or_else(|| EditorError::not_found(EntityKind::Node, a))?;
		let to = self
			.node(b)
			.ok_or_else(|| EditorError::not_found(EntityKind::Node, b))?;
		if self.connection_between(a, b).is_some() {
			return Err(ValidationError::DuplicateConnection.into());
		}

		let connection = GraphConnection {
			id: ConnectionId::generate(),
			from_node_id: a.clone(),
			to_node_id: b.clone(),
			distance: from.position.planar_distance(&to.position),
			bidirectional,
		};
		self.connections.push(connection.clone());
		self.link(a, b);
		info!("Connected {a} -> {b} ({:.1})", connection.distance);
		self.commit(
			Mutation::CreateConnection(connection.clone()),
			Undo::RemoveConnection(connection.id.clone()),
		);
		Ok(connection)
	}

	pub fn delete_connection(&mut self, id: &ConnectionId) -> bool {
		let Some(index) = self.connections.iter().position(|c| &c.id == id) else {
			return false;
		};
		let connection = self.connections.remove(index);
		self.unlink(&connection.from_node_id, &connection.to_node_id);
		info!("Deleted connection {id}");
		self.commit(Mutation::DeleteConnection(id.clone()), Undo::ReinsertConnection(connection));
		true
	}

	// --- Areas ---

	pub fn add_area(&mut self, data: NewArea) -> Option<Area> {
		match self.try_add_area(data) {
			Ok(area) => Some(area),
			Err(err) => {
				warn!("Area rejected: {err}");
				None
			}
		}
	}

	pub fn try_add_area(&mut self, data: NewArea) -> Result<Area, EditorError> {
		if data.boundary.len() < 3 {
			return Err(ValidationError::TooFewVertices {
				count: data.boundary.len(),
			}
			.into());
		}
		let name = data.name.trim();
		if name.is_empty() {
			return Err(ValidationError::EmptyName.into());
		}
		let area = Area {
			id: AreaId::generate(),
			name: name.to_owned(),
			category: data.category,
			description: data.description,
			boundary: data.boundary,
			start_node_id: None,
			gallery: Vec::new(),
		};
		self.areas.push(area.clone());
		info!("Added area {} ({} vertices)", area.name, area.boundary.len());
		self.commit(Mutation::CreateArea(area.clone()), Undo::RemoveArea(area.id.clone()));
		Ok(area)
	}

	/// Same transient/committed contract as [`Self::update_node`]. A boundary
	/// with fewer than 3 vertices is rejected.
	pub fn update_area(&mut self, id: &AreaId, patch: AreaPatch, is_dragging: bool) -> bool {
		if patch.boundary.as_ref().is_some_and(|b| b.len() < 3) {
			warn!("Ignoring boundary update with fewer than 3 vertices for area {id}");
			return false;
		}
		let Some(current) = self.area(id).cloned() else {
			return false;
		};

		if is_dragging {
			self.area_baselines.entry(id.clone()).or_insert(current);
			if let Some(area) = self.area_mut(id) {
				patch.apply_to(area);
			}
			return true;
		}

		let baseline = self.area_baselines.remove(id).unwrap_or(current);
		let undo = Undo::RestoreArea {
			id: id.clone(),
			patch: patch.inverse(&baseline),
		};
		if let Some(area) = self.area_mut(id) {
			patch.apply_to(area);
		}
		self.commit(
			Mutation::UpdateArea {
				id: id.clone(),
				patch,
			},
			undo,
		);
		true
	}

	pub fn cancel_area_gesture(&mut self, id: &AreaId) {
		if let Some(baseline) = self.area_baselines.remove(id) {
			if let Some(area) = self.area_mut(id) {
				*area = baseline;
			}
		}
	}

	pub fn delete_area(&mut self, id: &AreaId) -> bool {
		let Some(index) = self.areas.iter().position(|a| &a.id == id) else {
			return false;
		};
		let mut area = self.areas.remove(index);
		if let Some(baseline) = self.area_baselines.remove(id) {
			area = baseline;
		}
		info!("Deleted area {}", area.name);
		self.commit(Mutation::DeleteArea(id.clone()), Undo::ReinsertArea { area, index });
		true
	}

	pub fn set_area_start_node(&mut self, area_id: &AreaId, node_id: Option<NodeId>) -> bool {
		if node_id.as_ref().is_some_and(|n| self.node(n).is_none()) {
			return false;
		}
		let Some(area) = self.area_mut(area_id) else {
			return false;
		};
		let previous = std::mem::replace(&mut area.start_node_id, node_id.clone());
		self.commit(
			Mutation::SetAreaStartNode {
				area_id: area_id.clone(),
				node_id,
			},
			Undo::RestoreAreaStart {
				area_id: area_id.clone(),
				node_id: previous,
			},
		);
		true
	}

	// --- Floorplan ---

	pub fn set_floorplan(&mut self, floorplan: Floorplan) {
		let update = FloorplanUpdate {
			image_ref: floorplan.image_ref.clone(),
			width: floorplan.bounds.width,
			height: floorplan.bounds.height,
		};
		let previous = self.floorplan.replace(floorplan);
		self.commit(Mutation::UpdateFloorplan(update), Undo::RestoreFloorplan(previous));
	}

	// --- Rollback ---

	fn restore_node_scalars(&mut self, saved: GraphNode) {
		if let Some(node) = self.node_mut(&saved.id) {
			let connections = std::mem::take(&mut node.connections);
			*node = GraphNode { connections, ..saved };
		}
	}

	/// Undo a committed mutation whose persistence call failed. Never
	/// produces a dangling reference: pieces whose context has since
	/// disappeared are skipped.
	pub fn revert(&mut self, undo: Undo) {
		match undo {
			Undo::RemoveNode(id) => {
				// the server never saw this node, so its delete is not queued
				if self.delete_node(&id) {
					self.pending.pop();
				}
			}
			Undo::RestoreNode { id, patch } => {
				if let Some(node) = self.node_mut(&id) {
					patch.apply_to(node);
				}
				if patch.position.is_some() {
					self.refresh_distances(&id);
				}
			}
			Undo::ReinsertNode {
				node,
				index,
				connections,
				area_starts,
			} => {
				if self.node(&node.id).is_some() {
					return;
				}
				let id = node.id.clone();
				let index = index.min(self.nodes.len());
				self.nodes.insert(index, node);
				for connection in connections {
					self.reinsert_connection(connection);
				}
				for area_id in area_starts {
					if let Some(area) = self.area_mut(&area_id) {
						area.start_node_id.get_or_insert_with(|| id.clone());
					}
				}
			}
			Undo::RemoveConnection(id) => {
				if let Some(index) = self.connections.iter().position(|c| c.id == id) {
					let connection = self.connections.remove(index);
					self.unlink(&connection.from_node_id, &connection.to_node_id);
				}
			}
			Undo::ReinsertConnection(connection) => self.reinsert_connection(connection),
			Undo::RemoveArea(id) => self.areas.retain(|a| a.id != id),
			Undo::RestoreArea { id, patch } => {
				if let Some(area) = self.area_mut(&id) {
					patch.apply_to(area);
				}
			}
			Undo::ReinsertArea { area, index } => {
				if self.area(&area.id).is_none() {
					let area = self.sanitize_area(area);
					let index = index.min(self.areas.len());
					self.areas.insert(index, area);
				}
			}
			Undo::RestoreAreaStart { area_id, node_id } => {
				let node_id = node_id.filter(|n| self.node(n).is_some());
				if let Some(area) = self.area_mut(&area_id) {
					area.start_node_id = node_id;
				}
			}
			Undo::RestoreFloorplan(floorplan) => self.floorplan = floorplan,
		}
		self.revision += 1;
	}

	fn reinsert_connection(&mut self, connection: GraphConnection) {
		let (a, b) = (&connection.from_node_id, &connection.to_node_id);
		if self.node(a).is_none() || self.node(b).is_none() || self.connection_between(a, b).is_some() {
			return;
		}
		let (a, b) = (a.clone(), b.clone());
		self.connections.push(connection);
		self.link(&a, &b);
	}

	fn sanitize_area(&self, mut area: Area) -> Area {
		if area.start_node_id.as_ref().is_some_and(|n| self.node(n).is_none()) {
			area.start_node_id = None;
		}
		area
	}

	/// Neighbor sets match the connection list exactly, one connection per pair.
	#[cfg(test)]
	pub fn is_consistent(&self) -> bool {
		let mut expected: HashMap<&NodeId, BTreeSet<NodeId>> =
			self.nodes.iter().map(|n| (&n.id, BTreeSet::new())).collect();
		let mut pairs = BTreeSet::new();
		for c in &self.connections {
			let pair = if c.from_node_id < c.to_node_id {
				(c.from_node_id.clone(), c.to_node_id.clone())
			} else {
				(c.to_node_id.clone(), c.from_node_id.clone())
			};
			if c.from_node_id == c.to_node_id || !pairs.insert(pair) {
				return false;
			}
			let (Some(_), Some(_)) = (expected.get(&c.from_node_id), expected.get(&c.to_node_id)) else {
				return false;
			};
			if let Some(set) = expected.get_mut(&c.from_node_id) {
				set.insert(c.to_node_id.clone());
			}
			if let Some(set) = expected.get_mut(&c.to_node_id) {
				set.insert(c.from_node_id.clone());
			}
		}
		let starts_valid = self
			.areas
			.iter()
			.filter_map(|a| a.start_node_id.as_ref())
			.all(|n| self.node(n).is_some());
		starts_valid && self.nodes.iter().all(|n| expected.get(&n.id) == Some(&n.connections))
	}
}
