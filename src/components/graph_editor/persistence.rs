//! Boundary to the persistence collaborator, plus the timers that decide
//! when to talk to it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::{debug, warn};

use super::error::{EditorError, PersistenceError};
use super::model::{GraphModel, Mutation, PendingOp};
use super::types::{
	Area, AreaId, AreaPatch, ConnectionId, Floorplan, FloorplanBounds, FloorplanUpdate, GraphConnection,
	GraphNode, GraphSnapshot, NodeId, NodePatch,
};

/// Persistence collaborator. Calls may fail independently of in-memory state.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
	async fn load_graph(&self) -> Result<GraphSnapshot, PersistenceError>;
	async fn create_node(&self, node: &GraphNode) -> Result<(), PersistenceError>;
	async fn update_node(&self, id: &NodeId, patch: &NodePatch) -> Result<(), PersistenceError>;
	async fn delete_node(&self, id: &NodeId) -> Result<(), PersistenceError>;
	async fn create_connection(&self, connection: &GraphConnection) -> Result<(), PersistenceError>;
	async fn delete_connection(&self, id: &ConnectionId) -> Result<(), PersistenceError>;
	async fn create_area(&self, area: &Area) -> Result<(), PersistenceError>;
	async fn update_area(&self, id: &AreaId, patch: &AreaPatch) -> Result<(), PersistenceError>;
	async fn delete_area(&self, id: &AreaId) -> Result<(), PersistenceError>;
	async fn set_area_start_node(
		&self,
		area_id: &AreaId,
		node_id: Option<&NodeId>,
	) -> Result<(), PersistenceError>;
	async fn update_floorplan(&self, update: &FloorplanUpdate) -> Result<(), PersistenceError>;
	async fn save_graph(&self, snapshot: &GraphSnapshot) -> Result<(), PersistenceError>;
}

/// Forward one queued mutation to the matching collaborator call.
pub async fn dispatch<S: GraphStore>(store: &S, mutation: &Mutation) -> Result<(), PersistenceError> {
	match mutation {
		Mutation::CreateNode(node) => store.create_node(node).await,
		Mutation::UpdateNode { id, patch } => store.update_node(id, patch).await,
		Mutation::DeleteNode(id) => store.delete_node(id).await,
		Mutation::CreateConnection(connection) => store.create_connection(connection).await,
		Mutation::DeleteConnection(id) => store.delete_connection(id).await,
		Mutation::CreateArea(area) => store.create_area(area).await,
		Mutation::UpdateArea { id, patch } => store.update_area(id, patch).await,
		Mutation::DeleteArea(id) => store.delete_area(id).await,
		Mutation::SetAreaStartNode { area_id, node_id } => {
			store.set_area_start_node(area_id, node_id.as_ref()).await
		}
		Mutation::UpdateFloorplan(update) => store.update_floorplan(update).await,
	}
}

/// Fold a collaborator result back into the model. A failure rolls the
/// optimistic change back and is returned for the error banner.
pub fn settle(
	model: &mut GraphModel,
	op: PendingOp,
	result: Result<(), PersistenceError>,
) -> Option<EditorError> {
	match result {
		Ok(()) => {
			debug!("{} persisted", op.mutation.name());
			None
		}
		Err(err) => {
			warn!("{} failed, rolling back: {err}", op.mutation.name());
			model.revert(op.undo);
			Some(err.into())
		}
	}
}

/// Outgoing collaborator calls, sent one at a time in commit order.
///
/// Only one drain runs at a time; ops pushed while it is awaiting a reply
/// join the back of the queue.
#[derive(Debug, Default)]
pub struct WriteQueue {
	ops: RefCell<VecDeque<PendingOp>>,
	draining: Cell<bool>,
}

impl WriteQueue {
	/// Enqueue ops. Returns `true` when no drain is running and the caller
	/// must start one.
	pub fn push(&self, ops: Vec<PendingOp>) -> bool {
		if ops.is_empty() {
			return false;
		}
		self.ops.borrow_mut().extend(ops);
		!self.draining.replace(true)
	}

	/// Send queued ops until the queue is empty, awaiting each reply before
	/// the next call goes out.
	pub async fn drain<S: GraphStore>(
		&self,
		store: &S,
		mut on_settled: impl FnMut(PendingOp, Result<(), PersistenceError>),
	) {
		loop {
			let next = self.ops.borrow_mut().pop_front();
			let Some(op) = next else {
				break;
			};
			let result = dispatch(store, &op.mutation).await;
			on_settled(op, result);
		}
		self.draining.set(false);
	}
}

/// A restartable one-shot deadline on the host's millisecond clock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DebounceTimer {
	deadline: Option<f64>,
}

impl DebounceTimer {
	/// (Re)start the timer; an earlier deadline is discarded.
	pub fn schedule(&mut self, now_ms: f64, delay_ms: f64) {
		self.deadline = Some(now_ms + delay_ms);
	}

	pub fn cancel(&mut self) {
		self.deadline = None;
	}

	/// `true` exactly once, on the first poll at or after the deadline.
	pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
		match self.deadline {
			Some(deadline) if now_ms >= deadline => {
				self.deadline = None;
				true
			}
			_ => false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
struct PendingLabel {
	node_id: NodeId,
	label: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SaveEvent {
	Autosave(GraphSnapshot),
}

/// Label debounce and autosave timers owned by the editing session.
#[derive(Debug, Default)]
pub struct SaveScheduler {
	label_timer: DebounceTimer,
	pending_label: Option<PendingLabel>,
	autosave_timer: DebounceTimer,
	seen_revision: u64,
}

impl SaveScheduler {
	/// Show a label edit immediately, commit it once typing pauses.
	pub fn edit_label(&mut self, model: &mut GraphModel, node_id: &NodeId, label: Option<String>, now_ms: f64) {
		if self
			.pending_label
			.as_ref()
			.is_some_and(|pending| &pending.node_id != node_id)
		{
			self.flush_label(model);
		}
		let patch = NodePatch {
			label: Some(label.clone()),
			..Default::default()
		};
		if !model.update_node(node_id, patch, true) {
			return;
		}
		self.pending_label = Some(PendingLabel {
			node_id: node_id.clone(),
			label,
		});
		self.label_timer.schedule(now_ms, model.settings().label_debounce_ms);
	}

	/// Commit a pending label right away.
	pub fn flush_label(&mut self, model: &mut GraphModel) {
		self.label_timer.cancel();
		if let Some(PendingLabel { node_id, label }) = self.pending_label.take() {
			let patch = NodePatch {
				label: Some(label),
				..Default::default()
			};
			model.update_node(&node_id, patch, false);
		}
	}

	#[cfg(test)]
	pub fn has_pending_label(&self) -> bool {
		self.pending_label.is_some()
	}

	/// Advance the clock. Restarts autosave after every model change and
	/// reports when it elapses.
	pub fn tick(&mut self, model: &mut GraphModel, now_ms: f64) -> Vec<SaveEvent> {
		if self.label_timer.fire_if_due(now_ms) {
			self.flush_label(model);
		}

		let mut events = Vec::new();
		if model.revision() != self.seen_revision {
			self.seen_revision = model.revision();
			if model.settings().auto_save {
				self.autosave_timer.schedule(now_ms, model.settings().auto_save_delay_ms);
			}
		}
		if self.autosave_timer.fire_if_due(now_ms) && model.settings().auto_save {
			events.push(SaveEvent::Autosave(model.snapshot()));
		}
		events
	}
}

/// In-memory collaborator backing the demo page and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
	snapshot: RefCell<GraphSnapshot>,
	fail_next: Cell<bool>,
	latency: u32,
	calls: RefCell<Vec<&'static str>>,
}

/// Resolves after being polled `remaining + 1` times.
struct Yield {
	remaining: u32,
}

impl Future for Yield {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.remaining == 0 {
			return Poll::Ready(());
		}
		self.remaining -= 1;
		cx.waker().wake_by_ref();
		Poll::Pending
	}
}

impl MemoryStore {
	pub fn new(snapshot: GraphSnapshot) -> Self {
		Self {
			snapshot: RefCell::new(snapshot),
			..Self::default()
		}
	}

	/// Every reply is delayed by `yields` executor round trips.
	#[cfg(test)]
	pub fn with_latency(mut self, yields: u32) -> Self {
		self.latency = yields;
		self
	}

	/// Make the next call fail, to exercise rollback.
	#[cfg(test)]
	pub fn fail_next_call(&self) {
		self.fail_next.set(true);
	}

	#[cfg(test)]
	pub fn calls(&self) -> Vec<&'static str> {
		self.calls.borrow().clone()
	}

	async fn enter(&self, operation: &'static str) -> Result<(), PersistenceError> {
		Yield { remaining: self.latency }.await;
		self.calls.borrow_mut().push(operation);
		if self.fail_next.replace(false) {
			return Err(PersistenceError::new(operation, "store unavailable"));
		}
		Ok(())
	}

	async fn edit(&self, operation: &'static str, f: impl FnOnce(&mut GraphSnapshot)) -> Result<(), PersistenceError> {
		self.enter(operation).await?;
		f(&mut self.snapshot.borrow_mut());
		Ok(())
	}
}

impl GraphStore for MemoryStore {
	async fn load_graph(&self) -> Result<GraphSnapshot, PersistenceError> {
		self.enter("loadGraph").await?;
		Ok(self.snapshot.borrow().clone())
	}

	async fn create_node(&self, node: &GraphNode) -> Result<(), PersistenceError> {
		self.edit("createNode", |s| s.nodes.push(node.clone())).await
	}

	async fn update_node(&self, id: &NodeId, patch: &NodePatch) -> Result<(), PersistenceError> {
		self.edit("updateNode", |s| {
			if let Some(node) = s.nodes.iter_mut().find(|n| &n.id == id) {
				patch.apply_to(node);
			}
		})
		.await
	}

	async fn delete_node(&self, id: &NodeId) -> Result<(), PersistenceError> {
		self.edit("deleteNode", |s| {
			s.nodes.retain(|n| &n.id != id);
			s.connections.retain(|c| !c.touches(id));
			for area in &mut s.areas {
				if area.start_node_id.as_ref() == Some(id) {
					area.start_node_id = None;
				}
			}
		})
		.await
	}

	async fn create_connection(&self, connection: &GraphConnection) -> Result<(), PersistenceError> {
		self.edit("createConnection", |s| s.connections.push(connection.clone())).await
	}

	async fn delete_connection(&self, id: &ConnectionId) -> Result<(), PersistenceError> {
		self.edit("deleteConnection", |s| s.connections.retain(|c| &c.id != id)).await
	}

	async fn create_area(&self, area: &Area) -> Result<(), PersistenceError> {
		self.edit("createArea", |s| s.areas.push(area.clone())).await
	}

	async fn update_area(&self, id: &AreaId, patch: &AreaPatch) -> Result<(), PersistenceError> {
		self.edit("updateArea", |s| {
			if let Some(area) = s.areas.iter_mut().find(|a| &a.id == id) {
				patch.apply_to(area);
			}
		})
		.await
	}

	async fn delete_area(&self, id: &AreaId) -> Result<(), PersistenceError> {
		self.edit("deleteArea", |s| s.areas.retain(|a| &a.id != id)).await
	}

	async fn set_area_start_node(
		&self,
		area_id: &AreaId,
		node_id: Option<&NodeId>,
	) -> Result<(), PersistenceError> {
		self.edit("setAreaStartNode", |s| {
			if let Some(area) = s.areas.iter_mut().find(|a| &a.id == area_id) {
				area.start_node_id = node_id.cloned();
			}
		})
		.await
	}

	async fn update_floorplan(&self, update: &FloorplanUpdate) -> Result<(), PersistenceError> {
		self.edit("updateFloorplan", |s| {
			let floorplan = s.floorplan.get_or_insert_with(|| Floorplan {
				image_ref: None,
				scale: 1.0,
				bounds: FloorplanBounds::default(),
			});
			floorplan.image_ref = update.image_ref.clone();
			floorplan.bounds = FloorplanBounds::from_extents(0.0, 0.0, update.width, update.height);
		})
		.await
	}

	async fn save_graph(&self, snapshot: &GraphSnapshot) -> Result<(), PersistenceError> {
		self.edit("saveGraph", |s| *s = snapshot.clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_editor::types::{NodeAttrs, Position};

	#[test]
	fn debounce_restarts_and_fires_once() {
		let mut timer = DebounceTimer::default();
		timer.schedule(0.0, 500.0);
		assert!(!timer.fire_if_due(400.0));
		timer.schedule(400.0, 500.0);
		assert!(!timer.fire_if_due(600.0));
		assert!(timer.fire_if_due(900.0));
		assert!(!timer.fire_if_due(1000.0));

		timer.schedule(0.0, 10.0);
		timer.cancel();
		assert!(!timer.fire_if_due(100.0));
	}

	#[test]
	fn label_edits_commit_once_after_pause() {
		let mut model = GraphModel::new();
		let id = model.add_node(Position::default(), NodeAttrs::default()).id;
		model.take_pending();
		let mut scheduler = SaveScheduler::default();

		for (t, text) in [(0.0, "L"), (100.0, "Lo"), (200.0, "Lob"), (300.0, "Lobby")] {
			scheduler.edit_label(&mut model, &id, Some(text.into()), t);
			scheduler.tick(&mut model, t);
		}
		assert_eq!(model.node(&id).unwrap().label.as_deref(), Some("Lobby"));
		assert!(model.take_pending().is_empty());

		scheduler.tick(&mut model, 799.0);
		assert!(model.take_pending().is_empty());
		scheduler.tick(&mut model, 800.0);
		let ops = model.take_pending();
		assert_eq!(ops.len(), 1);
		assert!(matches!(&ops[0].mutation, Mutation::UpdateNode { patch, .. }
			if patch.label == Some(Some("Lobby".into()))));
	}

	#[test]
	fn switching_nodes_flushes_pending_label() {
		let mut model = GraphModel::new();
		let a = model.add_node(Position::default(), NodeAttrs::default()).id;
		let b = model.add_node(Position::default(), NodeAttrs::default()).id;
		model.take_pending();
		let mut scheduler = SaveScheduler::default();

		scheduler.edit_label(&mut model, &a, Some("A".into()), 0.0);
		scheduler.edit_label(&mut model, &b, Some("B".into()), 10.0);
		assert_eq!(model.take_pending().len(), 1);
		assert!(scheduler.has_pending_label());
	}

	#[test]
	fn autosave_waits_for_quiet_period() {
		let mut model = GraphModel::new();
		let mut scheduler = SaveScheduler::default();
		model.add_node(Position::default(), NodeAttrs::default());
		assert!(scheduler.tick(&mut model, 0.0).is_empty());

		model.add_node(Position::new(5.0, 0.0, 0.0), NodeAttrs::default());
		assert!(scheduler.tick(&mut model, 3000.0).is_empty());
		assert!(scheduler.tick(&mut model, 7999.0).is_empty());
		let events = scheduler.tick(&mut model, 8000.0);
		assert!(matches!(&events[..], [SaveEvent::Autosave(s)] if s.nodes.len() == 2));
		assert!(scheduler.tick(&mut model, 20_000.0).is_empty());
	}

	#[test]
	fn autosave_respects_setting() {
		let mut model = GraphModel::new();
		let mut settings = model.settings().clone();
		settings.auto_save = false;
		model.set_settings(settings);
		let mut scheduler = SaveScheduler::default();
		model.add_node(Position::default(), NodeAttrs::default());
		scheduler.tick(&mut model, 0.0);
		assert!(scheduler.tick(&mut model, 60_000.0).is_empty());
	}

	#[test]
	fn failed_call_rolls_back_model() {
		let store = MemoryStore::default();
		let mut model = GraphModel::new();
		let node = model.add_node(Position::default(), NodeAttrs::default());

		store.fail_next_call();
		for op in model.take_pending() {
			let result = pollster::block_on(dispatch(&store, &op.mutation));
			let err = settle(&mut model, op, result);
			assert!(matches!(err, Some(EditorError::Persistence(_))));
		}
		assert!(model.node(&node.id).is_none());
		assert_eq!(store.calls(), ["createNode"]);
	}

	#[test]
	fn successful_calls_reach_the_store() {
		let store = MemoryStore::default();
		let mut model = GraphModel::new();
		let a = model.add_node(Position::default(), NodeAttrs::default()).id;
		let b = model.add_node(Position::new(10.0, 0.0, 0.0), NodeAttrs::default()).id;
		model.add_connection(&a, &b);
		model.delete_node(&b);

		for op in model.take_pending() {
			let result = pollster::block_on(dispatch(&store, &op.mutation));
			assert!(settle(&mut model, op, result).is_none());
		}
		let saved = pollster::block_on(store.load_graph()).unwrap();
		assert_eq!(saved.nodes.len(), 1);
		assert!(saved.connections.is_empty());
		assert_eq!(
			store.calls(),
			["createNode", "createNode", "createConnection", "deleteNode", "loadGraph"]
		);
	}

	#[test]
	fn writes_go_out_in_commit_order_while_a_reply_is_pending() {
		let store = MemoryStore::default().with_latency(2);
		let queue = WriteQueue::default();
		let model = RefCell::new(GraphModel::new());
		let settled = RefCell::new(Vec::new());
		let id = model
			.borrow_mut()
			.add_node(Position::default(), NodeAttrs::default())
			.id;

		assert!(queue.push(model.borrow_mut().take_pending()));
		let mut drain = std::pin::pin!(queue.drain(&store, |op, result| {
			settled.borrow_mut().push((op.mutation.name(), result.is_ok()));
			settle(&mut model.borrow_mut(), op, result);
		}));
		let mut cx = Context::from_waker(std::task::Waker::noop());
		assert!(drain.as_mut().poll(&mut cx).is_pending());
		assert!(store.calls().is_empty());

		let patch = NodePatch {
			position: Some(Position::new(100.0, 0.0, 0.0)),
			..Default::default()
		};
		assert!(model.borrow_mut().update_node(&id, patch, false));
		assert!(!queue.push(model.borrow_mut().take_pending()));

		pollster::block_on(drain);
		assert_eq!(*settled.borrow(), [("createNode", true), ("updateNode", true)]);
		assert_eq!(store.calls(), ["createNode", "updateNode"]);
		let saved = pollster::block_on(store.load_graph()).unwrap();
		assert_eq!(saved.nodes[0].position.x, 100.0);


		model.borrow_mut().add_node(Position::default(), NodeAttrs::default());
		assert!(queue.push(model.borrow_mut().take_pending()));
	}
}
