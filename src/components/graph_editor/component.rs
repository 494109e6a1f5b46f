use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;
use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

use super::analytics::{GraphStats, graph_stats};
use super::model::{MAX_FOV_DEG, MIN_FOV_DEG};
use super::persistence::{GraphStore, WriteQueue, settle};
use super::render;
use super::state::{ContextMenu, EditorAction, EditorState, PointerButton, Selection, Tool};
use super::types::{
	AreaId, AreaPatch, ConnectionId, Floorplan, FloorplanBounds, GraphSnapshot, MediaAsset, NodeId, category,
};
use crate::components::panorama::{Neighbor, PanoramaViewer, ViewAngles, neighbors};

/// Properties of the selected entity, mirrored for the side panel.
#[derive(Clone, Debug, Default, PartialEq)]
enum Inspector {
	#[default]
	Empty,
	Node {
		id: NodeId,
		label: String,
		x: f64,
		y: f64,
		rotation: f64,
		pitch: f64,
		fov: f64,
		locked: bool,
		panorama: Option<String>,
	},
	Connection {
		id: ConnectionId,
		from: String,
		to: String,
		distance: f64,
		bidirectional: bool,
	},
	Area {
		id: AreaId,
		name: String,
		category: String,
		vertices: usize,
		start: Option<String>,
		gallery: usize,
	},
}

fn set_if_changed<T: PartialEq + Send + Sync + 'static>(signal: RwSignal<T>, value: T) {
	if signal.with_untracked(|current| current != &value) {
		signal.set(value);
	}
}

/// Reactive mirrors of the editor state. Written after every event.
#[derive(Clone, Copy)]
struct EditorUi {
	ready: RwSignal<bool>,
	tool: RwSignal<Tool>,
	inspector: RwSignal<Inspector>,
	stats: RwSignal<GraphStats>,
	route_m: RwSignal<Option<f64>>,
	menu: RwSignal<Option<ContextMenu>>,
	banner: RwSignal<Option<String>>,
	status: RwSignal<String>,
	confirm_discard: RwSignal<Option<Tool>>,
	area_panel: RwSignal<bool>,
	draft_vertices: RwSignal<usize>,
	picker: RwSignal<Option<NodeId>>,
	snap: RwSignal<bool>,
	grid: RwSignal<bool>,
	opacity: RwSignal<f64>,
	viewer_open: RwSignal<bool>,
	viewer_node: RwSignal<Option<NodeId>>,
	viewer_url: RwSignal<Option<String>>,
	viewer_angles: RwSignal<ViewAngles>,
	viewer_fov: RwSignal<f64>,
	viewer_neighbors: RwSignal<Vec<Neighbor>>,
}

impl EditorUi {
	fn new() -> Self {
		Self {
			ready: RwSignal::new(false),
			tool: RwSignal::new(Tool::default()),
			inspector: RwSignal::new(Inspector::Empty),
			stats: RwSignal::new(GraphStats::default()),
			route_m: RwSignal::new(None),
			menu: RwSignal::new(None),
			banner: RwSignal::new(None),
			status: RwSignal::new(String::new()),
			confirm_discard: RwSignal::new(None),
			area_panel: RwSignal::new(false),
			draft_vertices: RwSignal::new(0),
			picker: RwSignal::new(None),
			snap: RwSignal::new(false),
			grid: RwSignal::new(true),
			opacity: RwSignal::new(0.5),
			viewer_open: RwSignal::new(false),
			viewer_node: RwSignal::new(None),
			viewer_url: RwSignal::new(None),
			viewer_angles: RwSignal::new(ViewAngles::default()),
			viewer_fov: RwSignal::new(90.0),
			viewer_neighbors: RwSignal::new(Vec::new()),
		}
	}

	fn sync(&self, s: &EditorState) {
		let model = &s.model;
		set_if_changed(self.tool, s.tool);
		set_if_changed(self.menu, s.context_menu.clone());
		set_if_changed(self.stats, graph_stats(model));
		set_if_changed(self.route_m, s.route_length_m());
		set_if_changed(self.draft_vertices, s.drawing.vertices.len());
		set_if_changed(self.area_panel, s.drawing.awaiting_details);
		set_if_changed(self.snap, model.settings().snap_to_grid);
		set_if_changed(self.grid, model.settings().show_grid);
		set_if_changed(self.opacity, model.settings().floorplan_opacity);

		let inspector = match s.selection() {
			Selection::Node(id) => model.node(id).map(|n| Inspector::Node {
				id: n.id.clone(),
				label: n.label.clone().unwrap_or_default(),
				x: n.position.x,
				y: n.position.y,
				rotation: n.rotation,
				pitch: n.pitch,
				fov: n.fov,
				locked: n.locked,
				panorama: n.panorama_asset_id.clone().or_else(|| n.panorama_url.clone()),
			}),
			Selection::Connection(id) => model.connection(id).map(|c| {
				let name = |id: &NodeId| model.node(id).map(|n| n.display_label()).unwrap_or_default();
				Inspector::Connection {
					id: c.id.clone(),
					from: name(&c.from_node_id),
					to: name(&c.to_node_id),
					distance: c.distance,
					bidirectional: c.bidirectional,
				}
			}),
			Selection::Area(id) => model.area(id).map(|a| Inspector::Area {
				id: a.id.clone(),
				name: a.name.clone(),
				category: a.category.clone(),
				vertices: a.boundary.len(),
				start: a
					.start_node_id
					.as_ref()
					.and_then(|n| model.node(n))
					.map(|n| n.display_label()),
				gallery: a.visible_gallery().len(),
			}),
			Selection::None => None,
		};
		set_if_changed(self.inspector, inspector.unwrap_or_default());

		let viewed = s.selected_node_id().and_then(|id| model.node(id)).filter(|n| n.has_panorama());
		match viewed {
			Some(node) => {
				// angles first: the viewer re-seeds from them when the node changes
				set_if_changed(self.viewer_angles, ViewAngles::new(node.rotation, node.pitch));
				set_if_changed(self.viewer_fov, node.fov);
				set_if_changed(self.viewer_url, node.panorama_url.clone());
				set_if_changed(self.viewer_neighbors, neighbors(model, &node.id));
				set_if_changed(self.viewer_node, Some(node.id.clone()));
			}
			None => {
				set_if_changed(self.viewer_node, None);
				set_if_changed(self.viewer_url, None);
				set_if_changed(self.viewer_neighbors, Vec::new());
			}
		}
	}
}

/// Owns the editing session and talks to the store.
struct Editor<S> {
	state: Rc<RefCell<Option<EditorState>>>,
	store: Rc<S>,
	writes: Rc<WriteQueue>,
	ui: EditorUi,
	size: Rc<Cell<(f64, f64)>>,
	floorplan: Rc<RefCell<Option<HtmlImageElement>>>,
	floorplan_onload: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl<S> Clone for Editor<S> {
	fn clone(&self) -> Self {
		Self {
			state: self.state.clone(),
			store: self.store.clone(),
			writes: self.writes.clone(),
			ui: self.ui,
			size: self.size.clone(),
			floorplan: self.floorplan.clone(),
			floorplan_onload: self.floorplan_onload.clone(),
		}
	}
}

impl<S: GraphStore + 'static> Editor<S> {
	fn load(&self) {
		let editor = self.clone();
		spawn_local(async move {
			match editor.store.load_graph().await {
				Ok(snapshot) => editor.replace(snapshot),
				Err(err) => {
					error!("Could not load graph: {err}");
					editor.ui.banner.set(Some(err.to_string()));
				}
			}
		});
	}

	fn replace(&self, snapshot: GraphSnapshot) {
		let (w, h) = self.size.get();
		let image_ref = snapshot.floorplan.as_ref().and_then(|f| f.image_ref.clone());
		let state = EditorState::new(snapshot, w, h);
		info!(
			"Editing {} nodes, {} connections, {} areas",
			state.model.nodes().len(),
			state.model.connections().len(),
			state.model.areas().len()
		);
		self.ui.sync(&state);
		*self.state.borrow_mut() = Some(state);
		self.load_floorplan(image_ref.as_deref());
		self.ui.ready.set(true);
	}

	fn load_floorplan(&self, url: Option<&str>) {
		if let Some(previous) = self.floorplan.borrow_mut().take() {
			previous.set_onload(None);
		}
		let Some(url) = url else {
			return;
		};
		let Ok(image) = HtmlImageElement::new() else {
			return;
		};
		let state = self.state.clone();
		*self.floorplan_onload.borrow_mut() = Some(Closure::new(move || {
			if let Some(s) = state.borrow_mut().as_mut() {
				s.request_redraw();
			}
		}));
		if let Some(ref cb) = *self.floorplan_onload.borrow() {
			image.set_onload(Some(cb.as_ref().unchecked_ref()));
		}
		image.set_src(url);
		*self.floorplan.borrow_mut() = Some(image);
	}

	/// Run one state transition, then mirror, persist and react to it.
	fn apply(&self, f: impl FnOnce(&mut EditorState) -> Vec<EditorAction>) {
		let actions = {
			let mut guard = self.state.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let actions = f(s);
			self.ui.sync(s);
			self.flush(s);
			actions
		};
		for action in actions {
			self.handle(action);
		}
	}

	/// Queue committed ops. A single task sends them, one reply at a time.
	fn flush(&self, s: &mut EditorState) {
		if !self.writes.push(s.model.take_pending()) {
			return;
		}
		let editor = self.clone();
		spawn_local(async move {
			editor
				.writes
				.drain(editor.store.as_ref(), |op, result| {
					let mut guard = editor.state.borrow_mut();
					let Some(s) = guard.as_mut() else {
						return;
					};
					if let Some(err) = settle(&mut s.model, op, result) {
						editor.ui.banner.set(Some(format!("{err}. The change was undone.")));
						s.request_redraw();
						editor.ui.sync(s);
					}
				})
				.await;
		});
	}

	fn handle(&self, action: EditorAction) {
		match action {
			EditorAction::ConfirmDiscardArea { next } => self.ui.confirm_discard.set(Some(next)),
			EditorAction::AreaReadyToClose => self.ui.area_panel.set(true),
			EditorAction::ChoosePanorama(id) => self.ui.picker.set(Some(id)),
			EditorAction::ViewPanorama(_) => self.ui.viewer_open.set(true),
			EditorAction::ShowContextMenu(menu) => self.ui.menu.set(Some(menu)),
			EditorAction::Autosave(snapshot) => {
				let editor = self.clone();
				editor.ui.status.set("Saving…".into());
				spawn_local(async move {
					match editor.store.save_graph(&snapshot).await {
						Ok(()) => editor.ui.status.set("All changes saved".into()),
						Err(err) => {
							warn!("Autosave failed: {err}");
							editor.ui.status.set("Autosave failed".into());
						}
					}
				});
			}
		}
	}

	/// One animation frame: advance timers, redraw when dirty.
	fn frame(&self, ctx: &CanvasRenderingContext2d, now_ms: f64) {
		let actions = {
			let mut guard = self.state.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let revision = s.model.revision();
			let actions = s.tick(now_ms);
			if s.model.revision() != revision {
				self.ui.sync(s);
			}
			self.flush(s);
			if s.take_redraw() {
				render::render(s, ctx, self.floorplan.borrow().as_ref());
			}
			actions
		};
		for action in actions {
			self.handle(action);
		}
	}

	fn resize(&self, w: f64, h: f64, refit: bool) {
		self.size.set((w, h));
		if let Some(s) = self.state.borrow_mut().as_mut() {
			s.resize(w, h);
			if refit {
				s.reset_view();
			}
		}
	}

	fn export_json(&self) -> Option<String> {
		let guard = self.state.borrow();
		let snapshot = guard.as_ref()?.model.snapshot();
		match snapshot.to_json() {
			Ok(json) => Some(json),
			Err(err) => {
				self.ui.banner.set(Some(format!("Export failed: {err}")));
				None
			}
		}
	}

	fn import_json(&self, json: &str) {
		let snapshot = match GraphSnapshot::from_json(json) {
			Ok(snapshot) => snapshot,
			Err(err) => {
				self.ui.banner.set(Some(format!("Import failed: {err}")));
				return;
			}
		};
		self.replace(snapshot.clone());
		let editor = self.clone();
		spawn_local(async move {
			if let Err(err) = editor.store.save_graph(&snapshot).await {
				editor.ui.banner.set(Some(err.to_string()));
			}
		});
	}
}

/// Copyable handle to the editor for view closures and event handlers.
struct EditorHandle<S>(StoredValue<Editor<S>, LocalStorage>);

impl<S> Clone for EditorHandle<S> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<S> Copy for EditorHandle<S> {}

impl<S: GraphStore + 'static> EditorHandle<S> {
	fn with<U>(self, f: impl FnOnce(&Editor<S>) -> U) -> U {
		self.0.with_value(f)
	}

	fn try_with<U>(self, f: impl FnOnce(&Editor<S>) -> U) -> Option<U> {
		self.0.try_with_value(f)
	}

	fn run(self, f: impl FnOnce(&mut EditorState) -> Vec<EditorAction>) {
		self.0.with_value(|e| e.apply(f));
	}

	fn update(self, f: impl FnOnce(&mut EditorState)) {
		self.run(|s| {
			f(s);
			Vec::new()
		});
	}
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// Navigation-graph editor: canvas, toolbar, inspector and panorama preview.
#[component]
pub fn GraphEditor<S>(
	store: Rc<S>,
	/// Media library offered when binding a panorama to a node.
	#[prop(into)]
	media: Signal<Vec<MediaAsset>>,
) -> impl IntoView
where
	S: GraphStore + 'static,
{
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let ui = EditorUi::new();
	let editor = Editor {
		state: Rc::new(RefCell::new(None)),
		store,
		writes: Rc::new(WriteQueue::default()),
		ui,
		size: Rc::new(Cell::new((800.0, 600.0))),
		floorplan: Rc::new(RefCell::new(None)),
		floorplan_onload: Rc::new(RefCell::new(None)),
	};
	editor.load();
	let editor = EditorHandle(StoredValue::new_local(editor));

	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = parent_size(&canvas);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		editor.with(|e| e.resize(w, h, true));

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("Canvas 2d context unavailable");
			return;
		};

		let canvas_resize = canvas.clone();
		*resize_cb.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = parent_size(&canvas_resize);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			editor.try_with(|e| e.resize(nw, nh, false));
		}));
		if let Some(ref cb) = *resize_cb.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let animate_inner = animate.clone();
		*animate.borrow_mut() = Some(Closure::new(move || {
			if editor.try_with(|e| e.frame(&ctx, js_sys::Date::now())).is_none() {
				return;
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window().map(|w: Window| w.request_animation_frame(cb.as_ref().unchecked_ref()));
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(canvas) = canvas_ref.get() {
			let _ = canvas.focus();
		}
		let button = PointerButton::from_dom(ev.button());
		editor.run(move |s| s.pointer_down(x, y, button));
	};
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		editor.update(move |s| s.pointer_move(x, y));
	};
	let on_mouseup = move |_: MouseEvent| {
		editor.update(move |s| s.pointer_up());
	};
	let on_mouseleave = move |_: MouseEvent| {
		editor.update(move |s| s.pointer_leave());
	};
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let delta = ev.delta_y();
		editor.update(move |s| s.wheel(x, y, delta));
	};
	let on_keydown = move |ev: KeyboardEvent| {
		let key = ev.key();
		if matches!(key.as_str(), "Delete" | "Backspace") || (ev.ctrl_key() && key.eq_ignore_ascii_case("d")) {
			ev.prevent_default();
		}
		let ctrl = ev.ctrl_key() || ev.meta_key();
		editor.run(move |s| s.key_down(&key, ctrl));
	};

	let json_text = RwSignal::new(String::new());
	let area_name = RwSignal::new(String::new());
	let area_category = RwSignal::new(category::ROOM.to_owned());
	let area_description = RwSignal::new(String::new());
	let floorplan_url = RwSignal::new(String::new());
	let floorplan_width = RwSignal::new(1000.0);
	let floorplan_height = RwSignal::new(800.0);
	let floorplan_scale = RwSignal::new(1.0);

	let toolbar = move || {
		Tool::ALL
			.into_iter()
			.map(|tool| {
				view! {
					<button
						class:active=move || ui.tool.get() == tool
						title=format!("{} ({})", tool.label(), tool.shortcut())
						on:click=move |_| editor.run(move |s| s.set_tool(tool))
					>
						{tool.label()}
					</button>
				}
			})
			.collect_view()
	};

	let context_menu = move || {
		ui.menu.get().map(|menu| {
			let items = menu
				.items
				.iter()
				.map(|&command| {
					view! {
						<li on:click=move |_| editor.run(move |s| s.run_menu_command(command))>
							{command.label()}
						</li>
					}
				})
				.collect_view();
			view! {
				<ul class="context-menu" style=format!("position: absolute; left: {}px; top: {}px;", menu.x, menu.y)>
					{items}
				</ul>
			}
		})
	};

	let inspector = move || match ui.inspector.get() {
		Inspector::Empty => view! { <p class="hint">"Nothing selected"</p> }.into_any(),
		Inspector::Node {
			id,
			label,
			x,
			y,
			rotation,
			pitch,
			fov,
			locked,
			panorama,
		} => {
			let (id_label, id_rot, id_rot_commit, id_fov, id_lock, id_pano) =
				(id.clone(), id.clone(), id.clone(), id.clone(), id.clone(), id.clone());
			view! {
				<h3>"Node"</h3>
				<label>
					"Label"
					<input
						type="text"
						prop:value=label
						on:input=move |ev| {
							let value = event_target_value(&ev);
							let id = id_label.clone();
							editor.update(move |s| {
								s.edit_label(&id, &value, js_sys::Date::now());
							});
						}
					/>
				</label>
				<p>{format!("Position ({x:.0}, {y:.0})")}</p>
				<label>
					{format!("Rotation {rotation:.0}°")}
					<input
						type="range"
						min="0"
						max="359"
						prop:value=rotation.to_string()
						on:input=move |ev| {
							let Ok(yaw) = event_target_value(&ev).parse::<f64>() else {
								return;
							};
							let id = id_rot.clone();
							editor.update(move |s| {
								s.set_node_orientation(&id, yaw, pitch, false);
							});
						}
						on:change=move |ev| {
							let Ok(yaw) = event_target_value(&ev).parse::<f64>() else {
								return;
							};
							let id = id_rot_commit.clone();
							editor.update(move |s| {
								s.set_node_orientation(&id, yaw, pitch, true);
							});
						}
					/>
				</label>
				<p>{format!("Pitch {pitch:.0}°")}</p>
				<label>
					{format!("Field of view {fov:.0}°")}
					<input
						type="range"
						min=MIN_FOV_DEG.to_string()
						max=MAX_FOV_DEG.to_string()
						prop:value=fov.to_string()
						on:input=move |ev| {
							let Ok(fov) = event_target_value(&ev).parse::<f64>() else {
								return;
							};
							let id = id_fov.clone();
							editor.update(move |s| {
								s.model.set_node_fov(&id, fov);
							});
						}
					/>
				</label>
				<p>{format!("Panorama: {}", panorama.unwrap_or_else(|| "none".into()))}</p>
				<div class="actions">
					<button on:click=move |_| {
						let id = id_lock.clone();
						editor.update(move |s| {
							s.toggle_lock(&id);
						});
					}>{if locked { "Unlock" } else { "Lock" }}</button>
					<button on:click=move |_| {
						editor.update(|s| {
							s.duplicate_selected();
						});
					}>"Duplicate"</button>
					<button on:click=move |_| ui.picker.set(Some(id_pano.clone()))>"Set panorama"</button>
					<button on:click=move |_| ui.viewer_open.set(true)>"View panorama"</button>
					<button class="danger" on:click=move |_| {
						editor.update(|s| {
							s.delete_selection();
						});
					}>"Delete"</button>
				</div>
			}
				.into_any()
		}
		Inspector::Connection {
			from,
			to,
			distance,
			bidirectional,
			..
		} => view! {
			<h3>"Connection"</h3>
			<p>{format!("{from} {} {to}", if bidirectional { "↔" } else { "→" })}</p>
			<p>{format!("Distance {distance:.1}")}</p>
			<button class="danger" on:click=move |_| {
				editor.update(|s| {
					s.delete_selection();
				});
			}>"Delete"</button>
		}
			.into_any(),
		Inspector::Area {
			id,
			name,
			category: current_category,
			vertices,
			start,
			gallery,
		} => {
			let (id_name, id_category, id_start) = (id.clone(), id.clone(), id.clone());
			let options = category::ALL
				.iter()
				.map(|&c| view! { <option value=c selected=c == current_category>{c}</option> })
				.collect_view();
			view! {
				<h3>"Area"</h3>
				<label>
					"Name"
					<input
						type="text"
						prop:value=name
						on:change=move |ev| {
							let value = event_target_value(&ev);
							let id = id_name.clone();
							editor.update(move |s| {
								let patch = AreaPatch {
									name: Some(value),
									..Default::default()
								};
								s.model.update_area(&id, patch, false);
							});
						}
					/>
				</label>
				<label>
					"Category"
					<select on:change=move |ev| {
						let value = event_target_value(&ev);
						let id = id_category.clone();
						editor.update(move |s| {
							let patch = AreaPatch {
								category: Some(value),
								..Default::default()
							};
							s.model.update_area(&id, patch, false);
							s.request_redraw();
						});
					}>{options}</select>
				</label>
				<p>{format!("{vertices} vertices, {gallery} gallery items")}</p>
				<p>
					{format!("Start node: {}", start.clone().unwrap_or_else(|| "none".into()))}
					<Show when=move || start.is_some()>
						<button on:click={
							let id = id_start.clone();
							move |_| {
								let id = id.clone();
								editor.update(move |s| {
									s.model.set_area_start_node(&id, None);
								});
							}
						}>"Clear"</button>
					</Show>
				</p>
				<p class="hint">"Right-click a node to use it as the start node."</p>
				<button class="danger" on:click=move |_| {
					editor.update(|s| {
						s.delete_selection();
					});
				}>"Delete"</button>
			}
				.into_any()
		}
	};

	let panorama_picker = move || {
		ui.picker.get().map(|node_id| {
			let assets = media
				.get()
				.into_iter()
				.filter(|a| a.is_panorama())
				.map(|asset| {
					let (node_id, caption) = (node_id.clone(), asset.asset_id.clone());
					view! {
						<li on:click=move |_| {
							let (node_id, asset) = (node_id.clone(), asset.clone());
							ui.picker.set(None);
							editor.update(move |s| {
								if let Err(err) = s.assign_panorama(&node_id, &asset) {
									ui.banner.set(Some(err.to_string()));
								}
							});
						}>{caption}</li>
					}
				})
				.collect_view();
			view! {
				<div class="dialog">
					<h3>"Choose a panorama"</h3>
					<ul class="media-list">{assets}</ul>
					<button on:click=move |_| ui.picker.set(None)>"Cancel"</button>
				</div>
			}
		})
	};

	let area_panel = move || {
		view! {
			<Show when=move || ui.area_panel.get()>
				<div class="dialog">
					<h3>"New area"</h3>
					<input
						type="text"
						placeholder="Name"
						prop:value=move || area_name.get()
						on:input=move |ev| area_name.set(event_target_value(&ev))
					/>
					<select on:change=move |ev| area_category.set(event_target_value(&ev))>
						{category::ALL.iter().map(|&c| view! { <option value=c>{c}</option> }).collect_view()}
					</select>
					<textarea
						placeholder="Description"
						prop:value=move || area_description.get()
						on:input=move |ev| area_description.set(event_target_value(&ev))
					/>
					<button on:click=move |_| {
						let (name, cat, description) = (
							area_name.get_untracked(),
							area_category.get_untracked(),
							area_description.get_untracked(),
						);
						editor.update(move |s| {
							match s.finish_area(&name, &cat, &description) {
								Ok(_) => {
									area_name.set(String::new());
									area_description.set(String::new());
								}
								Err(err) => ui.banner.set(Some(err.to_string())),
							}
						});
					}>"Create area"</button>
					<button on:click=move |_| {
						editor.update(|s| {
							s.resume_area_drawing();
						});
					}>"Keep drawing"</button>
				</div>
			</Show>
		}
	};

	let discard_dialog = move || {
		ui.confirm_discard.get().map(|next| {
			view! {
				<div class="dialog">
					<p>"Discard the area you are drawing?"</p>
					<button on:click=move |_| {
						ui.confirm_discard.set(None);
						editor.update(move |s| {
							s.confirm_discard(next);
						});
					}>"Discard"</button>
					<button on:click=move |_| ui.confirm_discard.set(None)>"Keep"</button>
				</div>
			}
		})
	};

	view! {
		<div class="graph-editor">
			<div class="toolbar">
				{toolbar}
				<span class="separator" />
				<button on:click=move |_| {
					editor.update(|s| {
						s.reset_view();
					});
				}>"Fit"</button>
				<button on:click=move |_| {
					editor.update(|s| {
						s.apply_auto_layout();
					});
				}>"Auto layout"</button>
				<button on:click=move |_| {
					editor.update(|s| {
						s.clear_route();
					});
				}>"Clear route"</button>
				<label>
					<input
						type="checkbox"
						prop:checked=move || ui.snap.get()
						on:change=move |ev| {
							let on = event_target_checked(&ev);
							editor.update(move |s| {
								let mut settings = s.model.settings().clone();
								settings.snap_to_grid = on;
								s.model.set_settings(settings);
							});
						}
					/>
					"Snap"
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || ui.grid.get()
						on:change=move |ev| {
							let on = event_target_checked(&ev);
							editor.update(move |s| {
								let mut settings = s.model.settings().clone();
								settings.show_grid = on;
								s.model.set_settings(settings);
								s.request_redraw();
							});
						}
					/>
					"Grid"
				</label>
				<label>
					"Floorplan"
					<input
						type="range"
						min="0"
						max="1"
						step="0.05"
						prop:value=move || ui.opacity.get().to_string()
						on:input=move |ev| {
							let Ok(opacity) = event_target_value(&ev).parse::<f64>() else {
								return;
							};
							editor.update(move |s| {
								let mut settings = s.model.settings().clone();
								settings.floorplan_opacity = opacity;
								s.model.set_settings(settings);
								s.request_redraw();
							});
						}
					/>
				</label>
				<span class="status">{move || ui.status.get()}</span>
			</div>

			{move || {
				ui.banner
					.get()
					.map(|message| {
						view! {
							<div class="error-banner">
								<span>{message}</span>
								<button on:click=move |_| ui.banner.set(None)>"Dismiss"</button>
							</div>
						}
					})
			}}

			<div class="editor-body">
				<div class="canvas-host" style="position: relative;">
					<canvas
						node_ref=canvas_ref
						tabindex="0"
						on:mousedown=on_mousedown
						on:mousemove=on_mousemove
						on:mouseup=on_mouseup
						on:mouseleave=on_mouseleave
						on:wheel=on_wheel
						on:keydown=on_keydown
						on:contextmenu=|ev: MouseEvent| ev.prevent_default()
						style=move || format!("display: block; cursor: {};", ui.tool.get().cursor())
					/>
					{context_menu}
					<Show when=move || !ui.ready.get()>
						<div class="loading">"Loading graph…"</div>
					</Show>
					<Show when=move || ui.tool.get() == Tool::DrawArea>
						<div class="hint overlay">
							{move || format!(
								"{} vertices. Click the first vertex to close the area.",
								ui.draft_vertices.get(),
							)}
						</div>
					</Show>
				</div>

				<aside class="inspector">
					{inspector}
					<h3>"Graph"</h3>
					{move || {
						let stats = ui.stats.get();
						view! {
							<ul class="stats">
								<li>{format!("{} nodes, {} connections", stats.node_count, stats.connection_count)}</li>
								<li>{format!("{} components, {} isolated", stats.components, stats.isolated_nodes)}</li>
								<li>{format!("average degree {:.2}, max {}", stats.average_degree, stats.max_degree)}</li>
								<li>{format!("{} with panorama", stats.with_panorama)}</li>
							</ul>
						}
					}}
					{move || ui.route_m.get().map(|metres| view! { <p class="route">{format!("Route: {metres:.1} m")}</p> })}
					<h3>"Floorplan"</h3>
					<input
						type="text"
						placeholder="Image URL"
						prop:value=move || floorplan_url.get()
						on:input=move |ev| floorplan_url.set(event_target_value(&ev))
					/>
					<input
						type="number"
						prop:value=move || floorplan_width.get().to_string()
						on:input=move |ev| {
							if let Ok(v) = event_target_value(&ev).parse() {
								floorplan_width.set(v);
							}
						}
					/>
					<input
						type="number"
						prop:value=move || floorplan_height.get().to_string()
						on:input=move |ev| {
							if let Ok(v) = event_target_value(&ev).parse() {
								floorplan_height.set(v);
							}
						}
					/>
					<label>
						"Metres per unit"
						<input
							type="number"
							step="0.01"
							prop:value=move || floorplan_scale.get().to_string()
							on:input=move |ev| {
								if let Ok(v) = event_target_value(&ev).parse::<f64>() {
									floorplan_scale.set(v);
								}
							}
						/>
					</label>
					<button on:click=move |_| {
						let url = Some(floorplan_url.get_untracked()).filter(|u| !u.trim().is_empty());
						let scale = Some(floorplan_scale.get_untracked()).filter(|v| *v > 0.0).unwrap_or(1.0);
						let floorplan = Floorplan {
							image_ref: url.clone(),
							scale,
							bounds: FloorplanBounds::from_extents(
								0.0,
								0.0,
								floorplan_width.get_untracked(),
								floorplan_height.get_untracked(),
							),
						};
						editor.update(|s| {
							s.model.set_floorplan(floorplan);
							s.reset_view();
						});
						editor.with(|e| e.load_floorplan(url.as_deref()));
					}>"Apply floorplan"</button>
					<h3>"Import / export"</h3>
					<textarea
						class="json"
						prop:value=move || json_text.get()
						on:input=move |ev| json_text.set(event_target_value(&ev))
					/>
					<button on:click=move |_| {
						if let Some(json) = editor.with(|e| e.export_json()) {
							json_text.set(json);
						}
					}>"Export"</button>
					<button on:click=move |_| {
						let json = json_text.get_untracked();
						editor.with(|e| e.import_json(&json));
					}>"Import"</button>
				</aside>
			</div>

			{panorama_picker}
			{area_panel}
			{discard_dialog}

			<Show when=move || ui.viewer_open.get() && ui.viewer_node.get().is_some()>
				<div class="panorama-panel">
					<button class="close" on:click=move |_| ui.viewer_open.set(false)>"×"</button>
					<PanoramaViewer
						node_id=ui.viewer_node
						image_url=ui.viewer_url
						angles=ui.viewer_angles
						hfov=ui.viewer_fov
						neighbors=ui.viewer_neighbors
						on_rotate=move |angles: ViewAngles, committed: bool| {
							editor.update(move |s| {
								if let Some(id) = s.selected_node_id().cloned() {
									s.set_node_orientation(&id, angles.yaw, angles.pitch, committed);
								}
							});
						}
						on_navigate=move |id: NodeId| {
							editor.update(move |s| {
								s.select(Selection::Node(id));
							});
						}
					/>
				</div>
			</Show>
		</div>
	}
}
