use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData, MouseEvent};

use super::projection::{
	DEFAULT_HFOV_DEG, EquirectImage, Hotspot, Neighbor, ViewAngles, hotspot_at, project_hotspots, render_view,
};
use super::sync::{RotationOrigin, RotationSync};
use crate::components::graph_editor::NodeId;

const HOTSPOT_RADIUS_PX: f64 = 14.0;

#[derive(Clone, Copy, Debug)]
struct DragStart {
	x: f64,
	y: f64,
	angles: ViewAngles,
	moved: bool,
}

struct ViewerState {
	ctx: Option<CanvasRenderingContext2d>,
	sync: RotationSync,
	image: Option<EquirectImage>,
	loading: Option<HtmlImageElement>,
	neighbors: Vec<Neighbor>,
	hotspots: Vec<Hotspot>,
	drag: Option<DragStart>,
	width: f64,
	height: f64,
	hfov: f64,
}

impl ViewerState {
	fn draw(&mut self) {
		let Some(ctx) = self.ctx.clone() else {
			return;
		};
		let view = self.sync.current();
		let (w, h) = (self.width, self.height);

		match &self.image {
			Some(image) => {
				let pixels = render_view(image, view, w as u32, h as u32, self.hfov);
				match ImageData::new_with_u8_clamped_array_and_sh(Clamped(&pixels), w as u32, h as u32) {
					Ok(data) => {
						let _ = ctx.put_image_data(&data, 0.0, 0.0);
					}
					Err(err) => warn!("Dropped panorama frame: {err:?}"),
				}
			}
			None => {
				ctx.set_fill_style_str("#111827");
				ctx.fill_rect(0.0, 0.0, w, h);
				ctx.set_fill_style_str("#9ca3af");
				ctx.set_font("14px sans-serif");
				let _ = ctx.fill_text("No panorama loaded", 16.0, h / 2.0);
			}
		}

		self.hotspots = project_hotspots(&self.neighbors, view, w, h, self.hfov);
		for spot in &self.hotspots {
			ctx.begin_path();
			let _ = ctx.arc(spot.x, spot.y, HOTSPOT_RADIUS_PX, 0.0, std::f64::consts::TAU);
			ctx.set_fill_style_str("rgba(59, 130, 246, 0.6)");
			ctx.fill();
			ctx.set_stroke_style_str("#ffffff");
			ctx.set_line_width(2.0);
			ctx.stroke();
			ctx.set_fill_style_str("#ffffff");
			ctx.set_font("12px sans-serif");
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&spot.label, spot.x, spot.y + HOTSPOT_RADIUS_PX + 14.0);
			ctx.set_text_align("start");
		}

		ctx.set_fill_style_str("rgba(0, 0, 0, 0.5)");
		ctx.fill_rect(0.0, h - 24.0, 150.0, 24.0);
		ctx.set_fill_style_str("#ffffff");
		ctx.set_font("12px monospace");
		let _ = ctx.fill_text(&format!("yaw {:>5.1}  pitch {:>5.1}", view.yaw, view.pitch), 8.0, h - 8.0);
	}
}

/// Runs at most one redraw per animation frame; a new request replaces a
/// pending one.
struct FrameScheduler {
	pending: Cell<Option<i32>>,
	callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl FrameScheduler {
	fn request(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(handle) = self.pending.take() {
			let _ = window.cancel_animation_frame(handle);
		}
		if let Some(ref cb) = *self.callback.borrow() {
			self.pending.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	}
}

fn decode_image(image: &HtmlImageElement) -> Result<EquirectImage, JsValue> {
	let (w, h) = (image.natural_width(), image.natural_height());
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
	canvas.set_width(w);
	canvas.set_height(h);
	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")?
		.ok_or_else(|| JsValue::from_str("2d context unavailable"))?
		.dyn_into()?;
	ctx.draw_image_with_html_image_element(image, 0.0, 0.0)?;
	let data = ctx.get_image_data(0.0, 0.0, w as f64, h as f64)?;
	EquirectImage::new(w, h, data.data().0).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
}

/// Equirectangular viewer for one node with clickable neighbour hotspots.
///
/// `angles` is the stored orientation written by other controls. Drags are
/// reported through `on_rotate(angles, committed)`; the echo that comes back
/// through `angles` is absorbed by [`RotationSync`]. Changing `node_id`
/// re-seeds the view from `angles`.
#[component]
pub fn PanoramaViewer(
	#[prop(into)] node_id: Signal<Option<NodeId>>,
	#[prop(into)] image_url: Signal<Option<String>>,
	#[prop(into)] angles: Signal<ViewAngles>,
	#[prop(into)] neighbors: Signal<Vec<Neighbor>>,
	/// Horizontal field of view in degrees.
	#[prop(into, default = Signal::stored(DEFAULT_HFOV_DEG))]
	hfov: Signal<f64>,
	on_rotate: impl Fn(ViewAngles, bool) + 'static,
	on_navigate: impl Fn(NodeId) + 'static,
	#[prop(default = 640.0)] width: f64,
	#[prop(default = 360.0)] height: f64,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let viewer = Rc::new(RefCell::new(ViewerState {
		ctx: None,
		sync: RotationSync::new(angles.get_untracked()),
		image: None,
		loading: None,
		neighbors: Vec::new(),
		hotspots: Vec::new(),
		drag: None,
		width,
		height,
		hfov: hfov.get_untracked(),
	}));
	let frames = Rc::new(FrameScheduler {
		pending: Cell::new(None),
		callback: RefCell::new(None),
	});
	let onload: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let on_rotate = Rc::new(on_rotate);

	let (viewer_frame, frames_frame) = (viewer.clone(), frames.clone());
	*frames.callback.borrow_mut() = Some(Closure::new(move || {
		frames_frame.pending.set(None);
		viewer_frame.borrow_mut().draw();
	}));

	let (viewer_init, frames_init) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
		let ctx = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
		viewer_init.borrow_mut().ctx = ctx;
		frames_init.request();
	});

	let (viewer_img, frames_img) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		let url = image_url.get();
		let mut v = viewer_img.borrow_mut();
		if let Some(previous) = v.loading.take() {
			previous.set_onload(None);
		}
		v.image = None;
		frames_img.request();
		let Some(url) = url else {
			return;
		};
		let Ok(image) = HtmlImageElement::new() else {
			return;
		};
		image.set_cross_origin(Some("anonymous"));

		let (viewer_load, frames_load, loaded) = (viewer_img.clone(), frames_img.clone(), image.clone());
		*onload.borrow_mut() = Some(Closure::new(move || match decode_image(&loaded) {
			Ok(decoded) => {
				debug!("Panorama decoded: {}x{}", decoded.width(), decoded.height());
				viewer_load.borrow_mut().image = Some(decoded);
				frames_load.request();
			}
			Err(err) => warn!("Could not decode panorama: {err:?}"),
		}));
		if let Some(ref cb) = *onload.borrow() {
			image.set_onload(Some(cb.as_ref().unchecked_ref()));
		}
		image.set_src(&url);
		v.loading = Some(image);
	});

	let (viewer_fov, frames_fov) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		viewer_fov.borrow_mut().hfov = hfov.get();
		frames_fov.request();
	});

	let (viewer_seed, frames_seed) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		let id = node_id.get();
		debug!("Panorama viewer on {id:?}");
		viewer_seed.borrow_mut().sync.reseed(angles.get_untracked());
		frames_seed.request();
	});

	let (viewer_ext, frames_ext) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		let next = angles.get();
		let accepted = viewer_ext
			.borrow_mut()
			.sync
			.apply(next, RotationOrigin::Programmatic, js_sys::Date::now());
		if accepted {
			frames_ext.request();
		}
	});

	let (viewer_nb, frames_nb) = (viewer.clone(), frames.clone());
	Effect::new(move |_| {
		viewer_nb.borrow_mut().neighbors = neighbors.get();
		frames_nb.request();
	});

	let viewer_md = viewer.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut v = viewer_md.borrow_mut();
		let angles = v.sync.current();
		v.drag = Some(DragStart {
			x,
			y,
			angles,
			moved: false,
		});
	};

	let (viewer_mm, frames_mm, rotate_mm) = (viewer.clone(), frames.clone(), on_rotate.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let next = {
			let mut guard = viewer_mm.borrow_mut();
			let v = &mut *guard;
			let (width, hfov) = (v.width, v.hfov);
			let Some(drag) = v.drag.as_mut() else {
				return;
			};
			if x == drag.x && y == drag.y {
				return;
			}
			drag.moved = true;
			let next = drag.angles.dragged(x - drag.x, y - drag.y, width, hfov);
			v.sync.apply(next, RotationOrigin::User, js_sys::Date::now());
			next
		};
		frames_mm.request();
		rotate_mm(next, false);
	};

	let end_drag = {
		let (viewer_up, rotate_up) = (viewer.clone(), on_rotate.clone());
		Rc::new(move |click: Option<(f64, f64)>| {
			let (drag, current, target) = {
				let mut v = viewer_up.borrow_mut();
				let Some(drag) = v.drag.take() else {
					return;
				};
				let target = click
					.filter(|_| !drag.moved)
					.and_then(|(x, y)| hotspot_at(&v.hotspots, x, y))
					.map(|h| h.node_id.clone());
				(drag, v.sync.current(), target)
			};
			if drag.moved {
				rotate_up(current, true);
			} else if let Some(id) = target {
				on_navigate(id);
			}
		})
	};

	let end_up = end_drag.clone();
	let on_mouseup = move |ev: MouseEvent| {
		end_up(pointer(canvas_ref, &ev));
	};
	let on_mouseleave = move |_: MouseEvent| {
		end_drag(None);
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="panorama-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			style="display: block; cursor: grab;"
		/>
	}
}
