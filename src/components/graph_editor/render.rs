use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::geometry::{ViewTransform, polygon_centroid};
use super::state::{CLOSE_POLYGON_PX, EditorState, HitTarget, Selection};
use super::types::{Area, GraphNode, NodeId, Point, category};

pub const NODE_RADIUS_PX: f64 = 8.0;
const GRID_MIN_SPACING_PX: f64 = 6.0;
const LOCK_BADGE_PX: f64 = 3.5;

/// Fill, stroke and size of a node for the current interaction state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
	pub fill: &'static str,
	pub stroke: Option<&'static str>,
	pub radius_px: f64,
	pub lock_badge: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NodeFlags {
	pub selected: bool,
	pub connecting_from: bool,
	pub connect_target: bool,
	pub hovered: bool,
}

pub fn node_style(node: &GraphNode, flags: NodeFlags) -> NodeStyle {
	let base = if node.has_panorama() { "#2bb3a3" } else { "#8a94a6" };
	let (fill, stroke, radius_px) = if flags.connecting_from {
		("#f59e0b", Some("#ffffff"), NODE_RADIUS_PX * 1.25)
	} else if flags.connect_target {
		("#22c55e", Some("#ffffff"), NODE_RADIUS_PX * 1.25)
	} else if flags.selected {
		("#3b82f6", Some("#ffffff"), NODE_RADIUS_PX * 1.25)
	} else if flags.hovered {
		(base, Some("#e2e8f0"), NODE_RADIUS_PX * 1.1)
	} else {
		(base, None, NODE_RADIUS_PX)
	};
	NodeStyle {
		fill,
		stroke,
		radius_px,
		lock_badge: node.locked,
	}
}

/// `(fill, stroke)` for an area category. Unknown categories share one colour.
pub fn area_colors(category: &str) -> (&'static str, &'static str) {
	match category {
		category::ROOM => ("rgba(59, 130, 246, 0.18)", "#3b82f6"),
		category::HALL => ("rgba(168, 85, 247, 0.18)", "#a855f7"),
		category::EXHIBIT => ("rgba(234, 179, 8, 0.2)", "#ca8a04"),
		category::SERVICE => ("rgba(239, 68, 68, 0.16)", "#ef4444"),
		category::OUTDOOR => ("rgba(34, 197, 94, 0.18)", "#16a34a"),
		_ => ("rgba(148, 163, 184, 0.2)", "#64748b"),
	}
}

/// World coordinates of the grid lines visible through `transform`.
pub fn grid_lines(transform: &ViewTransform, width: f64, height: f64, grid_size: f64) -> (Vec<f64>, Vec<f64>) {
	if grid_size <= 0.0 || grid_size * transform.k < GRID_MIN_SPACING_PX {
		return (Vec::new(), Vec::new());
	}
	let top_left = transform.screen_to_world(0.0, 0.0);
	let bottom_right = transform.screen_to_world(width, height);
	let lines = |from: f64, to: f64| {
		let first = (from / grid_size).ceil() as i64;
		let last = (to / grid_size).floor() as i64;
		(first..=last).map(|i| i as f64 * grid_size).collect::<Vec<_>>()
	};
	(lines(top_left.x, bottom_right.x), lines(top_left.y, bottom_right.y))
}

fn dashed(ctx: &CanvasRenderingContext2d, dash: f64, gap: f64) {
	let _ = ctx.set_line_dash(&js_sys::Array::of2(&JsValue::from_f64(dash), &JsValue::from_f64(gap)));
}

fn solid(ctx: &CanvasRenderingContext2d) {
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn trace_polygon(ctx: &CanvasRenderingContext2d, points: &[Point]) {
	ctx.begin_path();
	for (i, p) in points.iter().enumerate() {
		if i == 0 {
			ctx.move_to(p.x, p.y);
		} else {
			ctx.line_to(p.x, p.y);
		}
	}
	ctx.close_path();
}

/// Draw one frame. Reads `state`, never mutates it.
pub fn render(state: &EditorState, ctx: &CanvasRenderingContext2d, floorplan_image: Option<&HtmlImageElement>) {
	ctx.set_fill_style_str("#f8fafc");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_floorplan(state, ctx, floorplan_image);
	draw_grid(state, ctx);
	draw_connections(state, ctx);
	draw_areas(state, ctx);
	draw_previews(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_floorplan(state: &EditorState, ctx: &CanvasRenderingContext2d, image: Option<&HtmlImageElement>) {
	let (Some(floorplan), Some(image)) = (state.model.floorplan(), image) else {
		return;
	};
	if !image.complete() || image.natural_width() == 0 {
		return;
	}
	let b = floorplan.bounds;
	ctx.set_global_alpha(state.model.settings().floorplan_opacity.clamp(0.0, 1.0));
	let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(image, b.min_x, b.min_y, b.width, b.height);
	ctx.set_global_alpha(1.0);
}

fn draw_grid(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let settings = state.model.settings();
	if !settings.show_grid {
		return;
	}
	let (xs, ys) = grid_lines(&state.transform, state.width, state.height, settings.grid_size);
	let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) = (xs.first(), xs.last(), ys.first(), ys.last()) else {
		return;
	};
	ctx.set_stroke_style_str("rgba(148, 163, 184, 0.25)");
	ctx.set_line_width(1.0 / state.transform.k);
	ctx.begin_path();
	for x in &xs {
		ctx.move_to(*x, y0 - settings.grid_size);
		ctx.line_to(*x, y1 + settings.grid_size);
	}
	for y in &ys {
		ctx.move_to(x0 - settings.grid_size, *y);
		ctx.line_to(x1 + settings.grid_size, *y);
	}
	ctx.stroke();
}

fn draw_connections(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (radius, arrow_size) = (NODE_RADIUS_PX / k, 8.0 / k);

	for connection in state.model.connections() {
		let (Some(a), Some(b)) = (
			state.model.node(&connection.from_node_id),
			state.model.node(&connection.to_node_id),
		) else {
			continue;
		};
		let (p1, p2) = (a.position.xy(), b.position.xy());
		let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
		let dist = dx.hypot(dy);
		if dist < 0.001 {
			continue;
		}

		let selected = state.selection() == &Selection::Connection(connection.id.clone());
		let hovered = state.is_hovered(&HitTarget::Connection(connection.id.clone()));
		let (color, width) = if selected {
			("#3b82f6", 3.0 / k)
		} else if hovered {
			("#60a5fa", 2.5 / k)
		} else {
			("#94a3b8", 1.5 / k)
		};
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(p1.x, p1.y);
		ctx.line_to(p2.x, p2.y);
		ctx.stroke();

		if !connection.bidirectional {
			let (ux, uy) = (dx / dist, dy / dist);
			let (tip_x, tip_y) = (p2.x - ux * radius, p2.y - uy * radius);
			let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
			let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
			ctx.set_fill_style_str(color);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	}
}

fn draw_areas(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for area in state.model.areas() {
		if area.boundary.len() < 3 {
			continue;
		}
		let selected = state.selected_area_id() == Some(&area.id);
		let emphasised = selected
			|| state.is_hovered(&HitTarget::Area(area.id.clone()))
			|| state.is_dragging_area(&area.id);
		let (fill, stroke) = area_colors(&area.category);

		trace_polygon(ctx, &area.boundary);
		ctx.set_fill_style_str(fill);
		ctx.fill();
		ctx.set_stroke_style_str(if emphasised { "#0f172a" } else { stroke });
		ctx.set_line_width(if emphasised { 2.5 / k } else { 1.5 / k });
		ctx.stroke();

		if selected {
			draw_vertex_handles(state, ctx, area);
		}
		if let Some(c) = polygon_centroid(&area.boundary) {
			ctx.set_fill_style_str("#0f172a");
			ctx.set_font(&format!("{}px sans-serif", 12.0 / k));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&area.name, c.x, c.y);
			ctx.set_text_align("start");
		}
	}
}

fn draw_vertex_handles(state: &EditorState, ctx: &CanvasRenderingContext2d, area: &Area) {
	let k = state.transform.k;
	let size = 8.0 / k;
	for (index, v) in area.boundary.iter().enumerate() {
		let hovered = state.is_hovered(&HitTarget::AreaVertex {
			area_id: area.id.clone(),
			index,
		});
		ctx.set_fill_style_str(if hovered { "#3b82f6" } else { "#ffffff" });
		ctx.fill_rect(v.x - size / 2.0, v.y - size / 2.0, size, size);
		ctx.set_stroke_style_str("#0f172a");
		ctx.set_line_width(1.0 / k);
		ctx.stroke_rect(v.x - size / 2.0, v.y - size / 2.0, size, size);
	}
}

fn draw_previews(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let pointer = state.hover.world;

	if let Some(path) = &state.path_preview {
		let points: Vec<Point> = path
			.iter()
			.filter_map(|id| state.model.node(id))
			.map(|n| n.position.xy())
			.collect();
		ctx.set_stroke_style_str("rgba(249, 115, 22, 0.8)");
		ctx.set_line_width(6.0 / k);
		ctx.set_line_cap("round");
		ctx.begin_path();
		for (i, p) in points.iter().enumerate() {
			if i == 0 {
				ctx.move_to(p.x, p.y);
			} else {
				ctx.line_to(p.x, p.y);
			}
		}
		ctx.stroke();
		ctx.set_line_cap("butt");
	}

	if let Some(from) = state.connecting_from.as_ref().and_then(|id| state.model.node(id)) {
		let start = from.position.xy();
		let end = state
			.connect_target()
			.and_then(|id| state.model.node(id))
			.map_or(pointer, |n| n.position.xy());
		ctx.set_stroke_style_str("#f59e0b");
		ctx.set_line_width(2.0 / k);
		dashed(ctx, 6.0 / k, 4.0 / k);
		ctx.begin_path();
		ctx.move_to(start.x, start.y);
		ctx.line_to(end.x, end.y);
		ctx.stroke();
		solid(ctx);
	}

	let vertices = &state.drawing.vertices;
	let Some(first) = vertices.first() else {
		return;
	};
	ctx.set_stroke_style_str("#0ea5e9");
	ctx.set_line_width(2.0 / k);
	ctx.begin_path();
	ctx.move_to(first.x, first.y);
	for v in &vertices[1..] {
		ctx.line_to(v.x, v.y);
	}
	if !state.drawing.awaiting_details {
		ctx.line_to(pointer.x, pointer.y);
	} else {
		ctx.close_path();
	}
	ctx.stroke();

	ctx.set_fill_style_str("#0ea5e9");
	for v in vertices {
		ctx.begin_path();
		let _ = ctx.arc(v.x, v.y, 4.0 / k, 0.0, 2.0 * PI);
		ctx.fill();
	}

	if state.is_near_first_vertex(pointer) {
		dashed(ctx, 4.0 / k, 3.0 / k);
		ctx.begin_path();
		let _ = ctx.arc(first.x, first.y, CLOSE_POLYGON_PX / k, 0.0, 2.0 * PI);
		ctx.stroke();
		solid(ctx);
	}
}

fn draw_nodes(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let show_labels = state.model.settings().show_labels;
	let connect_target: Option<&NodeId> = state.connect_target();

	for node in state.model.nodes() {
		let flags = NodeFlags {
			selected: state.selected_node_id() == Some(&node.id),
			connecting_from: state.connecting_from.as_ref() == Some(&node.id),
			connect_target: connect_target == Some(&node.id),
			hovered: state.is_hovered(&HitTarget::Node(node.id.clone())),
		};
		let style = node_style(node, flags);
		let (x, y) = (node.position.x, node.position.y);
		let radius = style.radius_px / k;

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(style.fill);
		ctx.fill();
		if let Some(stroke) = style.stroke {
			ctx.set_stroke_style_str(stroke);
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		if style.lock_badge {
			ctx.begin_path();
			let _ = ctx.arc(x + radius * 0.75, y - radius * 0.75, LOCK_BADGE_PX / k, 0.0, 2.0 * PI);
			ctx.set_fill_style_str("#dc2626");
			ctx.fill();
		}

		if show_labels {
			ctx.set_fill_style_str("#1e293b");
			ctx.set_font(&format!("{}px sans-serif", 11.0 / k));
			let _ = ctx.fill_text(&node.display_label(), x + radius + 3.0 / k, y + 4.0 / k);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;

	fn node(panorama: bool, locked: bool) -> GraphNode {
		GraphNode {
			id: NodeId::from("n1"),
			label: None,
			position: Default::default(),
			rotation: 0.0,
			pitch: 0.0,
			fov: 90.0,
			locked,
			panorama_asset_id: None,
			panorama_url: panorama.then(|| "/pano.jpg".to_owned()),
			connections: BTreeSet::new(),
		}
	}

	#[test]
	fn panorama_nodes_use_a_distinct_fill() {
		let plain = node_style(&node(false, false), NodeFlags::default());
		let pano = node_style(&node(true, false), NodeFlags::default());
		assert_ne!(plain.fill, pano.fill);
		assert_eq!(plain.radius_px, NODE_RADIUS_PX);
		assert!(plain.stroke.is_none());
	}

	#[test]
	fn interaction_states_override_base_fill() {
		let n = node(true, true);
		let connecting = node_style(
			&n,
			NodeFlags {
				connecting_from: true,
				selected: true,
				..Default::default()
			},
		);
		let target = node_style(
			&n,
			NodeFlags {
				connect_target: true,
				..Default::default()
			},
		);
		let selected = node_style(
			&n,
			NodeFlags {
				selected: true,
				..Default::default()
			},
		);
		assert_eq!(connecting.fill, "#f59e0b");
		assert_eq!(target.fill, "#22c55e");
		assert_eq!(selected.fill, "#3b82f6");
		assert!(selected.radius_px > NODE_RADIUS_PX);
		assert!(connecting.lock_badge && target.lock_badge);
	}

	#[test]
	fn unknown_area_category_falls_back() {
		assert_eq!(area_colors("broom-closet"), area_colors(category::OTHER));
		assert_ne!(area_colors(category::ROOM), area_colors(category::HALL));
	}

	#[test]
	fn grid_covers_viewport_only() {
		let view = ViewTransform {
			x: -10.0,
			y: 0.0,
			k: 1.0,
		};
		let (xs, ys) = grid_lines(&view, 100.0, 50.0, 20.0);
		assert_eq!(xs, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
		assert_eq!(ys, vec![0.0, 20.0, 40.0]);
	}

	#[test]
	fn grid_hidden_when_too_dense() {
		let view = ViewTransform {
			x: 0.0,
			y: 0.0,
			k: 0.1,
		};
		let (xs, ys) = grid_lines(&view, 800.0, 600.0, 20.0);
		assert!(xs.is_empty() && ys.is_empty());
	}
}
