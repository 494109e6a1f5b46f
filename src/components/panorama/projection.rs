//! Equirectangular re-projection and neighbour hotspot placement.
//!
//! Camera frame: forward is +X, up is +Y, right is +Z. Yaw turns right
//! (clockwise seen from above, matching floor bearings on a y-down canvas),
//! pitch turns up. Floor bearings and image yaw share one frame, so a
//! neighbour at floor bearing `b` sits at image yaw `b`.

use std::f64::consts::PI;

use thiserror::Error;

use crate::components::graph_editor::{GraphModel, NodeId};

pub const DEFAULT_HFOV_DEG: f64 = 90.0;
pub const HOTSPOT_MAX_YAW_DEG: f64 = 45.0;
pub const HOTSPOT_MAX_PITCH_DEG: f64 = 30.0;
pub const HOTSPOT_CLICK_RADIUS_PX: f64 = 24.0;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProjectionError {
	#[error("expected {expected} RGBA bytes for the image, got {actual}")]
	PixelCount { expected: usize, actual: usize },
	#[error("image has no pixels")]
	Empty,
}

/// Decoded RGBA source panorama.
#[derive(Clone, Debug, PartialEq)]
pub struct EquirectImage {
	width: u32,
	height: u32,
	pixels: Vec<u8>,
}

impl EquirectImage {
	pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ProjectionError> {
		if width == 0 || height == 0 {
			return Err(ProjectionError::Empty);
		}
		let expected = width as usize * height as usize * 4;
		if pixels.len() != expected {
			return Err(ProjectionError::PixelCount {
				expected,
				actual: pixels.len(),
			});
		}
		Ok(Self { width, height, pixels })
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// Nearest pixel at `(u, v)`. Wraps horizontally, clamps vertically.
	fn sample(&self, u: f64, v: f64) -> &[u8] {
		let (w, h) = (self.width as i64, self.height as i64);
		let x = ((u * w as f64).floor() as i64).rem_euclid(w);
		let y = ((v * h as f64).floor() as i64).clamp(0, h - 1);
		let i = ((y * w + x) * 4) as usize;
		&self.pixels[i..i + 4]
	}
}

/// Look direction in degrees. Yaw is kept in `0..360`, pitch in `-90..=90`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewAngles {
	pub yaw: f64,
	pub pitch: f64,
}

impl ViewAngles {
	pub fn new(yaw: f64, pitch: f64) -> Self {
		Self {
			yaw: yaw.rem_euclid(360.0),
			pitch: pitch.clamp(-90.0, 90.0),
		}
	}

	/// Angles after dragging the image by `(dx, dy)` screen pixels; the
	/// scene follows the pointer.
	pub fn dragged(self, dx: f64, dy: f64, width: f64, hfov_deg: f64) -> Self {
		let deg_per_px = hfov_deg / width.max(1.0);
		Self::new(self.yaw - dx * deg_per_px, self.pitch + dy * deg_per_px)
	}
}

/// Signed difference folded into `(-180, 180]`.
pub fn normalize_degrees(angle: f64) -> f64 {
	let a = angle.rem_euclid(360.0);
	if a > 180.0 { a - 360.0 } else { a }
}

/// Half-angle tangents of the horizontal and vertical field of view.
fn frustum(width: f64, height: f64, hfov_deg: f64) -> (f64, f64) {
	let tan_h = (hfov_deg.to_radians() / 2.0).tan();
	(tan_h, tan_h * height / width)
}

/// Camera-space vector to world space: pitch about Z, then yaw about Y.
fn rotate([x, y, z]: [f64; 3], view: ViewAngles) -> [f64; 3] {
	let (sin_p, cos_p) = view.pitch.to_radians().sin_cos();
	let (sin_y, cos_y) = view.yaw.rem_euclid(360.0).to_radians().sin_cos();
	let (x1, y1) = (x * cos_p - y * sin_p, x * sin_p + y * cos_p);
	[x1 * cos_y - z * sin_y, y1, x1 * sin_y + z * cos_y]
}

/// Inverse of [`rotate`].
fn unrotate([x, y, z]: [f64; 3], view: ViewAngles) -> [f64; 3] {
	let (sin_p, cos_p) = view.pitch.to_radians().sin_cos();
	let (sin_y, cos_y) = view.yaw.rem_euclid(360.0).to_radians().sin_cos();
	let (x1, z1) = (x * cos_y + z * sin_y, -x * sin_y + z * cos_y);
	[x1 * cos_p + y * sin_p, -x1 * sin_p + y * cos_p, z1]
}

fn direction(yaw_deg: f64, pitch_deg: f64) -> [f64; 3] {
	let (sin_y, cos_y) = yaw_deg.to_radians().sin_cos();
	let (sin_p, cos_p) = pitch_deg.to_radians().sin_cos();
	[cos_p * cos_y, sin_p, cos_p * sin_y]
}

fn to_uv([x, y, z]: [f64; 3]) -> (f64, f64) {
	let phi = z.atan2(x);
	let theta = y.clamp(-1.0, 1.0).acos();
	((phi + PI) / (2.0 * PI), theta / PI)
}

/// Re-project `source` for `view` into a `width`x`height` RGBA buffer by
/// casting one ray per output pixel.
pub fn render_view(source: &EquirectImage, view: ViewAngles, width: u32, height: u32, hfov_deg: f64) -> Vec<u8> {
	let mut out = vec![0u8; width as usize * height as usize * 4];
	if width == 0 || height == 0 {
		return out;
	}
	let (w, h) = (width as f64, height as f64);
	let (tan_h, tan_v) = frustum(w, h, hfov_deg);

	for (row, line) in out.chunks_exact_mut(width as usize * 4).enumerate() {
		let ndc_y = 1.0 - 2.0 * (row as f64 + 0.5) / h;
		for (col, px) in line.chunks_exact_mut(4).enumerate() {
			let ndc_x = 2.0 * (col as f64 + 0.5) / w - 1.0;
			let [x, y, z] = [1.0, ndc_y * tan_v, ndc_x * tan_h];
			let len = (x * x + y * y + z * z).sqrt();
			let (u, v) = to_uv(rotate([x / len, y / len, z / len], view));
			px.copy_from_slice(source.sample(u, v));
		}
	}
	out
}

/// A traversable neighbour as seen from the viewing node.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
	pub node_id: NodeId,
	pub label: String,
	/// Floor bearing in degrees.
	pub yaw: f64,
	/// Elevation in degrees from the height difference.
	pub pitch: f64,
	pub distance: f64,
}

/// Neighbours reachable in one step from `node_id`, with their directions.
pub fn neighbors(model: &GraphModel, node_id: &NodeId) -> Vec<Neighbor> {
	let Some(origin) = model.node(node_id) else {
		return Vec::new();
	};
	model
		.connections()
		.iter()
		.filter_map(|c| {
			let other = if &c.from_node_id == node_id {
				&c.to_node_id
			} else if &c.to_node_id == node_id && c.bidirectional {
				&c.from_node_id
			} else {
				return None;
			};
			let target = model.node(other)?;
			let (dx, dy, dz) = (
				target.position.x - origin.position.x,
				target.position.y - origin.position.y,
				target.position.z - origin.position.z,
			);
			let horizontal = dx.hypot(dy);
			Some(Neighbor {
				node_id: target.id.clone(),
				label: target.display_label(),
				yaw: dy.atan2(dx).to_degrees(),
				pitch: dz.atan2(horizontal).to_degrees(),
				distance: horizontal,
			})
		})
		.collect()
}

/// A neighbour projected onto the viewer canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Hotspot {
	pub node_id: NodeId,
	pub label: String,
	pub x: f64,
	pub y: f64,
	pub distance: f64,
}

/// Screen positions of the neighbours inside the hotspot window of `view`.
pub fn project_hotspots(neighbors: &[Neighbor], view: ViewAngles, width: f64, height: f64, hfov_deg: f64) -> Vec<Hotspot> {
	let (tan_h, tan_v) = frustum(width, height, hfov_deg);
	neighbors
		.iter()
		.filter_map(|n| {
			let rel_yaw = normalize_degrees(n.yaw - view.yaw);
			let rel_pitch = n.pitch - view.pitch;
			if rel_yaw.abs() > HOTSPOT_MAX_YAW_DEG || rel_pitch.abs() > HOTSPOT_MAX_PITCH_DEG {
				return None;
			}
			let [cx, cy, cz] = unrotate(direction(n.yaw, n.pitch), view);
			if cx <= 1e-6 {
				return None;
			}
			Some(Hotspot {
				node_id: n.node_id.clone(),
				label: n.label.clone(),
				x: width / 2.0 * (1.0 + cz / cx / tan_h),
				y: height / 2.0 * (1.0 - cy / cx / tan_v),
				distance: n.distance,
			})
		})
		.collect()
}

/// The hotspot closest to `(x, y)` within the click radius.
pub fn hotspot_at(hotspots: &[Hotspot], x: f64, y: f64) -> Option<&Hotspot> {
	hotspots
		.iter()
		.map(|h| (h, (h.x - x).hypot(h.y - y)))
		.filter(|(_, d)| *d <= HOTSPOT_CLICK_RADIUS_PX)
		.min_by(|a, b| a.1.total_cmp(&b.1))
		.map(|(h, _)| h)
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;

	use super::*;
	use crate::components::graph_editor::{NodeAttrs, Position};

	/// 360x180 source whose pixel at column `c` stores `c` in R (low) and G (high).
	fn column_coded() -> EquirectImage {
		let (w, h) = (360u32, 180u32);
		let mut pixels = Vec::with_capacity((w * h * 4) as usize);
		for row in 0..h {
			for col in 0..w {
				pixels.extend_from_slice(&[(col & 0xff) as u8, (col >> 8) as u8, row as u8, 255]);
			}
		}
		EquirectImage::new(w, h, pixels).unwrap()
	}

	fn column(px: &[u8]) -> u32 {
		px[0] as u32 | (px[1] as u32) << 8
	}

	#[test]
	fn rejects_mismatched_buffers() {
		assert_eq!(
			EquirectImage::new(2, 2, vec![0; 15]),
			Err(ProjectionError::PixelCount {
				expected: 16,
				actual: 15
			})
		);
		assert_eq!(EquirectImage::new(0, 2, Vec::new()), Err(ProjectionError::Empty));
	}

	#[test]
	fn level_view_samples_expected_columns() {
		let src = column_coded();
		let out = render_view(&src, ViewAngles::default(), 4, 3, 90.0);
		let middle = &out[4 * 4..8 * 4];
		let cols: Vec<u32> = middle.chunks_exact(4).map(column).collect();
		assert_eq!(cols, vec![143, 165, 194, 216]);
		assert!(middle.chunks_exact(4).all(|px| px[2] == 90));
	}

	#[test]
	fn yaw_wraps_and_is_periodic() {
		let src = column_coded();
		let a = render_view(&src, ViewAngles { yaw: 30.0, pitch: 10.0 }, 16, 9, 90.0);
		let b = render_view(&src, ViewAngles { yaw: 390.0, pitch: 10.0 }, 16, 9, 90.0);
		let c = render_view(&src, ViewAngles { yaw: -330.0, pitch: 10.0 }, 16, 9, 90.0);
		assert_eq!(a, b);
		assert_eq!(a, c);

		let behind = render_view(&src, ViewAngles { yaw: 180.0, pitch: 0.0 }, 3, 1, 90.0);
		// the seam: straight behind lands on the first or last column
		assert!(matches!(column(&behind[4..8]), 0 | 359));
	}

	#[test]
	fn looking_up_samples_upper_rows() {
		let src = column_coded();
		let level = render_view(&src, ViewAngles::default(), 1, 1, 90.0);
		let up = render_view(&src, ViewAngles { yaw: 0.0, pitch: 41.5 }, 1, 1, 90.0);
		assert_eq!(level[2], 90);
		assert_eq!(up[2], 48);
	}

	#[test]
	fn drag_follows_pointer_and_clamps_pitch() {
		let view = ViewAngles::new(10.0, 0.0).dragged(100.0, 0.0, 900.0, 90.0);
		assert!(approx_eq!(f64, view.yaw, 360.0, epsilon = 1e-9) || approx_eq!(f64, view.yaw, 0.0, epsilon = 1e-9));
		let view = ViewAngles::new(0.0, 80.0).dragged(0.0, 1000.0, 900.0, 90.0);
		assert_eq!(view.pitch, 90.0);
	}

	#[test]
	fn normalizes_into_half_open_range() {
		assert_eq!(normalize_degrees(190.0), -170.0);
		assert_eq!(normalize_degrees(-190.0), 170.0);
		assert_eq!(normalize_degrees(180.0), 180.0);
		assert_eq!(normalize_degrees(720.0), 0.0);
	}

	fn graph() -> (GraphModel, NodeId, NodeId, NodeId) {
		let mut model = GraphModel::new();
		let a = model.add_node(Position::new(0.0, 0.0, 0.0), NodeAttrs::default()).id;
		let east = model.add_node(Position::new(100.0, 0.0, 0.0), NodeAttrs::default()).id;
		let south = model.add_node(Position::new(0.0, 100.0, 0.0), NodeAttrs::default()).id;
		model.add_connection(&a, &east);
		model.add_connection(&a, &south);
		(model, a, east, south)
	}

	#[test]
	fn neighbor_bearings() {
		let (model, a, east, south) = graph();
		let found = neighbors(&model, &a);
		assert_eq!(found.len(), 2);
		let e = found.iter().find(|n| n.node_id == east).unwrap();
		let s = found.iter().find(|n| n.node_id == south).unwrap();
		assert!(approx_eq!(f64, e.yaw, 0.0));
		assert!(approx_eq!(f64, s.yaw, 90.0));
		assert!(approx_eq!(f64, e.distance, 100.0));
		assert!(neighbors(&model, &NodeId::from("missing")).is_empty());
	}

	#[test]
	fn hotspots_are_culled_outside_window() {
		let (model, a, east, south) = graph();
		let found = neighbors(&model, &a);

		let ahead = project_hotspots(&found, ViewAngles::default(), 800.0, 400.0, 90.0);
		assert_eq!(ahead.len(), 1);
		assert_eq!(ahead[0].node_id, east);
		assert!(approx_eq!(f64, ahead[0].x, 400.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, ahead[0].y, 200.0, epsilon = 1e-9));

		let turned = project_hotspots(&found, ViewAngles::new(80.0, 0.0), 800.0, 400.0, 90.0);
		assert_eq!(turned.len(), 1);
		assert_eq!(turned[0].node_id, south);
		assert!(turned[0].x > 400.0);

		let raised = project_hotspots(&found, ViewAngles::new(0.0, 35.0), 800.0, 400.0, 90.0);
		assert!(raised.is_empty());
	}

	#[test]
	fn one_way_connections_hide_the_reverse_hotspot() {
		let mut model = GraphModel::new();
		let a = model.add_node(Position::default(), NodeAttrs::default()).id;
		let b = model.add_node(Position::new(10.0, 0.0, 0.0), NodeAttrs::default()).id;
		model.try_add_connection(&a, &b, false).unwrap();
		assert_eq!(neighbors(&model, &a).len(), 1);
		assert!(neighbors(&model, &b).is_empty());
	}

	#[test]
	fn click_picks_nearest_hotspot_in_radius() {
		let spot = |id: &str, x: f64| Hotspot {
			node_id: NodeId::from(id),
			label: id.into(),
			x,
			y: 100.0,
			distance: 1.0,
		};
		let spots = vec![spot("a", 100.0), spot("b", 130.0)];
		assert_eq!(hotspot_at(&spots, 118.0, 100.0).map(|h| h.node_id.as_str()), Some("b"));
		assert_eq!(hotspot_at(&spots, 105.0, 110.0).map(|h| h.node_id.as_str()), Some("a"));
		assert!(hotspot_at(&spots, 100.0, 130.0).is_none());
	}
}
