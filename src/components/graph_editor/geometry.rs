use super::types::{FloorplanBounds, Point};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

/// Pan offset `(x, y)` in screen pixels and zoom factor `k`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn screen_to_world(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn world_to_screen(&self, p: Point) -> Point {
		Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
	}

	/// Rescale by `factor` keeping the world point under `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let anchor = self.screen_to_world(sx, sy);
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		self.k = k;
		self.x = sx - anchor.x * k;
		self.y = sy - anchor.y * k;
	}

	/// Camera that centres `bounds` in a `width`x`height` viewport.
	pub fn fit(bounds: &FloorplanBounds, width: f64, height: f64, margin: f64) -> Self {
		let (avail_w, avail_h) = ((width - 2.0 * margin).max(1.0), (height - 2.0 * margin).max(1.0));
		let k = if bounds.width <= f64::EPSILON || bounds.height <= f64::EPSILON {
			1.0
		} else {
			(avail_w / bounds.width).min(avail_h / bounds.height)
		}
		.clamp(MIN_ZOOM, MAX_ZOOM);
		let center = bounds.center();
		Self {
			x: width / 2.0 - center.x * k,
			y: height / 2.0 - center.y * k,
			k,
		}
	}
}

/// Even-odd ray casting. Points exactly on an edge may land either way.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
	if polygon.len() < 3 {
		return false;
	}
	let mut inside = false;
	let mut j = polygon.len() - 1;
	for i in 0..polygon.len() {
		let (a, b) = (polygon[i], polygon[j]);
		if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
			inside = !inside;
		}
		j = i;
	}
	inside
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len_sq = dx * dx + dy * dy;
	if len_sq <= f64::EPSILON {
		return p.distance_to(a);
	}
	let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
	p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Area-weighted centroid, falling back to the vertex mean for degenerate polygons.
pub fn polygon_centroid(polygon: &[Point]) -> Option<Point> {
	if polygon.is_empty() {
		return None;
	}
	let n = polygon.len() as f64;
	let mean = Point::new(
		polygon.iter().map(|p| p.x).sum::<f64>() / n,
		polygon.iter().map(|p| p.y).sum::<f64>() / n,
	);

	let (mut area2, mut cx, mut cy) = (0.0, 0.0, 0.0);
	for (i, a) in polygon.iter().enumerate() {
		let b = polygon[(i + 1) % polygon.len()];
		let cross = a.x * b.y - b.x * a.y;
		area2 += cross;
		cx += (a.x + b.x) * cross;
		cy += (a.y + b.y) * cross;
	}
	if area2.abs() < 1e-9 {
		return Some(mean);
	}
	Some(Point::new(cx / (3.0 * area2), cy / (3.0 * area2)))
}

pub fn snap_to_grid(value: f64, grid_size: f64) -> f64 {
	if grid_size <= 0.0 {
		return value;
	}
	(value / grid_size).round() * grid_size
}

pub fn snap_point(p: Point, grid_size: f64) -> Point {
	Point::new(snap_to_grid(p.x, grid_size), snap_to_grid(p.y, grid_size))
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;

	use super::*;

	fn square() -> Vec<Point> {
		vec![
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
			Point::new(10.0, 10.0),
			Point::new(0.0, 10.0),
		]
	}

	#[test]
	fn polygon_containment() {
		let sq = square();
		assert!(point_in_polygon(Point::new(5.0, 5.0), &sq));
		assert!(!point_in_polygon(Point::new(15.0, 5.0), &sq));
		assert!(!point_in_polygon(Point::new(5.0, -1.0), &sq));
		assert!(!point_in_polygon(Point::new(1.0, 1.0), &sq[..2]));
	}

	#[test]
	fn concave_polygon_notch_is_outside() {
		let l_shape = vec![
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
			Point::new(10.0, 4.0),
			Point::new(4.0, 4.0),
			Point::new(4.0, 10.0),
			Point::new(0.0, 10.0),
		];
		assert!(point_in_polygon(Point::new(2.0, 8.0), &l_shape));
		assert!(!point_in_polygon(Point::new(8.0, 8.0), &l_shape));
	}

	#[test]
	fn segment_distance_clamps_to_endpoints() {
		let (a, b) = (Point::new(0.0, 0.0), Point::new(10.0, 0.0));
		assert!(approx_eq!(f64, distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0));
		assert!(approx_eq!(f64, distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0));
		assert!(approx_eq!(f64, distance_to_segment(Point::new(3.0, 4.0), a, a), 5.0));
	}

	#[test]
	fn screen_world_round_trip() {
		let view = ViewTransform {
			x: 40.0,
			y: -12.0,
			k: 2.5,
		};
		let world = view.screen_to_world(100.0, 80.0);
		let screen = view.world_to_screen(world);
		assert!(approx_eq!(f64, screen.x, 100.0, epsilon = 1e-9));
		assert!(approx_eq!(f64, screen.y, 80.0, epsilon = 1e-9));
	}

	#[test]
	fn zoom_keeps_anchor_under_cursor() {
		let mut view = ViewTransform {
			x: 30.0,
			y: 20.0,
			k: 1.3,
		};
		let before = view.screen_to_world(250.0, 170.0);
		for factor in [1.1, 1.1, 0.9, 1.1, 0.9, 0.9, 0.9] {
			view.zoom_at(250.0, 170.0, factor);
			let after = view.screen_to_world(250.0, 170.0);
			assert!(approx_eq!(f64, after.x, before.x, epsilon = 1e-9));
			assert!(approx_eq!(f64, after.y, before.y, epsilon = 1e-9));
		}
	}

	#[test]
	fn zoom_is_clamped() {
		let mut view = ViewTransform::default();
		for _ in 0..100 {
			view.zoom_at(0.0, 0.0, 1.1);
		}
		assert_eq!(view.k, MAX_ZOOM);
		for _ in 0..200 {
			view.zoom_at(0.0, 0.0, 0.9);
		}
		assert_eq!(view.k, MIN_ZOOM);
	}

	#[test]
	fn fit_centres_bounds() {
		let bounds = FloorplanBounds::from_extents(0.0, 0.0, 200.0, 100.0);
		let view = ViewTransform::fit(&bounds, 440.0, 340.0, 20.0);
		assert!(approx_eq!(f64, view.k, 2.0));
		let c = view.world_to_screen(bounds.center());
		assert!(approx_eq!(f64, c.x, 220.0));
		assert!(approx_eq!(f64, c.y, 170.0));
	}

	#[test]
	fn centroid_of_square_and_degenerate() {
		let c = polygon_centroid(&square()).unwrap();
		assert!(approx_eq!(f64, c.x, 5.0));
		assert!(approx_eq!(f64, c.y, 5.0));

		let line = [Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(6.0, 0.0)];
		let c = polygon_centroid(&line).unwrap();
		assert!(approx_eq!(f64, c.x, 3.0));
		assert!(polygon_centroid(&[]).is_none());
	}

	#[test]
	fn grid_snapping() {
		assert_eq!(snap_to_grid(29.0, 20.0), 20.0);
		assert_eq!(snap_to_grid(31.0, 20.0), 40.0);
		assert_eq!(snap_to_grid(-11.0, 20.0), -20.0);
		assert_eq!(snap_to_grid(7.3, 0.0), 7.3);
	}
}
