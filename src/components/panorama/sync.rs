use log::debug;

use super::projection::ViewAngles;

/// Programmatic writes this close after a user write are dropped.
pub const GRACE_WINDOW_MS: f64 = 250.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationOrigin {
	/// Dragging on the panorama canvas.
	User,
	/// Any other writer, e.g. a properties-panel slider.
	Programmatic,
}

/// Reconciles the two writers of the viewer orientation so that echoes of
/// a user drag coming back through the slider do not fight the drag.
#[derive(Clone, Debug)]
pub struct RotationSync {
	current: ViewAngles,
	last_user_ms: Option<f64>,
	grace_ms: f64,
}

impl RotationSync {
	pub fn new(initial: ViewAngles) -> Self {
		Self {
			current: initial,
			last_user_ms: None,
			grace_ms: GRACE_WINDOW_MS,
		}
	}

	pub fn current(&self) -> ViewAngles {
		self.current
	}

	/// Returns whether the update was taken.
	pub fn apply(&mut self, angles: ViewAngles, origin: RotationOrigin, now_ms: f64) -> bool {
		match origin {
			RotationOrigin::User => {
				self.last_user_ms = Some(now_ms);
			}
			RotationOrigin::Programmatic => {
				if self.last_user_ms.is_some_and(|t| now_ms - t < self.grace_ms) {
					debug!("Ignoring programmatic rotation inside the grace window");
					return false;
				}
				if angles == self.current {
					return false;
				}
			}
		}
		self.current = angles;
		true
	}

	/// Jump to a new node's stored orientation, regardless of recent drags.
	pub fn reseed(&mut self, angles: ViewAngles) {
		self.current = angles;
		self.last_user_ms = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_updates_always_win() {
		let mut sync = RotationSync::new(ViewAngles::default());
		assert!(sync.apply(ViewAngles::new(10.0, 0.0), RotationOrigin::User, 0.0));
		assert!(sync.apply(ViewAngles::new(20.0, 0.0), RotationOrigin::User, 1.0));
		assert_eq!(sync.current().yaw, 20.0);
	}

	#[test]
	fn programmatic_echo_inside_grace_is_ignored() {
		let mut sync = RotationSync::new(ViewAngles::default());
		sync.apply(ViewAngles::new(30.0, 5.0), RotationOrigin::User, 1000.0);
		assert!(!sync.apply(ViewAngles::new(25.0, 5.0), RotationOrigin::Programmatic, 1100.0));
		assert!(!sync.apply(ViewAngles::new(25.0, 5.0), RotationOrigin::Programmatic, 1249.0));
		assert_eq!(sync.current(), ViewAngles::new(30.0, 5.0));

		assert!(sync.apply(ViewAngles::new(25.0, 5.0), RotationOrigin::Programmatic, 1250.0));
		assert_eq!(sync.current().yaw, 25.0);
	}

	#[test]
	fn unchanged_programmatic_value_is_a_no_op() {
		let mut sync = RotationSync::new(ViewAngles::new(45.0, 0.0));
		assert!(!sync.apply(ViewAngles::new(45.0, 0.0), RotationOrigin::Programmatic, 0.0));
		assert!(sync.apply(ViewAngles::new(50.0, 0.0), RotationOrigin::Programmatic, 0.0));
	}

	#[test]
	fn reseed_clears_the_grace_window() {
		let mut sync = RotationSync::new(ViewAngles::default());
		sync.apply(ViewAngles::new(90.0, 0.0), RotationOrigin::User, 500.0);
		sync.reseed(ViewAngles::new(180.0, 10.0));
		assert_eq!(sync.current(), ViewAngles::new(180.0, 10.0));
		assert!(sync.apply(ViewAngles::new(200.0, 0.0), RotationOrigin::Programmatic, 510.0));
	}
}
