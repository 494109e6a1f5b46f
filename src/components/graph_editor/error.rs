use thiserror::Error;

/// Input rejected before any mutation happened.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("a node cannot be connected to itself")]
	SelfConnection,
	#[error("these nodes are already connected")]
	DuplicateConnection,
	#[error("an area needs at least 3 vertices, got {count}")]
	TooFewVertices { count: usize },
	#[error("an area needs a name")]
	EmptyName,
	#[error("media asset {asset_id} is not a panorama")]
	NotPanorama { asset_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct PersistenceError {
	pub operation: &'static str,
	pub message: String,
}

impl PersistenceError {
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			message: message.into(),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
	Node,
	Connection,
	Area,
}

impl std::fmt::Display for EntityKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			EntityKind::Node => "node",
			EntityKind::Connection => "connection",
			EntityKind::Area => "area",
		})
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EditorError {
	#[error(transparent)]
	Validation(#[from] ValidationError),
	#[error("{kind} {id} no longer exists")]
	NotFound { kind: EntityKind, id: String },
	#[error(transparent)]
	Persistence(#[from] PersistenceError),
}

impl EditorError {
	pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
		Self::NotFound {
			kind,
			id: id.to_string(),
		}
	}
}
