//! Errors returned by ring operations.

use crate::ring::NodeHandle;

/// Identifiers are kept as their display form so the error type is shared by
/// every identifier width.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
	/// Join or create with an identifier that is already live.
	#[error("identifier {id} is already live in the ring")]
	DuplicateIdentifier{id: String},

	/// A lookup walked the whole ring without a hit.
	#[error("no node holds key {key}")]
	KeyNotFound{key: String},

	/// A message walked the whole ring without reaching its receiver.
	#[error("message target {target} is not in the ring")]
	TargetNotFound{target: String},

	/// The operation needs at least one live node.
	#[error("the ring is empty")]
	EmptyRing,

	/// The handle does not name a live node.
	#[error("node {handle} is not live")]
	UnknownNode{handle: NodeHandle},

	/// Only a lone node can be spliced in by `insert`.
	#[error("node {handle} is already linked into a ring")]
	AlreadyLinked{handle: NodeHandle},

	#[error("state file error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The processor task has stopped or did not answer in time.
	#[error("ring service stopped")]
	ServiceStopped,
}

impl RingError {
	pub(crate) fn duplicate(id: impl ToString) -> Self {
		RingError::DuplicateIdentifier { id: id.to_string() }
	}

	pub(crate) fn key_not_found(key: impl ToString) -> Self {
		RingError::KeyNotFound { key: key.to_string() }
	}

	pub(crate) fn target_not_found(target: impl ToString) -> Self {
		RingError::TargetNotFound { target: target.to_string() }
	}
}
