
use serde::{Serialize, Deserialize};

use crate::{RingId, RingValue};



/// A message routed around the ring. Created per send; delivered copies end
/// up in the receiver's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Message<I: RingId, V: RingValue>{
	pub from: I,
	pub to: I,
	pub payload: V,
}

impl<I: RingId, V: RingValue> Message<I, V>{
	pub fn new(from: I, to: I, payload: V) -> Self {
		Message {
			from,
			to,
			payload,
		}
	}
}


/// Result of a delivered send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Delivery<I: RingId>{
	pub receiver: I,
	pub hops: usize,
	/// Identifiers visited, sender first, receiver last.
	pub path: Vec<I>,
}


/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LookupHit<I: RingId, V: RingValue>{
	pub key: I,
	pub value: V,
	/// The first node on the walk that held the key.
	pub holder: I,
	pub hops: usize,
}


/// Result of a store request. Re-storing a key the owner already holds is a
/// no-op, never an overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum StoreOutcome<I: RingId>{
	Stored{owner: I, replicas: Vec<I>},
	AlreadyPresent{owner: I},
}

impl<I: RingId> StoreOutcome<I>{
	pub fn owner(&self) -> I {
		match self {
			StoreOutcome::Stored { owner, .. } => *owner,
			StoreOutcome::AlreadyPresent { owner } => *owner,
		}
	}
}
