
use std::{collections::BTreeMap, path::Path};

use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{RingId, RingValue, RingError};

use super::Ring;




/// Serializable picture of a ring: nodes in ring order starting from the
/// minimum identifier, each with its local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RingState<I: RingId, V: RingValue>{
	pub nodes: Vec<NodeState<I, V>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NodeState<I: RingId, V: RingValue>{
	pub id: I,
	pub entries: BTreeMap<I, V>,
}


impl<I: RingId, V: RingValue> RingState<I, V> {
	pub fn empty() -> Self {
		RingState { nodes: Vec::new() }
	}

	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RingError> {
		let state = fs::read_to_string(&path).await?;
		let ring_state = serde_json::from_str(&state)?;
		Ok(ring_state)
	}

	pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RingError> {
		let s = serde_json::to_string(self)?;
		fs::write(path, s).await?;
		Ok(())
	}
}


impl<I: RingId, V: RingValue> Ring<I, V>{

	/// Captures the ring that contains the minimum live node.
	pub fn snapshot(&self) -> Result<RingState<I, V>, RingError> {
		let anchor = match self.anchor() {
			Ok(anchor) => anchor,
			Err(RingError::EmptyRing) => return Ok(RingState::empty()),
			Err(e) => return Err(e),
		};

		let mut nodes = Vec::with_capacity(self.len());
		for handle in self.walk(anchor)? {
			let node = self.node(handle)?;
			nodes.push(NodeState {
				id: node.identifier,
				entries: node.store.clone(),
			});
		}
		Ok(RingState { nodes })
	}

	/// Rebuilds a ring from a snapshot. Entries are restored exactly as
	/// captured, without replicating them again.
	pub fn from_state(state: RingState<I, V>) -> Result<Self, RingError> {
		let mut ring = Ring::new();
		let mut anchor = None;

		for node_state in state.nodes {
			let handle = match anchor {
				None => {
					let handle = ring.create_node(node_state.id)?;
					anchor = Some(handle);
					handle
				},
				Some(anchor) => ring.join(anchor, node_state.id)?,
			};
			ring.node_mut(handle)?.store = node_state.entries;
		}
		Ok(ring)
	}

}
