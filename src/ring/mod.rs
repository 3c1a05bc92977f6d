use crate::{RingId, RingValue, RingError, IdentifierSpace};

use std::{
	collections::BTreeMap,
	fmt,
};

use serde::{Serialize, Deserialize};
use tracing::info;


pub mod message;
pub mod state;

mod membership;
mod replication;
mod routing;

use self::message::Message;


/// A stable reference to a node slot in the ring arena.
/// The generation changes every time a slot is reused, so a handle kept
/// after its node departed never resolves to a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle{
	index: u32,
	generation: u32,
}

impl NodeHandle {
	pub(crate) fn new(index: u32, generation: u32) -> Self {
		NodeHandle { index, generation }
	}
}

impl fmt::Display for NodeHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}.{}", self.index, self.generation)
	}
}

/// Direction policy for `Ring::send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPolicy{
	/// Always forward to the successor.
	#[default]
	Successor,
	/// Probe both directions one hop at a time and take the first match.
	Shortest,
}


/// A single member of the ring.
#[derive(Debug)]
pub struct RingNode<I: RingId, V: RingValue>{
	handle: NodeHandle,
	identifier: I,
	predecessor: NodeHandle,
	successor: NodeHandle,

	store: BTreeMap<I, V>,
	inbox: Vec<Message<I, V>>,
}

impl<I: RingId, V: RingValue> RingNode<I, V> {
	fn new(handle: NodeHandle, identifier: I) -> Self {
		RingNode {
			handle,
			identifier,
			predecessor: handle,
			successor: handle,
			store: BTreeMap::new(),
			inbox: Vec::new(),
		}
	}

	pub fn handle(&self) -> NodeHandle {
		self.handle
	}

	pub fn identifier(&self) -> I {
		self.identifier
	}

	pub fn predecessor(&self) -> NodeHandle {
		self.predecessor
	}

	pub fn successor(&self) -> NodeHandle {
		self.successor
	}

	/// A node with no peers links to itself on both sides.
	pub fn is_alone(&self) -> bool {
		self.successor == self.handle && self.predecessor == self.handle
	}

	pub fn has_data(&self, key: &I) -> bool {
		self.store.contains_key(key)
	}

	pub fn get(&self, key: &I) -> Option<&V> {
		self.store.get(key)
	}

	pub fn store(&self) -> &BTreeMap<I, V> {
		&self.store
	}

	/// Messages delivered to this node, oldest first.
	pub fn inbox(&self) -> &[Message<I, V>] {
		&self.inbox
	}
}


#[derive(Debug)]
struct Slot<I: RingId, V: RingValue>{
	generation: u32,
	node: Option<RingNode<I, V>>,
}


/// The ring arena. Owns every node; links between nodes are handles into
/// `slots`. The circular order itself lives only in the node links.
#[derive(Debug)]
pub struct Ring<I: RingId, V: RingValue>{
	slots: Vec<Slot<I, V>>,
	free: Vec<u32>,
	ids: IdentifierSpace<I>,
	routing: RoutingPolicy,
}

impl<I: RingId, V: RingValue> Ring<I, V>{

	/// Creates an empty ring with successor-only routing.
	pub fn new() -> Self {
		Ring {
			slots: Vec::new(),
			free: Vec::new(),
			ids: IdentifierSpace::new(),
			routing: RoutingPolicy::default(),
		}
	}

	pub fn with_routing(mut self, routing: RoutingPolicy) -> Self {
		self.routing = routing;
		self
	}

	pub fn set_routing(&mut self, routing: RoutingPolicy) {
		self.routing = routing;
	}

	pub fn routing(&self) -> RoutingPolicy {
		self.routing
	}

	/// Number of live nodes.
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn identifiers(&self) -> &IdentifierSpace<I> {
		&self.ids
	}

	pub fn contains(&self, id: &I) -> bool {
		self.ids.contains(id)
	}

	pub fn handle_of(&self, id: &I) -> Option<NodeHandle> {
		self.ids.resolve(id)
	}

	/// The live node with the smallest identifier.
	pub fn anchor(&self) -> Result<NodeHandle, RingError> {
		self.ids.min().map(|(_, handle)| handle).ok_or(RingError::EmptyRing)
	}

	pub fn is_live(&self, handle: NodeHandle) -> bool {
		self.node(handle).is_ok()
	}

	pub fn node(&self, handle: NodeHandle) -> Result<&RingNode<I, V>, RingError> {
		let slot = self.slots.get(handle.index as usize);
		match slot {
			Some(Slot { generation, node: Some(node) }) if *generation == handle.generation => Ok(node),
			_ => Err(self.missing(handle)),
		}
	}

	fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut RingNode<I, V>, RingError> {
		let missing = self.missing(handle);
		let slot = self.slots.get_mut(handle.index as usize);
		match slot {
			Some(Slot { generation, node: Some(node) }) if *generation == handle.generation => Ok(node),
			_ => Err(missing),
		}
	}

	fn missing(&self, handle: NodeHandle) -> RingError {
		if self.is_empty() {
			RingError::EmptyRing
		} else {
			RingError::UnknownNode { handle }
		}
	}

	/// Creates a new node, empty and alone. It forms a ring of its own until
	/// it is spliced in with `insert`.
	pub fn create_node(&mut self, id: I) -> Result<NodeHandle, RingError> {
		self.ids.check(&id)?;

		let handle = match self.free.pop() {
			Some(index) => {
				let slot = &mut self.slots[index as usize];
				slot.generation = slot.generation.wrapping_add(1);
				NodeHandle::new(index, slot.generation)
			},
			None => {
				self.slots.push(Slot { generation: 0, node: None });
				NodeHandle::new((self.slots.len() - 1) as u32, 0)
			},
		};
		self.slots[handle.index as usize].node = Some(RingNode::new(handle, id));
		self.ids.claim(id, handle)?;

		info!(node = %id, "created node");
		Ok(handle)
	}

	fn destroy(&mut self, handle: NodeHandle) -> Option<RingNode<I, V>> {
		let slot = self.slots.get_mut(handle.index as usize)?;
		if slot.generation != handle.generation {
			return None;
		}
		let node = slot.node.take()?;
		self.free.push(handle.index);
		self.ids.release(&node.identifier);
		Some(node)
	}

	fn identifier(&self, handle: NodeHandle) -> Result<I, RingError> {
		Ok(self.node(handle)?.identifier)
	}

	fn successor(&self, handle: NodeHandle) -> Result<NodeHandle, RingError> {
		Ok(self.node(handle)?.successor)
	}

	fn predecessor(&self, handle: NodeHandle) -> Result<NodeHandle, RingError> {
		Ok(self.node(handle)?.predecessor)
	}

	/// Walks the ring forward from `start`, yielding `start` first and
	/// stopping before coming back to it. Bounded by the live node count.
	pub fn walk(&self, start: NodeHandle) -> Result<Walk<'_, I, V>, RingError> {
		self.node(start)?;
		Ok(Walk {
			ring: self,
			start,
			next: Some(start),
			remaining: self.len(),
		})
	}

	/// Identifiers of the ring containing `from`, starting from its minimum.
	pub fn enumerate(&self, from: NodeHandle) -> Result<Vec<I>, RingError> {
		let mut ids: Vec<I> = self.walk(from)?
			.map(|handle| self.identifier(handle))
			.collect::<Result<_, _>>()?;

		let min_pos = ids.iter()
			.enumerate()
			.min_by_key(|(_, id)| **id)
			.map(|(pos, _)| pos)
			.unwrap_or(0);
		ids.rotate_left(min_pos);
		Ok(ids)
	}

	/// Console rendering of the ring, e.g. `[10]--->[30]--->[70]`.
	pub fn render(&self, from: NodeHandle) -> Result<String, RingError> {
		let ids = self.enumerate(from)?;
		let parts: Vec<String> = ids.iter().map(|id| format!("[{}]", id)).collect();
		Ok(parts.join("--->"))
	}

	/// Identifiers of every live node holding a copy of `key`, ascending.
	pub fn holders(&self, key: &I) -> Vec<I> {
		let mut holders: Vec<I> = self.slots.iter()
			.filter_map(|slot| slot.node.as_ref())
			.filter(|node| node.has_data(key))
			.map(|node| node.identifier)
			.collect();
		holders.sort();
		holders
	}

	/// Iterates over every live node in the arena, in slot order.
	pub fn nodes(&self) -> impl Iterator<Item = &RingNode<I, V>> {
		self.slots.iter().filter_map(|slot| slot.node.as_ref())
	}

}

impl<I: RingId, V: RingValue> Default for Ring<I, V> {
	fn default() -> Self {
		Self::new()
	}
}


/// Forward iterator over one ring. See `Ring::walk`.
pub struct Walk<'a, I: RingId, V: RingValue>{
	ring: &'a Ring<I, V>,
	start: NodeHandle,
	next: Option<NodeHandle>,
	remaining: usize,
}

impl<'a, I: RingId, V: RingValue> Iterator for Walk<'a, I, V> {
	type Item = NodeHandle;

	fn next(&mut self) -> Option<NodeHandle> {
		if self.remaining == 0 {
			return None;
		}
		let current = self.next?;
		self.remaining -= 1;
		self.next = match self.ring.successor(current) {
			Ok(successor) if successor != self.start => Some(successor),
			_ => None,
		};
		Some(current)
	}
}
