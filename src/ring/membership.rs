use tracing::{info, warn};

use crate::{RingId, RingValue, RingError};

use super::{Ring, NodeHandle};




impl<I: RingId, V: RingValue> Ring<I, V>{

	/// Creates a node for `id` and splices it into the ring reachable from
	/// `existing`.
	pub fn join(&mut self, existing: NodeHandle, id: I) -> Result<NodeHandle, RingError> {
		// all checks happen before anything is created or relinked
		self.ids.check(&id)?;
		let position = self.find_position(existing, &id)?;

		let new_node = self.create_node(id)?;
		self.splice_after(position, new_node)?;
		Ok(new_node)
	}

	/// Splices a lone node, created earlier by `create_node`, into the ring
	/// reachable from `existing`.
	pub fn insert(&mut self, existing: NodeHandle, lone: NodeHandle) -> Result<(), RingError> {
		let node = self.node(lone)?;
		if !node.is_alone() || existing == lone {
			return Err(RingError::AlreadyLinked { handle: lone });
		}
		let id = node.identifier;
		let position = self.find_position(existing, &id)?;
		self.splice_after(position, lone)
	}

	/// Walks forward from `start` to the node after which `id` belongs: the
	/// first `p` with `id` in `(p, p.successor]`.
	/// Falls back to the predecessor of `start` (insert before `start`) if
	/// the walk comes back around without a match.
	pub fn find_position(&self, start: NodeHandle, id: &I) -> Result<NodeHandle, RingError> {
		for current in self.walk(start)? {
			if self.position_matches(current, id)? {
				return Ok(current);
			}
		}

		warn!(node = %id, "no interval matched, inserting before the start node");
		self.predecessor(start)
	}

	/// True if `id` belongs between `handle` and its successor.
	/// A lone node accepts any identifier.
	pub(crate) fn position_matches(&self, handle: NodeHandle, id: &I) -> Result<bool, RingError> {
		let node = self.node(handle)?;
		if node.is_alone() {
			return Ok(true);
		}
		let successor_id = self.identifier(node.successor)?;
		Ok(id.is_between(&node.identifier, &successor_id))
	}

	/// Creates `id` and splices it directly after `position`. Used by hop-by-hop
	/// joins once the packet reached the right place.
	pub(crate) fn join_after(&mut self, position: NodeHandle, id: I) -> Result<NodeHandle, RingError> {
		self.ids.check(&id)?;
		self.node(position)?;

		let new_node = self.create_node(id)?;
		self.splice_after(position, new_node)?;
		Ok(new_node)
	}

	/// Links `new_node` between `position` and its successor, updating all
	/// four pointers.
	fn splice_after(&mut self, position: NodeHandle, new_node: NodeHandle) -> Result<(), RingError> {
		let next = self.successor(position)?;
		self.node(new_node)?;

		{
			let node = self.node_mut(new_node)?;
			node.predecessor = position;
			node.successor = next;
		}
		self.node_mut(next)?.predecessor = new_node;
		self.node_mut(position)?.successor = new_node;

		info!(
			node = %self.identifier(new_node)?,
			predecessor = %self.identifier(position)?,
			successor = %self.identifier(next)?,
			"node joined the ring"
		);
		Ok(())
	}

	/// Takes `handle` out of the ring, handing its store entries off to the
	/// neighbors first. Returns the former successor, or None if the ring
	/// became empty.
	pub fn remove(&mut self, handle: NodeHandle) -> Result<Option<NodeHandle>, RingError> {
		let node = self.node(handle)?;
		let (id, predecessor, successor) = (node.identifier, node.predecessor, node.successor);

		if node.is_alone() {
			self.destroy(handle);
			if self.is_empty() {
				info!(node = %id, "last node removed, the ring is empty");
			} else {
				info!(node = %id, "unlinked node removed");
			}
			return Ok(None);
		}

		self.hand_off(handle)?;

		self.node_mut(predecessor)?.successor = successor;
		self.node_mut(successor)?.predecessor = predecessor;
		self.destroy(handle);

		info!(
			node = %id,
			predecessor = %self.identifier(predecessor)?,
			successor = %self.identifier(successor)?,
			"node removed, neighbors are now linked"
		);
		Ok(Some(successor))
	}

}
