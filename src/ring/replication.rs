use tracing::{info, debug};

use crate::{RingId, RingValue, RingError};

use super::{Ring, NodeHandle, message::StoreOutcome};



impl<I: RingId, V: RingValue> Ring<I, V>{

	/// Walks forward from `from` to the node responsible for `key`: the node
	/// `n` with `key` in `(n.predecessor, n]`.
	pub fn find_responsible(&self, from: NodeHandle, key: &I) -> Result<NodeHandle, RingError> {
		for current in self.walk(from)? {
			if self.is_responsible(current, key)? {
				return Ok(current);
			}
		}
		// every closed ring covers the whole identifier space, so the walk
		// only runs out if the links are broken
		Ok(from)
	}

	pub(crate) fn is_responsible(&self, handle: NodeHandle, key: &I) -> Result<bool, RingError> {
		let node = self.node(handle)?;
		if node.is_alone() {
			return Ok(true);
		}
		let predecessor_id = self.identifier(node.predecessor)?;
		Ok(key.is_between(&predecessor_id, &node.identifier))
	}

	/// Stores `(key, value)` on the responsible node and its two neighbors.
	pub fn store(&mut self, from: NodeHandle, key: I, value: V) -> Result<StoreOutcome<I>, RingError> {
		let owner = self.find_responsible(from, &key)?;
		self.store_at(owner, key, value)
	}

	/// Stores on `owner` and replicates onto its predecessor and successor,
	/// skipping any node that already has the key.
	pub(crate) fn store_at(&mut self, owner: NodeHandle, key: I, value: V) -> Result<StoreOutcome<I>, RingError> {
		let node = self.node(owner)?;
		let owner_id = node.identifier;
		let (predecessor, successor) = (node.predecessor, node.successor);

		if node.has_data(&key) {
			info!(owner = %owner_id, key = %key, "owner already holds the key, store ignored");
			return Ok(StoreOutcome::AlreadyPresent { owner: owner_id });
		}

		self.node_mut(owner)?.store.insert(key, value.clone());
		info!(owner = %owner_id, key = %key, value = ?value, "stored");

		let mut replicas = Vec::with_capacity(2);
		for neighbor in [predecessor, successor] {
			if neighbor == owner {
				continue;
			}
			if self.put_if_missing(neighbor, key, &value)? {
				let neighbor_id = self.identifier(neighbor)?;
				info!(node = %neighbor_id, key = %key, "stored replica");
				replicas.push(neighbor_id);
			}
		}

		Ok(StoreOutcome::Stored { owner: owner_id, replicas })
	}

	/// Inserts a copy unless `handle` already holds `key`. Returns true if a
	/// copy was written.
	fn put_if_missing(&mut self, handle: NodeHandle, key: I, value: &V) -> Result<bool, RingError> {
		let node = self.node_mut(handle)?;
		if node.store.contains_key(&key) {
			return Ok(false);
		}
		node.store.insert(key, value.clone());
		Ok(true)
	}

	/// Re-replicates the entries of a departing node before it is unlinked.
	///
	/// Placement of each entry decides where new copies go:
	/// - also on both neighbors: onto the neighbor of each neighbor
	/// - also on the predecessor only: onto the predecessor's predecessor
	/// - also on the successor only: onto the successor's successor
	/// - on neither: onto both neighbors
	///
	/// A node that already holds the key, or the departing node itself, never
	/// receives a copy.
	pub(crate) fn hand_off(&mut self, departing: NodeHandle) -> Result<(), RingError> {
		let node = self.node(departing)?;
		let departing_id = node.identifier;
		let left = node.predecessor;
		let right = node.successor;
		let entries: Vec<(I, V)> = node.store.iter().map(|(k, v)| (*k, v.clone())).collect();

		let left_left = self.predecessor(left)?;
		let right_right = self.successor(right)?;

		for (key, value) in entries {
			let on_left = self.node(left)?.has_data(&key);
			let on_right = self.node(right)?.has_data(&key);

			let targets = match (on_left, on_right) {
				(true, true) => [left_left, right_right],
				(true, false) => [left_left, left_left],
				(false, true) => [right_right, right_right],
				(false, false) => [left, right],
			};

			for target in targets {
				if target == departing {
					continue;
				}
				if self.put_if_missing(target, key, &value)? {
					info!(
						from = %departing_id,
						node = %self.identifier(target)?,
						key = %key,
						"handed off entry"
					);
				} else {
					debug!(node = %self.identifier(target)?, key = %key, "hand-off target already holds the key");
				}
			}
		}
		Ok(())
	}

}
