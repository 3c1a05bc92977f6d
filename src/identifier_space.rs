use std::collections::BTreeMap;

use crate::{RingId, RingError, ring::NodeHandle};

/// Bookkeeping of the identifiers currently in use, scoped to one ring.
/// Every live node is registered here with the handle of its arena slot.
#[derive(Debug, Clone)]
pub struct IdentifierSpace<I: RingId>{
	live: BTreeMap<I, NodeHandle>,
}

impl<I: RingId> IdentifierSpace<I> {
	pub fn new() -> Self {
		IdentifierSpace { live: BTreeMap::new() }
	}

	/// Fails with `DuplicateIdentifier` if `id` is taken.
	pub fn check(&self, id: &I) -> Result<(), RingError> {
		if self.live.contains_key(id) {
			return Err(RingError::duplicate(id));
		}
		Ok(())
	}

	pub fn claim(&mut self, id: I, handle: NodeHandle) -> Result<(), RingError> {
		self.check(&id)?;
		self.live.insert(id, handle);
		Ok(())
	}

	/// Frees `id`, returning the handle it was bound to.
	pub fn release(&mut self, id: &I) -> Option<NodeHandle> {
		self.live.remove(id)
	}

	pub fn contains(&self, id: &I) -> bool {
		self.live.contains_key(id)
	}

	pub fn resolve(&self, id: &I) -> Option<NodeHandle> {
		self.live.get(id).copied()
	}

	pub fn len(&self) -> usize {
		self.live.len()
	}

	pub fn is_empty(&self) -> bool {
		self.live.is_empty()
	}

	/// Smallest live identifier and its node.
	pub fn min(&self) -> Option<(I, NodeHandle)> {
		self.live.iter().next().map(|(id, handle)| (*id, *handle))
	}

	pub fn ids(&self) -> impl Iterator<Item = &I> {
		self.live.keys()
	}
}

impl<I: RingId> Default for IdentifierSpace<I> {
	fn default() -> Self {
		Self::new()
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	fn handle(index: u32) -> NodeHandle {
		NodeHandle::new(index, 0)
	}

	#[test]
	fn rejects_duplicates() {
		let mut space = IdentifierSpace::new();
		space.claim(10u32, handle(0)).unwrap();
		assert!(matches!(space.claim(10, handle(1)), Err(RingError::DuplicateIdentifier { .. })));
		assert_eq!(space.resolve(&10), Some(handle(0)));
		assert_eq!(space.len(), 1);
	}

	#[test]
	fn released_identifier_is_reusable() {
		let mut space = IdentifierSpace::new();
		space.claim(50u32, handle(0)).unwrap();
		assert_eq!(space.release(&50), Some(handle(0)));
		assert!(space.is_empty());
		space.claim(50, handle(1)).unwrap();
		assert_eq!(space.resolve(&50), Some(handle(1)));
	}

	#[test]
	fn min_is_smallest_identifier() {
		let mut space = IdentifierSpace::new();
		space.claim(70i64, handle(0)).unwrap();
		space.claim(-3, handle(1)).unwrap();
		space.claim(30, handle(2)).unwrap();
		assert_eq!(space.min(), Some((-3, handle(1))));
	}
}
