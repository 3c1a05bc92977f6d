use tracing::{info, debug, warn};

use crate::{RingId, RingValue, RingError};

use super::{Ring, NodeHandle, RoutingPolicy, message::{Message, Delivery, LookupHit}};



impl<I: RingId, V: RingValue> Ring<I, V>{

	/// Looks `key` up hop by hop along successors, starting with `from`
	/// itself. The first node holding a copy answers.
	pub fn lookup(&self, from: NodeHandle, key: &I) -> Result<LookupHit<I, V>, RingError> {
		for (hops, current) in self.walk(from)?.enumerate() {
			let node = self.node(current)?;
			if let Some(value) = node.get(key) {
				info!(node = %node.identifier, key = %key, hops, "found data");
				return Ok(LookupHit {
					key: *key,
					value: value.clone(),
					holder: node.identifier,
					hops,
				});
			}
			debug!(node = %node.identifier, key = %key, "forwarding data request");
		}

		warn!(key = %key, "key not found in the ring");
		Err(RingError::key_not_found(key))
	}

	/// Sends `payload` from `from` to the node identified by `target`,
	/// following the ring's routing policy.
	pub fn send(&mut self, from: NodeHandle, target: I, payload: V) -> Result<Delivery<I>, RingError> {
		let sender = self.identifier(from)?;
		info!(from = %sender, to = %target, "sending message");

		let route = match self.routing {
			RoutingPolicy::Successor => self.route_forward(from, &target)?,
			RoutingPolicy::Shortest => self.route_shortest(from, &target)?,
		};

		match route {
			Some((receiver, path)) => {
				self.deliver(receiver, Message::new(sender, target, payload))?;
				Ok(Delivery {
					receiver: target,
					hops: path.len() - 1,
					path,
				})
			},
			None => {
				warn!(from = %sender, to = %target, "message target not found in the ring, dropped");
				Err(RingError::target_not_found(target))
			},
		}
	}

	/// Successor-only route. Returns the receiver and the identifiers visited.
	fn route_forward(&self, from: NodeHandle, target: &I) -> Result<Option<(NodeHandle, Vec<I>)>, RingError> {
		let mut path = Vec::new();
		for current in self.walk(from)? {
			let id = self.identifier(current)?;
			path.push(id);
			if id == *target {
				return Ok(Some((current, path)));
			}
			debug!(node = %id, to = %target, "forwarding message");
		}
		Ok(None)
	}

	/// Probes the successor and predecessor directions in lockstep, one hop
	/// each per round. Ties go to the successor side.
	pub(crate) fn route_shortest(&self, from: NodeHandle, target: &I) -> Result<Option<(NodeHandle, Vec<I>)>, RingError> {
		let start = self.identifier(from)?;
		if start == *target {
			return Ok(Some((from, vec![start])));
		}

		let mut forward = (from, vec![start]);
		let mut backward = (from, vec![start]);

		// the two directions meet halfway, covering every node between them
		let rounds = self.len() / 2;
		for _ in 0..rounds {
			for (cursor, step_forward) in [(&mut forward, true), (&mut backward, false)] {
				let next = if step_forward {
					self.successor(cursor.0)?
				} else {
					self.predecessor(cursor.0)?
				};
				if next == from {
					continue;
				}
				let id = self.identifier(next)?;
				cursor.0 = next;
				cursor.1.push(id);
				if id == *target {
					return Ok(Some((next, cursor.1.clone())));
				}
				debug!(node = %id, to = %target, "forwarding message");
			}
		}
		Ok(None)
	}

	pub(crate) fn deliver(&mut self, receiver: NodeHandle, message: Message<I, V>) -> Result<(), RingError> {
		let node = self.node_mut(receiver)?;
		info!(node = %node.identifier, from = %message.from, payload = ?message.payload, "message delivered");
		node.inbox.push(message);
		Ok(())
	}

}
