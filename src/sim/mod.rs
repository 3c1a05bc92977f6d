//! Discrete-event simulation of the ring.
//!
//! Requests are submitted against a node and then travel as packets, one hop
//! per scheduled event, with a random latency drawn from a seeded RNG before
//! every hop. Other events (joins, removals, other packets) may run between
//! two hops of the same request, but every event runs to completion, so a
//! splice is never interleaved with anything else.
//! Events due at the same tick run in the order they were scheduled.

use std::{
	cmp::Reverse,
	collections::{BTreeMap, BinaryHeap},
	fmt,
};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, debug, warn};

use crate::{
	Ring, RingId, RingValue, RingError, SimulationConfig, NodeHandle, RoutingPolicy,
	ring::message::{Message, Delivery, LookupHit, StoreOutcome},
};

mod packet;
use packet::{Packet, PacketType, Event, Scheduled};


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "req-{}", self.0)
	}
}


/// How a submitted request ended.
#[derive(Debug)]
pub enum Outcome<I: RingId, V: RingValue>{
	Joined{node: NodeHandle, id: I},
	Removed{successor: Option<NodeHandle>},
	Stored(StoreOutcome<I>),
	Found(LookupHit<I, V>),
	Delivered(Delivery<I>),
	Failed(RingError),
}

impl<I: RingId, V: RingValue> Outcome<I, V> {
	pub fn is_failure(&self) -> bool {
		matches!(self, Outcome::Failed(_))
	}
}


pub struct Simulation<I: RingId, V: RingValue>{
	ring: Ring<I, V>,
	config: SimulationConfig,
	rng: StdRng,

	now: u64,
	next_seq: u64,
	next_request: u64,
	queue: BinaryHeap<Reverse<Scheduled<I, V>>>,

	/// Identifiers visited so far by each in-flight send, for its delivery path.
	paths: BTreeMap<RequestId, Vec<I>>,
	outcomes: BTreeMap<RequestId, Outcome<I, V>>,
}

impl<I: RingId, V: RingValue> Simulation<I, V>{

	pub fn new(config: SimulationConfig) -> Self {
		Self::with_ring(Ring::new(), config)
	}

	pub fn with_ring(mut ring: Ring<I, V>, config: SimulationConfig) -> Self {
		ring.set_routing(config.routing);
		let rng = StdRng::seed_from_u64(config.seed);
		Simulation {
			ring,
			config,
			rng,
			now: 0,
			next_seq: 0,
			next_request: 0,
			queue: BinaryHeap::new(),
			paths: BTreeMap::new(),
			outcomes: BTreeMap::new(),
		}
	}

	pub fn ring(&self) -> &Ring<I, V> {
		&self.ring
	}

	pub fn ring_mut(&mut self) -> &mut Ring<I, V> {
		&mut self.ring
	}

	pub fn config(&self) -> &SimulationConfig {
		&self.config
	}

	/// Current virtual time.
	pub fn now(&self) -> u64 {
		self.now
	}

	/// Number of events still queued.
	pub fn pending(&self) -> usize {
		self.queue.len()
	}

	pub fn outcome(&self, request: RequestId) -> Option<&Outcome<I, V>> {
		self.outcomes.get(&request)
	}

	pub fn take_outcome(&mut self, request: RequestId) -> Option<Outcome<I, V>> {
		self.outcomes.remove(&request)
	}

	/// Creates the first node of a ring immediately, outside the event queue.
	pub fn bootstrap(&mut self, id: I) -> Result<NodeHandle, RingError> {
		self.ring.create_node(id)
	}

	pub fn submit_join(&mut self, via: NodeHandle, id: I) -> RequestId {
		self.submit_packet(via, PacketType::Join { id })
	}

	pub fn submit_store(&mut self, from: NodeHandle, key: I, value: V) -> RequestId {
		self.submit_packet(from, PacketType::Store { key, value })
	}

	pub fn submit_lookup(&mut self, from: NodeHandle, key: I) -> RequestId {
		self.submit_packet(from, PacketType::Lookup { key })
	}

	/// The sender identifier is read when the request is dispatched.
	pub fn submit_send(&mut self, from: NodeHandle, to: I, payload: V) -> RequestId {
		let request = self.new_request();
		let sender = match self.ring.node(from) {
			Ok(node) => node.identifier(),
			Err(e) => {
				self.finish(request, Outcome::Failed(e));
				return request;
			},
		};
		let packet_type = PacketType::Message { message: Message::new(sender, to, payload) };
		let delay = self.config.dispatch_latency.sample(&mut self.rng);
		self.schedule(delay, Event::Route { packet: Packet::new(request, from, packet_type) });
		request
	}

	pub fn submit_remove(&mut self, node: NodeHandle) -> RequestId {
		let request = self.new_request();
		let delay = self.config.remove_latency.sample(&mut self.rng);
		self.schedule(delay, Event::Remove { request, node });
		request
	}

	fn submit_packet(&mut self, origin: NodeHandle, packet_type: PacketType<I, V>) -> RequestId {
		let request = self.new_request();
		let delay = self.config.dispatch_latency.sample(&mut self.rng);
		self.schedule(delay, Event::Route { packet: Packet::new(request, origin, packet_type) });
		request
	}

	fn new_request(&mut self) -> RequestId {
		let request = RequestId(self.next_request);
		self.next_request += 1;
		request
	}

	fn schedule(&mut self, delay: u64, event: Event<I, V>) {
		let scheduled = Scheduled {
			at: self.now + delay,
			seq: self.next_seq,
			event,
		};
		self.next_seq += 1;
		self.queue.push(Reverse(scheduled));
	}

	/// Runs the next event. Returns false once the queue is empty.
	pub fn step(&mut self) -> bool {
		let Some(Reverse(scheduled)) = self.queue.pop() else {
			return false;
		};
		self.now = scheduled.at;

		match scheduled.event {
			Event::Route { packet } => self.process_packet(packet),
			Event::Remove { request, node } => {
				let outcome = match self.ring.remove(node) {
					Ok(successor) => Outcome::Removed { successor },
					Err(e) => Outcome::Failed(e),
				};
				self.finish(request, outcome);
			},
		}
		true
	}

	/// Runs until no events are left.
	pub fn run(&mut self) {
		while self.step() {}
	}

	/// Runs every event due at or before `until`, then advances the clock to
	/// `until`.
	pub fn run_until(&mut self, until: u64) {
		while let Some(Reverse(next)) = self.queue.peek() {
			if next.at > until {
				break;
			}
			self.step();
		}
		self.now = self.now.max(until);
	}

	fn process_packet(&mut self, mut packet: Packet<I, V>) {
		let at_id = match self.ring.node(packet.at) {
			Ok(node) => node.identifier(),
			Err(e) => {
				warn!(tick = self.now, request = %packet.request, "packet lost, its node left the ring");
				self.finish(packet.request, Outcome::Failed(e));
				return;
			},
		};
		debug!(tick = self.now, request = %packet.request, node = %at_id, hops = packet.hops, "packet arrived");

		match self.try_complete(&packet, at_id) {
			Ok(Some(outcome)) => {
				self.finish(packet.request, outcome);
				return;
			},
			Ok(None) => {},
			Err(e) => {
				self.finish(packet.request, Outcome::Failed(e));
				return;
			},
		}

		// the direction of a message is fixed once, at its first node
		if packet.hops == 0 && self.ring.routing() == RoutingPolicy::Shortest {
			if let PacketType::Message { message } = &packet.packet_type {
				packet.backward = self.heads_backward(packet.at, &message.to);
			}
		}

		let next = match self.ring.node(packet.at) {
			Ok(node) if packet.backward => node.predecessor(),
			Ok(node) => node.successor(),
			Err(e) => {
				self.finish(packet.request, Outcome::Failed(e));
				return;
			},
		};

		if next == packet.origin || packet.hops + 1 >= self.ring.len() {
			let outcome = self.exhausted(&packet);
			self.finish(packet.request, outcome);
			return;
		}

		debug!(tick = self.now, request = %packet.request, node = %at_id, "forwarding");
		let delay = self.config.hop_latency.sample(&mut self.rng);
		self.schedule(delay, Event::Route { packet: packet.forward_to(next) });
	}

	/// Handles the packet at its current node if this is where it ends.
	fn try_complete(&mut self, packet: &Packet<I, V>, at_id: I) -> Result<Option<Outcome<I, V>>, RingError> {
		let at = packet.at;
		match &packet.packet_type {
			PacketType::Join { id } => {
				if self.ring.position_matches(at, id)? {
					let node = self.ring.join_after(at, *id)?;
					return Ok(Some(Outcome::Joined { node, id: *id }));
				}
			},
			PacketType::Store { key, value } => {
				if self.ring.is_responsible(at, key)? {
					let stored = self.ring.store_at(at, *key, value.clone())?;
					return Ok(Some(Outcome::Stored(stored)));
				}
			},
			PacketType::Lookup { key } => {
				if let Some(value) = self.ring.node(at)?.get(key) {
					info!(tick = self.now, node = %at_id, key = %key, hops = packet.hops, "found data");
					return Ok(Some(Outcome::Found(LookupHit {
						key: *key,
						value: value.clone(),
						holder: at_id,
						hops: packet.hops,
					})));
				}
			},
			PacketType::Message { message } => {
				let path = self.paths.entry(packet.request).or_default();
				path.push(at_id);
				if at_id == message.to {
					let path = self.paths.remove(&packet.request).unwrap_or_default();
					self.ring.deliver(at, message.clone())?;
					return Ok(Some(Outcome::Delivered(Delivery {
						receiver: at_id,
						hops: packet.hops,
						path,
					})));
				}
			},
		}
		Ok(None)
	}

	/// True if the shortest route from `from` to `target` starts on the
	/// predecessor side. Unknown targets go forward.
	fn heads_backward(&self, from: NodeHandle, target: &I) -> bool {
		let Ok(Some((_, path))) = self.ring.route_shortest(from, target) else {
			return false;
		};
		let successor = self.ring.node(from)
			.and_then(|node| self.ring.node(node.successor()))
			.map(|node| node.identifier());
		match (path.get(1), successor) {
			(Some(second), Ok(successor)) => *second != successor,
			_ => false,
		}
	}

	/// The packet came back around without completing.
	fn exhausted(&mut self, packet: &Packet<I, V>) -> Outcome<I, V> {
		match &packet.packet_type {
			// a closed ring always has a position and an owner, so these only
			// run out under churn; finish them in one step from here
			PacketType::Join { id } => match self.ring.join(packet.at, *id) {
				Ok(node) => Outcome::Joined { node, id: *id },
				Err(e) => Outcome::Failed(e),
			},
			PacketType::Store { key, value } => match self.ring.store(packet.at, *key, value.clone()) {
				Ok(stored) => Outcome::Stored(stored),
				Err(e) => Outcome::Failed(e),
			},
			PacketType::Lookup { key } => {
				warn!(tick = self.now, key = %key, "key not found in the ring");
				Outcome::Failed(RingError::key_not_found(key))
			},
			PacketType::Message { message } => {
				self.paths.remove(&packet.request);
				warn!(tick = self.now, to = %message.to, "message target not found in the ring, dropped");
				Outcome::Failed(RingError::target_not_found(message.to))
			},
		}
	}

	fn finish(&mut self, request: RequestId, outcome: Outcome<I, V>) {
		match &outcome {
			Outcome::Failed(e) => warn!(tick = self.now, request = %request, error = %e, "request failed"),
			_ => info!(tick = self.now, request = %request, "request completed"),
		}
		self.paths.remove(&request);
		self.outcomes.insert(request, outcome);
	}

}
