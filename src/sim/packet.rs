
use std::cmp::Ordering;

use crate::{RingId, RingValue, ring::{NodeHandle, message::Message}};

use super::RequestId;



/// A request travelling around the ring, one hop per event.
#[derive(Debug)]
pub(crate) struct Packet<I: RingId, V: RingValue>{
	pub request: RequestId,
	/// Node the request was submitted to; coming back here ends the walk.
	pub origin: NodeHandle,
	/// Node currently handling the packet.
	pub at: NodeHandle,
	pub hops: usize,
	/// Travel along predecessors instead of successors.
	pub backward: bool,
	pub packet_type: PacketType<I, V>,
}

#[derive(Debug)]
pub(crate) enum PacketType<I: RingId, V: RingValue>{
	Join{id: I},
	Store{key: I, value: V},
	Lookup{key: I},
	Message{message: Message<I, V>},
}


impl<I: RingId, V: RingValue> Packet<I, V>{
	pub fn new(request: RequestId, origin: NodeHandle, packet_type: PacketType<I, V>) -> Self {
		Self{
			request,
			origin,
			at: origin,
			hops: 0,
			backward: false,
			packet_type,
		}
	}

	pub fn forward_to(self, next: NodeHandle) -> Self {
		Self{
			at: next,
			hops: self.hops + 1,
			..self
		}
	}
}


#[derive(Debug)]
pub(crate) enum Event<I: RingId, V: RingValue>{
	Route{packet: Packet<I, V>},
	Remove{request: RequestId, node: NodeHandle},
}


/// An event waiting in the scheduler queue. Ordered by time, then by the
/// order it was scheduled in.
#[derive(Debug)]
pub(crate) struct Scheduled<I: RingId, V: RingValue>{
	pub at: u64,
	pub seq: u64,
	pub event: Event<I, V>,
}

impl<I: RingId, V: RingValue> PartialEq for Scheduled<I, V> {
	fn eq(&self, other: &Self) -> bool {
		self.at == other.at && self.seq == other.seq
	}
}

impl<I: RingId, V: RingValue> Eq for Scheduled<I, V> {}

impl<I: RingId, V: RingValue> PartialOrd for Scheduled<I, V> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<I: RingId, V: RingValue> Ord for Scheduled<I, V> {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.at, self.seq).cmp(&(other.at, other.seq))
	}
}
