
use std::sync::{atomic::{AtomicU32, Ordering}, Arc};

use tokio::{sync::mpsc::{Sender, Receiver, channel}, time::timeout};
use tracing::{instrument, info};

use crate::{
	RingId, RingValue, RingError, NodeHandle, RingState,
	ring::message::{Delivery, LookupHit, StoreOutcome},
	service::{ProcessorId, Operation, PrivateOperation},
};


/// A client connection to a running `RingService`. Requests sent on one
/// channel are answered in order on that same channel.
pub struct AssociateChannel<I: RingId, V: RingValue>{
	to: Sender<(ProcessorId, Operation<I, V>)>,
	from: Receiver<AssociateResponse<I, V>>,
	associate_id: u32,
	next_associate_id: Arc<AtomicU32>,
}


impl<I: RingId, V: RingValue> AssociateChannel<I, V> {

	pub(crate) fn new(associate_id: u32, to: Sender<(ProcessorId, Operation<I, V>)>, from: Receiver<AssociateResponse<I, V>>, next_associate_id: Arc<AtomicU32>) -> Self{
		info!("creating new associate. new id is {}", associate_id);
		AssociateChannel {
			to,
			from,
			associate_id,
			next_associate_id,
		}
	}

	/// Opens another channel to the same service.
	#[instrument(skip_all)]
	pub async fn duplicate(&self) -> Result<Self, RingError> {
		let (new_to, new_from) = channel(50);
		let new_id = self.next_associate_id.fetch_add(1, Ordering::SeqCst);
		info!("duplicating associate. new id is {}", new_id);
		self.to.send((ProcessorId::Associate(new_id), PrivateOperation::RegisterAssociate { conn: new_to }.into())).await
			.map_err(|_| RingError::ServiceStopped)?;
		Ok(Self {
			to: self.to.clone(),
			from: new_from,
			associate_id: new_id,
			next_associate_id: self.next_associate_id.clone(),
		})
	}

	pub fn id(&self) -> u32 {
		self.associate_id
	}

	pub async fn send_op(&self, msg: AssociateRequest<I, V>) -> Result<(), RingError> {
		self.to.send((ProcessorId::Associate(self.associate_id), Operation::Public(msg))).await
			.map_err(|_| RingError::ServiceStopped)
	}

	/// Waits up to ten seconds for the next response.
	pub async fn recv_op(&mut self) -> Option<AssociateResponse<I, V>>{
		let limit = tokio::time::Duration::from_secs(10);
		match timeout(limit, self.from.recv()).await {
			Ok(msg) => msg,
			Err(_) => None,
		}
	}

	/// Sends a request and waits for its response.
	pub async fn request(&mut self, msg: AssociateRequest<I, V>) -> Result<AssociateResponse<I, V>, RingError> {
		self.send_op(msg).await?;
		match self.recv_op().await {
			Some(AssociateResponse::Error { error }) => Err(error),
			Some(response) => Ok(response),
			None => Err(RingError::ServiceStopped),
		}
	}

	pub async fn create_node(&mut self, id: I) -> Result<NodeHandle, RingError> {
		match self.request(AssociateRequest::CreateNode { id }).await? {
			AssociateResponse::Node { handle } => Ok(handle),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn join(&mut self, via: NodeHandle, id: I) -> Result<NodeHandle, RingError> {
		match self.request(AssociateRequest::Join { via, id }).await? {
			AssociateResponse::Node { handle } => Ok(handle),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn remove(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, RingError> {
		match self.request(AssociateRequest::Remove { node }).await? {
			AssociateResponse::Removed { successor } => Ok(successor),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn store(&mut self, from: NodeHandle, key: I, value: V) -> Result<StoreOutcome<I>, RingError> {
		match self.request(AssociateRequest::Store { from, key, value }).await? {
			AssociateResponse::Stored(outcome) => Ok(outcome),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn lookup(&mut self, from: NodeHandle, key: I) -> Result<LookupHit<I, V>, RingError> {
		match self.request(AssociateRequest::Lookup { from, key }).await? {
			AssociateResponse::Found(hit) => Ok(hit),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn send(&mut self, from: NodeHandle, to: I, payload: V) -> Result<Delivery<I>, RingError> {
		match self.request(AssociateRequest::Send { from, to, payload }).await? {
			AssociateResponse::Delivered(delivery) => Ok(delivery),
			_ => Err(RingError::ServiceStopped),
		}
	}

	pub async fn enumerate(&mut self, from: NodeHandle) -> Result<Vec<I>, RingError> {
		match self.request(AssociateRequest::Enumerate { from }).await? {
			AssociateResponse::Members { ids } => Ok(ids),
			_ => Err(RingError::ServiceStopped),
		}
	}

}




#[derive(Debug)]
pub enum AssociateRequest<I: RingId, V: RingValue>{
	CreateNode{id: I},
	Join{via: NodeHandle, id: I},
	Insert{via: NodeHandle, lone: NodeHandle},
	Remove{node: NodeHandle},

	Store{from: NodeHandle, key: I, value: V},
	Lookup{from: NodeHandle, key: I},
	Send{from: NodeHandle, to: I, payload: V},

	Enumerate{from: NodeHandle},
	Render{from: NodeHandle},
	Resolve{id: I},
	Snapshot,
}

#[derive(Debug)]
pub enum AssociateResponse<I: RingId, V: RingValue>{
	Node{handle: NodeHandle},
	Inserted,
	Removed{successor: Option<NodeHandle>},

	Stored(StoreOutcome<I>),
	Found(LookupHit<I, V>),
	Delivered(Delivery<I>),

	Members{ids: Vec<I>},
	Rendered{text: String},
	Resolved{handle: Option<NodeHandle>},
	State(RingState<I, V>),

	Error{error: RingError},
}
