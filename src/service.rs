use crate::{associate::{AssociateChannel, AssociateRequest, AssociateResponse}, Ring, RingId, RingValue, RingError, RingState};

use std::{
	time::Duration,
	collections::BTreeMap,
	sync::{atomic::{AtomicU32, Ordering}, Arc},
	path::PathBuf,
};

use tokio::sync::mpsc::{channel, Sender, Receiver};
use tokio::task::JoinHandle;
use tokio::time::interval;

use tracing::{info, debug, warn, instrument};


/// Identifies where an operation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorId{
	/// Operations raised by the service itself.
	Internal,
	/// A client channel.
	Associate(u32),
}

#[derive(Debug)]
pub(crate) enum Operation<I: RingId, V: RingValue>{
	Private(PrivateOperation<I, V>),
	Public(AssociateRequest<I, V>),
}

#[derive(Debug)]
pub(crate) enum PrivateOperation<I: RingId, V: RingValue>{
	RegisterAssociate{conn: Sender<AssociateResponse<I, V>>},

	// Timed Operation Triggers
	Cleanup,
	SaveState,
}

impl<I: RingId, V: RingValue> From<PrivateOperation<I, V>> for Operation<I, V> {
	fn from(op: PrivateOperation<I, V>) -> Self {
		Operation::Private(op)
	}
}


/// Runs a ring on a single processor task. Every request is applied to the
/// ring to completion before the next one is read, so splices never overlap.
///
/// Acts like a builder: configure it, then `start` consumes it and returns a
/// `RingHandle`.
pub struct RingService<I: RingId, V: RingValue>{
	ring: Ring<I, V>,

	associates: BTreeMap<u32, Sender<AssociateResponse<I, V>>>,
	next_associate_id: Arc<AtomicU32>,

	// Operations channel
	channel_rx: Receiver<(ProcessorId, Operation<I, V>)>,
	channel_tx: Sender<(ProcessorId, Operation<I, V>)>,

	// Other
	file_path: Option<PathBuf>,
	maintenance_interval: Duration,
}

impl<I: RingId, V: RingValue> RingService<I, V>{

	pub fn new(ring: Ring<I, V>) -> Self {
		let (channel_tx, channel_rx) = channel(50);
		RingService {
			ring,
			associates: BTreeMap::new(),
			next_associate_id: Arc::new(AtomicU32::new(1)),
			channel_rx,
			channel_tx,
			file_path: None,
			maintenance_interval: Duration::from_secs(15),
		}
	}

	/// Restores the ring saved at `path` and keeps saving back to it.
	pub async fn from_file(path: PathBuf) -> Result<Self, RingError> {
		let state = RingState::from_file(&path).await?;
		let mut service = RingService::new(Ring::from_state(state)?);
		service.set_file(Some(path));
		Ok(service)
	}

	/// Save the ring state to `path` on every maintenance tick.
	pub fn set_file(&mut self, path: Option<PathBuf>) {
		self.file_path = path;
	}

	pub fn set_maintenance_interval(&mut self, every: Duration) {
		self.maintenance_interval = every;
	}

	/// Gets an AssociateChannel connected to this service. The channel will
	/// not return any results until the service is started.
	pub async fn get_associate(&self) -> Result<AssociateChannel<I, V>, RingError> {
		let associate_id = self.next_associate_id.fetch_add(1, Ordering::SeqCst);
		let (to_processor, from) = channel(50);

		self.channel_tx.send((ProcessorId::Associate(associate_id), PrivateOperation::RegisterAssociate { conn: to_processor }.into())).await
			.map_err(|_| RingError::ServiceStopped)?;

		Ok(AssociateChannel::new(associate_id, self.channel_tx.clone(), from, self.next_associate_id.clone()))
	}

	/// Starts the processor and maintenance tasks.
	pub async fn start(mut self) -> Result<RingHandle<I, V>, RingError> {
		// Start maintenance task
		let maintenance_channel = self.channel_tx.clone();
		let every = self.maintenance_interval;
		let maintenance_handle = tokio::spawn(async move{
			let mut interval = interval(every);
			loop{
				interval.tick().await;
				if maintenance_channel.send((ProcessorId::Internal, PrivateOperation::Cleanup.into())).await.is_err() {
					break;
				}
				if maintenance_channel.send((ProcessorId::Internal, PrivateOperation::SaveState.into())).await.is_err() {
					break;
				}
			}
		});

		let associate_channel = self.get_associate().await?;

		// Spawn operation task
		let processor_handle = tokio::spawn(async move{
			while let Some((id, operation)) = self.channel_rx.recv().await{
				debug!("Processing operation from {:?}: {:?}", id, operation);
				match operation{
					Operation::Private(operation) => {
						self.process_private(id, operation).await;
					},
					Operation::Public(operation) => {
						self.process_public(id, operation).await;
					},
				}
			}
			info!("processor task terminating");
		});

		Ok(RingHandle{
			maintenance_handle,
			processor_handle,

			associate_channel,
		})
	}


	async fn process_private(&mut self, channel_id: ProcessorId, operation: PrivateOperation<I, V>) {
		match operation{
			PrivateOperation::RegisterAssociate { conn } => {
				if let ProcessorId::Associate(id) = channel_id {
					self.associates.insert(id, conn);
				}
			},
			PrivateOperation::Cleanup => {
				// only the maintenance task may trigger this
				if let ProcessorId::Internal = channel_id {
					self.associates.retain(|_, ch| !ch.is_closed());
				}
			},
			PrivateOperation::SaveState => {
				if let ProcessorId::Internal = channel_id {
					self.save_state().await;
				}
			},
		}
	}

	#[instrument(skip_all, fields(associate = ?channel_id))]
	async fn process_public(&mut self, channel_id: ProcessorId, operation: AssociateRequest<I, V>) {
		let ring = &mut self.ring;
		let result = match operation{
			AssociateRequest::CreateNode { id } => {
				ring.create_node(id).map(|handle| AssociateResponse::Node { handle })
			},
			AssociateRequest::Join { via, id } => {
				ring.join(via, id).map(|handle| AssociateResponse::Node { handle })
			},
			AssociateRequest::Insert { via, lone } => {
				ring.insert(via, lone).map(|_| AssociateResponse::Inserted)
			},
			AssociateRequest::Remove { node } => {
				ring.remove(node).map(|successor| AssociateResponse::Removed { successor })
			},
			AssociateRequest::Store { from, key, value } => {
				ring.store(from, key, value).map(AssociateResponse::Stored)
			},
			AssociateRequest::Lookup { from, key } => {
				ring.lookup(from, &key).map(AssociateResponse::Found)
			},
			AssociateRequest::Send { from, to, payload } => {
				ring.send(from, to, payload).map(AssociateResponse::Delivered)
			},
			AssociateRequest::Enumerate { from } => {
				ring.enumerate(from).map(|ids| AssociateResponse::Members { ids })
			},
			AssociateRequest::Render { from } => {
				ring.render(from).map(|text| AssociateResponse::Rendered { text })
			},
			AssociateRequest::Resolve { id } => {
				Ok(AssociateResponse::Resolved { handle: ring.handle_of(&id) })
			},
			AssociateRequest::Snapshot => {
				ring.snapshot().map(AssociateResponse::State)
			},
		};

		let response = match result {
			Ok(response) => response,
			Err(error) => AssociateResponse::Error { error },
		};
		self.send_result(channel_id, response).await;
	}

	async fn send_result(&mut self, id: ProcessorId, result: AssociateResponse<I, V>) {
		match id{
			ProcessorId::Associate(id) => {
				if let Some(channel) = self.associates.get(&id) {
					if channel.send(result).await.is_err() {
						debug!("associate {} hung up before its response", id);
					}
				}
			},
			ProcessorId::Internal => {}, // Results for the internal channel are dropped.
		}
	}

	async fn save_state(&mut self) {
		let Some(path) = self.file_path.clone() else {
			return;
		};
		let state = match self.ring.snapshot() {
			Ok(state) => state,
			Err(e) => {
				warn!("could not capture ring state: {}", e);
				return;
			},
		};
		if let Err(e) = state.save(&path).await {
			warn!("could not save ring state to {:?}: {}", path, e);
		}
	}

}



/// A RingHandle represents a running RingService.
pub struct RingHandle<I: RingId, V: RingValue>{
	maintenance_handle: JoinHandle<()>,
	processor_handle: JoinHandle<()>,

	associate_channel: AssociateChannel<I, V>,
}

impl<I: RingId, V: RingValue> RingHandle<I, V> {
	/// Get a new AssociateChannel connected to the running service.
	pub async fn get_associate(&self) -> Result<AssociateChannel<I, V>, RingError> {
		self.associate_channel.duplicate().await
	}

	/// Force the service to stop
	pub async fn stop(self) {
		self.maintenance_handle.abort();
		let _ = self.maintenance_handle.await;
		self.processor_handle.abort();
		let _ = self.processor_handle.await;
	}
}
