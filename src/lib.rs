
use std::fmt::Debug;
use serde::{Serialize, Deserialize};


pub mod ring;
pub use ring::{Ring, RingNode, NodeHandle, RoutingPolicy};
pub use ring::message::{Message, Delivery, LookupHit, StoreOutcome};
pub use ring::state::{RingState, NodeState};

mod ring_id;
pub use ring_id::RingId;

mod identifier_space;
pub use identifier_space::IdentifierSpace;

pub mod error;
pub use error::RingError;

pub mod config;
pub use config::{SimulationConfig, Latency};

pub mod sim;
pub use sim::{Simulation, RequestId, Outcome};

pub mod service;
pub mod associate;
pub use associate::AssociateChannel;
pub use service::{RingService, RingHandle};



/// Payload carried by store entries and messages.
pub trait RingValue: Clone + Send + Sync + 'static + Debug + Serialize + for<'de> Deserialize<'de>{}
impl<T: Clone + Send + Sync + 'static + Debug + Serialize + for<'de> Deserialize<'de>> RingValue for T{}
