//! Simulation configuration, loaded from JSON.

use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{RingError, RoutingPolicy};


/// An inclusive range of virtual ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency{
	pub min: u64,
	pub max: u64,
}

impl Latency {
	pub fn new(min: u64, max: u64) -> Self {
		Latency { min, max }
	}

	/// A latency that always takes `ticks`.
	pub fn fixed(ticks: u64) -> Self {
		Latency { min: ticks, max: ticks }
	}

	/// Draws a delay. A reversed range is read as its swapped form.
	pub fn sample<R: Rng>(&self, rng: &mut R) -> u64 {
		let (low, high) = if self.min <= self.max { (self.min, self.max) } else { (self.max, self.min) };
		rng.gen_range(low..=high)
	}
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig{
	/// Seed for every random delay; equal seeds replay identically.
	pub seed: u64,
	/// Ticks between submitting a join, store, lookup or send and its first hop.
	pub dispatch_latency: Latency,
	/// Ticks per forwarding hop.
	pub hop_latency: Latency,
	/// Ticks between submitting a removal and the splice.
	pub remove_latency: Latency,
	pub routing: RoutingPolicy,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		SimulationConfig {
			seed: 0,
			dispatch_latency: Latency::new(1, 5),
			hop_latency: Latency::new(1, 2),
			remove_latency: Latency::fixed(1),
			routing: RoutingPolicy::Successor,
		}
	}
}

impl SimulationConfig {
	pub fn from_json(json: &str) -> Result<Self, RingError> {
		Ok(serde_json::from_str(json)?)
	}

	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RingError> {
		let json = fs::read_to_string(&path).await?;
		Self::from_json(&json)
	}

	/// Every delay fixed at `ticks`; handy for deterministic scenarios.
	pub fn fixed(seed: u64, ticks: u64) -> Self {
		SimulationConfig {
			seed,
			dispatch_latency: Latency::fixed(ticks),
			hop_latency: Latency::fixed(ticks),
			remove_latency: Latency::fixed(ticks),
			routing: RoutingPolicy::Successor,
		}
	}
}
