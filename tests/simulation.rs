mod common;

use dht_ring::{
	Latency, Outcome, RequestId, RingError, RoutingPolicy, Simulation, SimulationConfig, StoreOutcome,
	NodeHandle,
};


fn joined(sim: &mut Simulation<u32, String>, request: RequestId) -> NodeHandle {
	match sim.take_outcome(request) {
		Some(Outcome::Joined { node, .. }) => node,
		other => panic!("expected a join, got {:?}", other),
	}
}

/// Ring [10, 30, 70] built through the event queue.
fn three_nodes(config: SimulationConfig) -> (Simulation<u32, String>, Vec<NodeHandle>) {
	common::init_tracing();
	let mut sim = Simulation::new(config);
	let n10 = sim.bootstrap(10).unwrap();
	let r30 = sim.submit_join(n10, 30);
	sim.run();
	let n30 = joined(&mut sim, r30);
	let r70 = sim.submit_join(n10, 70);
	sim.run();
	let n70 = joined(&mut sim, r70);
	(sim, vec![n10, n30, n70])
}


#[test]
fn requests_travel_one_hop_per_event() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));
	assert_eq!(sim.ring().enumerate(v[0]).unwrap(), vec![10, 30, 70]);

	let start = sim.now();
	let store = sim.submit_store(v[0], 50, "x".to_string());
	sim.run();
	// dispatch, then 10 -> 30 -> 70
	assert_eq!(sim.now(), start + 3);
	match sim.take_outcome(store) {
		Some(Outcome::Stored(outcome)) => {
			assert_eq!(outcome, StoreOutcome::Stored { owner: 70, replicas: vec![30, 10] });
		},
		other => panic!("unexpected outcome {:?}", other),
	}

	let lookup = sim.submit_lookup(v[1], 50);
	sim.run();
	match sim.take_outcome(lookup) {
		Some(Outcome::Found(hit)) => {
			assert_eq!(hit.value, "x");
			assert_eq!(hit.holder, 30);
			assert_eq!(hit.hops, 0);
		},
		other => panic!("unexpected outcome {:?}", other),
	}
}

#[test]
fn send_records_its_path() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));

	let send = sim.submit_send(v[0], 70, "hi".to_string());
	let lost = sim.submit_send(v[0], 50, "lost".to_string());
	sim.run();

	match sim.take_outcome(send) {
		Some(Outcome::Delivered(delivery)) => {
			assert_eq!(delivery.receiver, 70);
			assert_eq!(delivery.hops, 2);
			assert_eq!(delivery.path, vec![10, 30, 70]);
		},
		other => panic!("unexpected outcome {:?}", other),
	}
	assert!(matches!(sim.take_outcome(lost), Some(Outcome::Failed(RingError::TargetNotFound { .. }))));
	assert_eq!(sim.ring().node(v[2]).unwrap().inbox().len(), 1);
}

#[test]
fn failures_are_reported_as_outcomes() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));

	let missing = sim.submit_lookup(v[0], 99);
	let duplicate = sim.submit_join(v[1], 70);
	sim.run();

	assert!(matches!(sim.outcome(missing), Some(Outcome::Failed(RingError::KeyNotFound { .. }))));
	assert!(matches!(sim.outcome(duplicate), Some(Outcome::Failed(RingError::DuplicateIdentifier { .. }))));
	assert!(sim.outcome(duplicate).unwrap().is_failure());
	assert_eq!(sim.ring().len(), 3);
}

#[test]
fn removal_runs_through_the_queue() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));

	let remove = sim.submit_remove(v[2]);
	assert!(sim.ring().contains(&70));
	sim.run();

	assert!(matches!(sim.outcome(remove), Some(Outcome::Removed { successor: Some(s) }) if *s == v[0]));
	assert_eq!(sim.ring().enumerate(v[0]).unwrap(), vec![10, 30]);
}

#[test]
fn packet_fails_when_its_node_leaves() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));

	// both land on the same tick; the send goes first and forwards to 30,
	// which is gone by the time the next hop runs
	let send = sim.submit_send(v[0], 70, "hi".to_string());
	let remove = sim.submit_remove(v[1]);
	sim.run();

	assert!(matches!(sim.outcome(remove), Some(Outcome::Removed { .. })));
	assert!(matches!(sim.outcome(send), Some(Outcome::Failed(RingError::UnknownNode { .. }))));
}

#[test]
fn equal_ticks_run_in_submission_order() {
	let (mut sim, v) = three_nodes(SimulationConfig::fixed(1, 1));

	let first = sim.submit_store(v[0], 50, "first".to_string());
	let second = sim.submit_store(v[0], 50, "second".to_string());
	sim.run();

	assert!(matches!(sim.outcome(first), Some(Outcome::Stored(StoreOutcome::Stored { .. }))));
	assert!(matches!(sim.outcome(second), Some(Outcome::Stored(StoreOutcome::AlreadyPresent { owner: 70 }))));
	assert_eq!(sim.ring().lookup(v[0], &50).unwrap().value, "first");
}

#[test]
fn run_until_stops_at_the_given_tick() {
	common::init_tracing();
	let mut sim: Simulation<u32, String> = Simulation::new(SimulationConfig::fixed(0, 5));
	let n10 = sim.bootstrap(10).unwrap();

	let join = sim.submit_join(n10, 20);
	sim.run_until(3);
	assert_eq!(sim.now(), 3);
	assert_eq!(sim.pending(), 1);
	assert!(sim.outcome(join).is_none());

	sim.run_until(5);
	assert_eq!(sim.pending(), 0);
	assert!(matches!(sim.outcome(join), Some(Outcome::Joined { id: 20, .. })));
}

#[test]
fn concurrent_joins_produce_an_ordered_ring() {
	common::init_tracing();
	let ids = [55u32, 3, 91, 27, 64, 12, 80, 38, 7, 46];
	let mut sim: Simulation<u32, String> = Simulation::new(SimulationConfig::default());
	let root = sim.bootstrap(100).unwrap();

	let requests: Vec<RequestId> = ids.iter().map(|id| sim.submit_join(root, *id)).collect();
	sim.run();

	for request in requests {
		assert!(matches!(sim.outcome(request), Some(Outcome::Joined { .. })));
	}
	let mut expected: Vec<u32> = ids.to_vec();
	expected.push(100);
	expected.sort();
	assert_eq!(sim.ring().enumerate(root).unwrap(), expected);
}

fn replay(seed: u64) -> (u64, Vec<u32>, Vec<String>) {
	let mut sim: Simulation<u32, String> = Simulation::new(SimulationConfig { seed, ..SimulationConfig::default() });
	let root = sim.bootstrap(500).unwrap();

	let mut requests = Vec::new();
	for id in [120u32, 800, 40, 330, 610] {
		requests.push(sim.submit_join(root, id));
	}
	for key in [100u32, 350, 700] {
		requests.push(sim.submit_store(root, key, format!("v{}", key)));
	}
	requests.push(sim.submit_lookup(root, 350));
	requests.push(sim.submit_send(root, 330, "hello".to_string()));
	sim.run();

	let outcomes = requests.iter().map(|request| format!("{:?}", sim.outcome(*request))).collect();
	(sim.now(), sim.ring().enumerate(root).unwrap(), outcomes)
}

#[test]
fn equal_seeds_replay_identically() {
	common::init_tracing();
	assert_eq!(replay(42), replay(42));
	assert_eq!(replay(7), replay(7));
}

#[test]
fn config_loads_from_json() {
	let config = SimulationConfig::from_json(r#"{"seed": 7, "routing": "shortest", "hop_latency": {"min": 2, "max": 4}}"#).unwrap();
	assert_eq!(config.seed, 7);
	assert_eq!(config.routing, RoutingPolicy::Shortest);
	assert_eq!(config.hop_latency, Latency::new(2, 4));
	assert_eq!(config.dispatch_latency, SimulationConfig::default().dispatch_latency);

	assert!(matches!(SimulationConfig::from_json("{\"seed\": -1}"), Err(RingError::Serialization(_))));
}

#[test]
fn routing_policy_comes_from_the_config() {
	common::init_tracing();
	let config = SimulationConfig { routing: RoutingPolicy::Shortest, ..SimulationConfig::fixed(0, 1) };
	let mut sim: Simulation<u32, String> = Simulation::new(config);
	let n10 = sim.bootstrap(10).unwrap();
	for id in [30, 70, 90] {
		sim.ring_mut().join(n10, id).unwrap();
	}
	assert_eq!(sim.ring().routing(), RoutingPolicy::Shortest);

	let start = sim.now();
	let back = sim.submit_send(n10, 90, "b".to_string());
	sim.run();
	// dispatch, then one hop backwards
	assert_eq!(sim.now(), start + 2);
	match sim.take_outcome(back) {
		Some(Outcome::Delivered(delivery)) => {
			assert_eq!(delivery.path, vec![10, 90]);
			assert_eq!(delivery.hops, 1);
		},
		other => panic!("unexpected outcome {:?}", other),
	}

	// equal distance both ways: the successor side wins
	let tie = sim.submit_send(n10, 70, "t".to_string());
	let lost = sim.submit_send(n10, 50, "lost".to_string());
	sim.run();
	match sim.take_outcome(tie) {
		Some(Outcome::Delivered(delivery)) => assert_eq!(delivery.path, vec![10, 30, 70]),
		other => panic!("unexpected outcome {:?}", other),
	}
	assert!(matches!(sim.take_outcome(lost), Some(Outcome::Failed(RingError::TargetNotFound { .. }))));
}
