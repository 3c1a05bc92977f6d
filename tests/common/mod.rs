
use dht_ring::{Ring, NodeHandle};
use tracing_subscriber::EnvFilter;


/// Logs to the test writer, filtered by RUST_LOG. Safe to call from every test.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Builds a ring joining `ids` in order through the first one. Returns the
/// handles in the same order.
pub fn make_ring(ids: &[u32]) -> (Ring<u32, String>, Vec<NodeHandle>) {
	init_tracing();
	let mut ring = Ring::new();
	let mut handles = Vec::new();
	for id in ids {
		let handle = match handles.first() {
			None => ring.create_node(*id),
			Some(first) => ring.join(*first, *id),
		};
		handles.push(handle.expect("ids passed to make_ring should be distinct"));
	}
	(ring, handles)
}
