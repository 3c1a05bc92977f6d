mod common;

use std::time::Duration;
use tokio::time::sleep;

use dht_ring::{
	Ring, RingError, RingService, RingState, StoreOutcome,
	associate::{AssociateRequest, AssociateResponse},
};


#[tokio::test]
async fn service_runs_ring_operations() {
	common::init_tracing();
	let service: RingService<u32, String> = RingService::new(Ring::new());
	let handle = service.start().await.expect("service should start");
	let mut assoc = handle.get_associate().await.expect("associate should register");

	let n10 = assoc.create_node(10).await.unwrap();
	let n30 = assoc.join(n10, 30).await.unwrap();
	let n70 = assoc.join(n10, 70).await.unwrap();

	let stored = assoc.store(n10, 50, "x".to_string()).await.unwrap();
	assert_eq!(stored, StoreOutcome::Stored { owner: 70, replicas: vec![30, 10] });
	assert_eq!(assoc.lookup(n30, 50).await.unwrap().value, "x");
	assert_eq!(assoc.send(n10, 70, "hi".to_string()).await.unwrap().hops, 2);
	assert_eq!(assoc.enumerate(n70).await.unwrap(), vec![10, 30, 70]);

	match assoc.request(AssociateRequest::Render { from: n30 }).await {
		Ok(AssociateResponse::Rendered { text }) => assert_eq!(text, "[10]--->[30]--->[70]"),
		other => panic!("unexpected response {:?}", other),
	}
	match assoc.request(AssociateRequest::Resolve { id: 30 }).await {
		Ok(AssociateResponse::Resolved { handle }) => assert_eq!(handle, Some(n30)),
		other => panic!("unexpected response {:?}", other),
	}

	assert!(matches!(assoc.join(n30, 70).await, Err(RingError::DuplicateIdentifier { .. })));
	assert_eq!(assoc.remove(n70).await.unwrap(), Some(n10));
	assert!(matches!(assoc.lookup(n70, 50).await, Err(RingError::UnknownNode { .. })));

	handle.stop().await;
}

#[tokio::test]
async fn associates_get_their_own_responses() {
	common::init_tracing();
	let service: RingService<u32, String> = RingService::new(Ring::new());
	let handle = service.start().await.unwrap();
	let mut first = handle.get_associate().await.unwrap();
	let mut second = first.duplicate().await.unwrap();
	assert_ne!(first.id(), second.id());

	let n10 = first.create_node(10).await.unwrap();
	first.send_op(AssociateRequest::Join { via: n10, id: 20 }).await.unwrap();
	second.send_op(AssociateRequest::Enumerate { from: n10 }).await.unwrap();

	assert!(matches!(first.recv_op().await, Some(AssociateResponse::Node { .. })));
	match second.recv_op().await {
		Some(AssociateResponse::Members { ids }) => assert_eq!(ids, vec![10, 20]),
		other => panic!("unexpected response {:?}", other),
	}

	handle.stop().await;
}

#[tokio::test]
async fn service_saves_and_restores_state() {
	common::init_tracing();
	let path = std::env::temp_dir().join(format!("dht_ring_service_{}.json", std::process::id()));

	let mut service: RingService<u32, String> = RingService::new(Ring::new());
	service.set_file(Some(path.clone()));
	service.set_maintenance_interval(Duration::from_millis(20));
	let handle = service.start().await.unwrap();
	let mut assoc = handle.get_associate().await.unwrap();

	let n10 = assoc.create_node(10).await.unwrap();
	assoc.join(n10, 30).await.unwrap();
	assoc.store(n10, 20, "y".to_string()).await.unwrap();
	sleep(Duration::from_millis(200)).await;
	handle.stop().await;
	// let a write already handed to the blocking pool land
	sleep(Duration::from_millis(50)).await;

	let saved: RingState<u32, String> = RingState::from_file(&path).await.expect("state should have been saved");
	assert_eq!(saved.nodes.len(), 2);

	let restored = RingService::<u32, String>::from_file(path.clone()).await.unwrap();
	let handle = restored.start().await.unwrap();
	let mut assoc = handle.get_associate().await.unwrap();
	let n30 = match assoc.request(AssociateRequest::Resolve { id: 30 }).await {
		Ok(AssociateResponse::Resolved { handle: Some(handle) }) => handle,
		other => panic!("unexpected response {:?}", other),
	};
	assert_eq!(assoc.lookup(n30, 20).await.unwrap().value, "y");
	match assoc.request(AssociateRequest::Snapshot).await {
		Ok(AssociateResponse::State(state)) => assert_eq!(state, saved),
		other => panic!("unexpected response {:?}", other),
	}

	handle.stop().await;
	let _ = tokio::fs::remove_file(&path).await;
}
