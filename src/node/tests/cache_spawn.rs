//! Scenario 5 ("Cache spawn survives request cancellation"): aborting the
//! future that drove `CacheSpawner::spawn` must not kill the child process
//! it already started, since the child is detached into a reaper task
//! before the readiness wait that the cancelled future was blocked on.
//! Needs a real memberlist-style engine binary (e.g. `olricd`) on `PATH`.

use crate::common;
use node_cache::registry::InstanceState;
use node_cache::{CacheSpawner, SpawnRequest};

#[tokio::test]
async fn spawn_cancellation_does_not_kill_the_child() {
	if !common::binary_on_path("olricd") {
		eprintln!("skipping: olricd not found on PATH");
		return;
	}

	let scratch = common::ScratchDir::new("cache-spawn");
	let spawner = CacheSpawner::new(scratch.0.clone(), "olricd".into());

	let req = SpawnRequest {
		namespace: "alice".into(),
		node_id: "n1".into(),
		http_port: common::free_port(),
		memberlist_port: common::free_port(),
		bind_addr: "127.0.0.1".into(),
		advertise_addr: "127.0.0.1".into(),
		peers: Vec::new(),
	};

	let spawn_future = {
		let spawner = spawner.clone();
		let req = req.clone();
		tokio::spawn(async move { spawner.spawn(req).await })
	};

	// Give the child a moment to actually fork before cancelling the caller.
	tokio::time::sleep(std::time::Duration::from_millis(200)).await;
	spawn_future.abort();

	tokio::time::sleep(std::time::Duration::from_millis(500)).await;
	let status = spawner
		.status("alice", "n1")
		.expect("instance should still be registered after cancellation");
	assert_ne!(status.state, InstanceState::Failed);

	spawner.stop("alice", "n1").await.expect("stopping the cache instance");
	let stopped = spawner.status("alice", "n1").unwrap();
	assert_eq!(stopped.state, InstanceState::Stopped);
}
