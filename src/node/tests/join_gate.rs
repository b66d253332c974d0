//! Scenario 4 ("Join gate"): starting a joiner whose `join_address` isn't up
//! yet must not abort startup — it logs and keeps polling, then completes
//! once the target becomes reachable. Exercises `SqlManager::start`'s actual
//! `gate_join_target` retry loop against a real `rqlited` binary.

use crate::common;
use node_sql::{SqlManager, SqlManagerConfig};
use node_util::config::AdvertiseMode;

#[tokio::test]
async fn joiner_waits_for_target_then_joins() {
	if !common::binary_on_path("rqlited") {
		eprintln!("skipping: rqlited not found on PATH");
		return;
	}

	let scratch_a = common::ScratchDir::new("join-gate-a");
	let scratch_b = common::ScratchDir::new("join-gate-b");
	let http_a = common::free_port();
	let raft_a = common::free_port();
	let http_b = common::free_port();
	let raft_b = common::free_port();

	let join_address = format!("127.0.0.1:{}", http_a);
	let joiner = tokio::spawn(async move {
		SqlManager::start(SqlManagerConfig {
			engine_binary: "rqlited".into(),
			data_dir: scratch_b.0.clone(),
			http_port: http_b,
			raft_port: raft_b,
			advertise_mode: AdvertiseMode::Localhost,
			join_address,
			connect_timeout_secs: 10,
			retry_attempts: 3,
			retry_delay_ms: 200,
		})
		.await
	});

	// Node A isn't started yet; the joiner should be retrying `gate_join_target`
	// rather than giving up.
	tokio::time::sleep(std::time::Duration::from_secs(3)).await;
	assert!(!joiner.is_finished(), "joiner should still be waiting on an unreachable target");

	let sql_a = SqlManager::start(SqlManagerConfig {
		engine_binary: "rqlited".into(),
		data_dir: scratch_a.0.clone(),
		http_port: http_a,
		raft_port: raft_a,
		advertise_mode: AdvertiseMode::Localhost,
		join_address: String::new(),
		connect_timeout_secs: 10,
		retry_attempts: 3,
		retry_delay_ms: 200,
	})
	.await
	.expect("starting join target node A");

	let sql_b = tokio::time::timeout(std::time::Duration::from_secs(30), joiner)
		.await
		.expect("joiner did not finish within 30s of its target becoming reachable")
		.expect("joiner task panicked")
		.expect("joiner failed to join");

	sql_b.client().wait_select_1(std::time::Duration::from_secs(5)).await.unwrap();

	sql_b.stop().await.unwrap();
	sql_a.stop().await.unwrap();
}
