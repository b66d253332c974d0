//! Scenario 1 ("Two-node KV replication"): a value written through Node A's
//! `StorageService` is visible through Node B's once the replicated SQL
//! engine has caught up. Needs a real `rqlited`-style binary on `PATH`; the
//! multi-process harness cost is accepted here per the test-tooling note
//! rather than faked with an in-memory stand-in, since replication itself is
//! exactly what's under test.

use crate::common;
use node_storage::{Request, Response, StorageService};
use node_sql::{SqlManager, SqlManagerConfig};
use node_util::config::AdvertiseMode;

#[tokio::test]
async fn put_on_node_a_is_visible_from_node_b() {
	if !common::binary_on_path("rqlited") {
		eprintln!("skipping: rqlited not found on PATH");
		return;
	}

	let scratch_a = common::ScratchDir::new("kv-repl-a");
	let scratch_b = common::ScratchDir::new("kv-repl-b");
	let http_a = common::free_port();
	let raft_a = common::free_port();
	let http_b = common::free_port();
	let raft_b = common::free_port();

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
	.expect("starting node A's sql engine");

	let sql_b = SqlManager::start(SqlManagerConfig {
		engine_binary: "rqlited".into(),
		data_dir: scratch_b.0.clone(),
		http_port: http_b,
		raft_port: raft_b,
		advertise_mode: AdvertiseMode::Localhost,
		join_address: format!("127.0.0.1:{}", http_a),
		connect_timeout_secs: 10,
		retry_attempts: 3,
		retry_delay_ms: 200,
	})
	.await
	.expect("starting node B's sql engine joined to A");

	let service_a = StorageService::new(sql_a.client().clone());
	let service_b = StorageService::new(sql_b.client().clone());

	let put = service_a
		.handle(Request::Put {
			namespace: "tenant1".into(),
			key: "k".into(),
			value: b"v1".to_vec(),
		})
		.await;
	assert!(matches!(put, Response::Ok));

	let mut seen = None;
	for _ in 0..20 {
		let got = service_b
			.handle(Request::Get {
				namespace: "tenant1".into(),
				key: "k".into(),
			})
			.await;
		if let Response::OkWithValue { value } = &got {
			seen = Some(value.clone());
			break;
		}
		tokio::time::sleep(std::time::Duration::from_millis(100)).await;
	}
	assert_eq!(seen, Some(b"v1".to_vec()));

	sql_b.stop().await.unwrap();
	sql_a.stop().await.unwrap();
}
