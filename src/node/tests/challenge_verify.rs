//! Scenario 2 ("Challenge/verify"): a wallet that signs the issued nonce
//! gets a token pair back, and replaying the same signed nonce is rejected.
//! Drives the real `AuthStore` against a live `rqlited` so the single-use
//! nonce consumption is exercised against the actual SQL-backed store
//! rather than a fake.

use crate::common;
use ed25519_dalek::{Signer, SigningKey};
use node_gateway::auth::jwt::JwtIssuer;
use node_gateway::auth::{AuthService, AuthStore, ChainType};
use node_sql::{SqlManager, SqlManagerConfig};
use node_util::config::AdvertiseMode;

#[tokio::test]
async fn signed_nonce_yields_tokens_and_cannot_be_replayed() {
	if !common::binary_on_path("rqlited") {
		eprintln!("skipping: rqlited not found on PATH");
		return;
	}

	let scratch = common::ScratchDir::new("challenge-verify");
	let sql = SqlManager::start(SqlManagerConfig {
		engine_binary: "rqlited".into(),
		data_dir: scratch.0.clone(),
		http_port: common::free_port(),
		raft_port: common::free_port(),
		advertise_mode: AdvertiseMode::Localhost,
		join_address: String::new(),
		connect_timeout_secs: 10,
		retry_attempts: 3,
		retry_delay_ms: 200,
	})
	.await
	.expect("starting sql engine");

	let store = AuthStore::new(sql.client().clone());
	store.ensure_tables().await.expect("creating auth tables");

	let jwt = JwtIssuer::new(b"challenge-verify-test-key", "node-gateway".into(), "node-clients".into(), 900, 2_592_000);
	let auth = AuthService::new(jwt, store);

	let signing_key = SigningKey::from_bytes(&[9u8; 32]);
	let wallet = hex::encode(signing_key.verifying_key().to_bytes());
	let namespace = "tenant1";

	let nonce = auth
		.challenge(namespace, &wallet, "login")
		.await
		.expect("issuing challenge");
	let signature = signing_key.sign(nonce.as_bytes());
	let sig_hex = hex::encode(signature.to_bytes());

	let outcome = auth
		.verify(namespace, &wallet, &nonce, &sig_hex, ChainType::Ed25519)
		.await
		.expect("first verify should succeed");
	assert!(!outcome.tokens.access_token.is_empty());
	assert!(!outcome.tokens.refresh_token.is_empty());

	let replay = auth.verify(namespace, &wallet, &nonce, &sig_hex, ChainType::Ed25519).await;
	assert!(replay.is_err(), "replaying the same nonce must fail");

	sql.stop().await.unwrap();
}
