//! Discovery manager (§4.2): the bounded aggressive-discovery loop run right
//! after bootstrap, plus the long-lived connection monitor. Both are plain
//! tasks driven off a `watch<bool>` exit signal, in the same shape as the
//! teacher's `discovery_loop`/`status_exchange_loop` pair.

use std::time::Duration;

use libp2p::Multiaddr;
use tokio::sync::watch;

use crate::config::PeerConfig;
use crate::host::PeerHandle;

const AGGRESSIVE_DISCOVERY_ITERATIONS: u32 = 20;
const AGGRESSIVE_DISCOVERY_INTERVAL: Duration = Duration::from_secs(3);
const CONNECTION_LOG_INTERVAL: Duration = Duration::from_secs(60);
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Bounded loop (~20 iterations at 3s each): walks known addresses, dials
/// anything not already connected, and for the chat-like app also
/// reconnects to every known peerstore entry.
pub async fn aggressive_discovery(
	handle: PeerHandle,
	config: PeerConfig,
	known_addrs: Vec<Multiaddr>,
	mut must_exit: watch::Receiver<bool>,
) {
	for iteration in 0..AGGRESSIVE_DISCOVERY_ITERATIONS {
		if *must_exit.borrow() {
			return;
		}

		let connected = handle.connected_peers();
		debug!(
			"aggressive discovery pass {}/{}: {} peers connected",
			iteration + 1,
			AGGRESSIVE_DISCOVERY_ITERATIONS,
			connected.len()
		);

		if config.chat_like {
			for addr in &known_addrs {
				handle.dial(addr.clone()).await;
			}
		} else if connected.len() < config.max_connections {
			for addr in &known_addrs {
				handle.dial(addr.clone()).await;
			}
		}

		handle.bootstrap().await;

		tokio::select! {
			_ = tokio::time::sleep(AGGRESSIVE_DISCOVERY_INTERVAL) => {}
			_ = must_exit.changed() => { return; }
		}
	}
}

/// Purely observational: logs peer count deltas every 60s and a debug
/// snapshot of peer IDs every 5 minutes.
pub async fn connection_monitor(handle: PeerHandle, mut must_exit: watch::Receiver<bool>) {
	let mut last_count = handle.connected_count();
	let mut last_snapshot = tokio::time::Instant::now();

	loop {
		tokio::select! {
			_ = tokio::time::sleep(CONNECTION_LOG_INTERVAL) => {}
			_ = must_exit.changed() => { return; }
		}
		if *must_exit.borrow() {
			return;
		}

		let count = handle.connected_count();
		if count != last_count {
			info!("peer count changed: {} -> {}", last_count, count);
			last_count = count;
		}

		if last_snapshot.elapsed() >= SNAPSHOT_INTERVAL {
			debug!("connected peers: {:?}", handle.connected_peers());
			last_snapshot = tokio::time::Instant::now();
		}
	}
}

/// The standing discovery loop started after the aggressive phase completes:
/// re-runs bootstrap/dial on `discovery_interval` for as long as the node is
/// up.
pub async fn discovery_loop(
	handle: PeerHandle,
	config: PeerConfig,
	known_addrs: Vec<Multiaddr>,
	mut must_exit: watch::Receiver<bool>,
) {
	while !*must_exit.borrow() {
		if handle.connected_count() < config.max_connections {
			for addr in &known_addrs {
				handle.dial(addr.clone()).await;
			}
			handle.bootstrap().await;
		}

		tokio::select! {
			_ = tokio::time::sleep(config.discovery_interval) => {}
			_ = must_exit.changed() => {}
		}
	}
}
