use std::time::Duration;

use libp2p::Multiaddr;

#[derive(Debug, Clone)]
pub struct PeerConfig {
	pub bootstrap_peers: Vec<Multiaddr>,
	pub discovery_interval: Duration,
	pub max_connections: usize,
	pub enable_mdns: bool,
	/// Enables peer-exchange + flood-publish gossipsub behavior for the
	/// designated chat-like application, per §4.2.
	pub chat_like: bool,
}

impl Default for PeerConfig {
	fn default() -> Self {
		PeerConfig {
			bootstrap_peers: Vec::new(),
			discovery_interval: Duration::from_secs(60),
			max_connections: 64,
			enable_mdns: true,
			chat_like: false,
		}
	}
}
