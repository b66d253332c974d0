//! Host construction and the single swarm-event-loop task (§4.2). All shared
//! state — peer health, dial backoff, the connected set — lives behind one
//! `RwLock` inside [`PeerHandle`]; the swarm itself is only ever touched from
//! the loop task in [`run_event_loop`], and every other caller talks to it
//! through the command channel.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::StreamExt;
use libp2p::gossipsub::{self, IdentTopic};
use libp2p::kad::{self, store::MemoryStore};
use libp2p::mdns;
use libp2p::request_response::{self, ProtocolSupport, ResponseChannel};
use libp2p::swarm::{NetworkBehaviour, SwarmEvent};
use libp2p::{identify, identity, noise, tcp, yamux, Multiaddr, PeerId, StreamProtocol, Swarm, SwarmBuilder};
use tokio::sync::{mpsc, oneshot, watch};

use crate::codec::BytesCodec;
use crate::config::PeerConfig;
use crate::error::{PeerError, PeerResult};

pub const STORAGE_PROTOCOL: &str = "/node/storage/1.0.0";

#[derive(NetworkBehaviour)]
pub(crate) struct NodeBehaviour {
	pub(crate) kademlia: kad::Behaviour<MemoryStore>,
	pub(crate) gossipsub: gossipsub::Behaviour,
	pub(crate) mdns: libp2p::swarm::behaviour::toggle::Toggle<mdns::tokio::Behaviour>,
	pub(crate) identify: identify::Behaviour,
	pub(crate) storage: request_response::Behaviour<BytesCodec>,
}

/// Events surfaced to the rest of the node from the swarm loop.
pub enum PeerEvent {
	PubsubMessage {
		topic: String,
		data: Vec<u8>,
		source: Option<PeerId>,
	},
	StorageRequest {
		peer: PeerId,
		request: Vec<u8>,
		channel: ResponseChannel<Vec<u8>>,
	},
	PeerConnected(PeerId),
	PeerDisconnected(PeerId),
}

enum Command {
	Dial(Multiaddr),
	Subscribe(String),
	Unsubscribe(String),
	Publish(String, Vec<u8>, oneshot::Sender<PeerResult<()>>),
	SendStorageRequest(PeerId, Vec<u8>, oneshot::Sender<PeerResult<Vec<u8>>>),
	RespondStorage(ResponseChannel<Vec<u8>>, Vec<u8>),
	AddAddress(PeerId, Multiaddr),
	Bootstrap,
}

#[derive(Default)]
struct SharedState {
	connected: HashSet<PeerId>,
	last_seen: HashMap<PeerId, std::time::Instant>,
}

/// A cheaply cloneable handle to the running peer host.
#[derive(Clone)]
pub struct PeerHandle {
	local_peer_id: PeerId,
	cmd_tx: mpsc::Sender<Command>,
	state: Arc<RwLock<SharedState>>,
}

pub struct PeerHost {
	pub handle: PeerHandle,
	pub events: mpsc::Receiver<PeerEvent>,
	swarm: Swarm<NodeBehaviour>,
	cmd_rx: mpsc::Receiver<Command>,
	event_tx: mpsc::Sender<PeerEvent>,
	state: Arc<RwLock<SharedState>>,
	config: PeerConfig,
	pending_storage: HashMap<request_response::OutboundRequestId, oneshot::Sender<PeerResult<Vec<u8>>>>,
}

impl PeerHost {
	/// Create a libp2p host with TCP + QUIC transports, Noise security,
	/// default muxers, and a random listen port; a Kademlia DHT in server
	/// mode; and a gossipsub router configured for peer-exchange and
	/// flood-publish when `config.chat_like` is set.
	pub fn new(config: PeerConfig) -> PeerResult<Self> {
		let keypair = identity::Keypair::generate_ed25519();
		let local_peer_id = PeerId::from(keypair.public());

		let mut swarm = SwarmBuilder::with_existing_identity(keypair.clone())
			.with_tokio()
			.with_tcp(
				tcp::Config::default(),
				noise::Config::new,
				yamux::Config::default,
			)
			.map_err(|e| PeerError::Transport(e.to_string()))?
			.with_quic()
			.with_behaviour(|key| {
				let mut kad_config = kad::Config::default();
				kad_config.set_query_timeout(Duration::from_secs(60));
				let kademlia = kad::Behaviour::with_config(
					local_peer_id,
					MemoryStore::new(local_peer_id),
					kad_config,
				);

				let mut gossipsub_config_builder = gossipsub::ConfigBuilder::default();
				gossipsub_config_builder.heartbeat_interval(Duration::from_secs(10));
				if config.chat_like {
					gossipsub_config_builder.flood_publish(true);
					gossipsub_config_builder.do_px();
				}
				let gossipsub_config = gossipsub_config_builder
					.build()
					.expect("valid gossipsub config");
				let gossipsub = gossipsub::Behaviour::new(
					gossipsub::MessageAuthenticity::Signed(key.clone()),
					gossipsub_config,
				)
				.expect("valid gossipsub behaviour");

				let mdns = if config.enable_mdns {
					libp2p::swarm::behaviour::toggle::Toggle::from(Some(
						mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id)
							.expect("mdns behaviour"),
					))
				} else {
					libp2p::swarm::behaviour::toggle::Toggle::from(None)
				};

				let identify = identify::Behaviour::new(identify::Config::new(
					"node/1.0.0".to_string(),
					key.public(),
				));

				let storage = request_response::Behaviour::new(
					[(
						StreamProtocol::new(STORAGE_PROTOCOL),
						ProtocolSupport::Full,
					)],
					request_response::Config::default().with_request_timeout(Duration::from_secs(30)),
				);

				NodeBehaviour {
					kademlia,
					gossipsub,
					mdns,
					identify,
					storage,
				}
			})
			.map_err(|e| PeerError::Transport(e.to_string()))?
			.with_swarm_config(|c| c.with_idle_connection_timeout(Duration::from_secs(60)))
			.build();

		swarm
			.behaviour_mut()
			.kademlia
			.set_mode(Some(kad::Mode::Server));

		swarm
			.listen_on("/ip4/0.0.0.0/tcp/0".parse().unwrap())
			.map_err(|e| PeerError::Transport(e.to_string()))?;
		swarm
			.listen_on("/ip4/0.0.0.0/udp/0/quic-v1".parse().unwrap())
			.map_err(|e| PeerError::Transport(e.to_string()))?;

		let (cmd_tx, cmd_rx) = mpsc::channel(256);
		let (event_tx, events) = mpsc::channel(1024);
		let state = Arc::new(RwLock::new(SharedState::default()));

		let handle = PeerHandle {
			local_peer_id,
			cmd_tx,
			state: state.clone(),
		};

		Ok(PeerHost {
			handle,
			events,
			swarm,
			cmd_rx,
			event_tx,
			state,
			config,
			pending_storage: HashMap::new(),
		})
	}

	pub fn local_peer_id(&self) -> PeerId {
		self.handle.local_peer_id
	}

	/// Bootstrap sequence (§4.2): dial every configured peer (skipping self),
	/// explicitly add bootstrap peer IDs to the routing table, bootstrap the
	/// DHT, then hand off to the caller-driven discovery loops.
	pub async fn connect(&mut self) {
		for addr in self.config.bootstrap_peers.clone() {
			if let Some(peer_id) = extract_peer_id(&addr) {
				if peer_id == self.local_peer_id() {
					continue;
				}
				self.swarm
					.behaviour_mut()
					.kademlia
					.add_address(&peer_id, addr.clone());
			}
			if let Err(e) = self.swarm.dial(addr.clone()) {
				warn!("bootstrap dial to {} failed: {}", addr, e);
			}
		}
		let _ = self.swarm.behaviour_mut().kademlia.bootstrap();
	}

	/// Drive the swarm; this is the single task that ever touches `self.swarm`.
	pub async fn run_event_loop(mut self, mut must_exit: watch::Receiver<bool>) {
		loop {
			tokio::select! {
				biased;
				_ = must_exit.changed() => {
					if *must_exit.borrow() {
						info!("peer host event loop exiting");
						return;
					}
				}
				event = self.swarm.select_next_some() => {
					self.handle_swarm_event(event).await;
				}
				cmd = self.cmd_rx.recv() => {
					match cmd {
						Some(cmd) => self.handle_command(cmd).await,
						None => return,
					}
				}
			}
		}
	}

	async fn handle_swarm_event(&mut self, event: SwarmEvent<NodeBehaviourEvent>) {
		match event {
			SwarmEvent::ConnectionEstablished { peer_id, .. } => {
				self.state.write().unwrap().connected.insert(peer_id);
				self.state
					.write()
					.unwrap()
					.last_seen
					.insert(peer_id, std::time::Instant::now());
				let _ = self.event_tx.try_send(PeerEvent::PeerConnected(peer_id));
			}
			SwarmEvent::ConnectionClosed { peer_id, .. } => {
				let still_connected = self.swarm.is_connected(&peer_id);
				if !still_connected {
					self.state.write().unwrap().connected.remove(&peer_id);
					let _ = self.event_tx.try_send(PeerEvent::PeerDisconnected(peer_id));
				}
			}
			SwarmEvent::Behaviour(NodeBehaviourEvent::Gossipsub(gossipsub::Event::Message {
				message,
				propagation_source,
				..
			})) => {
				let _ = self.event_tx.try_send(PeerEvent::PubsubMessage {
					topic: message.topic.into_string(),
					data: message.data,
					source: Some(propagation_source),
				});
			}
			SwarmEvent::Behaviour(NodeBehaviourEvent::Storage(request_response::Event::Message {
				peer,
				message,
			})) => match message {
				request_response::Message::Request {
					request, channel, ..
				} => {
					let _ = self.event_tx.try_send(PeerEvent::StorageRequest {
						peer,
						request,
						channel,
					});
				}
				request_response::Message::Response {
					request_id,
					response,
				} => {
					if let Some(tx) = self.pending_storage.remove(&request_id) {
						let _ = tx.send(Ok(response));
					}
				}
			},
			SwarmEvent::Behaviour(NodeBehaviourEvent::Storage(
				request_response::Event::OutboundFailure {
					request_id, error, ..
				},
			)) => {
				if let Some(tx) = self.pending_storage.remove(&request_id) {
					let _ = tx.send(Err(PeerError::Transport(error.to_string())));
				}
			}
			SwarmEvent::Behaviour(NodeBehaviourEvent::Mdns(mdns::Event::Discovered(peers))) => {
				for (peer_id, addr) in peers {
					self.swarm
						.behaviour_mut()
						.kademlia
						.add_address(&peer_id, addr.clone());
					let _ = self.swarm.dial(addr);
				}
			}
			_ => {}
		}
	}

	async fn handle_command(&mut self, cmd: Command) {
		match cmd {
			Command::Dial(addr) => {
				if let Err(e) = self.swarm.dial(addr.clone()) {
					warn!("dial to {} failed: {}", addr, e);
				}
			}
			Command::Subscribe(topic) => {
				let topic = IdentTopic::new(topic);
				if let Err(e) = self.swarm.behaviour_mut().gossipsub.subscribe(&topic) {
					warn!("subscribe to {} failed: {}", topic, e);
				}
			}
			Command::Unsubscribe(topic) => {
				let topic = IdentTopic::new(topic);
				let _ = self.swarm.behaviour_mut().gossipsub.unsubscribe(&topic);
			}
			Command::Publish(topic, data, reply) => {
				let topic = IdentTopic::new(topic);
				let result = self
					.swarm
					.behaviour_mut()
					.gossipsub
					.publish(topic, data)
					.map(|_| ())
					.map_err(|e| PeerError::Transport(e.to_string()));
				let _ = reply.send(result);
			}
			Command::SendStorageRequest(peer, data, reply) => {
				let request_id = self
					.swarm
					.behaviour_mut()
					.storage
					.send_request(&peer, data);
				self.pending_storage.insert(request_id, reply);
			}
			Command::RespondStorage(channel, data) => {
				let _ = self
					.swarm
					.behaviour_mut()
					.storage
					.send_response(channel, data);
			}
			Command::AddAddress(peer_id, addr) => {
				self.swarm.behaviour_mut().kademlia.add_address(&peer_id, addr);
			}
			Command::Bootstrap => {
				let _ = self.swarm.behaviour_mut().kademlia.bootstrap();
			}
		}
	}
}

fn extract_peer_id(addr: &Multiaddr) -> Option<PeerId> {
	addr.iter().find_map(|p| match p {
		libp2p::multiaddr::Protocol::P2p(peer_id) => Some(peer_id),
		_ => None,
	})
}

impl PeerHandle {
	pub fn local_peer_id(&self) -> PeerId {
		self.local_peer_id
	}

	pub fn connected_peers(&self) -> Vec<PeerId> {
		self.state.read().unwrap().connected.iter().copied().collect()
	}

	pub fn connected_count(&self) -> usize {
		self.state.read().unwrap().connected.len()
	}

	pub async fn dial(&self, addr: Multiaddr) {
		let _ = self.cmd_tx.send(Command::Dial(addr)).await;
	}

	pub async fn add_address(&self, peer_id: PeerId, addr: Multiaddr) {
		let _ = self.cmd_tx.send(Command::AddAddress(peer_id, addr)).await;
	}

	pub async fn bootstrap(&self) {
		let _ = self.cmd_tx.send(Command::Bootstrap).await;
	}

	pub async fn subscribe(&self, topic: impl Into<String>) {
		let _ = self.cmd_tx.send(Command::Subscribe(topic.into())).await;
	}

	pub async fn unsubscribe(&self, topic: impl Into<String>) {
		let _ = self.cmd_tx.send(Command::Unsubscribe(topic.into())).await;
	}

	pub async fn publish(&self, topic: impl Into<String>, data: Vec<u8>) -> PeerResult<()> {
		let (tx, rx) = oneshot::channel();
		self.cmd_tx
			.send(Command::Publish(topic.into(), data, tx))
			.await
			.map_err(|_| PeerError::ChannelClosed)?;
		rx.await.map_err(|_| PeerError::ChannelClosed)?
	}

	/// Try each connected peer in turn until one answers; no retry beyond
	/// that single pass (§4.3 peer selection policy).
	pub async fn request_storage(&self, data: Vec<u8>) -> PeerResult<Vec<u8>> {
		let peers = self.connected_peers();
		if peers.is_empty() {
			return Err(PeerError::NoPeers);
		}
		let mut last_err = PeerError::NoPeers;
		for peer in peers {
			let (tx, rx) = oneshot::channel();
			if self
				.cmd_tx
				.send(Command::SendStorageRequest(peer, data.clone(), tx))
				.await
				.is_err()
			{
				return Err(PeerError::ChannelClosed);
			}
			match rx.await {
				Ok(Ok(resp)) => return Ok(resp),
				Ok(Err(e)) => last_err = e,
				Err(_) => last_err = PeerError::ChannelClosed,
			}
		}
		Err(last_err)
	}

	pub async fn respond_storage(&self, channel: ResponseChannel<Vec<u8>>, data: Vec<u8>) {
		let _ = self.cmd_tx.send(Command::RespondStorage(channel, data)).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_peer_id_from_multiaddr() {
		let addr: Multiaddr =
			"/ip4/127.0.0.1/tcp/4001/p2p/12D3KooWH8WgH9mgbMXrKX4veokUznvEn6Ycwg4qaGNi83nLkoUK"
				.parse()
				.unwrap();
		assert!(extract_peer_id(&addr).is_some());
	}

	#[test]
	fn no_peer_id_in_bare_multiaddr() {
		let addr: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
		assert!(extract_peer_id(&addr).is_none());
	}

	#[tokio::test]
	async fn new_host_has_distinct_local_peer_id() {
		let host_a = PeerHost::new(PeerConfig::default()).unwrap();
		let host_b = PeerHost::new(PeerConfig::default()).unwrap();
		assert_ne!(host_a.local_peer_id(), host_b.local_peer_id());
	}
}
