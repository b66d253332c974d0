//! Peer overlay and pubsub fabric (§4.2 of the design spec): a libp2p host
//! with TCP+QUIC transports, a Kademlia DHT in server mode and a gossipsub
//! pubsub router, driven from a single swarm-event-loop task and exposing a
//! small command handle to the rest of the node.

#[macro_use]
extern crate tracing;

mod codec;
pub mod config;
pub mod discovery;
pub mod error;
pub mod host;

pub use config::PeerConfig;
pub use error::{PeerError, PeerResult};
pub use host::{PeerEvent, PeerHandle, PeerHost};
