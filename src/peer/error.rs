use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
	#[error("no connected peers to try")]
	NoPeers,
	#[error("transport error: {0}")]
	Transport(String),
	#[error("invalid multiaddr: {0}")]
	InvalidAddr(String),
	#[error("swarm command channel closed")]
	ChannelClosed,
}

pub type PeerResult<T> = std::result::Result<T, PeerError>;

impl From<PeerError> for node_util::error::Error {
	fn from(e: PeerError) -> Self {
		node_util::error::Error::Message(e.to_string())
	}
}
