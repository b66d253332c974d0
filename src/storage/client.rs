//! Storage client: serializes a [`Request`], hands it to `node_peer`'s
//! request/response protocol, and deserializes the [`Response`]. Peer
//! selection (try each connected peer once) lives in `node_peer::PeerHandle`;
//! this layer only owns the JSON envelope.

use node_peer::PeerHandle;
use node_util::error::{Error, Result};

use crate::protocol::{Request, Response};

pub struct StorageClient {
	peers: PeerHandle,
}

impl StorageClient {
	pub fn new(peers: PeerHandle) -> Self {
		StorageClient { peers }
	}

	async fn call(&self, request: Request) -> Result<Response> {
		let bytes = self
			.peers
			.request_storage(request.to_bytes())
			.await
			.map_err(|e| Error::Message(e.to_string()))?;
		Response::from_bytes(&bytes).map_err(|e| Error::Message(format!("decoding storage response: {}", e)))
	}

	pub async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
		match self
			.call(Request::Put {
				namespace: namespace.to_string(),
				key: key.to_string(),
				value,
			})
			.await?
		{
			Response::Ok => Ok(()),
			Response::Error { message } => Err(Error::Message(message)),
			other => Err(Error::Message(format!("unexpected response to put: {:?}", other))),
		}
	}

	pub async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
		match self
			.call(Request::Get {
				namespace: namespace.to_string(),
				key: key.to_string(),
			})
			.await?
		{
			Response::OkWithValue { value } => Ok(Some(value)),
			Response::NotFound => Ok(None),
			Response::Error { message } => Err(Error::Message(message)),
			other => Err(Error::Message(format!("unexpected response to get: {:?}", other))),
		}
	}

	pub async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
		match self
			.call(Request::Delete {
				namespace: namespace.to_string(),
				key: key.to_string(),
			})
			.await?
		{
			Response::Ok => Ok(true),
			Response::NotFound => Ok(false),
			Response::Error { message } => Err(Error::Message(message)),
			other => Err(Error::Message(format!("unexpected response to delete: {:?}", other))),
		}
	}

	pub async fn list(&self, namespace: &str, prefix: &str, limit: Option<u32>) -> Result<Vec<String>> {
		match self
			.call(Request::List {
				namespace: namespace.to_string(),
				prefix: prefix.to_string(),
				limit,
			})
			.await?
		{
			Response::OkWithKeys { keys } => Ok(keys),
			Response::Error { message } => Err(Error::Message(message)),
			other => Err(Error::Message(format!("unexpected response to list: {:?}", other))),
		}
	}

	pub async fn exists(&self, namespace: &str, key: &str) -> Result<bool> {
		match self
			.call(Request::Exists {
				namespace: namespace.to_string(),
				key: key.to_string(),
			})
			.await?
		{
			Response::OkWithExists { exists } => Ok(exists),
			Response::Error { message } => Err(Error::Message(message)),
			other => Err(Error::Message(format!("unexpected response to exists: {:?}", other))),
		}
	}
}
