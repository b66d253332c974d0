//! Wire types for the storage protocol. Encoded as JSON over the raw byte
//! stream `node_peer::codec::BytesCodec` hands us (§4.3 wire framing).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Request {
	Put {
		namespace: String,
		key: String,
		value: Vec<u8>,
	},
	Get {
		namespace: String,
		key: String,
	},
	Delete {
		namespace: String,
		key: String,
	},
	List {
		namespace: String,
		#[serde(default)]
		prefix: String,
		#[serde(default)]
		limit: Option<u32>,
	},
	Exists {
		namespace: String,
		key: String,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
	Ok,
	OkWithValue { value: Vec<u8> },
	OkWithKeys { keys: Vec<String> },
	OkWithExists { exists: bool },
	NotFound,
	Error { message: String },
}

impl Request {
	pub fn to_bytes(&self) -> Vec<u8> {
		serde_json::to_vec(self).expect("request always serializes")
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(bytes)
	}
}

impl Response {
	pub fn to_bytes(&self) -> Vec<u8> {
		serde_json::to_vec(self).expect("response always serializes")
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn put_round_trips_through_json() {
		let req = Request::Put {
			namespace: "ns1".into(),
			key: "k".into(),
			value: vec![1, 2, 3],
		};
		let bytes = req.to_bytes();
		let decoded = Request::from_bytes(&bytes).unwrap();
		match decoded {
			Request::Put { namespace, key, value } => {
				assert_eq!(namespace, "ns1");
				assert_eq!(key, "k");
				assert_eq!(value, vec![1, 2, 3]);
			}
			_ => panic!("wrong variant"),
		}
	}
}
