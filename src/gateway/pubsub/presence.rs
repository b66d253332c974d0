//! Per-topic presence lists (§4.4 step 4/6). Presence join/leave events are
//! small JSON envelopes broadcast through the same topic as regular
//! messages, both to local subscribers and over the libp2p gossip router,
//! so every node's gateway websocket clients observe them uniformly.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PresenceEvent {
	#[serde(rename = "presence.join")]
	Join { member_id: String },
	#[serde(rename = "presence.leave")]
	Leave { member_id: String },
}

impl PresenceEvent {
	pub fn to_bytes(&self) -> Vec<u8> {
		serde_json::to_vec(self).expect("presence event always serializes")
	}
}

#[derive(Default)]
pub struct PresenceRegistry {
	members: RwLock<HashMap<String, HashSet<String>>>,
}

impl PresenceRegistry {
	pub fn new() -> Self {
		PresenceRegistry::default()
	}

	/// Adds `member_id` to `topic_key`'s presence set. Returns `true` if the
	/// member was not already present (callers only broadcast `presence.join`
	/// in that case).
	pub fn join(&self, topic_key: &str, member_id: &str) -> bool {
		self.members
			.write()
			.unwrap()
			.entry(topic_key.to_string())
			.or_default()
			.insert(member_id.to_string())
	}

	pub fn leave(&self, topic_key: &str, member_id: &str) -> bool {
		let mut members = self.members.write().unwrap();
		let removed = members
			.get_mut(topic_key)
			.map(|set| set.remove(member_id))
			.unwrap_or(false);
		if let Some(set) = members.get(topic_key) {
			if set.is_empty() {
				members.remove(topic_key);
			}
		}
		removed
	}

	pub fn members(&self, topic_key: &str) -> Vec<String> {
		self.members
			.read()
			.unwrap()
			.get(topic_key)
			.map(|set| set.iter().cloned().collect())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_then_leave_empties_topic() {
		let reg = PresenceRegistry::new();
		assert!(reg.join("ns.room", "alice"));
		assert!(!reg.join("ns.room", "alice"));
		assert_eq!(reg.members("ns.room"), vec!["alice".to_string()]);
		assert!(reg.leave("ns.room", "alice"));
		assert!(reg.members("ns.room").is_empty());
	}
}
