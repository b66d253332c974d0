//! Local subscriber fan-out (§4.4 pubsub bridge, §5 backpressure, §9 "fan-out
//! without callbacks"). A message published on this node is delivered to
//! every local subscriber on the same topic via a bounded channel; sends are
//! non-blocking so one slow client can never stall the broadcaster.
//!
//! Lock discipline: never hold the registry lock across a channel send.
//! `broadcast_local` takes the read lock only long enough to clone the
//! sender handles it needs, then releases it before calling `try_send`.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use uuid::Uuid;

pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 128;

#[derive(Default)]
pub struct SubscriberRegistry {
	topics: RwLock<HashMap<String, HashMap<Uuid, mpsc::Sender<Vec<u8>>>>>,
}

impl SubscriberRegistry {
	pub fn new() -> Self {
		SubscriberRegistry::default()
	}

	/// Registers a new local subscriber on `topic_key`, returning its id
	/// (used to unregister later) and the receiving half of its channel.
	pub fn register(&self, topic_key: &str) -> (Uuid, mpsc::Receiver<Vec<u8>>) {
		let id = Uuid::new_v4();
		let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
		self.topics
			.write()
			.unwrap()
			.entry(topic_key.to_string())
			.or_default()
			.insert(id, tx);
		(id, rx)
	}

	pub fn unregister(&self, topic_key: &str, id: Uuid) {
		let mut topics = self.topics.write().unwrap();
		if let Some(subs) = topics.get_mut(topic_key) {
			subs.remove(&id);
			if subs.is_empty() {
				topics.remove(topic_key);
			}
		}
	}

	/// Delivers `data` to every current local subscriber of `topic_key`.
	/// Overflowing a subscriber's channel drops the message for that
	/// subscriber and logs a warning; it never blocks or affects others.
	pub fn broadcast_local(&self, topic_key: &str, data: &[u8]) {
		let senders: Vec<mpsc::Sender<Vec<u8>>> = {
			let topics = self.topics.read().unwrap();
			match topics.get(topic_key) {
				Some(subs) => subs.values().cloned().collect(),
				None => return,
			}
		};
		for sender in senders {
			if sender.try_send(data.to_vec()).is_err() {
				warn!("dropping pubsub message for slow/closed subscriber on {}", topic_key);
			}
		}
	}

	pub fn has_local_subscribers(&self, topic_key: &str) -> bool {
		self.topics
			.read()
			.unwrap()
			.get(topic_key)
			.map(|s| !s.is_empty())
			.unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn registered_subscriber_receives_broadcast() {
		let registry = SubscriberRegistry::new();
		let (_id, mut rx) = registry.register("ns.topic");
		registry.broadcast_local("ns.topic", b"hello");
		assert_eq!(rx.recv().await.unwrap(), b"hello");
	}

	#[tokio::test]
	async fn unregistered_subscriber_gets_nothing() {
		let registry = SubscriberRegistry::new();
		let (id, mut rx) = registry.register("ns.topic");
		registry.unregister("ns.topic", id);
		registry.broadcast_local("ns.topic", b"hello");
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn full_channel_drops_without_panicking() {
		let registry = SubscriberRegistry::new();
		let (_id, mut rx) = registry.register("ns.topic");
		for _ in 0..(SUBSCRIBER_CHANNEL_CAPACITY + 10) {
			registry.broadcast_local("ns.topic", b"x");
		}
		let mut drained = 0;
		while rx.try_recv().is_ok() {
			drained += 1;
		}
		assert!(drained <= SUBSCRIBER_CHANNEL_CAPACITY);
	}
}
