//! End-to-end scenario 3 ("WebSocket presence"), exercised directly against
//! the library APIs the pubsub bridge is built on rather than through real
//! sockets, per the test-tooling note that multi-client websocket races are
//! covered as in-process checks against `SubscriberRegistry`/`PresenceRegistry`.

use node_gateway::pubsub::presence::{PresenceEvent, PresenceRegistry};
use node_gateway::pubsub::registry::SubscriberRegistry;

#[tokio::test]
async fn leaving_member_is_observed_by_remaining_subscriber() {
	let subscribers = SubscriberRegistry::new();
	let presence = PresenceRegistry::new();
	let topic_key = "tenant1.room1";

	// C1 (alice) connects first.
	let (alice_id, mut alice_rx) = subscribers.register(topic_key);
	assert!(presence.join(topic_key, "alice"));

	// C2 (bob) connects after alice; bob's own join is broadcast to every
	// subscriber already registered, so alice observes it.
	let (_bob_id, mut bob_rx) = subscribers.register(topic_key);
	assert!(presence.join(topic_key, "bob"));
	let bob_join = PresenceEvent::Join {
		member_id: "bob".to_string(),
	};
	subscribers.broadcast_local(topic_key, &bob_join.to_bytes());

	let received = alice_rx.try_recv().expect("alice should see bob's join");
	assert_eq!(received, bob_join.to_bytes());

	// C1 (alice) disconnects: unregister then broadcast presence.leave.
	subscribers.unregister(topic_key, alice_id);
	assert!(presence.leave(topic_key, "alice"));
	let alice_leave = PresenceEvent::Leave {
		member_id: "alice".to_string(),
	};
	subscribers.broadcast_local(topic_key, &alice_leave.to_bytes());

	let received = bob_rx.try_recv().expect("bob should see alice's leave");
	assert_eq!(received, alice_leave.to_bytes());

	assert_eq!(presence.members(topic_key), vec!["bob".to_string()]);
}
