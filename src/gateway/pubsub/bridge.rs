//! `GET /v1/pubsub/ws`: the websocket bridge (§4.4 "PubSub WebSocket bridge").
//!
//! Inbound gossip delivery is centralized: the node process's single swarm
//! event-loop task (the only place allowed to touch the swarm, per
//! `node_peer::host`) drains `PeerEvent::PubsubMessage` and calls
//! `SubscriberRegistry::broadcast_local` keyed by the message's topic string.
//! A connection's own "libp2p subscriber" loop from the design narrative
//! therefore collapses into just reading from the channel this registration
//! already hands back; what's scoped to this connection is the writer (socket
//! out) and reader (socket in, republished) loops below.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};

use crate::auth::check_namespace_override;
use crate::error::GatewayError;
use crate::pubsub::presence::PresenceEvent;
use crate::state::{GatewayState, RequestContext};

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct PubsubQuery {
	pub topic: String,
	#[serde(default)]
	pub presence: bool,
	#[serde(default)]
	pub member_id: Option<String>,
	#[serde(default)]
	pub namespace: Option<String>,
}

pub async fn ws_handler(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Query(query): Query<PubsubQuery>,
	ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
	check_namespace_override(&ctx.namespace, query.namespace.as_deref())?;
	let namespace = ctx.namespace;
	if query.presence && query.member_id.is_none() {
		return Err(GatewayError::BadRequest("presence=true requires member_id".into()));
	}

	Ok(ws.on_upgrade(move |socket| run_bridge(socket, state, namespace, query)))
}

async fn run_bridge(socket: WebSocket, state: GatewayState, namespace: String, query: PubsubQuery) {
	let topic_key = format!("{}.{}", namespace, query.topic);
	let (sub_id, mut sub_rx) = state.subscribers.register(&topic_key);
	state.peers.subscribe(topic_key.clone()).await;

	if query.presence {
		if let Some(member_id) = &query.member_id {
			if state.presence.join(&topic_key, member_id) {
				let event = PresenceEvent::Join {
					member_id: member_id.clone(),
				};
				publish_presence(&state, &topic_key, &event).await;
			}
		}
	}

	let (mut sink, mut stream) = socket.split();

	let writer = async {
		let mut ping_timer = interval(PING_INTERVAL);
		loop {
			tokio::select! {
				msg = sub_rx.recv() => {
					match msg {
						Some(data) => {
							if sink.send(Message::Binary(data)).await.is_err() {
								return;
							}
						}
						None => return,
					}
				}
				_ = ping_timer.tick() => {
					if sink.send(Message::Ping(Vec::new())).await.is_err() {
						return;
					}
				}
			}
		}
	};

	let reader = async {
		while let Some(Ok(msg)) = stream.next().await {
			let data = match msg {
				Message::Text(text) => {
					if is_heartbeat_ping(&text) {
						continue;
					}
					text.into_bytes()
				}
				Message::Binary(data) => data,
				Message::Close(_) => break,
				_ => continue,
			};
			state.subscribers.broadcast_local(&topic_key, &data);
			if let Err(e) = state.peers.publish(topic_key.clone(), data).await {
				warn!("pubsub publish on {} failed: {}", topic_key, e);
			}
		}
	};

	tokio::select! {
		_ = writer => {}
		_ = reader => {}
	}

	state.subscribers.unregister(&topic_key, sub_id);
	state.peers.unsubscribe(topic_key.clone()).await;

	if query.presence {
		if let Some(member_id) = &query.member_id {
			if state.presence.leave(&topic_key, member_id) {
				let event = PresenceEvent::Leave {
					member_id: member_id.clone(),
				};
				publish_presence(&state, &topic_key, &event).await;
			}
		}
	}
}

async fn publish_presence(state: &GatewayState, topic_key: &str, event: &PresenceEvent) {
	let data = event.to_bytes();
	state.subscribers.broadcast_local(topic_key, &data);
	let _ = state.peers.publish(topic_key.to_string(), data).await;
}

fn is_heartbeat_ping(text: &str) -> bool {
	matches!(
		serde_json::from_str::<serde_json::Value>(text),
		Ok(serde_json::Value::Object(ref map)) if map.get("type").and_then(|v| v.as_str()) == Some("ping")
	)
}
