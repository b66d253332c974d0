//! `GET /v1/cluster/status`: internal/admin view of this node's peer overlay
//! and SQL cluster health (§4.6 "cluster_status passthrough"). Namespace-less
//! — a node either answers about itself or it doesn't.

use axum::extract::State;
use axum::Json;
use node_sql::SqlClient;
use serde::Serialize;

use crate::state::GatewayState;

#[derive(Serialize)]
pub struct ClusterStatusResponse {
	pub local_peer_id: String,
	pub connected_peers: Vec<String>,
	pub connected_peer_count: usize,
	pub sql_healthy: bool,
}

pub async fn status(State(state): State<GatewayState>) -> Json<ClusterStatusResponse> {
	let sql_healthy = SqlClient::status_ok(&state.sql_base_url).await;
	Json(ClusterStatusResponse {
		local_peer_id: state.peers.local_peer_id().to_string(),
		connected_peers: state.peers.connected_peers().into_iter().map(|p| p.to_string()).collect(),
		connected_peer_count: state.peers.connected_count(),
		sql_healthy,
	})
}

pub async fn healthz() -> &'static str {
	"ok"
}
