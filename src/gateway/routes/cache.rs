//! `/v1/cache/*` handlers: spawn/stop/list per-namespace cache cluster
//! instances (§4.5). `node_id` and ports are caller-supplied; the namespace
//! always comes from the resolved credential, never the body, so a caller
//! cannot spawn into someone else's namespace.

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use node_cache::{InstanceStatus, SpawnRequest};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::state::{GatewayState, RequestContext};

#[derive(Deserialize)]
pub struct SpawnBody {
	pub http_port: u16,
	pub memberlist_port: u16,
	#[serde(default = "default_bind_addr")]
	pub bind_addr: String,
	pub advertise_addr: String,
	#[serde(default)]
	pub peers: Vec<String>,
}

fn default_bind_addr() -> String {
	"0.0.0.0".to_string()
}

pub async fn spawn(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(node_id): Path<String>,
	Json(body): Json<SpawnBody>,
) -> Result<Json<InstanceStatus>, GatewayError> {
	let req = SpawnRequest {
		namespace: ctx.namespace,
		node_id,
		http_port: body.http_port,
		memberlist_port: body.memberlist_port,
		bind_addr: body.bind_addr,
		advertise_addr: body.advertise_addr,
		peers: body.peers,
	};
	let status = state.cache.spawn(req).await?;
	Ok(Json(status))
}

pub async fn stop(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(node_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
	state.cache.stop(&ctx.namespace, &node_id).await?;
	Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn remove(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(node_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
	state.cache.remove(&ctx.namespace, &node_id)?;
	Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn list(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
) -> Json<Vec<InstanceStatus>> {
	let all = state.cache.list();
	Json(all.into_iter().filter(|s| s.namespace == ctx.namespace).collect())
}
