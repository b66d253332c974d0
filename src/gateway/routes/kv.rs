//! `/v1/kv/*` handlers: a thin HTTP façade over `node_storage::StorageClient`
//! scoped to the caller's namespace (§6). Not named explicitly in §4.4's
//! narrative but implied by "requests are routed to... Storage Service (KV)";
//! this is the surface external callers use since they don't speak the
//! libp2p storage protocol directly.

use axum::extract::{Extension, Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::check_namespace_override;
use crate::error::GatewayError;
use crate::state::{GatewayState, RequestContext};

#[derive(Deserialize)]
pub struct NamespaceOverride {
	#[serde(default)]
	pub namespace: Option<String>,
}

pub async fn get(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(key): Path<String>,
	Query(over): Query<NamespaceOverride>,
) -> Result<impl IntoResponse, GatewayError> {
	check_namespace_override(&ctx.namespace, over.namespace.as_deref())?;
	match state.storage.get(&ctx.namespace, &key).await? {
		Some(value) => Ok((axum::http::StatusCode::OK, value).into_response()),
		None => Err(GatewayError::NotFound(key)),
	}
}

#[derive(Deserialize)]
pub struct PutBody {
	#[serde(with = "base64_bytes")]
	pub value: Vec<u8>,
	#[serde(default)]
	pub namespace: Option<String>,
}

pub async fn put(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(key): Path<String>,
	Json(body): Json<PutBody>,
) -> Result<impl IntoResponse, GatewayError> {
	check_namespace_override(&ctx.namespace, body.namespace.as_deref())?;
	state.storage.put(&ctx.namespace, &key, body.value).await?;
	Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn delete(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(key): Path<String>,
	Query(over): Query<NamespaceOverride>,
) -> Result<impl IntoResponse, GatewayError> {
	check_namespace_override(&ctx.namespace, over.namespace.as_deref())?;
	if state.storage.delete(&ctx.namespace, &key).await? {
		Ok(axum::http::StatusCode::NO_CONTENT)
	} else {
		Err(GatewayError::NotFound(key))
	}
}

#[derive(Deserialize)]
pub struct ListParams {
	#[serde(default)]
	pub prefix: String,
	pub limit: Option<u32>,
	#[serde(default)]
	pub namespace: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse {
	pub keys: Vec<String>,
}

pub async fn list(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, GatewayError> {
	check_namespace_override(&ctx.namespace, params.namespace.as_deref())?;
	let keys = state.storage.list(&ctx.namespace, &params.prefix, params.limit).await?;
	Ok(Json(ListResponse { keys }))
}

mod base64_bytes {
	use base64::Engine;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		base64::engine::general_purpose::STANDARD.encode(value).serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		base64::engine::general_purpose::STANDARD
			.decode(s)
			.map_err(serde::de::Error::custom)
	}
}
