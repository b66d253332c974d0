//! `/v1/storage/*` handlers: proxy to the content store client (§4.4
//! "Storage proxy endpoints", §4.6). The resolved namespace is stamped onto
//! the pin's `name` so pinned content stays attributable to a tenant even
//! though the daemon itself has no namespace concept.

use axum::extract::{Extension, Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use node_content::{ForwardedAuth, PinStatus};
use serde::Serialize;

use crate::error::GatewayError;
use crate::state::{GatewayState, RequestContext};

fn forwarded_auth(ctx: &RequestContext) -> ForwardedAuth {
	match &ctx.credential {
		crate::auth::Credential::ApiKey { opaque, .. } => ForwardedAuth::ApiKey(opaque.clone()),
		crate::auth::Credential::Jwt(_) => ForwardedAuth::None,
		crate::auth::Credential::Internal => ForwardedAuth::None,
	}
}

#[derive(Serialize)]
pub struct UploadResponse {
	pub cid: String,
	pub size: u64,
}

pub async fn upload(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	mut multipart: Multipart,
) -> Result<Json<UploadResponse>, GatewayError> {
	let auth = forwarded_auth(&ctx);
	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| GatewayError::BadRequest(e.to_string()))?
	{
		let file_name = field.file_name().unwrap_or("blob").to_string();
		let data: Bytes = field.bytes().await.map_err(|e| GatewayError::BadRequest(e.to_string()))?;
		let name = format!("{}/{}", ctx.namespace, file_name);
		let result = state.content.upload(&name, data, &auth).await?;
		return Ok(Json(UploadResponse {
			cid: result.cid,
			size: result.size,
		}));
	}
	Err(GatewayError::BadRequest("multipart body had no file field".into()))
}

#[derive(serde::Deserialize)]
pub struct PinRequest {
	pub cid: String,
}

#[derive(Serialize)]
pub struct PinResponse {
	pub cid: String,
	pub status: PinStatus,
}

pub async fn pin(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Json(req): Json<PinRequest>,
) -> Result<Json<PinResponse>, GatewayError> {
	let auth = forwarded_auth(&ctx);
	let name = format!("{}/{}", ctx.namespace, req.cid);
	let info = state.content.pin(&req.cid, &name, &auth).await?;
	Ok(Json(PinResponse {
		cid: info.cid,
		status: info.status,
	}))
}

#[derive(Serialize)]
pub struct StatusResponse {
	pub cid: String,
	pub status: PinStatus,
	pub replication_min: Option<u32>,
	pub replication_max: Option<u32>,
	pub peers: Vec<String>,
}

pub async fn status(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(cid): Path<String>,
) -> Result<Json<StatusResponse>, GatewayError> {
	let auth = forwarded_auth(&ctx);
	let info = state.content.status(&cid, &auth).await?;
	Ok(Json(StatusResponse {
		cid: info.cid,
		status: info.status,
		replication_min: info.replication_min,
		replication_max: info.replication_max,
		peers: info.peers,
	}))
}

pub async fn get(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(cid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
	let auth = forwarded_auth(&ctx);
	let upstream = state.content.get(&cid, &auth).await?;
	let bytes = upstream.bytes().await.map_err(|e| GatewayError::Backend(e.to_string()))?;
	Ok(bytes)
}

pub async fn unpin(
	State(state): State<GatewayState>,
	Extension(ctx): Extension<RequestContext>,
	Path(cid): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
	let auth = forwarded_auth(&ctx);
	state.content.unpin(&cid, &auth).await?;
	Ok(axum::http::StatusCode::NO_CONTENT)
}
