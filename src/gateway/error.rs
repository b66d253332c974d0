//! Gateway-facing error type: every handler returns `Result<_, GatewayError>`,
//! and `IntoResponse` maps the taxonomy in §7 of the design spec onto HTTP
//! status codes with a JSON `{"error": "..."}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
	#[error("authentication required")]
	AuthRequired,
	#[error("namespace mismatch: {0}")]
	NamespaceMismatch(String),
	#[error("not found: {0}")]
	NotFound(String),
	#[error("invalid request: {0}")]
	BadRequest(String),
	#[error("backend unavailable: {0}")]
	Backend(String),
}

#[derive(Serialize)]
struct ErrorBody {
	error: String,
}

impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let status = match &self {
			GatewayError::AuthRequired => StatusCode::UNAUTHORIZED,
			GatewayError::NamespaceMismatch(_) => StatusCode::FORBIDDEN,
			GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
			GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
			GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
		};
		(status, Json(ErrorBody { error: self.to_string() })).into_response()
	}
}

impl From<node_util::error::Error> for GatewayError {
	fn from(e: node_util::error::Error) -> Self {
		match e {
			node_util::error::Error::AuthRequired => GatewayError::AuthRequired,
			node_util::error::Error::NamespaceMismatch(ns) => GatewayError::NamespaceMismatch(ns),
			node_util::error::Error::NotFound(what) => GatewayError::NotFound(what),
			node_util::error::Error::InvalidConfig(msg) => GatewayError::BadRequest(msg),
			other => GatewayError::Backend(other.to_string()),
		}
	}
}

impl From<node_peer::PeerError> for GatewayError {
	fn from(e: node_peer::PeerError) -> Self {
		GatewayError::Backend(e.to_string())
	}
}

impl From<node_content::ContentError> for GatewayError {
	fn from(e: node_content::ContentError) -> Self {
		match e {
			node_content::ContentError::NotFound(cid) => GatewayError::NotFound(cid),
			other => GatewayError::Backend(other.to_string()),
		}
	}
}

impl From<node_cache::CacheError> for GatewayError {
	fn from(e: node_cache::CacheError) -> Self {
		match e {
			node_cache::CacheError::NotFound(id) => GatewayError::NotFound(id),
			other => GatewayError::BadRequest(other.to_string()),
		}
	}
}
