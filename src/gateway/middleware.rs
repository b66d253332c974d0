//! Auth middleware (§4.4): resolves a [`RequestContext`] from the request's
//! credentials and stamps it on the request's extensions for downstream
//! handlers. `/healthz` and the auth endpoints themselves bypass this (see
//! `server.rs` route wiring); everything else requires a resolvable
//! namespace.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use node_util::error::Error;

use crate::error::GatewayError;
use crate::state::{GatewayState, RequestContext};

pub async fn require_namespace(
	State(state): State<GatewayState>,
	mut req: Request<Body>,
	next: Next<Body>,
) -> Result<Response, GatewayError> {
	let credential = state.auth.resolve(req.headers()).await?;
	let namespace = credential.namespace().ok_or(Error::AuthRequired)?;
	if namespace.is_empty() {
		return Err(GatewayError::BadRequest("empty namespace".into()));
	}
	req.extensions_mut().insert(RequestContext {
		namespace: namespace.to_string(),
		credential,
	});
	Ok(next.run(req).await)
}
