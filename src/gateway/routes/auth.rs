//! `/v1/auth/*` handlers (§4.4, §6).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::ChainType;
use crate::error::GatewayError;
use crate::state::GatewayState;

#[derive(Deserialize)]
pub struct ChallengeRequest {
	pub wallet: String,
	pub purpose: String,
	pub namespace: String,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
	pub nonce: String,
}

pub async fn challenge(
	State(state): State<GatewayState>,
	Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, GatewayError> {
	let nonce = state.auth.challenge(&req.namespace, &req.wallet, &req.purpose).await?;
	Ok(Json(ChallengeResponse { nonce }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
	pub wallet: String,
	pub nonce: String,
	pub signature: String,
	pub chain_type: ChainType,
	pub namespace: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
	pub access_token: String,
	pub refresh_token: String,
	pub api_key: String,
}

pub async fn verify(
	State(state): State<GatewayState>,
	Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, GatewayError> {
	let outcome = state
		.auth
		.verify(&req.namespace, &req.wallet, &req.nonce, &req.signature, req.chain_type)
		.await?;
	Ok(Json(VerifyResponse {
		access_token: outcome.tokens.access_token,
		refresh_token: outcome.tokens.refresh_token,
		api_key: outcome.api_key,
	}))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
	pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
	pub access_token: String,
}

pub async fn refresh(
	State(state): State<GatewayState>,
	Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, GatewayError> {
	let access_token = state.auth.refresh(&req.refresh_token).await?;
	Ok(Json(RefreshResponse { access_token }))
}

#[derive(Deserialize)]
pub struct LogoutRequest {
	pub refresh_token: String,
	#[serde(default)]
	pub all: bool,
}

pub async fn logout(
	State(state): State<GatewayState>,
	Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, GatewayError> {
	state.auth.logout(&req.refresh_token, req.all).await?;
	Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct RegisterRequest {
	pub wallet: String,
	pub app_name: String,
	pub namespace: String,
	pub signature: String,
	pub chain_type: ChainType,
}

pub async fn register(
	State(state): State<GatewayState>,
	Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, GatewayError> {
	state
		.auth
		.register(&req.namespace, &req.app_name, &req.wallet, &req.signature, req.chain_type)
		.await?;
	Ok(axum::http::StatusCode::CREATED)
}

#[derive(Serialize)]
pub struct WhoamiResponse {
	pub namespace: String,
	pub subject: Option<String>,
	pub mode: &'static str,
}

pub async fn whoami(State(state): State<GatewayState>, headers: HeaderMap) -> Result<Json<WhoamiResponse>, GatewayError> {
	let credential = state.auth.resolve(&headers).await?;
	let namespace = credential.namespace().unwrap_or_default().to_string();
	let mode = match &credential {
		crate::auth::Credential::ApiKey { .. } => "api_key",
		crate::auth::Credential::Jwt(_) => "jwt",
		crate::auth::Credential::Internal => "internal",
	};
	Ok(Json(WhoamiResponse {
		namespace,
		subject: credential.subject().map(|s| s.to_string()),
		mode,
	}))
}
