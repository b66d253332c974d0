//! Router assembly and the listen/serve entrypoint (§2 "Gateway").
//! `/healthz` and `/v1/auth/*` bypass [`crate::middleware::require_namespace`]
//! — a caller has to hit auth before it has a namespace to stamp.

use std::net::SocketAddr;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{auth, cache, cluster, kv, storage};
use crate::state::GatewayState;

pub fn build_router(state: GatewayState) -> Router {
	let public = Router::new()
		.route("/healthz", get(cluster::healthz))
		.route("/v1/auth/challenge", post(auth::challenge))
		.route("/v1/auth/verify", post(auth::verify))
		.route("/v1/auth/refresh", post(auth::refresh))
		.route("/v1/auth/register", post(auth::register));

	let authenticated = Router::new()
		.route("/v1/auth/logout", post(auth::logout))
		.route("/v1/auth/whoami", get(auth::whoami))
		.route("/v1/kv/:key", get(kv::get).put(kv::put).delete(kv::delete))
		.route("/v1/kv", get(kv::list))
		.route("/v1/storage/upload", post(storage::upload))
		.route("/v1/storage/pin", post(storage::pin))
		.route("/v1/storage/status/:cid", get(storage::status))
		.route("/v1/storage/get/:cid", get(storage::get))
		.route("/v1/storage/unpin/:cid", delete(storage::unpin))
		.route("/v1/cache/:node_id", post(cache::spawn).delete(cache::stop))
		.route("/v1/cache/:node_id/remove", post(cache::remove))
		.route("/v1/cache", get(cache::list))
		.route("/v1/pubsub/ws", get(crate::pubsub::bridge::ws_handler))
		.route_layer(axum::middleware::from_fn_with_state(
			state.clone(),
			crate::middleware::require_namespace,
		));

	let internal = Router::new().route("/v1/cluster/status", get(cluster::status));

	Router::new()
		.merge(public)
		.merge(authenticated)
		.merge(internal)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}

pub async fn serve(state: GatewayState, bind_addr: SocketAddr) -> std::io::Result<()> {
	let router = build_router(state);
	info!("gateway listening on {}", bind_addr);
	axum::Server::bind(&bind_addr)
		.serve(router.into_make_service())
		.await
}
