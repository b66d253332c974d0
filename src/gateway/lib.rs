//! HTTP/WebSocket façade fronting the SQL manager, storage service, peer
//! overlay, cache spawner, and content store client (§4.4). The only crate
//! in the workspace with a network-facing listener.

#[macro_use]
extern crate tracing;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod pubsub;
pub mod routes;
pub mod server;
pub mod state;

pub use error::GatewayError;
pub use server::{build_router, serve};
pub use state::GatewayState;
