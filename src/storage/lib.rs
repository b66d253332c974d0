//! Namespaced KV storage service (§4.3): a request/response protocol carried
//! over `node_peer`'s dedicated storage protocol ID, backed by the `kv_storage`
//! table in the replicated SQL engine.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod protocol;
pub mod service;

pub use client::StorageClient;
pub use protocol::{Request, Response};
pub use service::StorageService;
