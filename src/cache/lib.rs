//! Per-namespace cache cluster spawner (§4.5): on demand, runs N child
//! processes of a memberlist-clustered cache server, one per
//! `(namespace, node_id)`, with lifetime decoupled from the caller's request
//! context.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod registry;
pub mod spawner;

pub use config::SpawnRequest;
pub use error::{CacheError, CacheResult};
pub use registry::{InstanceState, InstanceStatus};
pub use spawner::CacheSpawner;
