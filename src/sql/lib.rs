//! Replicated SQL cluster lifecycle (§4.1 of the design spec): supervises a
//! child replicated-SQL process, resolves this node's advertise address,
//! gates joiners on the target being reachable, and waits for bootstrap
//! leadership or join-time availability before declaring the node ready.

#[macro_use]
extern crate tracing;

pub mod advertise;
pub mod client;
pub mod manager;

pub use client::SqlClient;
pub use manager::{SqlManager, SqlManagerConfig};
