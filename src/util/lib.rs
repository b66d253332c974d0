//! Shared types used across every subsystem of the node: the error taxonomy,
//! layered configuration, logging setup, time helpers and a small supervised
//! background-task runner.

#[macro_use]
extern crate tracing;

pub mod background;
pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
