//! Integration test binary: one scenario module per end-to-end behavior.
//! Scenarios that need a real replicated-SQL or cache engine binary skip
//! themselves (with a printed reason) when that binary isn't on `PATH`
//! rather than faking the subprocess; scenarios that only need the library
//! APIs directly (the pubsub registries, JWT issuance) always run.

mod common;

mod cache_spawn;
mod challenge_verify;
mod join_gate;
mod kv_replication;
mod namespace_isolation;
mod presence_scenario;
