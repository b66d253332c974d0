//! The crate-wide error taxonomy (§7 of the design spec).
//!
//! Subsystem crates are free to define narrower error enums of their own;
//! they convert into [`Error`] at the boundary where an HTTP status or a
//! CLI exit code gets assigned.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Client not connected to the overlay.
	#[error("not connected to the peer overlay")]
	NotConnected,

	/// Credentials missing or invalid.
	#[error("authentication required")]
	AuthRequired,

	/// Requested namespace differs from the one derived from credentials.
	#[error("namespace mismatch: {0}")]
	NamespaceMismatch(String),

	/// Malformed address/flag/config value.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Join target was not reachable; logged, does not abort startup.
	#[error("join target unreachable: {0}")]
	JoinUnreachable(String),

	/// The SQL engine had no leader within the readiness timeout.
	#[error("sql leader unavailable: {0}")]
	LeaderUnavailable(String),

	/// KV key / CID / nonce absent.
	#[error("not found: {0}")]
	NotFound(String),

	/// Cache child process failed to become ready.
	#[error("cache instance failed: {0}")]
	InstanceFailed(String),

	/// Network read/write hiccup, retried internally before being surfaced.
	#[error("transient io error: {0}")]
	TransientIo(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("{0}")]
	Message(String),
}

impl Error {
	pub fn message(msg: impl fmt::Display) -> Self {
		Error::Message(msg.to_string())
	}

	/// Whether a caller should retry this error internally (peer iteration,
	/// bounded DB reconnection) before surfacing it.
	pub fn is_transient(&self) -> bool {
		matches!(self, Error::TransientIo(_))
	}
}

impl From<&str> for Error {
	fn from(s: &str) -> Error {
		Error::Message(s.to_string())
	}
}

impl From<String> for Error {
	fn from(s: String) -> Error {
		Error::Message(s)
	}
}

/// Extension trait mirroring the teacher's `ok_or_message` convention for
/// turning an `Option` into a [`Result`] with a lazily-built message.
pub trait OkOrMessage<T> {
	fn ok_or_message(self, msg: impl fmt::Display) -> Result<T>;
}

impl<T> OkOrMessage<T> for Option<T> {
	fn ok_or_message(self, msg: impl fmt::Display) -> Result<T> {
		self.ok_or_else(|| Error::Message(msg.to_string()))
	}
}

impl<T, E: fmt::Display> OkOrMessage<T> for std::result::Result<T, E> {
	fn ok_or_message(self, msg: impl fmt::Display) -> Result<T> {
		self.map_err(|e| Error::Message(format!("{}: {}", msg, e)))
	}
}
