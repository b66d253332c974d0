//! Layered configuration: built-in defaults, overridden by a TOML file,
//! overridden again by environment variables. Mirrors the teacher's
//! `toml`-based config loading, with an explicit env-overlay pass added
//! since the ambient stack requires one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, OkOrMessage, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvertiseMode {
	Auto,
	Ip,
	Localhost,
}

impl Default for AdvertiseMode {
	fn default() -> Self {
		AdvertiseMode::Auto
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Pretty,
	Json,
}

impl Default for LogFormat {
	fn default() -> Self {
		LogFormat::Pretty
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Directory used for this node's own state (node key, peer list, etc).
	pub metadata_dir: PathBuf,
	/// Directory the replicated SQL engine stores its own data under.
	pub data_dir: PathBuf,
	/// Directory under which per-namespace cache clusters get their own subtree.
	pub cache_base_dir: PathBuf,

	pub sql_port: u16,
	pub raft_port: u16,
	pub gateway_port: u16,

	pub advertise_mode: AdvertiseMode,
	/// `host:port` of an existing cluster member's HTTP API to join, or empty to bootstrap.
	pub join_address: String,

	/// Bootstrap multiaddrs (with trailing `/p2p/<peer id>`) for the peer overlay.
	pub bootstrap_peers: Vec<String>,
	/// HTTP endpoints of SQL nodes; defaults derive from bootstrap peer hostnames + sql_port.
	pub database_endpoints: Vec<String>,
	pub discovery_interval_secs: u64,
	pub max_connections: usize,
	pub enable_mdns: bool,
	/// Enables the "chat-like" aggressive peer-exchange/flood-publish behavior (§4.2).
	pub chat_like: bool,

	pub connect_timeout_secs: u64,
	pub retry_attempts: u32,
	pub retry_delay_ms: u64,

	pub jwt_issuer: String,
	pub jwt_audience: String,
	/// Hex-encoded Ed25519 signing seed, or empty to generate and persist one on first start.
	pub jwt_signing_key: String,
	pub access_token_ttl_secs: i64,
	pub refresh_token_ttl_secs: i64,

	pub content_store_endpoint: String,

	pub log_format: LogFormat,
	pub log_filter: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			metadata_dir: PathBuf::from("./data/meta"),
			data_dir: PathBuf::from("./data/sql"),
			cache_base_dir: PathBuf::from("./data/cache"),
			sql_port: 4001,
			raft_port: 4002,
			gateway_port: 8080,
			advertise_mode: AdvertiseMode::Auto,
			join_address: String::new(),
			bootstrap_peers: Vec::new(),
			database_endpoints: Vec::new(),
			discovery_interval_secs: 60,
			max_connections: 64,
			enable_mdns: true,
			chat_like: false,
			connect_timeout_secs: 10,
			retry_attempts: 3,
			retry_delay_ms: 500,
			jwt_issuer: "node-gateway".to_string(),
			jwt_audience: "node-clients".to_string(),
			jwt_signing_key: String::new(),
			access_token_ttl_secs: 15 * 60,
			refresh_token_ttl_secs: 30 * 24 * 60 * 60,
			content_store_endpoint: "http://127.0.0.1:5001".to_string(),
			log_format: LogFormat::Pretty,
			log_filter: "info".to_string(),
		}
	}
}

impl Config {
	/// Load defaults, then a TOML file if present, then environment overrides.
	pub fn load(config_file: &Path) -> Result<Self> {
		let mut config = if config_file.exists() {
			let data = std::fs::read_to_string(config_file)
				.ok_or_message(format!("unable to read {}", config_file.display()))?;
			toml::from_str::<Config>(&data)
				.ok_or_message(format!("invalid config file {}", config_file.display()))?
		} else {
			Config::default()
		};
		config.apply_env_overrides()?;
		config.validate()?;
		Ok(config)
	}

	fn apply_env_overrides(&mut self) -> Result<()> {
		macro_rules! env_str {
			($key:literal, $field:expr) => {
				if let Ok(v) = std::env::var($key) {
					$field = v;
				}
			};
		}
		macro_rules! env_parse {
			($key:literal, $field:expr) => {
				if let Ok(v) = std::env::var($key) {
					$field = v
						.parse()
						.ok_or_message(concat!("invalid value for ", $key))?;
				}
			};
		}

		env_parse!("NODE_SQL_PORT", self.sql_port);
		env_parse!("NODE_RAFT_PORT", self.raft_port);
		env_parse!("NODE_GATEWAY_PORT", self.gateway_port);
		env_str!("NODE_JOIN_ADDRESS", self.join_address);
		env_str!("NODE_JWT_SIGNING_KEY", self.jwt_signing_key);
		env_str!("NODE_CONTENT_STORE_ENDPOINT", self.content_store_endpoint);
		env_str!("NODE_LOG_FILTER", self.log_filter);

		if let Ok(v) = std::env::var("NODE_ADVERTISE_MODE") {
			self.advertise_mode = match v.as_str() {
				"auto" => AdvertiseMode::Auto,
				"ip" => AdvertiseMode::Ip,
				"localhost" => AdvertiseMode::Localhost,
				other => return Err(Error::InvalidConfig(format!("advertise_mode: {}", other))),
			};
		}
		if let Ok(v) = std::env::var("NODE_BOOTSTRAP_PEERS") {
			self.bootstrap_peers = v.split(',').map(|s| s.trim().to_string()).collect();
		}

		Ok(())
	}

	fn validate(&self) -> Result<()> {
		if self.sql_port == 0 || self.raft_port == 0 || self.gateway_port == 0 {
			return Err(Error::InvalidConfig("ports must be non-zero".into()));
		}
		if self.sql_port == self.raft_port {
			return Err(Error::InvalidConfig(
				"sql_port and raft_port must differ".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_validate() {
		Config::default().validate().unwrap();
	}

	#[test]
	fn rejects_clashing_ports() {
		let mut c = Config::default();
		c.raft_port = c.sql_port;
		assert!(c.validate().is_err());
	}

	#[test]
	fn load_missing_file_uses_defaults() {
		let c = Config::load(Path::new("/nonexistent/node.toml")).unwrap();
		assert_eq!(c.gateway_port, 8080);
	}
}
