use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CacheResult;

#[derive(Debug, Clone)]
pub struct SpawnRequest {
	pub namespace: String,
	pub node_id: String,
	pub http_port: u16,
	pub memberlist_port: u16,
	pub bind_addr: String,
	pub advertise_addr: String,
	pub peers: Vec<String>,
}

impl SpawnRequest {
	pub fn key(&self) -> (String, String) {
		(self.namespace.clone(), self.node_id.clone())
	}
}

/// Mirrors the YAML config a memberlist-clustered cache server (olric-style)
/// expects: bind/advertise addresses, the "lan" environment tag, and the
/// peer list.
#[derive(Debug, Serialize)]
struct CacheClusterConfig {
	bind_addr: String,
	bind_port: u16,
	advertise_addr: String,
	advertise_port: u16,
	memberlist: MemberlistConfig,
}

#[derive(Debug, Serialize)]
struct MemberlistConfig {
	environment: String,
	bind_addr: String,
	bind_port: u16,
	peers: Vec<String>,
}

pub struct InstanceDirs {
	pub data_dir: PathBuf,
	pub config_dir: PathBuf,
	pub log_dir: PathBuf,
}

impl InstanceDirs {
	pub fn new(base_dir: &Path, namespace: &str, node_id: &str) -> Self {
		let ns_dir = base_dir.join(namespace);
		InstanceDirs {
			data_dir: ns_dir.join("olric").join(node_id),
			config_dir: ns_dir.join("configs"),
			log_dir: ns_dir.join("logs"),
		}
	}

	pub fn create_all(&self) -> std::io::Result<()> {
		std::fs::create_dir_all(&self.data_dir)?;
		std::fs::create_dir_all(&self.config_dir)?;
		std::fs::create_dir_all(&self.log_dir)?;
		Ok(())
	}

	pub fn config_path(&self, node_id: &str) -> PathBuf {
		self.config_dir.join(format!("{}.yaml", node_id))
	}

	pub fn log_path(&self, node_id: &str) -> PathBuf {
		self.log_dir.join(format!("{}.log", node_id))
	}
}

/// Generate the YAML config for this instance and write it to `dirs`'s
/// config directory, returning the path written.
pub fn write_config(dirs: &InstanceDirs, req: &SpawnRequest) -> CacheResult<PathBuf> {
	let config = CacheClusterConfig {
		bind_addr: req.bind_addr.clone(),
		bind_port: req.http_port,
		advertise_addr: req.advertise_addr.clone(),
		advertise_port: req.http_port,
		memberlist: MemberlistConfig {
			environment: "lan".to_string(),
			bind_addr: req.bind_addr.clone(),
			bind_port: req.memberlist_port,
			peers: req.peers.clone(),
		},
	};
	let yaml = serde_yaml::to_string(&config)?;
	let path = dirs.config_path(&req.node_id);
	std::fs::write(&path, yaml)?;
	Ok(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn instance_dirs_follow_namespace_layout() {
		let dirs = InstanceDirs::new(Path::new("/base"), "ns1", "node-a");
		assert_eq!(dirs.data_dir, PathBuf::from("/base/ns1/olric/node-a"));
		assert_eq!(dirs.config_dir, PathBuf::from("/base/ns1/configs"));
		assert_eq!(dirs.log_dir, PathBuf::from("/base/ns1/logs"));
	}
}
