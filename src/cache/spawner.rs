//! Spawn/stop lifecycle for per-namespace cache cluster instances (§4.5).
//! Child processes are deliberately **not** tied to the caller's request
//! context: a cancelled HTTP request must not kill a running cache cluster
//! node, so `Spawn` detaches the child into a reaper task immediately after
//! readiness is confirmed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};

use crate::config::{self, InstanceDirs, SpawnRequest};
use crate::error::{CacheError, CacheResult};
use crate::registry::{InstanceState, InstanceStatus, Registry};

const MEMBERLIST_READY_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_GRACE: Duration = Duration::from_secs(10);
const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

struct LiveInstance {
	pid: Option<u32>,
	done_rx: oneshot::Receiver<()>,
}

pub struct CacheSpawner {
	base_dir: PathBuf,
	engine_binary: PathBuf,
	registry: Arc<Registry>,
	live: Mutex<HashMap<(String, String), LiveInstance>>,
}

impl CacheSpawner {
	pub fn new(base_dir: PathBuf, engine_binary: PathBuf) -> Arc<Self> {
		Arc::new(CacheSpawner {
			base_dir,
			engine_binary,
			registry: Arc::new(Registry::default()),
			live: Mutex::new(HashMap::new()),
		})
	}

	pub fn list(&self) -> Vec<InstanceStatus> {
		self.registry.list()
	}

	pub fn status(&self, namespace: &str, node_id: &str) -> Option<InstanceStatus> {
		self.registry.get(namespace, node_id)
	}

	/// `Remove(namespace, node_id)`: valid only on `stopped`/`failed`
	/// instances, removes from the registry but leaves on-disk artifacts for
	/// post-mortem inspection.
	pub fn remove(&self, namespace: &str, node_id: &str) -> CacheResult<()> {
		self.registry
			.remove(namespace, node_id)
			.map(|_| ())
			.ok_or_else(|| CacheError::NotRemovable(format!("{}/{}", namespace, node_id)))
	}

	pub async fn spawn(self: &Arc<Self>, req: SpawnRequest) -> CacheResult<InstanceStatus> {
		let key = req.key();

		if let Some(status) = self.registry.get(&req.namespace, &req.node_id) {
			if status.state == InstanceState::Running || status.state == InstanceState::Starting {
				return Ok(status);
			}
		}

		self.registry.insert(InstanceStatus {
			namespace: req.namespace.clone(),
			node_id: req.node_id.clone(),
			http_port: req.http_port,
			memberlist_port: req.memberlist_port,
			state: InstanceState::Pending,
			error: None,
		});

		let dirs = InstanceDirs::new(&self.base_dir, &req.namespace, &req.node_id);
		dirs.create_all()?;
		let config_path = config::write_config(&dirs, &req)?;
		let log_path = dirs.log_path(&req.node_id);

		self.registry
			.set_state(&req.namespace, &req.node_id, InstanceState::Starting, None);

		match self.spawn_child(&req, &config_path, &log_path).await {
			Ok(()) => {
				self.registry
					.set_state(&req.namespace, &req.node_id, InstanceState::Running, None);
				self.spawn_health_monitor(key);
			}
			Err(e) => {
				self.registry.set_state(
					&req.namespace,
					&req.node_id,
					InstanceState::Failed,
					Some(e.to_string()),
				);
				return Err(e);
			}
		}

		Ok(self.registry.get(&req.namespace, &req.node_id).unwrap())
	}

	async fn spawn_child(
		self: &Arc<Self>,
		req: &SpawnRequest,
		config_path: &std::path::Path,
		log_path: &std::path::Path,
	) -> CacheResult<()> {
		let log_file = std::fs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(log_path)?;
		let log_file_err = log_file.try_clone()?;

		let mut child = Command::new(&self.engine_binary)
			.arg("--config")
			.arg(config_path)
			.stdin(Stdio::null())
			.stdout(Stdio::from(log_file))
			.stderr(Stdio::from(log_file_err))
			.kill_on_drop(false)
			.spawn()?;
		let pid = child.id();

		info!(
			"spawned cache instance {}/{} (http_port={} memberlist_port={})",
			req.namespace, req.node_id, req.http_port, req.memberlist_port
		);

		let (done_tx, done_rx) = oneshot::channel();

		let log_path_owned = log_path.to_path_buf();
		tokio::spawn(async move {
			let status = child.wait().await;
			debug!("cache child at {} exited: {:?}", log_path_owned.display(), status);
			let _ = done_tx.send(());
		});

		self.live.lock().await.insert(req.key(), LiveInstance { pid, done_rx });

		self.wait_memberlist_ready(req).await
	}

	async fn wait_memberlist_ready(&self, req: &SpawnRequest) -> CacheResult<()> {
		let addr = format!("{}:{}", req.bind_addr, req.memberlist_port);
		let deadline = tokio::time::Instant::now() + MEMBERLIST_READY_TIMEOUT;
		loop {
			if TcpStream::connect(&addr).await.is_ok() {
				return Ok(());
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(CacheError::InstanceFailed(
					format!("{}/{}", req.namespace, req.node_id),
					"timed out waiting for memberlist port".to_string(),
				));
			}
			tokio::time::sleep(Duration::from_millis(250)).await;
		}
	}

	fn spawn_health_monitor(self: &Arc<Self>, key: (String, String)) {
		let this = self.clone();
		tokio::spawn(async move {
			loop {
				tokio::time::sleep(HEALTH_INTERVAL).await;
				let (namespace, node_id) = &key;
				let status = match this.registry.get(namespace, node_id) {
					Some(s) => s,
					None => return,
				};
				if status.state != InstanceState::Running {
					return;
				}
				let addr = format!("127.0.0.1:{}", status.memberlist_port);
				let port_ok = TcpStream::connect(&addr).await.is_ok();

				let mut live = this.live.lock().await;
				let exited = match live.get_mut(&key) {
					Some(instance) => instance.done_rx.try_recv().is_ok(),
					None => true,
				};
				drop(live);

				if exited {
					this.registry.set_state(
						namespace,
						node_id,
						InstanceState::Failed,
						Some("process exited unexpectedly".to_string()),
					);
					return;
				}
				if !port_ok {
					warn!("cache instance {}/{} memberlist port not reachable", namespace, node_id);
				}
			}
		});
	}

	/// `Stop(namespace, node_id)`: graceful termination, wait up to 10s,
	/// force-kill on timeout, then wait for the reaper.
	pub async fn stop(&self, namespace: &str, node_id: &str) -> CacheResult<()> {
		let key = (namespace.to_string(), node_id.to_string());
		let mut live_guard = self.live.lock().await;
		let instance = live_guard
			.remove(&key)
			.ok_or_else(|| CacheError::NotFound(format!("{}/{}", namespace, node_id)))?;
		drop(live_guard);

		#[cfg(unix)]
		if let Some(pid) = instance.pid {
			send_signal(pid as i32, SIGTERM);
		}

		let mut done_rx = instance.done_rx;
		if tokio::time::timeout(STOP_GRACE, &mut done_rx).await.is_err() {
			#[cfg(unix)]
			if let Some(pid) = instance.pid {
				send_signal(pid as i32, SIGKILL);
			}
			let _ = done_rx.await;
		}

		self.registry.set_state(namespace, node_id, InstanceState::Stopped, None);
		Ok(())
	}
}

#[cfg(unix)]
const SIGTERM: i32 = 15;
#[cfg(unix)]
const SIGKILL: i32 = 9;

#[cfg(unix)]
fn send_signal(pid: i32, sig: i32) {
	extern "C" {
		fn kill(pid: i32, sig: i32) -> i32;
	}
	unsafe {
		kill(pid, sig);
	}
}
