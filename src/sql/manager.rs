//! Child SQL-replication process supervision (§4.1).

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use node_util::error::{Error, Result};
use tokio::process::{Child, Command};
use tokio::sync::watch;

use crate::advertise::resolve_advertise_host;
use crate::client::SqlClient;

const READINESS_TIMEOUT: Duration = Duration::from_secs(30);
const LEADER_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqlManagerConfig {
	/// Path to the replicated-SQL engine binary (e.g. an `rqlited`-style executable).
	pub engine_binary: PathBuf,
	pub data_dir: PathBuf,
	pub http_port: u16,
	pub raft_port: u16,
	pub advertise_mode: node_util::config::AdvertiseMode,
	/// `host:port` of an existing cluster member's HTTP API, or empty to bootstrap.
	pub join_address: String,
	pub connect_timeout_secs: u64,
	pub retry_attempts: u32,
	pub retry_delay_ms: u64,
}

/// Supervises the child SQL-replication process for the lifetime of this
/// node. The reaper task owns the `Child` outright and drives `wait()` on it
/// for as long as the process lives; `stop()` never touches `Child` itself,
/// it signals the process by pid and observes exit through `exit_rx`. This
/// keeps a healthy running child from deadlocking `stop()` against the
/// reaper's in-flight `wait()`.
pub struct SqlManager {
	pid: Option<u32>,
	exit_rx: watch::Receiver<Option<std::process::ExitStatus>>,
	client: SqlClient,
}

impl SqlManager {
	fn local_base_url(config: &SqlManagerConfig) -> String {
		format!("http://127.0.0.1:{}", config.http_port)
	}

	/// Start the child process, wait for HTTP readiness, and wait for either
	/// bootstrap leadership or join/restart availability depending on
	/// `join_address` and prior on-disk state.
	pub async fn start(config: SqlManagerConfig) -> Result<Arc<Self>> {
		std::fs::create_dir_all(&config.data_dir)?;
		let had_prior_state = has_prior_state(&config.data_dir);

		let advertise_host = resolve_advertise_host(config.advertise_mode);

		if !config.join_address.is_empty() {
			gate_join_target(&config.join_address).await;
		}

		let mut cmd = Command::new(&config.engine_binary);
		cmd.arg(format!("--data-dir={}", config.data_dir.display()))
			.arg(format!("-http-addr=0.0.0.0:{}", config.http_port))
			.arg(format!("-raft-addr=0.0.0.0:{}", config.raft_port))
			.arg(format!(
				"-http-adv-addr={}:{}",
				advertise_host, config.http_port
			))
			.arg(format!(
				"-raft-adv-addr={}:{}",
				advertise_host, config.raft_port
			));

		if !config.join_address.is_empty() {
			cmd.arg("-join")
				.arg(normalize_join_address(&config.join_address));
		}

		cmd.stdin(Stdio::null())
			.stdout(Stdio::inherit())
			.stderr(Stdio::inherit())
			.kill_on_drop(false);

		info!(
			"starting sql engine: data_dir={} http_port={} raft_port={} advertise={}",
			config.data_dir.display(),
			config.http_port,
			config.raft_port,
			advertise_host
		);
		let mut child = cmd
			.spawn()
			.map_err(|e| Error::Message(format!("spawning sql engine: {}", e)))?;
		let pid = child.id();

		let base_url = Self::local_base_url(&config);
		let client = SqlClient::new(
			base_url.clone(),
			Duration::from_secs(config.connect_timeout_secs),
			config.retry_attempts,
			Duration::from_millis(config.retry_delay_ms),
		)?;

		if let Err(e) = wait_for_readiness(&base_url, &mut child, READINESS_TIMEOUT).await {
			let _ = child.start_kill();
			let _ = child.wait().await;
			return Err(e);
		}

		let (exit_tx, exit_rx) = watch::channel(None);
		tokio::spawn(async move {
			let status = child.wait().await.ok();
			let _ = exit_tx.send(status);
		});

		let sys = Arc::new(SqlManager {
			pid,
			exit_rx,
			client: client.clone(),
		});

		if config.join_address.is_empty() && !had_prior_state {
			info!("bootstrapping: waiting for this node to become leader");
			client
				.wait_select_1(LEADER_TIMEOUT)
				.await
				.map_err(|_| Error::LeaderUnavailable("bootstrap leader election timed out".into()))?;
		} else {
			info!("waiting for sql availability (joiner or restart)");
			client
				.wait_select_1(LEADER_TIMEOUT)
				.await
				.map_err(|_| Error::LeaderUnavailable("no leader known within timeout".into()))?;
		}

		client.ensure_kv_table().await?;

		Ok(sys)
	}

	pub fn client(&self) -> &SqlClient {
		&self.client
	}

	pub fn has_exited(&self) -> Option<std::process::ExitStatus> {
		*self.exit_rx.borrow()
	}

	/// Graceful stop: send `SIGTERM`, wait up to 5s for the reaper to observe
	/// exit, then `SIGKILL` and wait again. Never takes a lock the reaper
	/// might be holding across `Child::wait()`.
	pub async fn stop(&self) -> Result<()> {
		#[cfg(unix)]
		if let Some(pid) = self.pid {
			send_signal(pid as i32, SIGTERM);
		}

		let mut exit_rx = self.exit_rx.clone();
		if tokio::time::timeout(STOP_GRACE, wait_for_exit(&mut exit_rx))
			.await
			.is_err()
		{
			#[cfg(unix)]
			if let Some(pid) = self.pid {
				send_signal(pid as i32, SIGKILL);
			}
			wait_for_exit(&mut exit_rx).await;
		}
		Ok(())
	}
}

async fn wait_for_exit(exit_rx: &mut watch::Receiver<Option<std::process::ExitStatus>>) {
	loop {
		if exit_rx.borrow().is_some() {
			return;
		}
		if exit_rx.changed().await.is_err() {
			return;
		}
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

fn has_prior_state(data_dir: &PathBuf) -> bool {
	match std::fs::read_dir(data_dir) {
		Ok(mut entries) => entries.next().is_some(),
		Err(_) => false,
	}
}

fn normalize_join_address(addr: &str) -> String {
	addr.trim_start_matches("https://")
		.trim_start_matches("http://")
		.to_string()
}

/// Poll the join target's `/status` until it responds 200. Unlike the
/// readiness wait below, this has no timeout: per the design spec's chosen
/// resolution of the join-reachability open question, we log and keep
/// retrying rather than aborting startup, since that tolerates ordered
/// restarts better.
async fn gate_join_target(join_address: &str) {
	let base_url = format!("http://{}", normalize_join_address(join_address));
	let mut attempt = 0u32;
	loop {
		if SqlClient::status_ok(&base_url).await {
			return;
		}
		attempt += 1;
		if attempt % 10 == 1 {
			warn!(
				"join target {} not reachable yet, retrying (attempt {})",
				join_address, attempt
			);
		}
		tokio::time::sleep(Duration::from_secs(1)).await;
	}
}

async fn wait_for_readiness(base_url: &str, child: &mut Child, timeout: Duration) -> Result<()> {
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		if let Ok(Some(status)) = child.try_wait() {
			return Err(Error::Message(format!(
				"sql engine exited before becoming ready: {}",
				status
			)));
		}
		if SqlClient::status_ok(base_url).await {
			return Ok(());
		}
		if tokio::time::Instant::now() >= deadline {
			return Err(Error::Message(
				"timed out waiting for sql engine http readiness".into(),
			));
		}
		tokio::time::sleep(Duration::from_millis(200)).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_join_address() {
		assert_eq!(normalize_join_address("http://10.0.0.1:4001"), "10.0.0.1:4001");
		assert_eq!(normalize_join_address("https://10.0.0.1:4001"), "10.0.0.1:4001");
		assert_eq!(normalize_join_address("10.0.0.1:4001"), "10.0.0.1:4001");
	}

	#[test]
	fn fresh_dir_has_no_prior_state() {
		let dir = std::env::temp_dir().join(format!("node-sql-test-{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		assert!(!has_prior_state(&dir));
		std::fs::write(dir.join("marker"), b"x").unwrap();
		assert!(has_prior_state(&dir));
		std::fs::remove_dir_all(&dir).unwrap();
	}
}
