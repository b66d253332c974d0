//! Thin HTTP client for the child SQL-replication process.
//!
//! The child exposes an HTTP-first query/execute API (rqlite-style), rather
//! than a native wire protocol, so the client is a `reqwest` wrapper rather
//! than a database driver.

use std::time::Duration;

use node_util::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone)]
pub struct SqlClient {
	http: reqwest::Client,
	base_url: String,
	retry_attempts: u32,
	retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct ExecuteResult {
	#[serde(default)]
	rows_affected: u64,
	#[serde(default)]
	error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
	#[serde(default)]
	columns: Vec<String>,
	#[serde(default)]
	values: Vec<Vec<Value>>,
	#[serde(default)]
	error: Option<String>,
}

/// One row of a query result, addressable by column name.
#[derive(Debug, Clone)]
pub struct Row {
	columns: Vec<String>,
	values: Vec<Value>,
}

impl Row {
	pub fn get(&self, column: &str) -> Option<&Value> {
		let idx = self.columns.iter().position(|c| c == column)?;
		self.values.get(idx)
	}

	pub fn get_str(&self, column: &str) -> Option<String> {
		self.get(column)?.as_str().map(|s| s.to_string())
	}

	pub fn get_i64(&self, column: &str) -> Option<i64> {
		self.get(column)?.as_i64()
	}
}

impl SqlClient {
	/// `retry_attempts`/`retry_delay` implement §7's "retry up to
	/// `retry_attempts` on DB connection errors, with `retry_delay` between
	/// attempts" policy for `execute`/`query`; `connect_timeout` bounds each
	/// individual TCP connect to the child process.
	pub fn new(
		base_url: String,
		connect_timeout: Duration,
		retry_attempts: u32,
		retry_delay: Duration,
	) -> Result<Self> {
		let http = reqwest::Client::builder()
			.connect_timeout(connect_timeout)
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| Error::Message(format!("building sql http client: {}", e)))?;
		Ok(SqlClient {
			http,
			base_url,
			retry_attempts,
			retry_delay,
		})
	}

	/// POSTs `body` to `<base_url><path>`, retrying connection-level failures
	/// (not HTTP error statuses, which are surfaced to the caller directly)
	/// up to `retry_attempts` times with `retry_delay` in between.
	async fn post_with_retry(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
		let mut attempt = 0u32;
		loop {
			match self
				.http
				.post(format!("{}{}", self.base_url, path))
				.json(body)
				.send()
				.await
			{
				Ok(resp) => return Ok(resp),
				Err(e) if attempt < self.retry_attempts => {
					attempt += 1;
					warn!(
						"sql request to {} failed (attempt {}/{}): {}, retrying",
						path, attempt, self.retry_attempts, e
					);
					tokio::time::sleep(self.retry_delay).await;
				}
				Err(e) => return Err(Error::TransientIo(e.to_string())),
			}
		}
	}

	/// `GET <base>/status`; used both for join-target gating and for this
	/// node's own readiness poll.
	pub async fn status_ok(base_url: &str) -> bool {
		let client = match reqwest::Client::builder().timeout(Duration::from_secs(3)).build() {
			Ok(c) => c,
			Err(_) => return false,
		};
		match client.get(format!("{}/status", base_url)).send().await {
			Ok(resp) => resp.status().is_success(),
			Err(_) => false,
		}
	}

	pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
		let body = serde_json::json!({ "sql": sql, "params": params });
		let resp = self.post_with_retry("/db/execute", &body).await?;
		if !resp.status().is_success() {
			return Err(Error::Message(format!(
				"sql execute failed with status {}",
				resp.status()
			)));
		}
		let result: ExecuteResult = resp
			.json()
			.await
			.map_err(|e| Error::Message(format!("decoding execute response: {}", e)))?;
		if let Some(err) = result.error {
			return Err(Error::Message(err));
		}
		Ok(result.rows_affected)
	}

	pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
		let body = serde_json::json!({ "sql": sql, "params": params });
		let resp = self.post_with_retry("/db/query", &body).await?;
		if !resp.status().is_success() {
			return Err(Error::Message(format!(
				"sql query failed with status {}",
				resp.status()
			)));
		}
		let result: QueryResult = resp
			.json()
			.await
			.map_err(|e| Error::Message(format!("decoding query response: {}", e)))?;
		if let Some(err) = result.error {
			return Err(Error::Message(err));
		}
		Ok(result
			.values
			.into_iter()
			.map(|values| Row {
				columns: result.columns.clone(),
				values,
			})
			.collect())
	}

	/// Polls `SELECT 1` until it succeeds, bounded by `timeout`. Used both for
	/// bootstrap leadership waits and join/restart availability waits (the
	/// semantic difference is in the caller, not in this poll).
	pub async fn wait_select_1(&self, timeout: Duration) -> Result<()> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			match self.query("SELECT 1", &[]).await {
				Ok(_) => return Ok(()),
				Err(_) if tokio::time::Instant::now() < deadline => {
					tokio::time::sleep(Duration::from_millis(250)).await;
				}
				Err(e) => return Err(Error::LeaderUnavailable(e.to_string())),
			}
		}
	}

	/// Idempotently creates the namespaced KV table this node's storage
	/// service operates on.
	pub async fn ensure_kv_table(&self) -> Result<()> {
		self.execute(
			"CREATE TABLE IF NOT EXISTS kv_storage (\
				namespace TEXT NOT NULL, \
				key TEXT NOT NULL, \
				value BLOB NOT NULL, \
				created_at INTEGER NOT NULL, \
				updated_at INTEGER NOT NULL, \
				PRIMARY KEY (namespace, key)\
			)",
			&[],
		)
		.await?;
		Ok(())
	}
}
