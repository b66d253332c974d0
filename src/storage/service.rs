//! Handler contracts for Put/Get/Delete/List/Exists (§4.3), all operating on
//! the local SQL table `kv_storage`. Binary values are hex-encoded for
//! transport through the SQL engine's JSON query/execute API.

use node_sql::SqlClient;
use node_util::error::Error;
use serde_json::json;

use crate::protocol::{Request, Response};

pub struct StorageService {
	sql: SqlClient,
}

impl StorageService {
	pub fn new(sql: SqlClient) -> Self {
		StorageService { sql }
	}

	/// Decode a raw storage-request payload and answer it. Called from the
	/// node's single `PeerEvent` dispatch loop whenever a `StorageRequest`
	/// event arrives; the caller owns sending the encoded response back
	/// through `node_peer::PeerHandle::respond_storage`.
	pub async fn handle_bytes(&self, request: &[u8]) -> Response {
		match Request::from_bytes(request) {
			Ok(req) => self.handle(req).await,
			Err(e) => Response::Error {
				message: format!("malformed request: {}", e),
			},
		}
	}

	pub async fn handle(&self, request: Request) -> Response {
		let result = match request {
			Request::Put { namespace, key, value } => self.put(namespace, key, value).await,
			Request::Get { namespace, key } => self.get(namespace, key).await,
			Request::Delete { namespace, key } => self.delete(namespace, key).await,
			Request::List { namespace, prefix, limit } => self.list(namespace, prefix, limit).await,
			Request::Exists { namespace, key } => self.exists(namespace, key).await,
		};
		match result {
			Ok(resp) => resp,
			Err(e) => Response::Error {
				message: e.to_string(),
			},
		}
	}

	async fn put(&self, namespace: String, key: String, value: Vec<u8>) -> Result<Response, Error> {
		let now = node_util::time::now_secs();
		let hex_value = hex::encode(&value);
		self.sql
			.execute(
				"INSERT INTO kv_storage (namespace, key, value, created_at, updated_at) \
				 VALUES (?, ?, ?, ?, ?) \
				 ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
				&[
					json!(namespace),
					json!(key),
					json!(hex_value),
					json!(now),
					json!(now),
				],
			)
			.await?;
		Ok(Response::Ok)
	}

	async fn get(&self, namespace: String, key: String) -> Result<Response, Error> {
		let rows = self
			.sql
			.query(
				"SELECT value FROM kv_storage WHERE namespace = ? AND key = ?",
				&[json!(namespace), json!(key)],
			)
			.await?;
		match rows.first().and_then(|r| r.get_str("value")) {
			Some(hex_value) => {
				let value = hex::decode(hex_value)
					.map_err(|e| Error::Message(format!("corrupt stored value: {}", e)))?;
				Ok(Response::OkWithValue { value })
			}
			None => Ok(Response::NotFound),
		}
	}

	async fn delete(&self, namespace: String, key: String) -> Result<Response, Error> {
		let affected = self
			.sql
			.execute(
				"DELETE FROM kv_storage WHERE namespace = ? AND key = ?",
				&[json!(namespace), json!(key)],
			)
			.await?;
		if affected == 0 {
			Ok(Response::NotFound)
		} else {
			Ok(Response::Ok)
		}
	}

	async fn list(
		&self,
		namespace: String,
		prefix: String,
		limit: Option<u32>,
	) -> Result<Response, Error> {
		let mut sql = if prefix.is_empty() {
			"SELECT key FROM kv_storage WHERE namespace = ?".to_string()
		} else {
			"SELECT key FROM kv_storage WHERE namespace = ? AND key LIKE ?".to_string()
		};
		let mut params = vec![json!(namespace)];
		if !prefix.is_empty() {
			params.push(json!(format!("{}%", prefix)));
		}
		if let Some(limit) = limit {
			sql.push_str(&format!(" LIMIT {}", limit));
		}
		let rows = self.sql.query(&sql, &params).await?;
		let keys = rows.into_iter().filter_map(|r| r.get_str("key")).collect();
		Ok(Response::OkWithKeys { keys })
	}

	async fn exists(&self, namespace: String, key: String) -> Result<Response, Error> {
		let rows = self
			.sql
			.query(
				"SELECT 1 AS present FROM kv_storage WHERE namespace = ? AND key = ?",
				&[json!(namespace), json!(key)],
			)
			.await?;
		Ok(Response::OkWithExists {
			exists: !rows.is_empty(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_round_trips_arbitrary_bytes() {
		let value = vec![0u8, 1, 255, 16, 7];
		let encoded = hex::encode(&value);
		let decoded = hex::decode(encoded).unwrap();
		assert_eq!(decoded, value);
	}
}
