//! SQL-backed persistence for nonces, refresh tokens, API keys, registered
//! applications and revocations (§3 data model, `auth/` in the persisted
//! state layout). Deliberately rides the same replicated SQL engine
//! `node_sql` uses for `kv_storage`, rather than a separate local store,
//! so that challenge/verify and token refresh work correctly regardless of
//! which cluster node a caller happens to hit.

use node_sql::SqlClient;
use node_util::error::{Error, Result};
use node_util::time::now_secs;
use serde_json::json;

#[derive(Clone)]
pub struct AuthStore {
	sql: SqlClient,
}

pub struct PersistedNonce {
	pub namespace: String,
	pub wallet: String,
	pub nonce: String,
	pub purpose: String,
	pub expires_at: i64,
}

impl AuthStore {
	pub fn new(sql: SqlClient) -> Self {
		AuthStore { sql }
	}

	/// Idempotently creates every table this store needs. Called once at
	/// gateway startup, mirroring `SqlClient::ensure_kv_table`.
	pub async fn ensure_tables(&self) -> Result<()> {
		self.sql
			.execute(
				"CREATE TABLE IF NOT EXISTS nonces (\
					namespace TEXT NOT NULL, \
					wallet TEXT NOT NULL, \
					nonce TEXT NOT NULL, \
					purpose TEXT NOT NULL, \
					expires_at INTEGER NOT NULL, \
					used_at INTEGER, \
					PRIMARY KEY (namespace, nonce)\
				)",
				&[],
			)
			.await?;
		self.sql
			.execute(
				"CREATE TABLE IF NOT EXISTS refresh_tokens (\
					token_hash TEXT NOT NULL PRIMARY KEY, \
					namespace TEXT NOT NULL, \
					subject TEXT NOT NULL, \
					issued_at INTEGER NOT NULL, \
					expires_at INTEGER NOT NULL, \
					revoked_at INTEGER\
				)",
				&[],
			)
			.await?;
		self.sql
			.execute(
				"CREATE TABLE IF NOT EXISTS api_keys (\
					wallet TEXT NOT NULL, \
					namespace TEXT NOT NULL, \
					opaque TEXT NOT NULL, \
					created_at INTEGER NOT NULL, \
					PRIMARY KEY (wallet, namespace)\
				)",
				&[],
			)
			.await?;
		self.sql
			.execute(
				"CREATE TABLE IF NOT EXISTS registered_apps (\
					namespace TEXT NOT NULL PRIMARY KEY, \
					app_name TEXT NOT NULL, \
					owner_wallet TEXT NOT NULL, \
					created_at INTEGER NOT NULL\
				)",
				&[],
			)
			.await?;
		self.sql
			.execute(
				"CREATE TABLE IF NOT EXISTS revoked_subjects (\
					namespace TEXT NOT NULL, \
					subject TEXT NOT NULL, \
					revoked_before INTEGER NOT NULL, \
					PRIMARY KEY (namespace, subject)\
				)",
				&[],
			)
			.await?;
		Ok(())
	}

	pub async fn put_nonce(&self, n: &PersistedNonce) -> Result<()> {
		self.sql
			.execute(
				"INSERT INTO nonces (namespace, wallet, nonce, purpose, expires_at, used_at) \
				 VALUES (?, ?, ?, ?, ?, NULL)",
				&[
					json!(n.namespace),
					json!(n.wallet),
					json!(n.nonce),
					json!(n.purpose),
					json!(n.expires_at),
				],
			)
			.await?;
		Ok(())
	}

	/// Atomically consumes a nonce: the conditional `UPDATE` only matches
	/// rows that are unused and unexpired, and its affected-row-count gates
	/// success, so concurrent verify attempts for the same nonce can only
	/// ever have one winner (§5 ordering guarantees).
	pub async fn consume_nonce(&self, namespace: &str, wallet: &str, nonce: &str) -> Result<bool> {
		let now = now_secs();
		let affected = self
			.sql
			.execute(
				"UPDATE nonces SET used_at = ? \
				 WHERE namespace = ? AND nonce = ? AND wallet = ? \
				 AND used_at IS NULL AND expires_at > ?",
				&[json!(now), json!(namespace), json!(nonce), json!(wallet), json!(now)],
			)
			.await?;
		Ok(affected > 0)
	}

	pub async fn put_refresh_token(
		&self,
		token_hash: &str,
		namespace: &str,
		subject: &str,
		issued_at: i64,
		expires_at: i64,
	) -> Result<()> {
		self.sql
			.execute(
				"INSERT INTO refresh_tokens (token_hash, namespace, subject, issued_at, expires_at, revoked_at) \
				 VALUES (?, ?, ?, ?, ?, NULL)",
				&[
					json!(token_hash),
					json!(namespace),
					json!(subject),
					json!(issued_at),
					json!(expires_at),
				],
			)
			.await?;
		Ok(())
	}

	/// Returns `(namespace, subject)` if the token is present, unexpired and
	/// unrevoked.
	pub async fn lookup_refresh_token(&self, token_hash: &str) -> Result<Option<(String, String)>> {
		let now = now_secs();
		let rows = self
			.sql
			.query(
				"SELECT namespace, subject FROM refresh_tokens \
				 WHERE token_hash = ? AND revoked_at IS NULL AND expires_at > ?",
				&[json!(token_hash), json!(now)],
			)
			.await?;
		Ok(rows.first().map(|r| {
			(
				r.get_str("namespace").unwrap_or_default(),
				r.get_str("subject").unwrap_or_default(),
			)
		}))
	}

	pub async fn revoke_refresh_token(&self, token_hash: &str) -> Result<()> {
		self.sql
			.execute(
				"UPDATE refresh_tokens SET revoked_at = ? WHERE token_hash = ?",
				&[json!(now_secs()), json!(token_hash)],
			)
			.await?;
		Ok(())
	}

	/// Revokes every outstanding refresh token for `subject` in `namespace`
	/// AND bumps the subject's revocation horizon so that still-live access
	/// JWTs issued before now are rejected too (§3 "revocable... en masse").
	pub async fn revoke_all_for_subject(&self, namespace: &str, subject: &str) -> Result<()> {
		let now = now_secs();
		self.sql
			.execute(
				"UPDATE refresh_tokens SET revoked_at = ? \
				 WHERE namespace = ? AND subject = ? AND revoked_at IS NULL",
				&[json!(now), json!(namespace), json!(subject)],
			)
			.await?;
		self.sql
			.execute(
				"INSERT INTO revoked_subjects (namespace, subject, revoked_before) VALUES (?, ?, ?) \
				 ON CONFLICT(namespace, subject) DO UPDATE SET revoked_before = excluded.revoked_before",
				&[json!(namespace), json!(subject), json!(now)],
			)
			.await?;
		Ok(())
	}

	/// `None` if the subject has never had a mass-revocation; otherwise the
	/// unix-seconds horizon before which tokens are rejected.
	pub async fn revoked_before(&self, namespace: &str, subject: &str) -> Result<Option<i64>> {
		let rows = self
			.sql
			.query(
				"SELECT revoked_before FROM revoked_subjects WHERE namespace = ? AND subject = ?",
				&[json!(namespace), json!(subject)],
			)
			.await?;
		Ok(rows.first().and_then(|r| r.get_i64("revoked_before")))
	}

	/// Upsert the active API key for `(wallet, namespace)`; regeneration
	/// replaces the prior opaque value outright (§3 "one active key").
	pub async fn put_api_key(&self, wallet: &str, namespace: &str, opaque: &str) -> Result<()> {
		self.sql
			.execute(
				"INSERT INTO api_keys (wallet, namespace, opaque, created_at) VALUES (?, ?, ?, ?) \
				 ON CONFLICT(wallet, namespace) DO UPDATE SET opaque = excluded.opaque, created_at = excluded.created_at",
				&[json!(wallet), json!(namespace), json!(opaque), json!(now_secs())],
			)
			.await?;
		Ok(())
	}

	pub async fn get_api_key(&self, wallet: &str, namespace: &str) -> Result<Option<String>> {
		let rows = self
			.sql
			.query(
				"SELECT opaque FROM api_keys WHERE wallet = ? AND namespace = ?",
				&[json!(wallet), json!(namespace)],
			)
			.await?;
		Ok(rows.first().and_then(|r| r.get_str("opaque")))
	}

	/// Whether `opaque` is a currently-active API key for any wallet in
	/// `namespace`. The gateway only needs namespace validity, not which
	/// wallet minted it, to authorize a bearer request.
	pub async fn api_key_is_active(&self, namespace: &str, opaque: &str) -> Result<bool> {
		let rows = self
			.sql
			.query(
				"SELECT 1 AS present FROM api_keys WHERE namespace = ? AND opaque = ?",
				&[json!(namespace), json!(opaque)],
			)
			.await?;
		Ok(!rows.is_empty())
	}

	/// Registers an application, claiming `namespace` for `owner_wallet` if
	/// unclaimed. Returns an error if the namespace is already claimed by a
	/// different wallet (§4.4 register/whoami).
	pub async fn register_app(&self, namespace: &str, app_name: &str, owner_wallet: &str) -> Result<()> {
		let rows = self
			.sql
			.query(
				"SELECT owner_wallet FROM registered_apps WHERE namespace = ?",
				&[json!(namespace)],
			)
			.await?;
		if let Some(existing) = rows.first().and_then(|r| r.get_str("owner_wallet")) {
			if existing != owner_wallet {
				return Err(Error::NamespaceMismatch(format!(
					"namespace {} already registered to a different wallet",
					namespace
				)));
			}
			return Ok(());
		}
		self.sql
			.execute(
				"INSERT INTO registered_apps (namespace, app_name, owner_wallet, created_at) VALUES (?, ?, ?, ?)",
				&[json!(namespace), json!(app_name), json!(owner_wallet), json!(now_secs())],
			)
			.await?;
		Ok(())
	}

	pub async fn namespace_for_app(&self, app_name: &str) -> Result<Option<String>> {
		let rows = self
			.sql
			.query(
				"SELECT namespace FROM registered_apps WHERE app_name = ?",
				&[json!(app_name)],
			)
			.await?;
		Ok(rows.first().and_then(|r| r.get_str("namespace")))
	}
}
