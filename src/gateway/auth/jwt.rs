//! JWT issuance and verification (§4.4). Access tokens are short-lived and
//! carry the namespace directly as a claim; refresh tokens are opaque random
//! strings stored hashed (§3 token pair), not JWTs themselves, since they
//! never need to be independently decodable off the wire.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use node_util::error::{Error, Result};
use node_util::time::now_secs;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
	pub sub: String,
	pub namespace: String,
	pub iss: String,
	pub aud: String,
	pub iat: i64,
	pub nbf: i64,
	pub exp: i64,
	/// Unique id, present so a future revocation-by-jti scheme has something
	/// to key on even though this implementation revokes by subject+horizon.
	pub jti: String,
}

pub struct TokenPair {
	pub access_token: String,
	pub refresh_token: String,
}

#[derive(Clone)]
pub struct JwtIssuer {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	issuer: String,
	audience: String,
	access_ttl_secs: i64,
	refresh_ttl_secs: i64,
}

impl JwtIssuer {
	/// `signing_key` is the raw secret bytes (HMAC); an empty key is
	/// replaced by the caller with a freshly generated one on first start.
	pub fn new(signing_key: &[u8], issuer: String, audience: String, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
		JwtIssuer {
			encoding_key: EncodingKey::from_secret(signing_key),
			decoding_key: DecodingKey::from_secret(signing_key),
			issuer,
			audience,
			access_ttl_secs,
			refresh_ttl_secs,
		}
	}

	pub fn access_ttl_secs(&self) -> i64 {
		self.access_ttl_secs
	}

	pub fn refresh_ttl_secs(&self) -> i64 {
		self.refresh_ttl_secs
	}

	pub fn issue_access_token(&self, subject: &str, namespace: &str) -> Result<String> {
		let now = now_secs();
		let claims = AccessClaims {
			sub: subject.to_string(),
			namespace: namespace.to_string(),
			iss: self.issuer.clone(),
			aud: self.audience.clone(),
			iat: now,
			nbf: now,
			exp: now + self.access_ttl_secs,
			jti: random_opaque(16),
		};
		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(|e| Error::Message(format!("signing access token: {}", e)))
	}

	/// Verifies signature, `iss`/`aud`/`nbf`/`exp`; does NOT check the
	/// revocation set, which requires a store lookup the caller performs
	/// separately (`AuthStore::revoked_before`).
	pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.set_issuer(&[self.issuer.clone()]);
		validation.set_audience(&[self.audience.clone()]);
		let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
			.map_err(|_| Error::AuthRequired)?;
		Ok(data.claims)
	}

	pub fn new_refresh_token(&self) -> String {
		random_opaque(32)
	}

	pub fn hash_refresh_token(token: &str) -> String {
		let digest = Sha256::digest(token.as_bytes());
		hex::encode(digest)
	}
}

pub fn random_opaque(n_bytes: usize) -> String {
	let mut buf = vec![0u8; n_bytes];
	rand::thread_rng().fill_bytes(&mut buf);
	hex::encode(buf)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn issuer() -> JwtIssuer {
		JwtIssuer::new(b"test-signing-key-material", "node-gateway".into(), "node-clients".into(), 900, 2_592_000)
	}

	#[test]
	fn access_token_round_trips() {
		let iss = issuer();
		let token = iss.issue_access_token("0xabc", "tenant1").unwrap();
		let claims = iss.verify_access_token(&token).unwrap();
		assert_eq!(claims.sub, "0xabc");
		assert_eq!(claims.namespace, "tenant1");
	}

	#[test]
	fn wrong_audience_is_rejected() {
		let iss = issuer();
		let other = JwtIssuer::new(b"test-signing-key-material", "node-gateway".into(), "someone-else".into(), 900, 2_592_000);
		let token = iss.issue_access_token("0xabc", "tenant1").unwrap();
		assert!(other.verify_access_token(&token).is_err());
	}

	#[test]
	fn refresh_token_hash_is_deterministic() {
		let token = "some-opaque-refresh-token";
		assert_eq!(JwtIssuer::hash_refresh_token(token), JwtIssuer::hash_refresh_token(token));
	}
}
