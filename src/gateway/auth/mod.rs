//! Authentication: namespace resolution, the wallet challenge/verify flow,
//! JWT issuance/refresh, API keys and application registration (§4.4).

pub mod credential;
pub mod jwt;
pub mod nonce;
pub mod signature;
pub mod store;

use node_util::error::{Error, Result};

pub use credential::{check_namespace_override, Credential};
pub use jwt::{AccessClaims, TokenPair};
pub use signature::ChainType;
pub use store::AuthStore;

use jwt::JwtIssuer;

#[derive(Clone)]
pub struct AuthService {
	pub jwt: JwtIssuer,
	pub store: AuthStore,
}

pub struct VerifyOutcome {
	pub tokens: TokenPair,
	pub api_key: String,
}

impl AuthService {
	pub fn new(jwt: JwtIssuer, store: AuthStore) -> Self {
		AuthService { jwt, store }
	}

	pub async fn resolve(&self, headers: &axum::http::HeaderMap) -> Result<Credential> {
		credential::resolve(headers, &self.jwt, &self.store).await
	}

	/// `POST /v1/auth/challenge`: issue and persist a nonce.
	pub async fn challenge(&self, namespace: &str, wallet: &str, purpose: &str) -> Result<String> {
		if namespace.is_empty() {
			return Err(Error::InvalidConfig("namespace must not be empty".into()));
		}
		let n = nonce::new_challenge(namespace, wallet, purpose);
		let value = n.nonce.clone();
		self.store.put_nonce(&n).await?;
		Ok(value)
	}

	/// `POST /v1/auth/verify`: verify the signed nonce, consume it, issue a
	/// fresh token pair, and return or create an API key for this wallet in
	/// this namespace.
	pub async fn verify(
		&self,
		namespace: &str,
		wallet: &str,
		nonce_value: &str,
		signature_hex: &str,
		chain_type: ChainType,
	) -> Result<VerifyOutcome> {
		signature::verify(chain_type, wallet, nonce_value.as_bytes(), signature_hex)?;

		let consumed = self.store.consume_nonce(namespace, wallet, nonce_value).await?;
		if !consumed {
			return Err(Error::AuthRequired);
		}

		let access_token = self.jwt.issue_access_token(wallet, namespace)?;
		let refresh_token = self.jwt.new_refresh_token();
		let now = node_util::time::now_secs();
		self.store
			.put_refresh_token(
				&JwtIssuer::hash_refresh_token(&refresh_token),
				namespace,
				wallet,
				now,
				now + self.jwt.refresh_ttl_secs(),
			)
			.await?;

		let api_key = match self.store.get_api_key(wallet, namespace).await? {
			Some(existing) => existing,
			None => {
				let minted = format!("{}:{}", jwt::random_opaque(20), namespace);
				self.store.put_api_key(wallet, namespace, &minted).await?;
				minted
			}
		};

		Ok(VerifyOutcome {
			tokens: TokenPair {
				access_token,
				refresh_token,
			},
			api_key,
		})
	}

	/// `POST /v1/auth/refresh`: exchange a valid refresh token for a new
	/// access token. The refresh token itself is not rotated.
	pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
		let hash = JwtIssuer::hash_refresh_token(refresh_token);
		let (namespace, subject) = self
			.store
			.lookup_refresh_token(&hash)
			.await?
			.ok_or(Error::AuthRequired)?;
		self.jwt.issue_access_token(&subject, &namespace)
	}

	/// `POST /v1/auth/logout`: revoke one refresh token, or every refresh
	/// token (and live access token) for a subject.
	pub async fn logout(&self, refresh_token: &str, all_for_subject: bool) -> Result<()> {
		let hash = JwtIssuer::hash_refresh_token(refresh_token);
		if all_for_subject {
			let (namespace, subject) = self
				.store
				.lookup_refresh_token(&hash)
				.await?
				.ok_or(Error::AuthRequired)?;
			self.store.revoke_all_for_subject(&namespace, &subject).await
		} else {
			self.store.revoke_refresh_token(&hash).await
		}
	}

	/// `POST /v1/auth/register`: claim (or confirm ownership of) `namespace`
	/// for `owner_wallet` after verifying the signed registration payload.
	pub async fn register(
		&self,
		namespace: &str,
		app_name: &str,
		owner_wallet: &str,
		signature_hex: &str,
		chain_type: ChainType,
	) -> Result<()> {
		let payload = format!("register:{}:{}", app_name, namespace);
		signature::verify(chain_type, owner_wallet, payload.as_bytes(), signature_hex)?;
		self.store.register_app(namespace, app_name, owner_wallet).await
	}
}
