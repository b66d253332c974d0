//! Namespace derivation (§3, §4.4 auth modes) as an explicit sum type rather
//! than the several-sources-at-once lookup the design narrative describes:
//! a single [`resolve`] call returns `(namespace, Credential)` or a typed
//! error, and the result is stamped immutably onto the request via
//! [`crate::state::RequestContext`].

use axum::http::HeaderMap;
use node_util::error::{Error, Result};

use super::jwt::{AccessClaims, JwtIssuer};
use super::store::AuthStore;

#[derive(Debug, Clone)]
pub enum Credential {
	ApiKey { opaque: String, namespace: String },
	Jwt(AccessClaims),
	Internal,
}

impl Credential {
	pub fn namespace(&self) -> Option<&str> {
		match self {
			Credential::ApiKey { namespace, .. } => Some(namespace),
			Credential::Jwt(claims) => Some(&claims.namespace),
			Credential::Internal => None,
		}
	}

	pub fn subject(&self) -> Option<&str> {
		match self {
			Credential::Jwt(claims) => Some(&claims.sub),
			_ => None,
		}
	}
}

/// Parses `Authorization: Bearer <opaque>:<ns>` / `X-API-Key: ...` / a JWT,
/// verifies whichever form is present, and returns the resolved credential.
/// Does not by itself decide whether the namespace is empty; callers enforce
/// that (§3 "empty namespace is rejected at the gateway").
pub async fn resolve(headers: &HeaderMap, jwt: &JwtIssuer, store: &AuthStore) -> Result<Credential> {
	if let Some(key_header) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
		return resolve_api_key(key_header, store).await;
	}

	let auth_header = headers
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.ok_or(Error::AuthRequired)?;

	let token = auth_header.strip_prefix("Bearer ").ok_or(Error::AuthRequired)?;

	if let Some((_, ns)) = split_api_key(token) {
		if store.api_key_is_active(&ns, token).await? {
			return Ok(Credential::ApiKey {
				opaque: token.to_string(),
				namespace: ns,
			});
		}
		return Err(Error::AuthRequired);
	}

	let claims = jwt.verify_access_token(token)?;
	if let Some(horizon) = store.revoked_before(&claims.namespace, &claims.sub).await? {
		if claims.iat <= horizon {
			return Err(Error::AuthRequired);
		}
	}
	Ok(Credential::Jwt(claims))
}

async fn resolve_api_key(opaque: &str, store: &AuthStore) -> Result<Credential> {
	let (_, ns) = split_api_key(opaque).ok_or(Error::AuthRequired)?;
	if store.api_key_is_active(&ns, opaque).await? {
		Ok(Credential::ApiKey {
			opaque: opaque.to_string(),
			namespace: ns,
		})
	} else {
		Err(Error::AuthRequired)
	}
}

/// An API key is `<opaque>:<namespace>`; the namespace is the suffix after
/// the LAST `:` so an opaque value may itself contain colons.
fn split_api_key(value: &str) -> Option<(String, String)> {
	let idx = value.rfind(':')?;
	let (opaque, ns) = value.split_at(idx);
	let ns = &ns[1..];
	if ns.is_empty() {
		return None;
	}
	Some((opaque.to_string(), ns.to_string()))
}

/// Enforces that a request's resolved namespace matches an explicit override
/// on the context (e.g. set by the pubsub bridge from a path/query param),
/// per §4.4 "conflicting namespace is rejected".
pub fn check_namespace_override(resolved: &str, override_ns: Option<&str>) -> Result<()> {
	match override_ns {
		Some(ns) if ns != resolved => Err(Error::NamespaceMismatch(format!(
			"credential namespace {} does not match requested namespace {}",
			resolved, ns
		))),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_last_colon() {
		let (opaque, ns) = split_api_key("abc:def:tenant1").unwrap();
		assert_eq!(opaque, "abc:def");
		assert_eq!(ns, "tenant1");
	}

	#[test]
	fn rejects_missing_namespace_suffix() {
		assert!(split_api_key("no-colon-here").is_none());
		assert!(split_api_key("trailing:").is_none());
	}

	#[test]
	fn namespace_override_conflict_is_rejected() {
		assert!(check_namespace_override("ns1", Some("ns2")).is_err());
		assert!(check_namespace_override("ns1", Some("ns1")).is_ok());
		assert!(check_namespace_override("ns1", None).is_ok());
	}
}
