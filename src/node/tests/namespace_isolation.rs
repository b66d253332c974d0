//! Scenario 6 ("Namespace isolation"), covering the part of the invariant
//! that doesn't require a live SQL-backed revocation store: a JWT minted for
//! one namespace resolves to that namespace, and a context stamped with a
//! different requested namespace is rejected before any handler runs.

use node_gateway::auth::jwt::JwtIssuer;
use node_gateway::auth::{check_namespace_override, Credential};

fn issuer() -> JwtIssuer {
	JwtIssuer::new(
		b"integration-test-signing-key",
		"node-gateway".into(),
		"node-clients".into(),
		900,
		2_592_000,
	)
}

#[test]
fn token_namespace_does_not_grant_access_to_another_namespace() {
	let iss = issuer();
	let token = iss.issue_access_token("0xalice", "ns1").unwrap();
	let claims = iss.verify_access_token(&token).unwrap();
	let credential = Credential::Jwt(claims);

	assert_eq!(credential.namespace(), Some("ns1"));
	assert!(check_namespace_override("ns1", Some("ns1")).is_ok());

	// A caller for ns1's token asking for ns2's resource is rejected by the
	// same check the pubsub bridge and kv routes apply to their path/query
	// namespace overrides.
	assert!(check_namespace_override(credential.namespace().unwrap(), Some("ns2")).is_err());
}
