//! Nonce generation for the challenge step (§4.4 step 1). TTL ~5 minutes.

use node_util::time::now_secs;

use super::jwt::random_opaque;
use super::store::PersistedNonce;

pub const NONCE_TTL_SECS: i64 = 5 * 60;

pub fn new_challenge(namespace: &str, wallet: &str, purpose: &str) -> PersistedNonce {
	PersistedNonce {
		namespace: namespace.to_string(),
		wallet: wallet.to_string(),
		nonce: random_opaque(24),
		purpose: purpose.to_string(),
		expires_at: now_secs() + NONCE_TTL_SECS,
	}
}
