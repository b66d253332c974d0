//! Wallet signature verification over the challenge nonce (§4.4 step 2-3).
//! Two chain signature schemes are supported: Ed25519 wallets, verified
//! directly, and secp256k1/ECDSA (EVM-style) wallets, verified as a
//! recoverable signature over the Keccak-256 digest of the nonce with the
//! recovered address compared against the claimed wallet.

use ed25519_dalek::{Signature as EdSignature, Verifier, VerifyingKey};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey as K256VerifyingKey};
use node_util::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
	Ed25519,
	Secp256k1,
}

/// Verifies `signature` over `message` for `wallet` under `chain_type`.
/// Returns `Ok(())` on success; any malformed input or signature mismatch is
/// reported as `Error::AuthRequired` since none of it should leak to the
/// caller beyond "verification failed".
pub fn verify(chain_type: ChainType, wallet: &str, message: &[u8], signature_hex: &str) -> Result<()> {
	match chain_type {
		ChainType::Ed25519 => verify_ed25519(wallet, message, signature_hex),
		ChainType::Secp256k1 => verify_secp256k1(wallet, message, signature_hex),
	}
}

fn verify_ed25519(wallet: &str, message: &[u8], signature_hex: &str) -> Result<()> {
	let pubkey_bytes = hex::decode(wallet.trim_start_matches("0x")).map_err(|_| Error::AuthRequired)?;
	let pubkey_bytes: [u8; 32] = pubkey_bytes.try_into().map_err(|_| Error::AuthRequired)?;
	let verifying_key = VerifyingKey::from_bytes(&pubkey_bytes).map_err(|_| Error::AuthRequired)?;

	let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x")).map_err(|_| Error::AuthRequired)?;
	let sig_bytes: [u8; 64] = sig_bytes.try_into().map_err(|_| Error::AuthRequired)?;
	let signature = EdSignature::from_bytes(&sig_bytes);

	verifying_key
		.verify(message, &signature)
		.map_err(|_| Error::AuthRequired)
}

fn verify_secp256k1(wallet: &str, message: &[u8], signature_hex: &str) -> Result<()> {
	let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x")).map_err(|_| Error::AuthRequired)?;
	if sig_bytes.len() != 65 {
		return Err(Error::AuthRequired);
	}
	let (rs, v) = sig_bytes.split_at(64);
	let signature = K256Signature::from_slice(rs).map_err(|_| Error::AuthRequired)?;
	let recovery_id = normalize_recovery_id(v[0]);
	let recovery_id = RecoveryId::from_byte(recovery_id).ok_or(Error::AuthRequired)?;

	let digest = Keccak256::new_with_prefix(message);
	let recovered = K256VerifyingKey::recover_from_digest(digest, &signature, recovery_id)
		.map_err(|_| Error::AuthRequired)?;

	let recovered_address = ethereum_address(&recovered);
	if recovered_address.eq_ignore_ascii_case(wallet.trim_start_matches("0x")) {
		Ok(())
	} else {
		Err(Error::AuthRequired)
	}
}

/// EVM wallets submit `v` as 27/28 (legacy) or 0/1; recoverable-signature
/// crates want 0/1.
fn normalize_recovery_id(v: u8) -> u8 {
	if v >= 27 {
		v - 27
	} else {
		v
	}
}

fn ethereum_address(key: &K256VerifyingKey) -> String {
	let encoded = key.to_encoded_point(false);
	let bytes = &encoded.as_bytes()[1..];
	let hash = Keccak256::digest(bytes);
	hex::encode(&hash[12..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use ed25519_dalek::{SigningKey, Signer};

	#[test]
	fn ed25519_round_trips() {
		let signing_key = SigningKey::from_bytes(&[7u8; 32]);
		let verifying_key = signing_key.verifying_key();
		let message = b"nonce-bytes";
		let signature = signing_key.sign(message);

		let wallet = hex::encode(verifying_key.to_bytes());
		let sig_hex = hex::encode(signature.to_bytes());

		assert!(verify(ChainType::Ed25519, &wallet, message, &sig_hex).is_ok());
		assert!(verify(ChainType::Ed25519, &wallet, b"different", &sig_hex).is_err());
	}
}
