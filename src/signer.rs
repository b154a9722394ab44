//! Session signer.
//!
//! A connected wallet session is represented by an account address plus an
//! ed25519 signing key. Invoke payloads are signed before submission; the
//! gateway never sees the private key, only the produced signature.

use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;

use crate::types::Identity;

pub struct Signer {
    account: Identity,
    key: SigningKey,
}

impl Signer {
    /// Bind an existing key to an account address.
    pub fn new(account: Identity, key: SigningKey) -> Self {
        Self { account, key }
    }

    /// Generate a fresh session key for an account.
    pub fn generate(account: Identity) -> Self {
        Self {
            account,
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(account: Identity, secret: &[u8; 32]) -> Self {
        Self {
            account,
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn account(&self) -> &Identity {
        &self.account
    }

    /// Sign an invoke payload, returning the hex-encoded signature.
    pub fn sign(&self, payload: &[u8]) -> String {
        let signature = self.key.sign(payload);
        format!("0x{}", hex::encode(signature.to_bytes()))
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material in logs.
        f.debug_struct("Signer")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn test_identity() -> Identity {
        Identity::parse("0xabc123").unwrap()
    }

    #[test]
    fn signatures_verify_against_the_public_key() {
        let signer = Signer::from_secret_bytes(test_identity(), &[7u8; 32]);
        let payload = b"log_bake:0xabc123:1700000000";

        let sig_hex = signer.sign(payload);
        let sig_bytes = hex::decode(sig_hex.trim_start_matches("0x")).unwrap();
        let signature = Signature::from_slice(&sig_bytes).unwrap();

        let verifying: VerifyingKey = signer.key.verifying_key();
        assert!(verifying.verify(payload, &signature).is_ok());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let signer = Signer::from_secret_bytes(test_identity(), &[9u8; 32]);
        let rendered = format!("{signer:?}");
        assert!(rendered.contains("0xabc123"));
        assert!(!rendered.contains("key"));
    }
}
