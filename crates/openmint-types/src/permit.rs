//! Signed spending permits for the token ledger.
//!
//! A `Permit` lets an owner approve a spender without calling the ledger
//! themselves: the owner signs the approval off-platform and any caller
//! may submit it. Same replay rules as orders: one nonce space per owner,
//! each nonce consumed forever.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, OpenmintError, Result};

/// A signed allowance approval, submitted by any caller on the owner's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    /// The account granting the allowance and signing the payload.
    pub owner: AccountId,
    /// The account being approved to spend.
    pub spender: AccountId,
    /// Allowance amount to set.
    pub amount: Decimal,
    /// Replay-protection nonce, unique per owner.
    pub nonce: u64,
    /// Instant after which the permit is no longer admissible.
    pub deadline: DateTime<Utc>,
}

impl Permit {
    /// Canonical signing payload for ed25519 verification.
    ///
    /// Format: `"openmint:permit:v1:" || owner || spender || amount || nonce || deadline`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(b"openmint:permit:v1:");
        payload.extend_from_slice(self.owner.as_bytes());
        payload.extend_from_slice(self.spender.as_bytes());
        payload.extend_from_slice(self.amount.to_string().as_bytes());
        payload.extend_from_slice(&self.nonce.to_le_bytes());
        payload.extend_from_slice(&self.deadline.timestamp().to_le_bytes());
        payload
    }

    /// Returns `true` if this permit is past its deadline at the given instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Verify the permit's ed25519 signature against the owner's key bytes.
    ///
    /// # Errors
    /// Returns `InvalidPermit` if the key bytes are not a valid ed25519
    /// point, the signature is malformed, or verification fails.
    pub fn verify_signature(&self, signature: &[u8]) -> Result<()> {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let key = VerifyingKey::from_bytes(self.owner.as_bytes()).map_err(|e| {
            OpenmintError::InvalidPermit {
                reason: format!("owner is not a valid verifying key: {e}"),
            }
        })?;
        let sig_bytes: [u8; 64] =
            signature
                .try_into()
                .map_err(|_| OpenmintError::InvalidPermit {
                    reason: format!("signature must be 64 bytes, got {}", signature.len()),
                })?;
        let sig = Signature::from_bytes(&sig_bytes);
        key.verify(&self.signing_payload(), &sig)
            .map_err(|e| OpenmintError::InvalidPermit {
                reason: e.to_string(),
            })
    }
}

/// Dummy permits for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Permit {
    /// Create a dummy permit with a process-unique nonce, expiring in an hour.
    pub fn dummy(owner: AccountId, spender: AccountId, amount: Decimal) -> Self {
        static NONCE_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
        let nonce = NONCE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self {
            owner,
            spender,
            amount,
            nonce,
            deadline: Utc::now() + chrono::Duration::hours(1),
        }
    }

    /// Sign this permit's canonical payload with the given key.
    pub fn sign(&self, key: &ed25519_dalek::SigningKey) -> Vec<u8> {
        use ed25519_dalek::Signer;
        key.sign(&self.signing_payload()).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn keyed_permit() -> (SigningKey, Permit) {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let permit = Permit::dummy(owner, AccountId::random(), Decimal::new(500, 0));
        (key, permit)
    }

    #[test]
    fn valid_permit_verifies() {
        let (key, permit) = keyed_permit();
        let sig = permit.sign(&key);
        assert!(permit.verify_signature(&sig).is_ok());
    }

    #[test]
    fn tampered_amount_fails() {
        let (key, permit) = keyed_permit();
        let sig = permit.sign(&key);
        let mut tampered = permit.clone();
        tampered.amount = Decimal::new(9_999, 0);
        assert!(matches!(
            tampered.verify_signature(&sig),
            Err(OpenmintError::InvalidPermit { .. })
        ));
    }

    #[test]
    fn non_owner_signature_fails() {
        let (_, permit) = keyed_permit();
        let other = SigningKey::generate(&mut rand::rngs::OsRng);
        let sig = permit.sign(&other);
        assert!(permit.verify_signature(&sig).is_err());
    }

    #[test]
    fn deadline_boundary_is_inclusive() {
        let (_, permit) = keyed_permit();
        assert!(!permit.is_expired(permit.deadline));
        assert!(permit.is_expired(permit.deadline + chrono::Duration::seconds(1)));
    }

    #[test]
    fn serde_roundtrip() {
        let (_, permit) = keyed_permit();
        let json = serde_json::to_string(&permit).unwrap();
        let back: Permit = serde_json::from_str(&json).unwrap();
        assert_eq!(permit, back);
    }
}
