//! # Order: the signed settlement instruction
//!
//! An `Order` is an off-platform authorization produced and signed by the
//! subject account, then submitted by a privileged caller. The gateway
//! admits it through a fixed validation pipeline before any balance moves.
//!
//! ## Security Properties
//!
//! - **Subject-signed**: the ed25519 signature binds every field to the
//!   subject (or a registered delegated signer)
//! - **Single-use**: each (subject, nonce) pair is consumed forever,
//!   preventing replay
//! - **Time-bound**: orders carry an expiry and are rejected after it
//! - **Direction-bound**: the direction is part of the signed payload, so
//!   a mint authorization can never be replayed as a redemption

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, CollateralId, OpenmintError, OrderNonce, Result};

/// Which way value flows through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Collateral in, protocol tokens out.
    Mint,
    /// Protocol tokens in, collateral out.
    Redeem,
}

impl std::fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mint => write!(f, "MINT"),
            Self::Redeem => write!(f, "REDEEM"),
        }
    }
}

/// A signed instruction to mint or redeem protocol tokens against collateral.
///
/// The signature is carried separately: callers submit `(order, signature)`
/// pairs, and the canonical signing payload covers the entire struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Value flow direction.
    pub direction: OrderDirection,
    /// Replay-protection nonce, unique per subject.
    pub nonce: OrderNonce,
    /// The account whose funds move and whose key must sign.
    pub subject: AccountId,
    /// The collateral asset this order settles against.
    pub collateral: CollateralId,
    /// Amount of collateral paid in (mint) or out (redeem).
    pub counter_amount: Decimal,
    /// Amount of protocol tokens minted (mint) or burned (redeem).
    pub token_amount: Decimal,
    /// Instant after which the order is no longer admissible.
    pub expiry: DateTime<Utc>,
    /// Free-form caller annotation, bounded by `MAX_ORDER_MESSAGE_LEN`.
    pub message: String,
}

impl Order {
    /// Canonical signing payload for ed25519 verification.
    ///
    /// Format: `"openmint:order:v1:" || direction || nonce || subject || collateral || counter_amount || token_amount || expiry || message`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(b"openmint:order:v1:");
        payload.extend_from_slice(self.direction.to_string().as_bytes());
        payload.extend_from_slice(&self.nonce.0.to_le_bytes());
        payload.extend_from_slice(self.subject.as_bytes());
        payload.extend_from_slice(self.collateral.as_bytes());
        payload.extend_from_slice(self.counter_amount.to_string().as_bytes());
        payload.extend_from_slice(self.token_amount.to_string().as_bytes());
        payload.extend_from_slice(&self.expiry.timestamp().to_le_bytes());
        payload.extend_from_slice(self.message.as_bytes());
        payload
    }

    /// SHA-256 digest of the canonical signing payload.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        Sha256::digest(self.signing_payload()).into()
    }

    /// Returns `true` if this order is past its expiry at the given instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    /// Verify the order's ed25519 signature against a verifying key.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if the key bytes are not a valid
    /// ed25519 point, the signature is malformed, or verification fails.
    pub fn verify_signature(&self, key_bytes: &[u8; 32], signature: &[u8]) -> Result<()> {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let key = VerifyingKey::from_bytes(key_bytes).map_err(|e| {
            OpenmintError::InvalidSignature {
                reason: format!("bad verifying key: {e}"),
            }
        })?;
        let sig_bytes: [u8; 64] =
            signature
                .try_into()
                .map_err(|_| OpenmintError::InvalidSignature {
                    reason: format!("signature must be 64 bytes, got {}", signature.len()),
                })?;
        let sig = Signature::from_bytes(&sig_bytes);
        key.verify(&self.signing_payload(), &sig)
            .map_err(|e| OpenmintError::InvalidSignature {
                reason: e.to_string(),
            })
    }
}

/// Dummy orders for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// Create a dummy order with a process-unique nonce, expiring in an hour.
    pub fn dummy(
        direction: OrderDirection,
        subject: AccountId,
        collateral: &str,
        counter_amount: Decimal,
        token_amount: Decimal,
    ) -> Self {
        static NONCE_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
        let nonce = NONCE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self {
            direction,
            nonce: OrderNonce(nonce),
            subject,
            collateral: collateral.to_string(),
            counter_amount,
            token_amount,
            expiry: Utc::now() + chrono::Duration::hours(1),
            message: String::new(),
        }
    }

    /// Sign this order's canonical payload with the given key.
    pub fn sign(&self, key: &ed25519_dalek::SigningKey) -> Vec<u8> {
        use ed25519_dalek::Signer;
        key.sign(&self.signing_payload()).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn keyed_order() -> (SigningKey, Order) {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let subject = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let order = Order::dummy(
            OrderDirection::Mint,
            subject,
            "USDC",
            Decimal::new(100, 0),
            Decimal::new(100, 0),
        );
        (key, order)
    }

    #[test]
    fn signing_payload_deterministic() {
        let (_, order) = keyed_order();
        assert_eq!(order.signing_payload(), order.signing_payload());
    }

    #[test]
    fn signing_payload_differs_by_direction() {
        let (_, order) = keyed_order();
        let mut flipped = order.clone();
        flipped.direction = OrderDirection::Redeem;
        assert_ne!(order.signing_payload(), flipped.signing_payload());
    }

    #[test]
    fn signing_payload_differs_by_nonce() {
        let (_, order) = keyed_order();
        let mut other = order.clone();
        other.nonce = OrderNonce(order.nonce.0 + 1);
        assert_ne!(order.signing_payload(), other.signing_payload());
    }

    #[test]
    fn digest_deterministic() {
        let (_, order) = keyed_order();
        assert_eq!(order.digest(), order.digest());
    }

    #[test]
    fn valid_signature_verifies() {
        let (key, order) = keyed_order();
        let sig = order.sign(&key);
        assert!(
            order
                .verify_signature(key.verifying_key().as_bytes(), &sig)
                .is_ok()
        );
    }

    #[test]
    fn tampered_order_fails_verification() {
        let (key, order) = keyed_order();
        let sig = order.sign(&key);
        let mut tampered = order.clone();
        tampered.token_amount = Decimal::new(999, 0);
        assert!(matches!(
            tampered.verify_signature(key.verifying_key().as_bytes(), &sig),
            Err(OpenmintError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (key, order) = keyed_order();
        let sig = order.sign(&key);
        let other = SigningKey::generate(&mut rand::rngs::OsRng);
        assert!(
            order
                .verify_signature(other.verifying_key().as_bytes(), &sig)
                .is_err()
        );
    }

    #[test]
    fn short_signature_rejected() {
        let (key, order) = keyed_order();
        let result = order.verify_signature(key.verifying_key().as_bytes(), &[0u8; 10]);
        assert!(matches!(
            result,
            Err(OpenmintError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let (_, order) = keyed_order();
        assert!(!order.is_expired(order.expiry));
        assert!(order.is_expired(order.expiry + chrono::Duration::seconds(1)));
    }

    #[test]
    fn serde_roundtrip() {
        let (_, order) = keyed_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
