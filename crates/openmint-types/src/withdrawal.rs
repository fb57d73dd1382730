//! # Withdrawal requests: time-delayed exit claims
//!
//! Burning shares does not pay out immediately. The vault snapshots the
//! owed amount into a `WithdrawalRequest` and the owner claims it after
//! the configured delay.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  delay elapses  ┌───────────┐  claim   ┌─────────┐
//!   │ CREATED ├────────────────▶│ CLAIMABLE ├─────────▶│ CLAIMED │
//!   └─────────┘                 └───────────┘          └─────────┘
//! ```
//!
//! ## Security Properties
//!
//! - **Snapshot isolation**: the payout amount is fixed at creation;
//!   later share-price movement never changes it
//! - **Single claim**: CLAIMABLE → CLAIMED is irreversible
//! - **Owner-only**: only the request owner may claim, even if the
//!   beneficiary differs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, RequestId};

/// The lifecycle state of a withdrawal request.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Created → Claimable` (the delay elapsed)
/// - `Claimable → Claimed` (the owner claimed the payout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// The delay has not elapsed yet. The payout cannot be claimed.
    Created,
    /// The delay elapsed. The owner may claim exactly once.
    Claimable,
    /// The payout was transferred. **Irreversible.**
    Claimed,
}

impl WithdrawalStatus {
    /// Can this request transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Claimable) | (Self::Claimable, Self::Claimed)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Claimable => write!(f, "CLAIMABLE"),
            Self::Claimed => write!(f, "CLAIMED"),
        }
    }
}

/// A pending exit from the vault, snapshotted at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Per-owner request identifier, assigned in creation order.
    pub id: RequestId,
    /// The vault account that owes this payout.
    pub vault: AccountId,
    /// The account that burned shares and may claim.
    pub owner: AccountId,
    /// The account that receives the payout on claim.
    pub beneficiary: AccountId,
    /// Token amount owed, fixed when the request was created.
    pub asset_amount: Decimal,
    /// Shares burned to create this request.
    pub share_amount: Decimal,
    /// When the request was created. The delay counts from here.
    pub created_at: DateTime<Utc>,
    /// Whether the payout has been transferred.
    pub claimed: bool,
}

impl WithdrawalRequest {
    /// The request's state at the given instant under the given delay.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>, delay_secs: u64) -> WithdrawalStatus {
        if self.claimed {
            WithdrawalStatus::Claimed
        } else if self.delay_elapsed(now, delay_secs) {
            WithdrawalStatus::Claimable
        } else {
            WithdrawalStatus::Created
        }
    }

    /// Returns `true` if the request is unclaimed and its delay elapsed.
    #[must_use]
    pub fn is_claimable(&self, now: DateTime<Utc>, delay_secs: u64) -> bool {
        self.status(now, delay_secs) == WithdrawalStatus::Claimable
    }

    fn delay_elapsed(&self, now: DateTime<Utc>, delay_secs: u64) -> bool {
        let delay = chrono::Duration::seconds(i64::try_from(delay_secs).unwrap_or(i64::MAX));
        now >= self.created_at + delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(created_at: DateTime<Utc>) -> WithdrawalRequest {
        WithdrawalRequest {
            id: RequestId(0),
            vault: AccountId([1u8; 32]),
            owner: AccountId([2u8; 32]),
            beneficiary: AccountId([2u8; 32]),
            asset_amount: Decimal::new(1_000, 0),
            share_amount: Decimal::new(1_000, 0),
            created_at,
            claimed: false,
        }
    }

    #[test]
    fn transitions_valid() {
        assert!(WithdrawalStatus::Created.can_transition_to(WithdrawalStatus::Claimable));
        assert!(WithdrawalStatus::Claimable.can_transition_to(WithdrawalStatus::Claimed));
    }

    #[test]
    fn transitions_invalid() {
        assert!(!WithdrawalStatus::Created.can_transition_to(WithdrawalStatus::Claimed));
        assert!(!WithdrawalStatus::Claimed.can_transition_to(WithdrawalStatus::Claimable));
        assert!(!WithdrawalStatus::Claimed.can_transition_to(WithdrawalStatus::Created));
        assert!(!WithdrawalStatus::Claimable.can_transition_to(WithdrawalStatus::Created));
    }

    #[test]
    fn status_progresses_with_time() {
        let created = Utc::now();
        let req = make_request(created);
        assert_eq!(req.status(created, 86_400), WithdrawalStatus::Created);
        let later = created + chrono::Duration::days(2);
        assert_eq!(req.status(later, 86_400), WithdrawalStatus::Claimable);
    }

    #[test]
    fn claimable_exactly_at_delay_boundary() {
        let created = Utc::now();
        let req = make_request(created);
        let boundary = created + chrono::Duration::seconds(86_400);
        assert!(req.is_claimable(boundary, 86_400));
        assert!(!req.is_claimable(boundary - chrono::Duration::seconds(1), 86_400));
    }

    #[test]
    fn claimed_flag_dominates() {
        let created = Utc::now();
        let mut req = make_request(created);
        req.claimed = true;
        let later = created + chrono::Duration::days(2);
        assert_eq!(req.status(later, 86_400), WithdrawalStatus::Claimed);
        assert!(!req.is_claimable(later, 86_400));
    }

    #[test]
    fn serde_roundtrip() {
        let req = make_request(Utc::now());
        let json = serde_json::to_string(&req).unwrap();
        let back: WithdrawalRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}
