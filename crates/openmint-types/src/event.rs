//! Observable protocol events for the OpenMint audit trail.
//!
//! Every state transition that external observers care about (mint
//! settled, withdrawal claimed, role granted) appends an [`EventRecord`]
//! to the owning component's event log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, CollateralId, EventId, OrderDirection, OrderNonce, RequestId, Role};

/// A protocol-level fact observable by the host and external indexers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// A signed mint order settled: collateral in, tokens out.
    MintSettled {
        subject: AccountId,
        collateral: CollateralId,
        counter_amount: Decimal,
        token_amount: Decimal,
        nonce: OrderNonce,
    },
    /// A signed redeem order settled: tokens in, collateral out.
    RedeemSettled {
        subject: AccountId,
        collateral: CollateralId,
        counter_amount: Decimal,
        token_amount: Decimal,
        nonce: OrderNonce,
    },
    /// An oracle-priced redemption settled against the treasury.
    OracleRedeemSettled {
        subject: AccountId,
        collateral: CollateralId,
        token_amount: Decimal,
        collateral_amount: Decimal,
        price: Decimal,
    },
    /// A collateral asset became accepted for orders.
    CollateralRegistered { collateral: CollateralId },
    /// A collateral asset was removed from the registry.
    CollateralRemoved { collateral: CollateralId },
    /// An account was added to the gateway admission allow-list.
    SubjectAllowed { account: AccountId },
    /// An account was removed from the gateway admission allow-list.
    SubjectDisallowed { account: AccountId },
    /// The collateral custody destination changed.
    CustodianChanged { account: AccountId },
    /// The treasury account changed.
    TreasuryChanged { account: AccountId },
    /// A per-period volume capacity changed.
    CapacityChanged {
        direction: OrderDirection,
        capacity: Decimal,
    },
    /// The oracle redemption peg percentage changed.
    PegPercentageChanged { bps: u32 },
    /// A delegated signing key was registered for an account.
    SignerRegistered { account: AccountId },
    /// A delegated signing key was removed for an account.
    SignerRemoved { account: AccountId },

    /// Tokens entered the vault and shares were minted.
    Deposited {
        owner: AccountId,
        assets: Decimal,
        shares: Decimal,
    },
    /// Shares were burned and a time-delayed withdrawal request created.
    WithdrawRequested {
        owner: AccountId,
        request: RequestId,
        assets: Decimal,
        shares: Decimal,
    },
    /// Shares were burned and assets paid out immediately.
    WithdrawSettled {
        owner: AccountId,
        beneficiary: AccountId,
        assets: Decimal,
        shares: Decimal,
    },
    /// A matured withdrawal request was paid out.
    WithdrawClaimed {
        owner: AccountId,
        request: RequestId,
        assets: Decimal,
    },
    /// Vault assets were adjusted by yield or loss.
    Rebased {
        delta: Decimal,
        total_assets: Decimal,
    },
    /// Shares moved between holders.
    SharesTransferred {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
    /// An account was barred from share operations.
    AccountBlacklisted { account: AccountId },
    /// An account was readmitted to share operations.
    AccountUnblacklisted { account: AccountId },
    /// The withdrawal delay changed.
    WithdrawalDelayChanged { delay_secs: u64 },
    /// Stray assets were released from custody to a recipient.
    AssetsRescued {
        asset: CollateralId,
        to: AccountId,
        amount: Decimal,
    },

    /// A role was granted to an account.
    RoleGranted { role: Role, account: AccountId },
    /// A role was revoked from an account.
    RoleRevoked { role: Role, account: AccountId },
    /// The administering role of a role changed.
    RoleAdminChanged { role: Role, admin_role: Role },
}

impl ProtocolEvent {
    /// Stable uppercase tag for log lines and external indexers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MintSettled { .. } => "MINT_SETTLED",
            Self::RedeemSettled { .. } => "REDEEM_SETTLED",
            Self::OracleRedeemSettled { .. } => "ORACLE_REDEEM_SETTLED",
            Self::CollateralRegistered { .. } => "COLLATERAL_REGISTERED",
            Self::CollateralRemoved { .. } => "COLLATERAL_REMOVED",
            Self::SubjectAllowed { .. } => "SUBJECT_ALLOWED",
            Self::SubjectDisallowed { .. } => "SUBJECT_DISALLOWED",
            Self::CustodianChanged { .. } => "CUSTODIAN_CHANGED",
            Self::TreasuryChanged { .. } => "TREASURY_CHANGED",
            Self::CapacityChanged { .. } => "CAPACITY_CHANGED",
            Self::PegPercentageChanged { .. } => "PEG_PERCENTAGE_CHANGED",
            Self::SignerRegistered { .. } => "SIGNER_REGISTERED",
            Self::SignerRemoved { .. } => "SIGNER_REMOVED",
            Self::Deposited { .. } => "DEPOSITED",
            Self::WithdrawRequested { .. } => "WITHDRAW_REQUESTED",
            Self::WithdrawSettled { .. } => "WITHDRAW_SETTLED",
            Self::WithdrawClaimed { .. } => "WITHDRAW_CLAIMED",
            Self::Rebased { .. } => "REBASED",
            Self::SharesTransferred { .. } => "SHARES_TRANSFERRED",
            Self::AccountBlacklisted { .. } => "ACCOUNT_BLACKLISTED",
            Self::AccountUnblacklisted { .. } => "ACCOUNT_UNBLACKLISTED",
            Self::WithdrawalDelayChanged { .. } => "WITHDRAWAL_DELAY_CHANGED",
            Self::AssetsRescued { .. } => "ASSETS_RESCUED",
            Self::RoleGranted { .. } => "ROLE_GRANTED",
            Self::RoleRevoked { .. } => "ROLE_REVOKED",
            Self::RoleAdminChanged { .. } => "ROLE_ADMIN_CHANGED",
        }
    }
}

/// An event with its identity and observation timestamp.
///
/// Records form an append-only log per component. UUIDv7 identifiers
/// keep the log sortable across components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Globally unique, time-ordered identifier.
    pub id: EventId,
    /// Host-observed instant the event was recorded.
    pub recorded_at: DateTime<Utc>,
    /// The fact itself.
    pub event: ProtocolEvent,
}

impl EventRecord {
    #[must_use]
    pub fn new(event: ProtocolEvent, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            recorded_at,
            event,
        }
    }
}
