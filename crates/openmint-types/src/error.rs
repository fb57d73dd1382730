//! Error types for the OpenMint settlement core.
//!
//! All errors use the `MINT_ERR_` prefix convention for easy grepping in
//! logs. Error codes are grouped by subsystem:
//! - 1xx: Order admission errors
//! - 2xx: Token ledger errors
//! - 3xx: Vault errors
//! - 4xx: Withdrawal queue errors
//! - 5xx: Oracle redemption errors
//! - 8xx: Access control / security errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, OrderNonce, RequestId, Role};

/// Central error enum for all OpenMint operations.
///
/// Every failure aborts the call that raised it and leaves no partial
/// state behind. Callers observe either the full effect of an operation
/// or one of these.
#[derive(Debug, Error)]
pub enum OpenmintError {
    // =================================================================
    // Order Admission Errors (1xx)
    // =================================================================
    /// The order failed structural validation (missing fields, bad values).
    #[error("MINT_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The order carries a zero token amount.
    #[error("MINT_ERR_101: Order amount must be positive")]
    ZeroAmount,

    /// A subject or destination field is the all-zero account.
    #[error("MINT_ERR_102: Zero account not allowed")]
    ZeroAccount,

    /// The order's expiry timestamp is not in the future.
    #[error("MINT_ERR_103: Order expired")]
    OrderExpired,

    /// The (subject, nonce) pair was already consumed.
    #[error("MINT_ERR_104: Nonce replay detected for {subject} {nonce}")]
    ReplayedOrder {
        subject: AccountId,
        nonce: OrderNonce,
    },

    /// Collateral and token amounts deviate beyond the configured tolerance.
    #[error("MINT_ERR_105: Ratio mismatch: counter {counter_amount}, token {token_amount}")]
    RatioMismatch {
        counter_amount: Decimal,
        token_amount: Decimal,
    },

    /// The order would push the current period's cumulative volume past its cap.
    #[error("MINT_ERR_106: Period limit exceeded: attempted {attempted}, capacity {capacity}")]
    PeriodLimitExceeded {
        attempted: Decimal,
        capacity: Decimal,
    },

    /// The referenced collateral asset is not registered.
    #[error("MINT_ERR_107: Unknown collateral: {0}")]
    UnknownCollateral(String),

    /// The collateral asset is already registered.
    #[error("MINT_ERR_108: Collateral already registered: {0}")]
    CollateralAlreadyRegistered(String),

    // =================================================================
    // Token Ledger Errors (2xx)
    // =================================================================
    /// Not enough balance to perform the operation.
    #[error("MINT_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough approved allowance for a delegated transfer.
    #[error("MINT_ERR_201: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Decimal, available: Decimal },

    /// The permit's deadline has passed.
    #[error("MINT_ERR_202: Permit expired")]
    PermitExpired,

    /// The permit failed structural or signature validation.
    #[error("MINT_ERR_203: Invalid permit: {reason}")]
    InvalidPermit { reason: String },

    /// The permit nonce was already consumed for this owner.
    #[error("MINT_ERR_204: Permit nonce already used")]
    PermitNonceReused,

    // =================================================================
    // Vault Errors (3xx)
    // =================================================================
    /// The deposit would mint zero shares at the current share price.
    #[error("MINT_ERR_300: Deposit would mint zero shares")]
    NoSharesMinted,

    /// Withdrawal request exceeds the owner's redeemable value.
    #[error("MINT_ERR_301: Exceeded max withdraw: requested {requested}, available {available}")]
    ExceededMaxWithdraw {
        requested: Decimal,
        available: Decimal,
    },

    /// A caller-supplied slippage bound was violated.
    #[error("MINT_ERR_302: Slippage bound violated: limit {limit}, actual {actual}")]
    SlippageExceeded { limit: Decimal, actual: Decimal },

    /// Attempted to rescue an asset the vault must never release.
    #[error("MINT_ERR_303: Rescue disallowed for asset: {0}")]
    RescueDisallowed(String),

    /// Attempted to set a configuration value to zero where zero is invalid.
    #[error("MINT_ERR_304: Value must be non-zero")]
    CannotSetZero,

    // =================================================================
    // Withdrawal Queue Errors (4xx)
    // =================================================================
    /// The withdrawal delay has not elapsed since request creation.
    #[error("MINT_ERR_400: Withdrawal period not elapsed")]
    WithdrawPeriodNotElapsed,

    /// The withdrawal request was already claimed.
    #[error("MINT_ERR_401: Request already claimed: {0}")]
    AlreadyClaimed(RequestId),

    /// No withdrawal request exists under this identifier.
    #[error("MINT_ERR_402: Unknown withdrawal request: {0}")]
    UnknownRequest(RequestId),

    /// Only the request owner may claim it.
    #[error("MINT_ERR_403: Caller is not the request owner")]
    UnauthorizedClaimant,

    /// The calling vault is not authorized to enqueue withdrawals.
    #[error("MINT_ERR_404: Vault not authorized: {0}")]
    VaultNotAuthorized(AccountId),

    // =================================================================
    // Oracle Redemption Errors (5xx)
    // =================================================================
    /// The oracle price is older than the staleness threshold.
    #[error("MINT_ERR_500: Stale oracle price: age {age_secs}s, max {max_secs}s")]
    StalePrice { age_secs: i64, max_secs: i64 },

    /// The oracle has no price for this collateral.
    #[error("MINT_ERR_501: No oracle price for collateral: {0}")]
    MissingPrice(String),

    /// The peg percentage is outside the valid basis-point range.
    #[error("MINT_ERR_502: Invalid peg percentage: {0} bps")]
    InvalidPegPercentage(u32),

    /// The treasury cannot cover the requested redemption.
    #[error("MINT_ERR_503: Insufficient treasury: need {needed}, have {available}")]
    InsufficientTreasury { needed: Decimal, available: Decimal },

    // =================================================================
    // Access Control / Security Errors (8xx)
    // =================================================================
    /// The account does not hold the role the operation requires.
    #[error("MINT_ERR_800: Missing role {role} for {account}")]
    MissingRole { account: AccountId, role: Role },

    /// The subject is not on the admission allow-list.
    #[error("MINT_ERR_801: Account not allow-listed: {0}")]
    NotAllowListed(AccountId),

    /// The account is blacklisted from share operations.
    #[error("MINT_ERR_802: Account blacklisted: {0}")]
    Blacklisted(AccountId),

    /// Allow-list add for an account already present.
    #[error("MINT_ERR_803: Account already allow-listed: {0}")]
    AlreadyAllowListed(AccountId),

    /// Allow-list removal for an account not present.
    #[error("MINT_ERR_804: Account not on allow-list: {0}")]
    AllowListEntryMissing(AccountId),

    /// Blacklist add for an account already present.
    #[error("MINT_ERR_805: Account already blacklisted: {0}")]
    AlreadyBlacklisted(AccountId),

    /// Blacklist removal for an account not present.
    #[error("MINT_ERR_806: Account not blacklisted: {0}")]
    NotBlacklisted(AccountId),

    /// The ed25519 signature on the order didn't verify.
    #[error("MINT_ERR_807: Signature verification failed: {reason}")]
    InvalidSignature { reason: String },

    /// Share supply bookkeeping diverged from the sum of holdings.
    #[error("MINT_ERR_808: Share supply violation: {reason}")]
    ShareSupplyViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("MINT_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("MINT_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// A persisted snapshot carries an unsupported schema version.
    #[error("MINT_ERR_902: Snapshot schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },

    /// A persisted snapshot failed its integrity digest check.
    #[error("MINT_ERR_903: Snapshot digest mismatch")]
    StateDigestMismatch,
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenmintError>;

// Conversion from serde_json::Error (snapshot encode/decode paths)
impl From<serde_json::Error> for OpenmintError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
