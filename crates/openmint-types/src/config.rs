//! Configuration types for the OpenMint gateway and vault.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Order Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Cumulative mint volume allowed per rate-limit period.
    pub mint_capacity: Decimal,
    /// Cumulative redeem volume allowed per rate-limit period.
    pub redeem_capacity: Decimal,
    /// Allowed mint-order deviation between counter and token amounts,
    /// in basis points.
    pub ratio_tolerance_bps: u32,
    /// When `false`, any account may be an order subject and the
    /// admission allow-list is bypassed.
    pub allowlist_enabled: bool,
    /// Maximum byte length of an order's message field.
    pub max_message_len: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mint_capacity: Decimal::from(constants::DEFAULT_MINT_CAPACITY),
            redeem_capacity: Decimal::from(constants::DEFAULT_REDEEM_CAPACITY),
            ratio_tolerance_bps: constants::RATIO_TOLERANCE_BPS,
            allowlist_enabled: true,
            max_message_len: constants::MAX_ORDER_MESSAGE_LEN,
        }
    }
}

/// Rebasing vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Seconds between withdrawal request creation and claimability.
    pub withdrawal_delay_secs: u64,
    /// Receipt-share symbol. Rescue refuses this asset.
    pub share_symbol: String,
    /// Underlying token symbol. Rescue refuses this asset too.
    pub underlying_symbol: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            withdrawal_delay_secs: constants::DEFAULT_WITHDRAWAL_DELAY_SECS,
            share_symbol: "sMINT".to_string(),
            underlying_symbol: "MINT".to_string(),
        }
    }
}

/// Oracle redemption configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Maximum oracle price age before redemption is refused, in seconds.
    pub staleness_threshold_secs: i64,
    /// Floor price: the effective redemption price never drops below this.
    pub peg_price: Decimal,
    /// Fraction of face value paid out, in basis points (10000 = 100%).
    pub peg_percentage_bps: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: constants::ORACLE_STALENESS_THRESHOLD_SECS,
            peg_price: Decimal::ONE,
            peg_percentage_bps: constants::DEFAULT_PEG_PERCENTAGE_BPS,
        }
    }
}
