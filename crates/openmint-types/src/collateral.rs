//! Collateral asset identity and precision metadata.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Collateral asset identifier (e.g., "USDC").
pub type CollateralId = String;

/// Precision metadata recorded when a collateral asset is registered.
///
/// The protocol token always carries [`crate::constants::TOKEN_DECIMALS`]
/// places; collateral assets keep their own native precision, so every
/// amount paid out in collateral must be quantized to it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralMeta {
    /// Native decimal places of the asset.
    pub decimals: u32,
    /// When the asset was registered.
    pub registered_at: DateTime<Utc>,
}

impl CollateralMeta {
    #[must_use]
    pub fn new(decimals: u32, registered_at: DateTime<Utc>) -> Self {
        Self {
            decimals,
            registered_at,
        }
    }

    /// Truncate an amount to this asset's native precision.
    /// Rounds toward zero; residual dust stays in custody.
    #[must_use]
    pub fn quantize_down(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimals, RoundingStrategy::ToZero)
    }
}
