//! Share/asset conversion math.
//!
//! All four conversions round in the vault's favor: entering the vault
//! rounds what the depositor receives (shares) down and what the vault
//! pulls (assets) up; leaving the vault rounds what the vault releases
//! (assets) down and what it burns (shares) up. Rounding error therefore
//! always accrues to the remaining shareholders and can never be farmed
//! by round-tripping.
//!
//! With no shares outstanding the price is 1:1.

use openmint_types::constants::TOKEN_DECIMALS;
use rust_decimal::{Decimal, RoundingStrategy};

fn floor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TOKEN_DECIMALS, RoundingStrategy::ToZero)
}

fn ceil(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TOKEN_DECIMALS, RoundingStrategy::AwayFromZero)
}

/// Shares minted for depositing `assets`. Rounds down.
#[must_use]
pub fn shares_for_deposit(assets: Decimal, total_assets: Decimal, total_shares: Decimal) -> Decimal {
    if total_shares.is_zero() || total_assets.is_zero() {
        return floor(assets);
    }
    floor(assets * total_shares / total_assets)
}

/// Assets released for burning `shares`. Rounds down.
#[must_use]
pub fn assets_for_redeem(shares: Decimal, total_assets: Decimal, total_shares: Decimal) -> Decimal {
    if total_shares.is_zero() {
        return Decimal::ZERO;
    }
    floor(shares * total_assets / total_shares)
}

/// Shares that must burn to release exactly `assets`. Rounds up.
#[must_use]
pub fn shares_for_withdraw(
    assets: Decimal,
    total_assets: Decimal,
    total_shares: Decimal,
) -> Decimal {
    if total_shares.is_zero() || total_assets.is_zero() {
        return ceil(assets);
    }
    ceil(assets * total_shares / total_assets)
}

/// Assets that must enter to mint exactly `shares`. Rounds up.
#[must_use]
pub fn assets_for_mint(shares: Decimal, total_assets: Decimal, total_shares: Decimal) -> Decimal {
    if total_shares.is_zero() || total_assets.is_zero() {
        return ceil(shares);
    }
    ceil(shares * total_assets / total_shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_is_one_to_one() {
        let assets = Decimal::new(1_000, 0);
        assert_eq!(
            shares_for_deposit(assets, Decimal::ZERO, Decimal::ZERO),
            assets
        );
        assert_eq!(
            assets_for_mint(assets, Decimal::ZERO, Decimal::ZERO),
            assets
        );
    }

    #[test]
    fn redeem_with_no_shares_outstanding_is_zero() {
        assert_eq!(
            assets_for_redeem(Decimal::new(10, 0), Decimal::new(100, 0), Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn proportional_after_appreciation() {
        // 1000 shares back 1100 assets: each share is worth 1.1.
        let total_assets = Decimal::new(1_100, 0);
        let total_shares = Decimal::new(1_000, 0);

        assert_eq!(
            assets_for_redeem(Decimal::new(100, 0), total_assets, total_shares),
            Decimal::new(110, 0)
        );
        assert_eq!(
            shares_for_deposit(Decimal::new(110, 0), total_assets, total_shares),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn deposit_rounds_shares_down() {
        // Price 1.1: 100 assets buy 90.909..., floors at 18 places.
        let shares = shares_for_deposit(
            Decimal::new(100, 0),
            Decimal::new(1_100, 0),
            Decimal::new(1_000, 0),
        );
        let exact = Decimal::new(100, 0) * Decimal::new(1_000, 0) / Decimal::new(1_100, 0);
        assert!(shares <= exact);
        assert_eq!(shares, exact.round_dp_with_strategy(18, RoundingStrategy::ToZero));
    }

    #[test]
    fn withdraw_rounds_shares_up() {
        let burned = shares_for_withdraw(
            Decimal::new(100, 0),
            Decimal::new(1_100, 0),
            Decimal::new(1_000, 0),
        );
        let exact = Decimal::new(100, 0) * Decimal::new(1_000, 0) / Decimal::new(1_100, 0);
        assert!(burned >= exact);
    }

    #[test]
    fn round_trip_never_profits() {
        // Deposit then redeem at an awkward price must not come out ahead.
        let total_assets = Decimal::new(3_333, 0);
        let total_shares = Decimal::new(1_000, 0);
        let deposit = Decimal::new(997, 0);

        let shares = shares_for_deposit(deposit, total_assets, total_shares);
        let back = assets_for_redeem(
            shares,
            total_assets + deposit,
            total_shares + shares,
        );
        assert!(back <= deposit, "round trip extracted value: {back} > {deposit}");
    }

    #[test]
    fn mint_pulls_at_least_proportional_assets() {
        let assets = assets_for_mint(
            Decimal::new(100, 0),
            Decimal::new(1_100, 0),
            Decimal::new(1_000, 0),
        );
        // 100 shares at price 1.1 cost exactly 110.
        assert_eq!(assets, Decimal::new(110, 0));
    }
}
