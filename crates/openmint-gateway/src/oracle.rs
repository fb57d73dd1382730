//! Collateral price feeds for oracle-priced redemption.
//!
//! The gateway never trusts a price without its observation instant:
//! staleness is checked against the configured threshold at every
//! redemption.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A price observation and when it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    /// Protocol-token value of one collateral unit.
    pub price: Decimal,
    /// When the observation was taken.
    pub updated_at: DateTime<Utc>,
}

/// Source of collateral prices.
pub trait PriceOracle {
    /// Latest observation for a collateral asset, if any.
    fn get_price(&self, collateral: &str) -> Option<PricePoint>;
}

/// In-memory oracle fed by the host loop.
#[derive(Debug, Default)]
pub struct StaticOracle {
    prices: HashMap<String, PricePoint>,
}

impl StaticOracle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Record an observation, replacing any previous one.
    pub fn set_price(&mut self, collateral: &str, price: Decimal, updated_at: DateTime<Utc>) {
        self.prices
            .insert(collateral.to_string(), PricePoint { price, updated_at });
    }
}

impl PriceOracle for StaticOracle {
    fn get_price(&self, collateral: &str) -> Option<PricePoint> {
        self.prices.get(collateral).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_is_none() {
        let oracle = StaticOracle::new();
        assert!(oracle.get_price("USDC").is_none());
    }

    #[test]
    fn set_then_get() {
        let mut oracle = StaticOracle::new();
        let at = Utc::now();
        oracle.set_price("USDC", Decimal::new(99, 2), at);
        let point = oracle.get_price("USDC").unwrap();
        assert_eq!(point.price, Decimal::new(99, 2));
        assert_eq!(point.updated_at, at);
    }

    #[test]
    fn newer_observation_replaces_older() {
        let mut oracle = StaticOracle::new();
        let first = Utc::now();
        oracle.set_price("USDC", Decimal::ONE, first);
        let second = first + chrono::Duration::minutes(5);
        oracle.set_price("USDC", Decimal::new(98, 2), second);

        let point = oracle.get_price("USDC").unwrap();
        assert_eq!(point.price, Decimal::new(98, 2));
        assert_eq!(point.updated_at, second);
    }
}
