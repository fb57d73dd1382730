//! Collateral custody book.
//!
//! Tracks per-(asset, account) holdings of everything that is not the
//! protocol token: registered collateral in custody, treasury reserves,
//! and any stray asset awaiting rescue. Authorization to move funds is
//! the caller's concern; the book only enforces balance sufficiency.

use std::collections::HashMap;

use openmint_types::{AccountId, CollateralId, OpenmintError, Result};
use rust_decimal::Decimal;

/// Multi-asset balance book for collateral and treasury holdings.
pub struct AssetBook {
    /// Per-(asset, account) balances.
    balances: HashMap<(CollateralId, AccountId), Decimal>,
}

impl AssetBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Credit an account with an asset.
    pub fn deposit(&mut self, asset: &str, account: AccountId, amount: Decimal) {
        *self
            .balances
            .entry((asset.to_string(), account))
            .or_default() += amount;
    }

    /// Move an asset between accounts.
    ///
    /// # Errors
    /// Returns `ZeroAccount` for a zero recipient, `InsufficientBalance`
    /// if the sender holds less than `amount`.
    pub fn transfer(
        &mut self,
        asset: &str,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<()> {
        if to.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        let balance = self
            .balances
            .entry((asset.to_string(), from))
            .or_default();
        if *balance < amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        *self.balances.entry((asset.to_string(), to)).or_default() += amount;
        Ok(())
    }

    /// Balance of an (asset, account) pair.
    #[must_use]
    pub fn balance_of(&self, asset: &str, account: AccountId) -> Decimal {
        self.balances
            .get(&(asset.to_string(), account))
            .copied()
            .unwrap_or_default()
    }

    /// Total holdings of an asset across all accounts.
    #[must_use]
    pub fn total_of(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl Default for AssetBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_credits_account() {
        let mut book = AssetBook::new();
        let account = AccountId::random();
        book.deposit("USDC", account, Decimal::new(500, 0));
        assert_eq!(book.balance_of("USDC", account), Decimal::new(500, 0));
        assert_eq!(book.balance_of("DAI", account), Decimal::ZERO);
    }

    #[test]
    fn transfer_moves_asset() {
        let mut book = AssetBook::new();
        let from = AccountId::random();
        let to = AccountId::random();
        book.deposit("USDC", from, Decimal::new(500, 0));
        book.transfer("USDC", from, to, Decimal::new(200, 0)).unwrap();
        assert_eq!(book.balance_of("USDC", from), Decimal::new(300, 0));
        assert_eq!(book.balance_of("USDC", to), Decimal::new(200, 0));
    }

    #[test]
    fn transfer_insufficient_fails_and_leaves_state() {
        let mut book = AssetBook::new();
        let from = AccountId::random();
        let to = AccountId::random();
        book.deposit("USDC", from, Decimal::new(100, 0));
        let err = book
            .transfer("USDC", from, to, Decimal::new(200, 0))
            .unwrap_err();
        assert!(matches!(err, OpenmintError::InsufficientBalance { .. }));
        assert_eq!(book.balance_of("USDC", from), Decimal::new(100, 0));
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut book = AssetBook::new();
        let from = AccountId::random();
        book.deposit("USDC", from, Decimal::new(100, 0));
        let err = book
            .transfer("USDC", from, AccountId::zero(), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, OpenmintError::ZeroAccount));
    }

    #[test]
    fn total_of_sums_across_accounts() {
        let mut book = AssetBook::new();
        let a = AccountId::random();
        let b = AccountId::random();
        book.deposit("USDC", a, Decimal::new(300, 0));
        book.deposit("USDC", b, Decimal::new(200, 0));
        book.deposit("DAI", a, Decimal::new(50, 0));
        assert_eq!(book.total_of("USDC"), Decimal::new(500, 0));
        assert_eq!(book.total_of("DAI"), Decimal::new(50, 0));
    }
}
