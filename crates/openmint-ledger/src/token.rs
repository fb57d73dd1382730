//! Protocol token ledger.
//!
//! Tracks per-account balances, the circulating supply, and delegated
//! spending allowances. All mutations are atomic: either the full
//! operation succeeds or the ledger is unchanged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use openmint_types::{AccountId, OpenmintError, Permit, Result};
use rust_decimal::Decimal;

/// Source of truth for protocol token balances.
///
/// Only the gateway mints and burns; the vault and withdrawal queue move
/// existing balances. Allowances let third parties (the vault pulling a
/// deposit, a relayer) spend on an owner's behalf, either by direct
/// approval or by a signed [`Permit`].
pub struct TokenLedger {
    /// Per-account balances.
    balances: HashMap<AccountId, Decimal>,
    /// (owner, spender) allowances.
    allowances: HashMap<(AccountId, AccountId), Decimal>,
    /// Consumed permit nonces per owner. Never shrinks.
    used_permit_nonces: HashMap<AccountId, HashSet<u64>>,
    /// Circulating supply. Always the sum of all balances.
    total_supply: Decimal,
}

impl TokenLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            allowances: HashMap::new(),
            used_permit_nonces: HashMap::new(),
            total_supply: Decimal::ZERO,
        }
    }

    /// Mint tokens to an account, growing the supply.
    ///
    /// # Errors
    /// Returns `ZeroAccount` if the recipient is the zero account.
    pub fn mint(&mut self, to: AccountId, amount: Decimal) -> Result<()> {
        if to.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        *self.balances.entry(to).or_default() += amount;
        self.total_supply += amount;
        tracing::debug!(to = %to, amount = %amount, supply = %self.total_supply, "Tokens minted");
        Ok(())
    }

    /// Burn tokens from an account, shrinking the supply.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the account holds less than `amount`.
    pub fn burn(&mut self, from: AccountId, amount: Decimal) -> Result<()> {
        let balance = self.balances.entry(from).or_default();
        if *balance < amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        self.total_supply -= amount;
        tracing::debug!(from = %from, amount = %amount, supply = %self.total_supply, "Tokens burned");
        Ok(())
    }

    /// Move tokens between accounts.
    ///
    /// # Errors
    /// Returns `ZeroAccount` for a zero recipient, `InsufficientBalance`
    /// if the sender holds less than `amount`.
    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: Decimal) -> Result<()> {
        if to.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        let balance = self.balances.entry(from).or_default();
        if *balance < amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    /// Set a spender's allowance, replacing any previous value.
    ///
    /// # Errors
    /// Returns `ZeroAccount` if the spender is the zero account.
    pub fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Decimal) -> Result<()> {
        if spender.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    /// Spend from an owner's balance using a previously set allowance.
    ///
    /// The allowance is reduced only after the transfer succeeds, so a
    /// failed transfer leaves it untouched.
    ///
    /// # Errors
    /// Returns `InsufficientAllowance` if the spender's allowance is
    /// below `amount`, plus any error `transfer` can produce.
    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<()> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(OpenmintError::InsufficientAllowance {
                needed: amount,
                available: allowance,
            });
        }
        self.transfer(from, to, amount)?;
        self.allowances.insert((from, spender), allowance - amount);
        Ok(())
    }

    /// Apply a signed permit, setting the approved allowance.
    ///
    /// Check order: structure, deadline, signature, nonce. The nonce is
    /// consumed in the same call that sets the allowance, so a rejected
    /// permit burns nothing.
    ///
    /// # Errors
    /// Returns `ZeroAccount`, `PermitExpired`, `InvalidPermit`, or
    /// `PermitNonceReused`.
    pub fn permit(
        &mut self,
        permit: &Permit,
        signature: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if permit.spender.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if permit.is_expired(now) {
            return Err(OpenmintError::PermitExpired);
        }
        permit.verify_signature(signature)?;

        let used = self.used_permit_nonces.entry(permit.owner).or_default();
        if !used.insert(permit.nonce) {
            return Err(OpenmintError::PermitNonceReused);
        }
        self.allowances
            .insert((permit.owner, permit.spender), permit.amount);
        tracing::debug!(
            owner = %permit.owner,
            spender = %permit.spender,
            amount = %permit.amount,
            "Permit applied"
        );
        Ok(())
    }

    /// Current balance of an account.
    #[must_use]
    pub fn balance_of(&self, account: AccountId) -> Decimal {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Current (owner, spender) allowance.
    #[must_use]
    pub fn allowance(&self, owner: AccountId, spender: AccountId) -> Decimal {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Circulating supply.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    /// Whether an owner has already consumed a permit nonce.
    #[must_use]
    pub fn permit_nonce_used(&self, owner: AccountId, nonce: u64) -> bool {
        self.used_permit_nonces
            .get(&owner)
            .is_some_and(|set| set.contains(&nonce))
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn mint_increases_balance_and_supply() {
        let mut ledger = TokenLedger::new();
        let account = AccountId::random();
        ledger.mint(account, Decimal::new(1000, 0)).unwrap();
        assert_eq!(ledger.balance_of(account), Decimal::new(1000, 0));
        assert_eq!(ledger.total_supply(), Decimal::new(1000, 0));
    }

    #[test]
    fn mint_to_zero_account_rejected() {
        let mut ledger = TokenLedger::new();
        let err = ledger.mint(AccountId::zero(), Decimal::ONE).unwrap_err();
        assert!(matches!(err, OpenmintError::ZeroAccount));
    }

    #[test]
    fn burn_decreases_balance_and_supply() {
        let mut ledger = TokenLedger::new();
        let account = AccountId::random();
        ledger.mint(account, Decimal::new(1000, 0)).unwrap();
        ledger.burn(account, Decimal::new(400, 0)).unwrap();
        assert_eq!(ledger.balance_of(account), Decimal::new(600, 0));
        assert_eq!(ledger.total_supply(), Decimal::new(600, 0));
    }

    #[test]
    fn burn_insufficient_fails_and_leaves_state() {
        let mut ledger = TokenLedger::new();
        let account = AccountId::random();
        ledger.mint(account, Decimal::new(100, 0)).unwrap();
        let err = ledger.burn(account, Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(err, OpenmintError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(account), Decimal::new(100, 0));
        assert_eq!(ledger.total_supply(), Decimal::new(100, 0));
    }

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = TokenLedger::new();
        let from = AccountId::random();
        let to = AccountId::random();
        ledger.mint(from, Decimal::new(1000, 0)).unwrap();
        ledger.transfer(from, to, Decimal::new(300, 0)).unwrap();
        assert_eq!(ledger.balance_of(from), Decimal::new(700, 0));
        assert_eq!(ledger.balance_of(to), Decimal::new(300, 0));
        assert_eq!(ledger.total_supply(), Decimal::new(1000, 0));
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut ledger = TokenLedger::new();
        let from = AccountId::random();
        ledger.mint(from, Decimal::new(100, 0)).unwrap();
        let err = ledger
            .transfer(from, AccountId::zero(), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, OpenmintError::ZeroAccount));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut ledger = TokenLedger::new();
        let owner = AccountId::random();
        let spender = AccountId::random();
        let to = AccountId::random();
        ledger.mint(owner, Decimal::new(1000, 0)).unwrap();
        ledger.approve(owner, spender, Decimal::new(500, 0)).unwrap();

        ledger
            .transfer_from(spender, owner, to, Decimal::new(200, 0))
            .unwrap();
        assert_eq!(ledger.balance_of(to), Decimal::new(200, 0));
        assert_eq!(ledger.allowance(owner, spender), Decimal::new(300, 0));
    }

    #[test]
    fn transfer_from_beyond_allowance_fails() {
        let mut ledger = TokenLedger::new();
        let owner = AccountId::random();
        let spender = AccountId::random();
        ledger.mint(owner, Decimal::new(1000, 0)).unwrap();
        ledger.approve(owner, spender, Decimal::new(100, 0)).unwrap();

        let err = ledger
            .transfer_from(spender, owner, spender, Decimal::new(200, 0))
            .unwrap_err();
        assert!(matches!(err, OpenmintError::InsufficientAllowance { .. }));
        assert_eq!(ledger.allowance(owner, spender), Decimal::new(100, 0));
    }

    #[test]
    fn failed_transfer_leaves_allowance_untouched() {
        let mut ledger = TokenLedger::new();
        let owner = AccountId::random();
        let spender = AccountId::random();
        ledger.approve(owner, spender, Decimal::new(500, 0)).unwrap();

        // Owner has no balance, so the transfer leg fails.
        let err = ledger
            .transfer_from(spender, owner, spender, Decimal::new(100, 0))
            .unwrap_err();
        assert!(matches!(err, OpenmintError::InsufficientBalance { .. }));
        assert_eq!(ledger.allowance(owner, spender), Decimal::new(500, 0));
    }

    #[test]
    fn permit_sets_allowance() {
        let mut ledger = TokenLedger::new();
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let spender = AccountId::random();
        let permit = Permit::dummy(owner, spender, Decimal::new(750, 0));
        let sig = permit.sign(&key);

        ledger.permit(&permit, &sig, Utc::now()).unwrap();
        assert_eq!(ledger.allowance(owner, spender), Decimal::new(750, 0));
        assert!(ledger.permit_nonce_used(owner, permit.nonce));
    }

    #[test]
    fn permit_replay_rejected() {
        let mut ledger = TokenLedger::new();
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let permit = Permit::dummy(owner, AccountId::random(), Decimal::new(10, 0));
        let sig = permit.sign(&key);

        ledger.permit(&permit, &sig, Utc::now()).unwrap();
        let err = ledger.permit(&permit, &sig, Utc::now()).unwrap_err();
        assert!(matches!(err, OpenmintError::PermitNonceReused));
    }

    #[test]
    fn expired_permit_rejected_without_consuming_nonce() {
        let mut ledger = TokenLedger::new();
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let permit = Permit::dummy(owner, AccountId::random(), Decimal::new(10, 0));
        let sig = permit.sign(&key);

        let late = permit.deadline + chrono::Duration::seconds(1);
        let err = ledger.permit(&permit, &sig, late).unwrap_err();
        assert!(matches!(err, OpenmintError::PermitExpired));
        assert!(!ledger.permit_nonce_used(owner, permit.nonce));
    }

    #[test]
    fn forged_permit_rejected() {
        let mut ledger = TokenLedger::new();
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let forger = SigningKey::generate(&mut rand::rngs::OsRng);
        let owner = AccountId::from_pubkey(key.verifying_key().to_bytes());
        let permit = Permit::dummy(owner, AccountId::random(), Decimal::new(10, 0));
        let sig = permit.sign(&forger);

        let err = ledger.permit(&permit, &sig, Utc::now()).unwrap_err();
        assert!(matches!(err, OpenmintError::InvalidPermit { .. }));
    }
}
