//! Fail-loud account allow-list.
//!
//! Operator mistakes must surface: adding an account already present or
//! removing one that is absent is an error, never a silent no-op. The
//! gateway uses one of these for admission, the vault another for
//! direct-withdraw exemptions.

use std::collections::HashSet;

use openmint_types::{AccountId, OpenmintError, Result};

/// A set of admitted accounts with loud duplicate and missing errors.
#[derive(Debug, Default)]
pub struct AllowList {
    entries: HashSet<AccountId>,
}

impl AllowList {
    /// Create a new empty allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashSet::new(),
        }
    }

    /// Add an account.
    ///
    /// # Errors
    /// Returns `ZeroAccount` for the zero account,
    /// `AlreadyAllowListed` if the account is already present.
    pub fn add(&mut self, account: AccountId) -> Result<()> {
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if !self.entries.insert(account) {
            return Err(OpenmintError::AlreadyAllowListed(account));
        }
        Ok(())
    }

    /// Remove an account.
    ///
    /// # Errors
    /// Returns `AllowListEntryMissing` if the account is not present.
    pub fn remove(&mut self, account: AccountId) -> Result<()> {
        if !self.entries.remove(&account) {
            return Err(OpenmintError::AllowListEntryMissing(account));
        }
        Ok(())
    }

    /// Whether an account is present.
    #[must_use]
    pub fn contains(&self, account: AccountId) -> bool {
        self.entries.contains(&account)
    }

    /// Number of admitted accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Admitted accounts in sorted order, for snapshot export.
    #[must_use]
    pub fn export(&self) -> Vec<AccountId> {
        let mut entries: Vec<AccountId> = self.entries.iter().copied().collect();
        entries.sort_unstable();
        entries
    }

    /// Rebuild the list from snapshot entries.
    #[must_use]
    pub fn from_entries(entries: Vec<AccountId>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_contains() {
        let mut list = AllowList::new();
        let account = AccountId::random();
        list.add(account).unwrap();
        assert!(list.contains(account));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicate_add_fails() {
        let mut list = AllowList::new();
        let account = AccountId::random();
        list.add(account).unwrap();
        let err = list.add(account).unwrap_err();
        assert!(matches!(err, OpenmintError::AlreadyAllowListed(a) if a == account));
    }

    #[test]
    fn remove_absent_fails() {
        let mut list = AllowList::new();
        let account = AccountId::random();
        let err = list.remove(account).unwrap_err();
        assert!(matches!(err, OpenmintError::AllowListEntryMissing(a) if a == account));
    }

    #[test]
    fn add_remove_add_cycle() {
        let mut list = AllowList::new();
        let account = AccountId::random();
        list.add(account).unwrap();
        list.remove(account).unwrap();
        assert!(!list.contains(account));
        list.add(account).unwrap();
        assert!(list.contains(account));
    }

    #[test]
    fn zero_account_rejected() {
        let mut list = AllowList::new();
        let err = list.add(AccountId::zero()).unwrap_err();
        assert!(matches!(err, OpenmintError::ZeroAccount));
    }
}
