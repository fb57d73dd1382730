//! Order replay protection.
//!
//! Each account has its own nonce space, and consuming a nonce burns it
//! forever. Unlike a settlement cache, this set must never evict: an
//! evicted nonce would make its signed order replayable, so the set only
//! grows.

use std::collections::{HashMap, HashSet};

use openmint_types::{AccountId, OpenmintError, OrderNonce, Result};

/// Consumed (subject, nonce) pairs.
pub struct UsedNonceSet {
    used: HashMap<AccountId, HashSet<u64>>,
}

impl UsedNonceSet {
    /// Create a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            used: HashMap::new(),
        }
    }

    /// Consume a nonce for a subject.
    ///
    /// # Errors
    /// Returns [`OpenmintError::ReplayedOrder`] if this subject already
    /// consumed the nonce.
    pub fn consume(&mut self, subject: AccountId, nonce: OrderNonce) -> Result<()> {
        if !self.used.entry(subject).or_default().insert(nonce.0) {
            return Err(OpenmintError::ReplayedOrder { subject, nonce });
        }
        Ok(())
    }

    /// Whether a subject has already consumed a nonce.
    #[must_use]
    pub fn is_used(&self, subject: AccountId, nonce: OrderNonce) -> bool {
        self.used
            .get(&subject)
            .is_some_and(|set| set.contains(&nonce.0))
    }

    /// Total consumed nonces across all subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.values().map(HashSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.values().all(HashSet::is_empty)
    }

    /// Consumed nonces per subject, for snapshot export.
    #[must_use]
    pub fn export(&self) -> Vec<(AccountId, Vec<u64>)> {
        let mut entries: Vec<(AccountId, Vec<u64>)> = self
            .used
            .iter()
            .map(|(subject, set)| {
                let mut nonces: Vec<u64> = set.iter().copied().collect();
                nonces.sort_unstable();
                (*subject, nonces)
            })
            .collect();
        entries.sort_unstable_by_key(|(subject, _)| *subject);
        entries
    }

    /// Rebuild the set from snapshot entries.
    #[must_use]
    pub fn from_entries(entries: Vec<(AccountId, Vec<u64>)>) -> Self {
        let used = entries
            .into_iter()
            .map(|(subject, nonces)| (subject, nonces.into_iter().collect()))
            .collect();
        Self { used }
    }
}

impl Default for UsedNonceSet {
    fn default() -> Self {
        Self::new()
    }
}
