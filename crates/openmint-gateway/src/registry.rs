//! Registered collateral assets.
//!
//! Orders settle only against assets present here. Registration records
//! the asset's native precision so payouts can be quantized down to it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openmint_types::{CollateralId, CollateralMeta, OpenmintError, Result};

/// The set of collateral assets the gateway accepts.
pub struct CollateralRegistry {
    assets: HashMap<CollateralId, CollateralMeta>,
}

impl CollateralRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    /// Register a collateral asset with its native decimal precision.
    ///
    /// # Errors
    /// Returns `CollateralAlreadyRegistered` if the asset is present.
    pub fn add(&mut self, collateral: &str, decimals: u32, now: DateTime<Utc>) -> Result<()> {
        if self.assets.contains_key(collateral) {
            return Err(OpenmintError::CollateralAlreadyRegistered(
                collateral.to_string(),
            ));
        }
        self.assets
            .insert(collateral.to_string(), CollateralMeta::new(decimals, now));
        tracing::info!(collateral, decimals, "Collateral registered");
        Ok(())
    }

    /// Remove a collateral asset.
    ///
    /// # Errors
    /// Returns `UnknownCollateral` if the asset is not present.
    pub fn remove(&mut self, collateral: &str) -> Result<()> {
        if self.assets.remove(collateral).is_none() {
            return Err(OpenmintError::UnknownCollateral(collateral.to_string()));
        }
        tracing::info!(collateral, "Collateral removed");
        Ok(())
    }

    /// Metadata for a registered asset.
    ///
    /// # Errors
    /// Returns `UnknownCollateral` if the asset is not present.
    pub fn meta(&self, collateral: &str) -> Result<CollateralMeta> {
        self.assets
            .get(collateral)
            .copied()
            .ok_or_else(|| OpenmintError::UnknownCollateral(collateral.to_string()))
    }

    /// Whether an asset is registered.
    #[must_use]
    pub fn contains(&self, collateral: &str) -> bool {
        self.assets.contains_key(collateral)
    }

    /// Registered asset identifiers, unordered.
    #[must_use]
    pub fn ids(&self) -> Vec<CollateralId> {
        self.assets.keys().cloned().collect()
    }

    /// Registered assets with metadata in sorted order, for snapshot export.
    #[must_use]
    pub fn export(&self) -> Vec<(CollateralId, CollateralMeta)> {
        let mut entries: Vec<(CollateralId, CollateralMeta)> = self
            .assets
            .iter()
            .map(|(id, meta)| (id.clone(), *meta))
            .collect();
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }

    /// Rebuild the registry from snapshot entries, keeping original
    /// registration timestamps.
    #[must_use]
    pub fn from_entries(entries: Vec<(CollateralId, CollateralMeta)>) -> Self {
        Self {
            assets: entries.into_iter().collect(),
        }
    }
}

impl Default for CollateralRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_lookup() {
        let mut registry = CollateralRegistry::new();
        registry.add("USDC", 6, Utc::now()).unwrap();
        assert!(registry.contains("USDC"));
        assert_eq!(registry.meta("USDC").unwrap().decimals, 6);
    }

    #[test]
    fn duplicate_add_fails() {
        let mut registry = CollateralRegistry::new();
        registry.add("USDC", 6, Utc::now()).unwrap();
        let err = registry.add("USDC", 18, Utc::now()).unwrap_err();
        assert!(matches!(err, OpenmintError::CollateralAlreadyRegistered(_)));
        // Original registration untouched
        assert_eq!(registry.meta("USDC").unwrap().decimals, 6);
    }

    #[test]
    fn remove_unknown_fails() {
        let mut registry = CollateralRegistry::new();
        let err = registry.remove("DAI").unwrap_err();
        assert!(matches!(err, OpenmintError::UnknownCollateral(_)));
    }

    #[test]
    fn meta_for_unknown_fails() {
        let registry = CollateralRegistry::new();
        let err = registry.meta("DAI").unwrap_err();
        assert!(matches!(err, OpenmintError::UnknownCollateral(_)));
    }

    #[test]
    fn remove_then_re_add() {
        let mut registry = CollateralRegistry::new();
        registry.add("USDC", 6, Utc::now()).unwrap();
        registry.remove("USDC").unwrap();
        assert!(!registry.contains("USDC"));
        registry.add("USDC", 18, Utc::now()).unwrap();
        assert_eq!(registry.meta("USDC").unwrap().decimals, 18);
    }
}
