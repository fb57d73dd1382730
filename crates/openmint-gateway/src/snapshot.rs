//! Versioned capture and restore of the gateway's durable state.
//!
//! The snapshot carries exactly what replay protection and rate limiting
//! need to survive a restart: the consumed nonce set, both rate windows,
//! the subject allow-list, the collateral registry, and the account
//! wiring. The event log is host-drained and deliberately excluded.
//!
//! Restore runs the raw JSON through a migration step first, so payloads
//! written by older builds (missing later additive fields) still load.

use chrono::{DateTime, Utc};
use openmint_ledger::AllowList;
use openmint_types::constants::SNAPSHOT_SCHEMA_VERSION;
use openmint_types::{
    AccountId, CollateralId, CollateralMeta, GatewayConfig, OpenmintError, OracleConfig,
    PeriodKey, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::gateway::OrderGateway;
use crate::nonces::UsedNonceSet;
use crate::rate_limit::RateLimitWindow;
use crate::registry::CollateralRegistry;

/// Persisted state of one rate window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowState {
    pub capacity: Decimal,
    pub period: PeriodKey,
    pub cumulative: Decimal,
}

impl From<&RateLimitWindow> for WindowState {
    fn from(window: &RateLimitWindow) -> Self {
        Self {
            capacity: window.capacity(),
            period: window.period(),
            cumulative: window.cumulative(),
        }
    }
}

impl WindowState {
    fn into_window(self) -> RateLimitWindow {
        RateLimitWindow::from_parts(self.capacity, self.period, self.cumulative)
    }
}

/// Serializable capture of the gateway's durable state.
///
/// Collections are exported in sorted order so two captures of the same
/// state serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub schema_version: u32,
    pub captured_at: DateTime<Utc>,
    pub config: GatewayConfig,
    pub oracle_config: OracleConfig,
    pub custodian: AccountId,
    pub treasury: AccountId,
    pub subjects: Vec<AccountId>,
    pub collaterals: Vec<(CollateralId, CollateralMeta)>,
    pub used_nonces: Vec<(AccountId, Vec<u64>)>,
    pub mint_window: WindowState,
    pub redeem_window: WindowState,
    /// Added in schema v1; v0 payloads migrate to an empty list.
    pub delegated_signers: Vec<(AccountId, [u8; 32])>,
}

impl GatewaySnapshot {
    /// Capture the gateway's durable state.
    #[must_use]
    pub fn capture(gateway: &OrderGateway, now: DateTime<Utc>) -> Self {
        let (
            config,
            oracle_config,
            subjects,
            registry,
            nonces,
            mint_window,
            redeem_window,
            custodian,
            treasury,
            signers,
        ) = gateway.snapshot_parts();

        let mut delegated_signers: Vec<(AccountId, [u8; 32])> =
            signers.iter().map(|(account, key)| (*account, *key)).collect();
        delegated_signers.sort_unstable_by_key(|(account, _)| *account);

        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            captured_at: now,
            config: config.clone(),
            oracle_config: oracle_config.clone(),
            custodian,
            treasury,
            subjects: subjects.export(),
            collaterals: registry.export(),
            used_nonces: nonces.export(),
            mint_window: WindowState::from(mint_window),
            redeem_window: WindowState::from(redeem_window),
            delegated_signers,
        }
    }

    /// Serialize to a JSON payload.
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot payload, migrating older schema versions.
    ///
    /// # Errors
    /// Returns `SchemaVersionMismatch` for payloads newer than this
    /// build supports, `Serialization` for malformed payloads.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let migrated = migrate(value)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Rebuild a gateway from this snapshot. The event log starts empty;
    /// recorded events belong to the run that captured them.
    #[must_use]
    pub fn restore(self) -> OrderGateway {
        OrderGateway::from_snapshot_parts(
            self.config,
            self.oracle_config,
            AllowList::from_entries(self.subjects),
            CollateralRegistry::from_entries(self.collaterals),
            UsedNonceSet::from_entries(self.used_nonces),
            self.mint_window.into_window(),
            self.redeem_window.into_window(),
            self.custodian,
            self.treasury,
            self.delegated_signers.into_iter().collect(),
        )
    }
}

/// Bring an older payload up to the current schema.
///
/// Only additive field changes are supported: each step fills in the
/// fields its version introduced with their empty defaults.
fn migrate(mut value: serde_json::Value) -> Result<serde_json::Value> {
    let version = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));
    if version > SNAPSHOT_SCHEMA_VERSION {
        return Err(OpenmintError::SchemaVersionMismatch {
            expected: SNAPSHOT_SCHEMA_VERSION,
            actual: version,
        });
    }
    let Some(fields) = value.as_object_mut() else {
        return Err(OpenmintError::Serialization(
            "snapshot payload is not a JSON object".to_string(),
        ));
    };

    if version < 1 {
        // v0 predates delegated signing keys.
        fields
            .entry("delegated_signers")
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
    }
    fields.insert(
        "schema_version".to_string(),
        serde_json::Value::from(SNAPSHOT_SCHEMA_VERSION),
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use openmint_ledger::{AssetBook, RoleRegistry, TokenLedger};
    use openmint_types::{Order, OrderDirection, OrderNonce, Role};

    struct Captured {
        snapshot: GatewaySnapshot,
        subject: AccountId,
        nonce: OrderNonce,
    }

    /// Build a gateway, settle one mint order, capture.
    fn captured() -> Captured {
        let now = Utc::now();
        let admin = AccountId::random();
        let mut roles = RoleRegistry::new(admin);
        let issuer = AccountId::random();
        roles.grant(admin, Role::Issuer, issuer, now).unwrap();
        roles
            .grant(admin, Role::AllowListOperator, admin, now)
            .unwrap();

        let mut gateway = OrderGateway::new(
            GatewayConfig::default(),
            OracleConfig::default(),
            AccountId::random(),
            AccountId::random(),
        )
        .unwrap();
        gateway.add_collateral(&roles, admin, "USDC", 6, now).unwrap();

        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        let subject = AccountId::from_pubkey(key.verifying_key().to_bytes());
        gateway.allow_subject(&roles, admin, subject, now).unwrap();

        let mut ledger = TokenLedger::new();
        let mut assets = AssetBook::new();
        assets.deposit("USDC", subject, Decimal::new(1_000, 0));

        let order = Order::dummy(
            OrderDirection::Mint,
            subject,
            "USDC",
            Decimal::new(1_000, 0),
            Decimal::new(1_000, 0),
        );
        let sig = order.sign(&key);
        gateway
            .submit_mint_order(
                &roles,
                &mut ledger,
                &mut assets,
                issuer,
                &order,
                &sig,
                now,
                PeriodKey(3),
            )
            .unwrap();

        Captured {
            snapshot: GatewaySnapshot::capture(&gateway, now),
            subject,
            nonce: order.nonce,
        }
    }

    #[test]
    fn roundtrip_preserves_replay_protection() {
        let c = captured();
        let json = c.snapshot.to_json().unwrap();
        let restored = GatewaySnapshot::from_json(&json).unwrap().restore();

        assert!(restored.is_nonce_used(c.subject, c.nonce));
        assert!(restored.is_subject_allowed(c.subject));
        assert!(restored.collaterals().contains("USDC"));
        // The mint window's consumed volume survives the restart.
        assert_eq!(
            restored.remaining_mint_capacity(PeriodKey(3)),
            Decimal::new(1_000_000 - 1_000, 0)
        );
    }

    #[test]
    fn roundtrip_preserves_wiring() {
        let c = captured();
        let json = c.snapshot.to_json().unwrap();
        let restored = GatewaySnapshot::from_json(&json).unwrap().restore();

        assert_eq!(restored.custodian(), c.snapshot.custodian);
        assert_eq!(restored.treasury(), c.snapshot.treasury);
        assert_eq!(
            restored.config().mint_capacity,
            c.snapshot.config.mint_capacity
        );
    }

    #[test]
    fn v0_payload_migrates_to_empty_signer_list() {
        let c = captured();
        let mut value: serde_json::Value =
            serde_json::from_str(&c.snapshot.to_json().unwrap()).unwrap();
        let fields = value.as_object_mut().unwrap();
        fields.remove("delegated_signers");
        fields.insert("schema_version".to_string(), serde_json::Value::from(0u32));

        let migrated = GatewaySnapshot::from_json(&value.to_string()).unwrap();
        assert_eq!(migrated.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(migrated.delegated_signers.is_empty());
        // Everything a v0 payload did carry survives.
        let restored = migrated.restore();
        assert!(restored.is_nonce_used(c.subject, c.nonce));
    }

    #[test]
    fn future_schema_rejected() {
        let c = captured();
        let mut value: serde_json::Value =
            serde_json::from_str(&c.snapshot.to_json().unwrap()).unwrap();
        value["schema_version"] = serde_json::Value::from(99u32);

        let err = GatewaySnapshot::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            OpenmintError::SchemaVersionMismatch { actual: 99, .. }
        ));
    }

    #[test]
    fn non_object_payload_rejected() {
        let err = GatewaySnapshot::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, OpenmintError::Serialization(_)));
    }
}
