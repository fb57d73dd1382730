//! Versioned capture and restore of the vault plane's money state.
//!
//! One snapshot covers both the vault (share balances, totals,
//! blacklist, direct-exit list) and its withdrawal queue (delay,
//! authorized vaults, pending requests): the two move money together and
//! must restore together. Event logs are host-drained and excluded.
//!
//! Unlike the gateway snapshot, this one carries a SHA-256 integrity
//! digest over its canonical payload: the vault snapshot is the ledger
//! of who is owed what, so a silently corrupted or hand-edited payload
//! must be refused, not loaded.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use openmint_ledger::AllowList;
use openmint_types::constants::SNAPSHOT_SCHEMA_VERSION;
use openmint_types::{AccountId, OpenmintError, Result, VaultConfig, WithdrawalRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::queue::WithdrawalQueue;
use crate::vault::Vault;

/// Serializable capture of the vault plane's durable state.
///
/// Collections are exported in sorted order so two captures of the same
/// state serialize identically, which the digest relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub schema_version: u32,
    pub captured_at: DateTime<Utc>,
    pub config: VaultConfig,
    pub account: AccountId,
    pub total_shares: Decimal,
    pub total_assets: Decimal,
    pub shares: Vec<(AccountId, Decimal)>,
    pub share_allowances: Vec<(AccountId, AccountId, Decimal)>,
    pub blacklist: Vec<AccountId>,
    /// Added in schema v1; v0 payloads migrate to an empty list.
    pub direct_exits: Vec<AccountId>,
    pub delay_secs: u64,
    pub authorized_vaults: Vec<AccountId>,
    pub requests: Vec<(AccountId, Vec<WithdrawalRequest>)>,
    /// SHA-256 hex over the canonical payload with this field blanked.
    pub digest: String,
}

impl VaultSnapshot {
    /// Capture the vault and queue state, sealing it with the digest.
    ///
    /// # Errors
    /// Returns `Serialization` if the digest payload cannot be encoded.
    pub fn capture(vault: &Vault, queue: &WithdrawalQueue, now: DateTime<Utc>) -> Result<Self> {
        let (config, account, total_shares, total_assets, shares, allowances, blacklist, exits) =
            vault.snapshot_parts();
        let (delay_secs, authorized_vaults, requests) = queue.snapshot_parts();

        let mut shares: Vec<(AccountId, Decimal)> =
            shares.iter().map(|(a, v)| (*a, *v)).collect();
        shares.sort_unstable_by_key(|(a, _)| *a);

        let mut share_allowances: Vec<(AccountId, AccountId, Decimal)> = allowances
            .iter()
            .map(|((owner, spender), v)| (*owner, *spender, *v))
            .collect();
        share_allowances.sort_unstable_by_key(|(owner, spender, _)| (*owner, *spender));

        let mut blacklist: Vec<AccountId> = blacklist.iter().copied().collect();
        blacklist.sort_unstable();

        let mut authorized_vaults: Vec<AccountId> =
            authorized_vaults.iter().copied().collect();
        authorized_vaults.sort_unstable();

        let mut requests: Vec<(AccountId, Vec<WithdrawalRequest>)> = requests
            .iter()
            .map(|(owner, list)| (*owner, list.clone()))
            .collect();
        requests.sort_unstable_by_key(|(owner, _)| *owner);

        let mut snapshot = Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            captured_at: now,
            config: config.clone(),
            account,
            total_shares,
            total_assets,
            shares,
            share_allowances,
            blacklist,
            direct_exits: exits.export(),
            delay_secs,
            authorized_vaults,
            requests,
            digest: String::new(),
        };
        snapshot.digest = digest_of(&serde_json::to_value(&snapshot)?)?;
        Ok(snapshot)
    }

    /// Serialize to a JSON payload.
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot payload: digest check first, then schema
    /// migration.
    ///
    /// # Errors
    /// Returns `StateDigestMismatch` for a tampered payload,
    /// `SchemaVersionMismatch` for payloads newer than this build,
    /// `Serialization` for malformed payloads.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let stored = value
            .get("digest")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        if digest_of(&value)? != stored {
            return Err(OpenmintError::StateDigestMismatch);
        }

        let migrated = migrate(value)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Rebuild the vault and queue from this snapshot. Event logs start
    /// empty; recorded events belong to the run that captured them.
    #[must_use]
    pub fn restore(self) -> (Vault, WithdrawalQueue) {
        let shares: HashMap<AccountId, Decimal> = self.shares.into_iter().collect();
        let share_allowances: HashMap<(AccountId, AccountId), Decimal> = self
            .share_allowances
            .into_iter()
            .map(|(owner, spender, v)| ((owner, spender), v))
            .collect();
        let blacklist: HashSet<AccountId> = self.blacklist.into_iter().collect();

        let vault = Vault::from_snapshot_parts(
            self.config,
            self.account,
            self.total_shares,
            self.total_assets,
            shares,
            share_allowances,
            blacklist,
            AllowList::from_entries(self.direct_exits),
        );
        let queue = WithdrawalQueue::from_snapshot_parts(
            self.delay_secs,
            self.authorized_vaults.into_iter().collect(),
            self.requests.into_iter().collect(),
        );
        (vault, queue)
    }
}

/// Digest over the payload with the `digest` field blanked.
///
/// Serialized through `serde_json::Value`, whose object keys are sorted,
/// so the digest is independent of the writer's field order and stable
/// across additive schema versions.
fn digest_of(value: &serde_json::Value) -> Result<String> {
    let mut canonical = value.clone();
    let Some(fields) = canonical.as_object_mut() else {
        return Err(OpenmintError::Serialization(
            "snapshot payload is not a JSON object".to_string(),
        ));
    };
    fields.insert("digest".to_string(), serde_json::Value::String(String::new()));
    let encoded = serde_json::to_string(&canonical)?;
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
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
        // v0 predates the direct-exit exemption list.
        fields
            .entry("direct_exits")
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
    use openmint_ledger::{RoleRegistry, TokenLedger};
    use openmint_types::{RequestId, Role};

    struct Captured {
        snapshot: VaultSnapshot,
        owner: AccountId,
        request: RequestId,
    }

    /// Deposit, withdraw into the queue, capture.
    fn captured() -> Captured {
        let now = Utc::now();
        let admin = AccountId::random();
        let mut roles = RoleRegistry::new(admin);
        roles
            .grant(admin, Role::BlacklistOperator, admin, now)
            .unwrap();

        let mut vault = Vault::new(VaultConfig::default(), AccountId::random()).unwrap();
        let mut queue = WithdrawalQueue::new(86_400).unwrap();
        queue.authorize_vault(&roles, admin, vault.account()).unwrap();

        let mut ledger = TokenLedger::new();
        let owner = AccountId::random();
        ledger.mint(owner, Decimal::new(1_000, 0)).unwrap();
        vault
            .deposit(&mut ledger, owner, Decimal::new(1_000, 0), owner, now)
            .unwrap();
        let outcome = vault
            .withdraw(
                &mut ledger,
                &mut queue,
                owner,
                Decimal::new(400, 0),
                owner,
                owner,
                now,
            )
            .unwrap();
        vault
            .add_to_blacklist(&roles, admin, AccountId::random(), now)
            .unwrap();

        Captured {
            snapshot: VaultSnapshot::capture(&vault, &queue, now).unwrap(),
            owner,
            request: match outcome {
                crate::vault::WithdrawOutcome::Queued { request, .. } => request,
                crate::vault::WithdrawOutcome::Settled { .. } => unreachable!(),
            },
        }
    }

    #[test]
    fn roundtrip_preserves_money_state() {
        let c = captured();
        let json = c.snapshot.to_json().unwrap();
        let (vault, queue) = VaultSnapshot::from_json(&json).unwrap().restore();

        assert_eq!(vault.total_shares(), Decimal::new(600, 0));
        assert_eq!(vault.total_assets(), Decimal::new(600, 0));
        assert_eq!(vault.share_balance_of(c.owner), Decimal::new(600, 0));
        vault.verify_share_supply().unwrap();

        let request = queue.request(c.owner, c.request).unwrap();
        assert_eq!(request.asset_amount, Decimal::new(400, 0));
        assert!(!request.claimed);
        assert!(queue.is_authorized(vault.account()));
    }

    #[test]
    fn restored_queue_continues_id_sequence() {
        let c = captured();
        let json = c.snapshot.to_json().unwrap();
        let (vault, mut queue) = VaultSnapshot::from_json(&json).unwrap().restore();

        let next = queue
            .create_request(
                vault.account(),
                c.owner,
                c.owner,
                Decimal::new(10, 0),
                Decimal::new(10, 0),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(next, c.request.next());
    }

    #[test]
    fn tampered_payload_rejected() {
        let c = captured();
        let mut value: serde_json::Value =
            serde_json::from_str(&c.snapshot.to_json().unwrap()).unwrap();
        // An attacker quietly doubles their payout.
        value["total_assets"] = serde_json::Value::String("1200".to_string());

        let err = VaultSnapshot::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, OpenmintError::StateDigestMismatch));
    }

    #[test]
    fn v0_payload_migrates_to_empty_direct_exits() {
        let c = captured();
        let mut value: serde_json::Value =
            serde_json::from_str(&c.snapshot.to_json().unwrap()).unwrap();
        let fields = value.as_object_mut().unwrap();
        fields.remove("direct_exits");
        fields.insert("schema_version".to_string(), serde_json::Value::from(0u32));
        // A v0 writer sealed the v0 shape.
        let digest = digest_of(&value).unwrap();
        value["digest"] = serde_json::Value::String(digest);

        let migrated = VaultSnapshot::from_json(&value.to_string()).unwrap();
        assert_eq!(migrated.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(migrated.direct_exits.is_empty());
        let (vault, _) = migrated.restore();
        assert_eq!(vault.share_balance_of(c.owner), Decimal::new(600, 0));
    }

    #[test]
    fn future_schema_rejected() {
        let c = captured();
        let mut value: serde_json::Value =
            serde_json::from_str(&c.snapshot.to_json().unwrap()).unwrap();
        value["schema_version"] = serde_json::Value::from(99u32);
        let digest = digest_of(&value).unwrap();
        value["digest"] = serde_json::Value::String(digest);

        let err = VaultSnapshot::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            OpenmintError::SchemaVersionMismatch { actual: 99, .. }
        ));
    }

    #[test]
    fn non_object_payload_rejected() {
        let err = VaultSnapshot::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, OpenmintError::Serialization(_)));
    }
}
