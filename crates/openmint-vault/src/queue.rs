//! Time-delayed withdrawal queue.
//!
//! The vault burns shares and enqueues a request here instead of paying
//! out immediately. The queue snapshots the owed amount at creation, so
//! the eventual payout is exactly what the shares were worth when the
//! owner demanded the exit, no matter what rebases happen in between.
//!
//! Only authorized vault accounts may enqueue. Only the request owner
//! may claim, and only after the delay.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use openmint_ledger::{RoleRegistry, TokenLedger};
use openmint_types::{
    AccountId, EventRecord, OpenmintError, ProtocolEvent, RequestId, Result, Role,
    WithdrawalRequest,
};
use rust_decimal::Decimal;

/// Holds pending exits until their delay elapses.
#[derive(Debug)]
pub struct WithdrawalQueue {
    /// Seconds between request creation and claimability. Never zero.
    delay_secs: u64,
    /// Vault accounts allowed to enqueue requests.
    authorized_vaults: HashSet<AccountId>,
    /// All requests per owner, in creation order.
    requests: HashMap<AccountId, Vec<WithdrawalRequest>>,
    /// Next request id per owner.
    next_ids: HashMap<AccountId, RequestId>,
    events: Vec<EventRecord>,
}

impl WithdrawalQueue {
    /// Create a queue with the given claim delay.
    ///
    /// # Errors
    /// Returns `CannotSetZero` for a zero delay: an instantly claimable
    /// queue defeats its purpose.
    pub fn new(delay_secs: u64) -> Result<Self> {
        if delay_secs == 0 {
            return Err(OpenmintError::CannotSetZero);
        }
        Ok(Self {
            delay_secs,
            authorized_vaults: HashSet::new(),
            requests: HashMap::new(),
            next_ids: HashMap::new(),
            events: Vec::new(),
        })
    }

    /// Permit a vault account to enqueue requests. Idempotent.
    ///
    /// # Errors
    /// Returns `MissingRole` without Admin, `ZeroAccount` for the zero
    /// account.
    pub fn authorize_vault(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        vault: AccountId,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if vault.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if self.authorized_vaults.insert(vault) {
            tracing::info!(vault = %vault, "Vault authorized for withdrawal queue");
        }
        Ok(())
    }

    /// Whether a vault account may enqueue requests.
    #[must_use]
    pub fn is_authorized(&self, vault: AccountId) -> bool {
        self.authorized_vaults.contains(&vault)
    }

    /// Enqueue a withdrawal on behalf of a vault, snapshotting the owed
    /// amount. Returns the per-owner request id.
    ///
    /// # Errors
    /// Returns `VaultNotAuthorized` if the vault account is not
    /// authorized.
    pub fn create_request(
        &mut self,
        vault: AccountId,
        owner: AccountId,
        beneficiary: AccountId,
        asset_amount: Decimal,
        share_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<RequestId> {
        if !self.authorized_vaults.contains(&vault) {
            return Err(OpenmintError::VaultNotAuthorized(vault));
        }

        let id = *self.next_ids.entry(owner).or_insert(RequestId(0));
        self.next_ids.insert(owner, id.next());
        self.requests.entry(owner).or_default().push(WithdrawalRequest {
            id,
            vault,
            owner,
            beneficiary,
            asset_amount,
            share_amount,
            created_at: now,
            claimed: false,
        });

        tracing::info!(
            owner = %owner,
            request = %id,
            assets = %asset_amount,
            shares = %share_amount,
            "Withdrawal request created"
        );
        Ok(id)
    }

    /// Pay out a matured request to its beneficiary.
    ///
    /// The amount paid is exactly what was snapshotted at creation.
    ///
    /// # Errors
    /// Returns `UnauthorizedClaimant` when the caller is not the owner,
    /// `UnknownRequest` for an id the owner never created,
    /// `AlreadyClaimed` on a second claim, and
    /// `WithdrawPeriodNotElapsed` before the delay runs out.
    pub fn claim(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        owner: AccountId,
        request_id: RequestId,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if caller != owner {
            return Err(OpenmintError::UnauthorizedClaimant);
        }
        let delay_secs = self.delay_secs;
        let request = self
            .requests
            .get_mut(&owner)
            .and_then(|list| list.iter_mut().find(|r| r.id == request_id))
            .ok_or(OpenmintError::UnknownRequest(request_id))?;

        if request.claimed {
            return Err(OpenmintError::AlreadyClaimed(request_id));
        }
        if !request.is_claimable(now, delay_secs) {
            return Err(OpenmintError::WithdrawPeriodNotElapsed);
        }

        // Probe the vault's holdings so the transfer below cannot fail.
        let held = ledger.balance_of(request.vault);
        if held < request.asset_amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: request.asset_amount,
                available: held,
            });
        }

        request.claimed = true;
        let vault = request.vault;
        let beneficiary = request.beneficiary;
        let amount = request.asset_amount;
        ledger.transfer(vault, beneficiary, amount)?;

        tracing::info!(
            owner = %owner,
            request = %request_id,
            assets = %amount,
            "Withdrawal claimed"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::WithdrawClaimed {
                owner,
                request: request_id,
                assets: amount,
            },
            now,
        ));
        Ok(amount)
    }

    /// Change the claim delay. Applies to pending and future requests.
    ///
    /// # Errors
    /// Returns `MissingRole` without Admin, `CannotSetZero` for zero.
    pub fn set_delay(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        delay_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if delay_secs == 0 {
            return Err(OpenmintError::CannotSetZero);
        }
        self.delay_secs = delay_secs;
        self.events.push(EventRecord::new(
            ProtocolEvent::WithdrawalDelayChanged { delay_secs },
            now,
        ));
        Ok(())
    }

    #[must_use]
    pub fn delay_secs(&self) -> u64 {
        self.delay_secs
    }

    /// All requests an owner has created, in creation order.
    #[must_use]
    pub fn requests_of(&self, owner: AccountId) -> &[WithdrawalRequest] {
        self.requests.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Look up one request.
    ///
    /// # Errors
    /// Returns `UnknownRequest` if the owner never created this id.
    pub fn request(&self, owner: AccountId, request_id: RequestId) -> Result<&WithdrawalRequest> {
        self.requests
            .get(&owner)
            .and_then(|list| list.iter().find(|r| r.id == request_id))
            .ok_or(OpenmintError::UnknownRequest(request_id))
    }

    /// Recorded claims and configuration changes, oldest first.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub(crate) fn snapshot_parts(
        &self,
    ) -> (u64, &HashSet<AccountId>, &HashMap<AccountId, Vec<WithdrawalRequest>>) {
        (self.delay_secs, &self.authorized_vaults, &self.requests)
    }

    pub(crate) fn from_snapshot_parts(
        delay_secs: u64,
        authorized_vaults: HashSet<AccountId>,
        requests: HashMap<AccountId, Vec<WithdrawalRequest>>,
    ) -> Self {
        let next_ids = requests
            .iter()
            .map(|(owner, list)| {
                let next = list.iter().map(|r| r.id.next()).max().unwrap_or(RequestId(0));
                (*owner, next)
            })
            .collect();
        Self {
            delay_secs,
            authorized_vaults,
            requests,
            next_ids,
            events: Vec::new(),
        }
    }
}
