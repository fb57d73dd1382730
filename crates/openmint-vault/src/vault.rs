//! Rebasing vault: share-based accounting over the protocol token.
//!
//! Depositors lock tokens and receive receipt shares priced at
//! `total_assets / total_shares`. A rebase adds assets without minting
//! shares, so the price only ever rises. Exits burn shares and, for
//! ordinary owners, enqueue a time-delayed [`WithdrawalQueue`] request
//! whose payout is snapshotted at burn time.
//!
//! Every entry point follows the same two-phase shape as the gateway:
//! validate and probe first, commit share accounting, then issue the
//! single ledger transfer. Share and asset totals are read and written
//! inside the same call, never cached across calls.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use openmint_ledger::{AllowList, AssetBook, RoleRegistry, TokenLedger};
use openmint_types::{
    AccountId, EventRecord, OpenmintError, Permit, ProtocolEvent, RequestId, Result, Role,
    VaultConfig,
};
use rust_decimal::Decimal;

use crate::math;
use crate::queue::WithdrawalQueue;

/// How an exit settled: immediately, or through the delayed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    /// The owner is on the direct-exit list; assets were paid at once.
    Settled { assets: Decimal, shares: Decimal },
    /// A queue request was created; the owner claims after the delay.
    Queued {
        request: RequestId,
        assets: Decimal,
        shares: Decimal,
    },
}

impl WithdrawOutcome {
    /// Assets owed by this exit, regardless of path.
    #[must_use]
    pub fn assets(&self) -> Decimal {
        match self {
            Self::Settled { assets, .. } | Self::Queued { assets, .. } => *assets,
        }
    }

    /// Shares burned by this exit.
    #[must_use]
    pub fn shares(&self) -> Decimal {
        match self {
            Self::Settled { shares, .. } | Self::Queued { shares, .. } => *shares,
        }
    }
}

/// Share ledger and conversion engine for the rebasing vault.
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    /// Ledger account custodying deposited tokens until claim or payout.
    account: AccountId,
    /// Receipt share balances.
    shares: HashMap<AccountId, Decimal>,
    /// (owner, spender) share allowances for delegated exits.
    share_allowances: HashMap<(AccountId, AccountId), Decimal>,
    /// Sum of all share balances. Invariant checked by
    /// [`Vault::verify_share_supply`].
    total_shares: Decimal,
    /// Assets backing the shares. Grows on deposit and rebase, shrinks
    /// when an exit burns shares.
    total_assets: Decimal,
    /// Accounts barred from every share operation.
    blacklist: HashSet<AccountId>,
    /// Owners whose exits bypass the withdrawal queue.
    direct_exits: AllowList,
    events: Vec<EventRecord>,
}

impl Vault {
    /// Create a vault custodying funds under `account`.
    ///
    /// # Errors
    /// Returns `ZeroAccount` for the zero account, `CannotSetZero` if the
    /// configured withdrawal delay is zero.
    pub fn new(config: VaultConfig, account: AccountId) -> Result<Self> {
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if config.withdrawal_delay_secs == 0 {
            return Err(OpenmintError::CannotSetZero);
        }
        Ok(Self {
            config,
            account,
            shares: HashMap::new(),
            share_allowances: HashMap::new(),
            total_shares: Decimal::ZERO,
            total_assets: Decimal::ZERO,
            blacklist: HashSet::new(),
            direct_exits: AllowList::new(),
            events: Vec::new(),
        })
    }

    // --- Conversion views -----------------------------------------------

    /// Shares a deposit of `assets` would mint right now.
    #[must_use]
    pub fn convert_to_shares(&self, assets: Decimal) -> Decimal {
        math::shares_for_deposit(assets, self.total_assets, self.total_shares)
    }

    /// Assets a redemption of `shares` would release right now.
    #[must_use]
    pub fn convert_to_assets(&self, shares: Decimal) -> Decimal {
        math::assets_for_redeem(shares, self.total_assets, self.total_shares)
    }

    /// Alias of [`Vault::convert_to_shares`] for the deposit path.
    #[must_use]
    pub fn preview_deposit(&self, assets: Decimal) -> Decimal {
        self.convert_to_shares(assets)
    }

    /// Assets a mint of exactly `shares` would pull right now.
    #[must_use]
    pub fn preview_mint(&self, shares: Decimal) -> Decimal {
        math::assets_for_mint(shares, self.total_assets, self.total_shares)
    }

    /// Shares a withdrawal of exactly `assets` would burn right now.
    #[must_use]
    pub fn preview_withdraw(&self, assets: Decimal) -> Decimal {
        math::shares_for_withdraw(assets, self.total_assets, self.total_shares)
    }

    /// Alias of [`Vault::convert_to_assets`] for the redeem path.
    #[must_use]
    pub fn preview_redeem(&self, shares: Decimal) -> Decimal {
        self.convert_to_assets(shares)
    }

    /// The most assets an owner can currently withdraw.
    #[must_use]
    pub fn max_withdraw(&self, owner: AccountId) -> Decimal {
        self.convert_to_assets(self.share_balance_of(owner))
    }

    /// The most shares an owner can currently redeem.
    #[must_use]
    pub fn max_redeem(&self, owner: AccountId) -> Decimal {
        self.share_balance_of(owner)
    }

    // --- Entries ---------------------------------------------------------

    /// Deposit `assets` of protocol token and mint shares to `receiver`.
    /// Returns the shares minted.
    ///
    /// # Errors
    /// Any failed check aborts the call with nothing committed.
    pub fn deposit(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        assets: Decimal,
        receiver: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        self.enter(ledger, caller, receiver, assets, None, false, now)
    }

    /// Deposit with a slippage bound: fails if the minted shares fall
    /// below `min_shares_out`. Protects the caller against a rebase
    /// landing between construction and execution.
    ///
    /// # Errors
    /// `SlippageExceeded` when the bound is violated, plus anything
    /// [`Vault::deposit`] can return.
    pub fn deposit_with_min_shares(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        assets: Decimal,
        receiver: AccountId,
        min_shares_out: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        self.enter(
            ledger,
            caller,
            receiver,
            assets,
            Some(min_shares_out),
            false,
            now,
        )
    }

    /// Deposit on the strength of a signed [`Permit`], with no prior
    /// approval call. The permit's owner funds the deposit; the permit's
    /// spender must be this vault's account.
    ///
    /// # Errors
    /// Permit errors surface unchanged; the deposit itself can fail like
    /// [`Vault::deposit`].
    pub fn deposit_with_permit(
        &mut self,
        ledger: &mut TokenLedger,
        permit: &Permit,
        signature: &[u8],
        receiver: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if permit.spender != self.account {
            return Err(OpenmintError::InvalidPermit {
                reason: "permit spender is not the vault".to_string(),
            });
        }
        // Every deposit-side probe runs before the permit consumes its
        // nonce: a refused deposit must leave the permit replayable and
        // install no allowance.
        if permit.amount <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if self.convert_to_shares(permit.amount).is_zero() {
            return Err(OpenmintError::NoSharesMinted);
        }
        if receiver.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.check_not_blacklisted(permit.owner)?;
        self.check_not_blacklisted(receiver)?;
        let held = ledger.balance_of(permit.owner);
        if held < permit.amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: permit.amount,
                available: held,
            });
        }
        ledger.permit(permit, signature, now)?;
        self.enter(
            ledger,
            permit.owner,
            receiver,
            permit.amount,
            None,
            true,
            now,
        )
    }

    /// Mint exactly `shares` to `receiver`, pulling whatever assets that
    /// costs at the current price (rounded against the caller). Returns
    /// the assets pulled.
    ///
    /// # Errors
    /// Any failed check aborts the call with nothing committed.
    pub fn mint_shares(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        shares: Decimal,
        receiver: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        self.mint_inner(ledger, caller, shares, receiver, None, now)
    }

    /// Mint with a slippage bound: fails if the assets pulled exceed
    /// `max_assets_in`.
    ///
    /// # Errors
    /// `SlippageExceeded` when the bound is violated, plus anything
    /// [`Vault::mint_shares`] can return.
    pub fn mint_shares_with_max_assets(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        shares: Decimal,
        receiver: AccountId,
        max_assets_in: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        self.mint_inner(ledger, caller, shares, receiver, Some(max_assets_in), now)
    }

    fn mint_inner(
        &mut self,
        ledger: &mut TokenLedger,
        caller: AccountId,
        shares: Decimal,
        receiver: AccountId,
        max_assets_in: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if shares <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        let assets = self.preview_mint(shares);
        if let Some(limit) = max_assets_in {
            if assets > limit {
                return Err(OpenmintError::SlippageExceeded {
                    limit,
                    actual: assets,
                });
            }
        }
        self.credit(ledger, caller, receiver, assets, shares, false, now)?;
        Ok(assets)
    }

    /// Shared deposit body: computes shares from assets, then credits.
    #[allow(clippy::too_many_arguments)]
    fn enter(
        &mut self,
        ledger: &mut TokenLedger,
        funder: AccountId,
        receiver: AccountId,
        assets: Decimal,
        min_shares_out: Option<Decimal>,
        via_allowance: bool,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if assets <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        let shares = self.convert_to_shares(assets);
        if shares.is_zero() {
            return Err(OpenmintError::NoSharesMinted);
        }
        if let Some(limit) = min_shares_out {
            if shares < limit {
                return Err(OpenmintError::SlippageExceeded {
                    limit,
                    actual: shares,
                });
            }
        }
        self.credit(ledger, funder, receiver, assets, shares, via_allowance, now)?;
        Ok(shares)
    }

    /// Admission, probes, share mint, and the single token pull.
    #[allow(clippy::too_many_arguments)]
    fn credit(
        &mut self,
        ledger: &mut TokenLedger,
        funder: AccountId,
        receiver: AccountId,
        assets: Decimal,
        shares: Decimal,
        via_allowance: bool,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if receiver.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.check_not_blacklisted(funder)?;
        self.check_not_blacklisted(receiver)?;

        // Probe the pull so nothing after the commit can fail.
        let held = ledger.balance_of(funder);
        if held < assets {
            return Err(OpenmintError::InsufficientBalance {
                needed: assets,
                available: held,
            });
        }
        if via_allowance {
            let allowance = ledger.allowance(funder, self.account);
            if allowance < assets {
                return Err(OpenmintError::InsufficientAllowance {
                    needed: assets,
                    available: allowance,
                });
            }
        }

        // Commit share accounting, then pull the tokens.
        self.total_assets += assets;
        self.total_shares += shares;
        *self.shares.entry(receiver).or_default() += shares;
        if via_allowance {
            ledger.transfer_from(self.account, funder, self.account, assets)?;
        } else {
            ledger.transfer(funder, self.account, assets)?;
        }

        tracing::info!(
            owner = %receiver,
            assets = %assets,
            shares = %shares,
            total_assets = %self.total_assets,
            "Deposit settled"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::Deposited {
                owner: receiver,
                assets,
                shares,
            },
            now,
        ));
        Ok(shares)
    }

    // --- Exits -----------------------------------------------------------

    /// Withdraw exactly `assets`, burning whatever shares that costs
    /// (rounded against the owner). Ordinary owners get a queue request;
    /// direct-exit owners are paid immediately.
    ///
    /// # Errors
    /// Any failed check aborts the call with nothing committed.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        assets: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        self.withdraw_inner(ledger, queue, caller, assets, beneficiary, owner, None, now)
    }

    /// Withdraw with a slippage bound: fails if the burned shares exceed
    /// `max_shares_burned`.
    ///
    /// # Errors
    /// `SlippageExceeded` when the bound is violated, plus anything
    /// [`Vault::withdraw`] can return.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw_with_max_shares(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        assets: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        max_shares_burned: Decimal,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        self.withdraw_inner(
            ledger,
            queue,
            caller,
            assets,
            beneficiary,
            owner,
            Some(max_shares_burned),
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn withdraw_inner(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        assets: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        max_shares_burned: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        if assets <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        let shares = self.preview_withdraw(assets);
        if let Some(limit) = max_shares_burned {
            if shares > limit {
                return Err(OpenmintError::SlippageExceeded {
                    limit,
                    actual: shares,
                });
            }
        }
        if assets > self.max_withdraw(owner) {
            return Err(OpenmintError::ExceededMaxWithdraw {
                requested: assets,
                available: self.max_withdraw(owner),
            });
        }
        self.exit(ledger, queue, caller, owner, beneficiary, assets, shares, now)
    }

    /// Redeem exactly `shares`, releasing their proportional asset value
    /// (rounded against the owner). Ordinary owners get a queue request;
    /// direct-exit owners are paid immediately.
    ///
    /// # Errors
    /// Any failed check aborts the call with nothing committed.
    #[allow(clippy::too_many_arguments)]
    pub fn redeem(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        shares: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        self.redeem_inner(ledger, queue, caller, shares, beneficiary, owner, None, now)
    }

    /// Redeem with a slippage bound: fails if the released assets fall
    /// below `min_assets_out`.
    ///
    /// # Errors
    /// `SlippageExceeded` when the bound is violated, plus anything
    /// [`Vault::redeem`] can return.
    #[allow(clippy::too_many_arguments)]
    pub fn redeem_with_min_assets(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        shares: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        min_assets_out: Decimal,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        self.redeem_inner(
            ledger,
            queue,
            caller,
            shares,
            beneficiary,
            owner,
            Some(min_assets_out),
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn redeem_inner(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        shares: Decimal,
        beneficiary: AccountId,
        owner: AccountId,
        min_assets_out: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        if shares <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if shares > self.share_balance_of(owner) {
            return Err(OpenmintError::ExceededMaxWithdraw {
                requested: shares,
                available: self.share_balance_of(owner),
            });
        }
        let assets = self.convert_to_assets(shares);
        if let Some(limit) = min_assets_out {
            if assets < limit {
                return Err(OpenmintError::SlippageExceeded {
                    limit,
                    actual: assets,
                });
            }
        }
        self.exit(ledger, queue, caller, owner, beneficiary, assets, shares, now)
    }

    /// Shared exit body: admission, allowance, share burn, then either an
    /// immediate payout or a queue request.
    #[allow(clippy::too_many_arguments)]
    fn exit(
        &mut self,
        ledger: &mut TokenLedger,
        queue: &mut WithdrawalQueue,
        caller: AccountId,
        owner: AccountId,
        beneficiary: AccountId,
        assets: Decimal,
        shares: Decimal,
        now: DateTime<Utc>,
    ) -> Result<WithdrawOutcome> {
        if beneficiary.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.check_not_blacklisted(caller)?;
        self.check_not_blacklisted(owner)?;
        self.check_not_blacklisted(beneficiary)?;

        // The rounded-up burn must still fit the owner's balance.
        let held_shares = self.share_balance_of(owner);
        if held_shares < shares {
            return Err(OpenmintError::ExceededMaxWithdraw {
                requested: shares,
                available: held_shares,
            });
        }

        // Delegated exits spend the share allowance.
        if caller != owner {
            let allowance = self.share_allowance(owner, caller);
            if allowance < shares {
                return Err(OpenmintError::InsufficientAllowance {
                    needed: shares,
                    available: allowance,
                });
            }
        }

        let direct = self.direct_exits.contains(owner);
        // Probe whichever settlement leg runs after the burn.
        if direct {
            let held = ledger.balance_of(self.account);
            if held < assets {
                return Err(OpenmintError::InsufficientBalance {
                    needed: assets,
                    available: held,
                });
            }
        } else if !queue.is_authorized(self.account) {
            return Err(OpenmintError::VaultNotAuthorized(self.account));
        }

        // Commit: burn shares, drop backing assets, consume allowance.
        let balance = self.shares.entry(owner).or_default();
        *balance -= shares;
        self.total_shares -= shares;
        self.total_assets -= assets;
        if caller != owner {
            let allowance = self.share_allowance(owner, caller);
            self.share_allowances
                .insert((owner, caller), allowance - shares);
        }

        if direct {
            ledger.transfer(self.account, beneficiary, assets)?;
            tracing::info!(
                owner = %owner,
                beneficiary = %beneficiary,
                assets = %assets,
                shares = %shares,
                "Direct withdrawal settled"
            );
            self.events.push(EventRecord::new(
                ProtocolEvent::WithdrawSettled {
                    owner,
                    beneficiary,
                    assets,
                    shares,
                },
                now,
            ));
            return Ok(WithdrawOutcome::Settled { assets, shares });
        }

        let request =
            queue.create_request(self.account, owner, beneficiary, assets, shares, now)?;
        self.events.push(EventRecord::new(
            ProtocolEvent::WithdrawRequested {
                owner,
                request,
                assets,
                shares,
            },
            now,
        ));
        Ok(WithdrawOutcome::Queued {
            request,
            assets,
            shares,
        })
    }

    // --- Rebase ----------------------------------------------------------

    /// Inject yield: pull `added_assets` from the operator and raise
    /// `total_assets` without minting shares. Share price strictly rises.
    ///
    /// # Errors
    /// `MissingRole` without RebaseOperator, `ZeroAmount` for a
    /// non-positive amount, `NoSharesMinted` with no shares outstanding
    /// (the yield would be unrecoverable), `InsufficientBalance` if the
    /// operator cannot fund it.
    pub fn rebase(
        &mut self,
        roles: &RoleRegistry,
        ledger: &mut TokenLedger,
        caller: AccountId,
        added_assets: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::RebaseOperator, caller)?;
        if added_assets <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if self.total_shares.is_zero() {
            return Err(OpenmintError::NoSharesMinted);
        }
        let held = ledger.balance_of(caller);
        if held < added_assets {
            return Err(OpenmintError::InsufficientBalance {
                needed: added_assets,
                available: held,
            });
        }

        self.total_assets += added_assets;
        ledger.transfer(caller, self.account, added_assets)?;

        tracing::info!(
            operator = %caller,
            delta = %added_assets,
            total_assets = %self.total_assets,
            "Rebase applied"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::Rebased {
                delta: added_assets,
                total_assets: self.total_assets,
            },
            now,
        ));
        Ok(())
    }

    // --- Share transfers -------------------------------------------------

    /// Move shares between holders. Both ends must be clean of the
    /// blacklist.
    ///
    /// # Errors
    /// `Blacklisted`, `ZeroAccount`, `ZeroAmount`, or
    /// `InsufficientBalance`.
    pub fn transfer_shares(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if to.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.check_not_blacklisted(caller)?;
        self.check_not_blacklisted(to)?;

        let balance = self.shares.entry(caller).or_default();
        if *balance < amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        *self.shares.entry(to).or_default() += amount;

        self.events.push(EventRecord::new(
            ProtocolEvent::SharesTransferred {
                from: caller,
                to,
                amount,
            },
            now,
        ));
        Ok(())
    }

    /// Set a spender's share allowance, replacing any previous value.
    ///
    /// # Errors
    /// Returns `ZeroAccount` if the spender is the zero account.
    pub fn approve_shares(
        &mut self,
        caller: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<()> {
        if spender.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.share_allowances.insert((caller, spender), amount);
        Ok(())
    }

    // --- Administrative --------------------------------------------------

    /// Bar an account from every share operation.
    ///
    /// # Errors
    /// `MissingRole` without BlacklistOperator, `ZeroAccount`,
    /// `AlreadyBlacklisted` if present.
    pub fn add_to_blacklist(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::BlacklistOperator, caller)?;
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if !self.blacklist.insert(account) {
            return Err(OpenmintError::AlreadyBlacklisted(account));
        }
        tracing::warn!(account = %account, caller = %caller, "Account blacklisted");
        self.events.push(EventRecord::new(
            ProtocolEvent::AccountBlacklisted { account },
            now,
        ));
        Ok(())
    }

    /// Readmit a blacklisted account.
    ///
    /// # Errors
    /// `MissingRole` without BlacklistOperator, `NotBlacklisted` if
    /// absent.
    pub fn remove_from_blacklist(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::BlacklistOperator, caller)?;
        if !self.blacklist.remove(&account) {
            return Err(OpenmintError::NotBlacklisted(account));
        }
        self.events.push(EventRecord::new(
            ProtocolEvent::AccountUnblacklisted { account },
            now,
        ));
        Ok(())
    }

    /// Exempt an owner from the withdrawal queue.
    ///
    /// # Errors
    /// `MissingRole` without AllowListOperator, plus the allow-list's own
    /// fail-loud errors.
    pub fn allow_direct_exit(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
    ) -> Result<()> {
        roles.check(Role::AllowListOperator, caller)?;
        self.direct_exits.add(account)?;
        tracing::info!(account = %account, "Direct-exit exemption granted");
        Ok(())
    }

    /// Revoke an owner's direct-exit exemption.
    ///
    /// # Errors
    /// `MissingRole` without AllowListOperator,
    /// `AllowListEntryMissing` if absent.
    pub fn disallow_direct_exit(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
    ) -> Result<()> {
        roles.check(Role::AllowListOperator, caller)?;
        self.direct_exits.remove(account)?;
        tracing::info!(account = %account, "Direct-exit exemption revoked");
        Ok(())
    }

    /// Release stray assets from the vault's custody account.
    ///
    /// The vault's receipt and the underlying token are refused: draining
    /// either would mask insolvency.
    ///
    /// # Errors
    /// `MissingRole` without Admin, `RescueDisallowed` for the protected
    /// symbols, `ZeroAccount`, `ZeroAmount`, or `InsufficientBalance`.
    #[allow(clippy::too_many_arguments)]
    pub fn rescue(
        &mut self,
        roles: &RoleRegistry,
        assets: &mut AssetBook,
        caller: AccountId,
        asset: &str,
        to: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if asset == self.config.share_symbol || asset == self.config.underlying_symbol {
            return Err(OpenmintError::RescueDisallowed(asset.to_string()));
        }
        if to.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if amount <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        assets.transfer(asset, self.account, to, amount)?;

        tracing::warn!(asset, to = %to, amount = %amount, "Stray assets rescued");
        self.events.push(EventRecord::new(
            ProtocolEvent::AssetsRescued {
                asset: asset.to_string(),
                to,
                amount,
            },
            now,
        ));
        Ok(())
    }

    /// Assert that the share supply equals the sum of all balances.
    ///
    /// # Errors
    /// Returns `ShareSupplyViolation` on divergence.
    pub fn verify_share_supply(&self) -> Result<()> {
        let summed: Decimal = self.shares.values().copied().sum();
        if summed != self.total_shares {
            return Err(OpenmintError::ShareSupplyViolation {
                reason: format!(
                    "sum of balances {summed} != total shares {}",
                    self.total_shares
                ),
            });
        }
        Ok(())
    }

    // --- Accessors -------------------------------------------------------

    fn check_not_blacklisted(&self, account: AccountId) -> Result<()> {
        if self.blacklist.contains(&account) {
            return Err(OpenmintError::Blacklisted(account));
        }
        Ok(())
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    #[must_use]
    pub fn total_assets(&self) -> Decimal {
        self.total_assets
    }

    #[must_use]
    pub fn total_shares(&self) -> Decimal {
        self.total_shares
    }

    #[must_use]
    pub fn share_balance_of(&self, account: AccountId) -> Decimal {
        self.shares.get(&account).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn share_allowance(&self, owner: AccountId, spender: AccountId) -> Decimal {
        self.share_allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_blacklisted(&self, account: AccountId) -> bool {
        self.blacklist.contains(&account)
    }

    /// Whether an owner's exits bypass the queue.
    #[must_use]
    pub fn exits_directly(&self, account: AccountId) -> bool {
        self.direct_exits.contains(account)
    }

    /// Recorded deposits, exits, rebases, and administrative changes,
    /// oldest first.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    #[allow(clippy::type_complexity)]
    pub(crate) fn snapshot_parts(
        &self,
    ) -> (
        &VaultConfig,
        AccountId,
        Decimal,
        Decimal,
        &HashMap<AccountId, Decimal>,
        &HashMap<(AccountId, AccountId), Decimal>,
        &HashSet<AccountId>,
        &AllowList,
    ) {
        (
            &self.config,
            self.account,
            self.total_shares,
            self.total_assets,
            &self.shares,
            &self.share_allowances,
            &self.blacklist,
            &self.direct_exits,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_snapshot_parts(
        config: VaultConfig,
        account: AccountId,
        total_shares: Decimal,
        total_assets: Decimal,
        shares: HashMap<AccountId, Decimal>,
        share_allowances: HashMap<(AccountId, AccountId), Decimal>,
        blacklist: HashSet<AccountId>,
        direct_exits: AllowList,
    ) -> Self {
        Self {
            config,
            account,
            shares,
            share_allowances,
            total_shares,
            total_assets,
            blacklist,
            direct_exits,
            events: Vec::new(),
        }
    }
}
