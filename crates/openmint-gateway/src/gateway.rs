//! Order Gateway: the hard gate for all mint and redeem settlement.
//!
//! Every order passes the full validation pipeline before any balance
//! moves. The body of each entry point is two-phase: validate everything
//! and probe every balance first, then commit internal accounting (nonce,
//! rate window) and issue ledger effects. Under host-serialized execution
//! a call therefore either completes in full or changes nothing.
//!
//! ## Admission Pipeline
//!
//! ```text
//! caller role → shape → expiry → signature → allow-list → collateral
//!   → ratio guard → balance probes → nonce → rate window → settle
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openmint_ledger::{AllowList, AssetBook, RoleRegistry, TokenLedger};
use openmint_types::constants::PEG_SCALE_BPS;
use openmint_types::{
    AccountId, EventRecord, GatewayConfig, OpenmintError, OracleConfig, Order, OrderDirection,
    PeriodKey, ProtocolEvent, Result, Role,
};
use rust_decimal::Decimal;

use crate::oracle::PriceOracle;
use crate::rate_limit::RateLimitWindow;
use crate::registry::CollateralRegistry;
use crate::nonces::UsedNonceSet;

/// Validates and settles signed orders against the token ledger and
/// collateral custody book.
pub struct OrderGateway {
    config: GatewayConfig,
    oracle_config: OracleConfig,
    /// Admission allow-list for order subjects.
    subjects: AllowList,
    /// Accepted collateral assets.
    registry: CollateralRegistry,
    /// Consumed (subject, nonce) pairs.
    nonces: UsedNonceSet,
    /// Mint volume cap per period.
    mint_window: RateLimitWindow,
    /// Redeem volume cap per period, shared by both redemption paths.
    redeem_window: RateLimitWindow,
    /// Destination for collateral pulled in by mint orders.
    custodian: AccountId,
    /// Source of collateral for oracle-priced redemptions.
    treasury: AccountId,
    /// Delegated verifying keys for subjects that cannot sign themselves.
    delegated_signers: HashMap<AccountId, [u8; 32]>,
    /// Append-only log of settlements and administrative changes.
    events: Vec<EventRecord>,
}

impl OrderGateway {
    /// Create a gateway with the given destinations.
    ///
    /// # Errors
    /// Returns `ZeroAccount` if the custodian or treasury is the zero
    /// account.
    pub fn new(
        config: GatewayConfig,
        oracle_config: OracleConfig,
        custodian: AccountId,
        treasury: AccountId,
    ) -> Result<Self> {
        if custodian.is_zero() || treasury.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        let mint_window = RateLimitWindow::new(config.mint_capacity);
        let redeem_window = RateLimitWindow::new(config.redeem_capacity);
        Ok(Self {
            config,
            oracle_config,
            subjects: AllowList::new(),
            registry: CollateralRegistry::new(),
            nonces: UsedNonceSet::new(),
            mint_window,
            redeem_window,
            custodian,
            treasury,
            delegated_signers: HashMap::new(),
            events: Vec::new(),
        })
    }

    /// Settle a signed mint order: pull collateral from the subject to
    /// the custodian and mint protocol tokens to the subject.
    ///
    /// # Errors
    /// Any failed pipeline step aborts the call with nothing committed.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_mint_order(
        &mut self,
        roles: &RoleRegistry,
        ledger: &mut TokenLedger,
        assets: &mut AssetBook,
        caller: AccountId,
        order: &Order,
        signature: &[u8],
        now: DateTime<Utc>,
        period: PeriodKey,
    ) -> Result<()> {
        // 1. Only issuers may submit mint orders.
        roles.check(Role::Issuer, caller)?;
        if order.direction != OrderDirection::Mint {
            return Err(OpenmintError::InvalidOrder {
                reason: format!("expected MINT order, got {}", order.direction),
            });
        }

        // 2. Shared shape, expiry, signature, and admission checks.
        self.validate_common(order, signature, now)?;

        // 3. Deviation guard, unless the subject is itself an issuer.
        if !roles.has_role(Role::Issuer, order.subject) {
            self.check_ratio(order)?;
        }

        // 4. Probe the collateral pull so nothing below can fail.
        let held = assets.balance_of(&order.collateral, order.subject);
        if held < order.counter_amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: order.counter_amount,
                available: held,
            });
        }

        // 5. Commit internal accounting: rate window, then nonce.
        self.mint_window.charge(period, order.token_amount)?;
        self.nonces.consume(order.subject, order.nonce)?;

        // 6. Effects: collateral to custody, tokens to the subject.
        assets.transfer(
            &order.collateral,
            order.subject,
            self.custodian,
            order.counter_amount,
        )?;
        ledger.mint(order.subject, order.token_amount)?;

        tracing::info!(
            subject = %order.subject,
            collateral = %order.collateral,
            counter = %order.counter_amount,
            token = %order.token_amount,
            nonce = %order.nonce,
            "Mint order settled"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::MintSettled {
                subject: order.subject,
                collateral: order.collateral.clone(),
                counter_amount: order.counter_amount,
                token_amount: order.token_amount,
                nonce: order.nonce,
            },
            now,
        ));
        Ok(())
    }

    /// Settle a signed redeem order: burn the subject's protocol tokens
    /// and release collateral from the custodian to the subject.
    ///
    /// # Errors
    /// Any failed pipeline step aborts the call with nothing committed.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_redeem_order(
        &mut self,
        roles: &RoleRegistry,
        ledger: &mut TokenLedger,
        assets: &mut AssetBook,
        caller: AccountId,
        order: &Order,
        signature: &[u8],
        now: DateTime<Utc>,
        period: PeriodKey,
    ) -> Result<()> {
        // 1. Only burners may submit redeem orders.
        roles.check(Role::Burner, caller)?;
        if order.direction != OrderDirection::Redeem {
            return Err(OpenmintError::InvalidOrder {
                reason: format!("expected REDEEM order, got {}", order.direction),
            });
        }

        // 2. A zero collateral leg is an issuer-only exception path.
        if order.counter_amount.is_zero() && !roles.has_role(Role::Issuer, order.subject) {
            return Err(OpenmintError::InvalidOrder {
                reason: "zero counter amount requires an issuer subject".to_string(),
            });
        }

        // 3. Shared shape, expiry, signature, and admission checks.
        self.validate_common(order, signature, now)?;

        // 4. Probe the burn and the collateral release.
        let held = ledger.balance_of(order.subject);
        if held < order.token_amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: order.token_amount,
                available: held,
            });
        }
        let custody = assets.balance_of(&order.collateral, self.custodian);
        if custody < order.counter_amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: order.counter_amount,
                available: custody,
            });
        }

        // 5. Commit internal accounting: rate window, then nonce.
        self.redeem_window.charge(period, order.token_amount)?;
        self.nonces.consume(order.subject, order.nonce)?;

        // 6. Effects: burn first, then release collateral.
        ledger.burn(order.subject, order.token_amount)?;
        assets.transfer(
            &order.collateral,
            self.custodian,
            order.subject,
            order.counter_amount,
        )?;

        tracing::info!(
            subject = %order.subject,
            collateral = %order.collateral,
            counter = %order.counter_amount,
            token = %order.token_amount,
            nonce = %order.nonce,
            "Redeem order settled"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::RedeemSettled {
                subject: order.subject,
                collateral: order.collateral.clone(),
                counter_amount: order.counter_amount,
                token_amount: order.token_amount,
                nonce: order.nonce,
            },
            now,
        ));
        Ok(())
    }

    /// Redeem protocol tokens directly against the treasury at the
    /// oracle price, floored at the peg and reduced by the configured
    /// peg percentage. Returns the collateral amount paid out.
    ///
    /// Called by the token holder; consumes no order nonce. Shares the
    /// redeem rate window with signed redeem orders.
    ///
    /// # Errors
    /// Any failed pipeline step aborts the call with nothing committed.
    #[allow(clippy::too_many_arguments)]
    pub fn redeem_with_oracle(
        &mut self,
        ledger: &mut TokenLedger,
        assets: &mut AssetBook,
        oracle: &dyn PriceOracle,
        subject: AccountId,
        collateral: &str,
        token_amount: Decimal,
        now: DateTime<Utc>,
        period: PeriodKey,
    ) -> Result<Decimal> {
        // 1. Shape and admission.
        if token_amount <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if subject.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if self.config.allowlist_enabled && !self.subjects.contains(subject) {
            return Err(OpenmintError::NotAllowListed(subject));
        }
        let meta = self.registry.meta(collateral)?;

        // 2. Price: must exist, must be fresh, never below the peg.
        let point = oracle
            .get_price(collateral)
            .ok_or_else(|| OpenmintError::MissingPrice(collateral.to_string()))?;
        let age_secs = (now - point.updated_at).num_seconds();
        if age_secs > self.oracle_config.staleness_threshold_secs {
            return Err(OpenmintError::StalePrice {
                age_secs,
                max_secs: self.oracle_config.staleness_threshold_secs,
            });
        }
        let effective_price = point.price.max(self.oracle_config.peg_price);

        // 3. Payout: haircut by peg percentage, floor to native precision.
        let haircut = Decimal::from(self.oracle_config.peg_percentage_bps)
            / Decimal::from(PEG_SCALE_BPS);
        let owed = meta.quantize_down(token_amount * haircut / effective_price);

        // 4. Probe the burn and the treasury release.
        let held = ledger.balance_of(subject);
        if held < token_amount {
            return Err(OpenmintError::InsufficientBalance {
                needed: token_amount,
                available: held,
            });
        }
        let reserve = assets.balance_of(collateral, self.treasury);
        if reserve < owed {
            return Err(OpenmintError::InsufficientTreasury {
                needed: owed,
                available: reserve,
            });
        }

        // 5. Commit: rate window, then effects.
        self.redeem_window.charge(period, token_amount)?;
        ledger.burn(subject, token_amount)?;
        assets.transfer(collateral, self.treasury, subject, owed)?;

        tracing::info!(
            subject = %subject,
            collateral,
            token = %token_amount,
            paid = %owed,
            price = %effective_price,
            "Oracle redemption settled"
        );
        self.events.push(EventRecord::new(
            ProtocolEvent::OracleRedeemSettled {
                subject,
                collateral: collateral.to_string(),
                token_amount,
                collateral_amount: owed,
                price: effective_price,
            },
            now,
        ));
        Ok(owed)
    }

    /// Checks shared by both signed-order paths. Pure: commits nothing.
    fn validate_common(
        &self,
        order: &Order,
        signature: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if order.token_amount <= Decimal::ZERO {
            return Err(OpenmintError::ZeroAmount);
        }
        if order.counter_amount.is_sign_negative() {
            return Err(OpenmintError::InvalidOrder {
                reason: "counter amount must not be negative".to_string(),
            });
        }
        if order.subject.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if order.message.len() > self.config.max_message_len {
            return Err(OpenmintError::InvalidOrder {
                reason: format!(
                    "message exceeds {} bytes",
                    self.config.max_message_len
                ),
            });
        }
        if order.is_expired(now) {
            return Err(OpenmintError::OrderExpired);
        }

        // Delegated key if one is registered, else the subject's own key.
        let key_bytes = self
            .delegated_signers
            .get(&order.subject)
            .copied()
            .unwrap_or_else(|| *order.subject.as_bytes());
        order.verify_signature(&key_bytes, signature)?;

        if self.config.allowlist_enabled && !self.subjects.contains(order.subject) {
            return Err(OpenmintError::NotAllowListed(order.subject));
        }
        if !self.registry.contains(&order.collateral) {
            return Err(OpenmintError::UnknownCollateral(order.collateral.clone()));
        }
        if self.nonces.is_used(order.subject, order.nonce) {
            return Err(OpenmintError::ReplayedOrder {
                subject: order.subject,
                nonce: order.nonce,
            });
        }
        Ok(())
    }

    /// Mint orders must keep collateral and token legs within tolerance.
    fn check_ratio(&self, order: &Order) -> Result<()> {
        let tolerance = order.counter_amount * Decimal::from(self.config.ratio_tolerance_bps)
            / Decimal::from(PEG_SCALE_BPS);
        let deviation = (order.token_amount - order.counter_amount).abs();
        if deviation > tolerance {
            return Err(OpenmintError::RatioMismatch {
                counter_amount: order.counter_amount,
                token_amount: order.token_amount,
            });
        }
        Ok(())
    }

    // --- Administrative operations -------------------------------------

    /// Admit an account as an order subject.
    ///
    /// # Errors
    /// `MissingRole` without the allow-list operator role;
    /// `AlreadyAllowListed` if present.
    pub fn allow_subject(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::AllowListOperator, caller)?;
        self.subjects.add(account)?;
        self.events.push(EventRecord::new(
            ProtocolEvent::SubjectAllowed { account },
            now,
        ));
        Ok(())
    }

    /// Remove an account from the subject allow-list.
    ///
    /// # Errors
    /// `MissingRole` without the allow-list operator role;
    /// `AllowListEntryMissing` if absent.
    pub fn disallow_subject(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::AllowListOperator, caller)?;
        self.subjects.remove(account)?;
        self.events.push(EventRecord::new(
            ProtocolEvent::SubjectDisallowed { account },
            now,
        ));
        Ok(())
    }

    /// Register a collateral asset.
    ///
    /// # Errors
    /// `MissingRole` without Admin; `CollateralAlreadyRegistered` if present.
    pub fn add_collateral(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        collateral: &str,
        decimals: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        self.registry.add(collateral, decimals, now)?;
        self.events.push(EventRecord::new(
            ProtocolEvent::CollateralRegistered {
                collateral: collateral.to_string(),
            },
            now,
        ));
        Ok(())
    }

    /// Remove a collateral asset.
    ///
    /// # Errors
    /// `MissingRole` without Admin; `UnknownCollateral` if absent.
    pub fn remove_collateral(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        collateral: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        self.registry.remove(collateral)?;
        self.events.push(EventRecord::new(
            ProtocolEvent::CollateralRemoved {
                collateral: collateral.to_string(),
            },
            now,
        ));
        Ok(())
    }

    /// Replace the per-period mint capacity.
    ///
    /// # Errors
    /// `MissingRole` without Admin.
    pub fn set_mint_capacity(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        capacity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        self.config.mint_capacity = capacity;
        self.mint_window.set_capacity(capacity);
        self.events.push(EventRecord::new(
            ProtocolEvent::CapacityChanged {
                direction: OrderDirection::Mint,
                capacity,
            },
            now,
        ));
        Ok(())
    }

    /// Replace the per-period redeem capacity.
    ///
    /// # Errors
    /// `MissingRole` without Admin.
    pub fn set_redeem_capacity(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        capacity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        self.config.redeem_capacity = capacity;
        self.redeem_window.set_capacity(capacity);
        self.events.push(EventRecord::new(
            ProtocolEvent::CapacityChanged {
                direction: OrderDirection::Redeem,
                capacity,
            },
            now,
        ));
        Ok(())
    }

    /// Replace the collateral custody destination.
    ///
    /// # Errors
    /// `MissingRole` without Admin; `ZeroAccount` for the zero account.
    pub fn set_custodian(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.custodian = account;
        self.events.push(EventRecord::new(
            ProtocolEvent::CustodianChanged { account },
            now,
        ));
        Ok(())
    }

    /// Replace the treasury account.
    ///
    /// # Errors
    /// `MissingRole` without Admin; `ZeroAccount` for the zero account.
    pub fn set_treasury(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.treasury = account;
        self.events.push(EventRecord::new(
            ProtocolEvent::TreasuryChanged { account },
            now,
        ));
        Ok(())
    }

    /// Set the fraction of face value paid on oracle redemptions.
    ///
    /// # Errors
    /// `MissingRole` without Accountant; `InvalidPegPercentage` above
    /// 10000 bps.
    pub fn set_peg_percentage(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        bps: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Accountant, caller)?;
        if bps > PEG_SCALE_BPS {
            return Err(OpenmintError::InvalidPegPercentage(bps));
        }
        self.oracle_config.peg_percentage_bps = bps;
        self.events.push(EventRecord::new(
            ProtocolEvent::PegPercentageChanged { bps },
            now,
        ));
        Ok(())
    }

    /// Register a delegated verifying key for a subject.
    ///
    /// # Errors
    /// `MissingRole` without Admin; `ZeroAccount` for the zero account.
    pub fn register_signer(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        key_bytes: [u8; 32],
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        self.delegated_signers.insert(account, key_bytes);
        self.events.push(EventRecord::new(
            ProtocolEvent::SignerRegistered { account },
            now,
        ));
        Ok(())
    }

    /// Remove a subject's delegated verifying key. Idempotent.
    ///
    /// # Errors
    /// `MissingRole` without Admin.
    pub fn remove_signer(
        &mut self,
        roles: &RoleRegistry,
        caller: AccountId,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        roles.check(Role::Admin, caller)?;
        if self.delegated_signers.remove(&account).is_some() {
            self.events.push(EventRecord::new(
                ProtocolEvent::SignerRemoved { account },
                now,
            ));
        }
        Ok(())
    }

    // --- Accessors ------------------------------------------------------

    #[must_use]
    pub fn custodian(&self) -> AccountId {
        self.custodian
    }

    #[must_use]
    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn oracle_config(&self) -> &OracleConfig {
        &self.oracle_config
    }

    /// Whether an account may currently be an order subject.
    #[must_use]
    pub fn is_subject_allowed(&self, account: AccountId) -> bool {
        !self.config.allowlist_enabled || self.subjects.contains(account)
    }

    /// Whether a subject already consumed a nonce.
    #[must_use]
    pub fn is_nonce_used(&self, subject: AccountId, nonce: openmint_types::OrderNonce) -> bool {
        self.nonces.is_used(subject, nonce)
    }

    /// Mint volume still admissible in the observed period.
    #[must_use]
    pub fn remaining_mint_capacity(&self, period: PeriodKey) -> Decimal {
        self.mint_window.remaining(period)
    }

    /// Redeem volume still admissible in the observed period.
    #[must_use]
    pub fn remaining_redeem_capacity(&self, period: PeriodKey) -> Decimal {
        self.redeem_window.remaining(period)
    }

    #[must_use]
    pub fn collaterals(&self) -> &CollateralRegistry {
        &self.registry
    }

    /// Recorded settlements and administrative changes, oldest first.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub(crate) fn snapshot_parts(
        &self,
    ) -> (
        &GatewayConfig,
        &OracleConfig,
        &AllowList,
        &CollateralRegistry,
        &UsedNonceSet,
        &RateLimitWindow,
        &RateLimitWindow,
        AccountId,
        AccountId,
        &HashMap<AccountId, [u8; 32]>,
    ) {
        (
            &self.config,
            &self.oracle_config,
            &self.subjects,
            &self.registry,
            &self.nonces,
            &self.mint_window,
            &self.redeem_window,
            self.custodian,
            self.treasury,
            &self.delegated_signers,
        )
    }

    pub(crate) fn from_snapshot_parts(
        config: GatewayConfig,
        oracle_config: OracleConfig,
        subjects: AllowList,
        registry: CollateralRegistry,
        nonces: UsedNonceSet,
        mint_window: RateLimitWindow,
        redeem_window: RateLimitWindow,
        custodian: AccountId,
        treasury: AccountId,
        delegated_signers: HashMap<AccountId, [u8; 32]>,
    ) -> Self {
        Self {
            config,
            oracle_config,
            subjects,
            registry,
            nonces,
            mint_window,
            redeem_window,
            custodian,
            treasury,
            delegated_signers,
            events: Vec::new(),
        }
    }
}
