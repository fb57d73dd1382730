//! Role-based access control.
//!
//! Every privileged entry point in the gateway and vault names one
//! [`Role`] and calls [`RoleRegistry::check`] before doing anything else.
//! Each role has an administering role: holders of the administering role
//! may grant and revoke it. All adjacency starts at `Admin`, which
//! administers itself, so authority is rooted in the accounts seeded at
//! construction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use openmint_types::{AccountId, EventRecord, OpenmintError, ProtocolEvent, Result, Role};

/// Membership and adjacency state for all roles.
pub struct RoleRegistry {
    /// Accounts holding each role.
    members: HashMap<Role, HashSet<AccountId>>,
    /// The role that administers each role.
    admins: HashMap<Role, Role>,
    /// Append-only log of membership and adjacency changes.
    events: Vec<EventRecord>,
}

impl RoleRegistry {
    /// Create a registry with `root` as the initial Admin.
    ///
    /// Every role starts administered by `Admin`, including `Admin`
    /// itself.
    #[must_use]
    pub fn new(root: AccountId) -> Self {
        let mut members: HashMap<Role, HashSet<AccountId>> = HashMap::new();
        members.entry(Role::Admin).or_default().insert(root);

        let admins = Role::ALL.iter().map(|role| (*role, Role::Admin)).collect();

        Self {
            members,
            admins,
            events: Vec::new(),
        }
    }

    /// Whether an account holds a role.
    #[must_use]
    pub fn has_role(&self, role: Role, account: AccountId) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(&account))
    }

    /// Require that an account holds a role.
    ///
    /// # Errors
    /// Returns `MissingRole` if it does not.
    pub fn check(&self, role: Role, account: AccountId) -> Result<()> {
        if !self.has_role(role, account) {
            return Err(OpenmintError::MissingRole { account, role });
        }
        Ok(())
    }

    /// The role currently administering `role`.
    #[must_use]
    pub fn admin_of(&self, role: Role) -> Role {
        self.admins.get(&role).copied().unwrap_or(Role::Admin)
    }

    /// Grant a role to an account.
    ///
    /// Idempotent: granting a role the account already holds succeeds
    /// without recording an event.
    ///
    /// # Errors
    /// Returns `MissingRole` if the caller does not hold the
    /// administering role, `ZeroAccount` for the zero account.
    pub fn grant(
        &mut self,
        caller: AccountId,
        role: Role,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check(self.admin_of(role), caller)?;
        if account.is_zero() {
            return Err(OpenmintError::ZeroAccount);
        }
        if self.members.entry(role).or_default().insert(account) {
            tracing::info!(role = %role, account = %account, caller = %caller, "Role granted");
            self.events
                .push(EventRecord::new(ProtocolEvent::RoleGranted { role, account }, now));
        }
        Ok(())
    }

    /// Revoke a role from an account.
    ///
    /// Idempotent: revoking a role the account does not hold succeeds
    /// without recording an event.
    ///
    /// # Errors
    /// Returns `MissingRole` if the caller does not hold the
    /// administering role.
    pub fn revoke(
        &mut self,
        caller: AccountId,
        role: Role,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check(self.admin_of(role), caller)?;
        if self
            .members
            .get_mut(&role)
            .is_some_and(|set| set.remove(&account))
        {
            tracing::info!(role = %role, account = %account, caller = %caller, "Role revoked");
            self.events
                .push(EventRecord::new(ProtocolEvent::RoleRevoked { role, account }, now));
        }
        Ok(())
    }

    /// Give up a role the caller holds.
    ///
    /// # Errors
    /// Returns `MissingRole` if the caller does not hold the role.
    pub fn renounce(&mut self, caller: AccountId, role: Role, now: DateTime<Utc>) -> Result<()> {
        self.check(role, caller)?;
        if let Some(set) = self.members.get_mut(&role) {
            set.remove(&caller);
        }
        tracing::info!(role = %role, account = %caller, "Role renounced");
        self.events.push(EventRecord::new(
            ProtocolEvent::RoleRevoked {
                role,
                account: caller,
            },
            now,
        ));
        Ok(())
    }

    /// Change which role administers `role`.
    ///
    /// Gated by the current administering role, so adjacency changes walk
    /// the same authority chain as grants.
    ///
    /// # Errors
    /// Returns `MissingRole` if the caller does not hold the current
    /// administering role.
    pub fn set_role_admin(
        &mut self,
        caller: AccountId,
        role: Role,
        admin_role: Role,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check(self.admin_of(role), caller)?;
        self.admins.insert(role, admin_role);
        tracing::info!(role = %role, admin_role = %admin_role, caller = %caller, "Role admin changed");
        self.events.push(EventRecord::new(
            ProtocolEvent::RoleAdminChanged { role, admin_role },
            now,
        ));
        Ok(())
    }

    /// Recorded membership and adjacency changes, oldest first.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (RoleRegistry, AccountId) {
        let root = AccountId::random();
        (RoleRegistry::new(root), root)
    }

    #[test]
    fn root_holds_admin() {
        let (registry, root) = registry();
        assert!(registry.has_role(Role::Admin, root));
        assert!(registry.check(Role::Admin, root).is_ok());
    }

    #[test]
    fn admin_grants_and_revokes() {
        let (mut registry, root) = registry();
        let issuer = AccountId::random();
        let now = Utc::now();

        registry.grant(root, Role::Issuer, issuer, now).unwrap();
        assert!(registry.has_role(Role::Issuer, issuer));

        registry.revoke(root, Role::Issuer, issuer, now).unwrap();
        assert!(!registry.has_role(Role::Issuer, issuer));
    }

    #[test]
    fn non_admin_cannot_grant() {
        let (mut registry, _) = registry();
        let outsider = AccountId::random();
        let err = registry
            .grant(outsider, Role::Issuer, AccountId::random(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, OpenmintError::MissingRole { role: Role::Admin, .. }));
    }

    #[test]
    fn grant_to_zero_account_rejected() {
        let (mut registry, root) = registry();
        let err = registry
            .grant(root, Role::Issuer, AccountId::zero(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, OpenmintError::ZeroAccount));
    }

    #[test]
    fn check_names_missing_role() {
        let (registry, _) = registry();
        let account = AccountId::random();
        let err = registry.check(Role::Burner, account).unwrap_err();
        match err {
            OpenmintError::MissingRole { account: a, role } => {
                assert_eq!(a, account);
                assert_eq!(role, Role::Burner);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renounce_requires_holding_the_role() {
        let (mut registry, root) = registry();
        let holder = AccountId::random();
        let now = Utc::now();
        registry.grant(root, Role::Accountant, holder, now).unwrap();

        registry.renounce(holder, Role::Accountant, now).unwrap();
        assert!(!registry.has_role(Role::Accountant, holder));

        let err = registry
            .renounce(holder, Role::Accountant, now)
            .unwrap_err();
        assert!(matches!(err, OpenmintError::MissingRole { .. }));
    }

    #[test]
    fn adjacency_rewires_grant_authority() {
        let (mut registry, root) = registry();
        let operator = AccountId::random();
        let delegate = AccountId::random();
        let now = Utc::now();

        registry
            .grant(root, Role::AllowListOperator, operator, now)
            .unwrap();
        registry
            .set_role_admin(root, Role::BlacklistOperator, Role::AllowListOperator, now)
            .unwrap();
        assert_eq!(
            registry.admin_of(Role::BlacklistOperator),
            Role::AllowListOperator
        );

        // The operator can now administer the blacklist role; root cannot
        // unless it also holds the allow-list operator role.
        registry
            .grant(operator, Role::BlacklistOperator, delegate, now)
            .unwrap();
        assert!(registry.has_role(Role::BlacklistOperator, delegate));

        let err = registry
            .grant(root, Role::BlacklistOperator, AccountId::random(), now)
            .unwrap_err();
        assert!(matches!(err, OpenmintError::MissingRole { .. }));
    }

    #[test]
    fn idempotent_grant_records_one_event() {
        let (mut registry, root) = registry();
        let issuer = AccountId::random();
        let now = Utc::now();
        let before = registry.events().len();

        registry.grant(root, Role::Issuer, issuer, now).unwrap();
        registry.grant(root, Role::Issuer, issuer, now).unwrap();
        assert_eq!(registry.events().len(), before + 1);
    }
}
