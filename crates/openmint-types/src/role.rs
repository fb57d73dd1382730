//! Privileged operation roles.
//!
//! Authorization is a closed enum rather than free-form strings: every
//! privileged entry point names the one role it requires, and the
//! registry maps each role to its administering role (the role allowed
//! to grant and revoke it).

use serde::{Deserialize, Serialize};

/// A privilege tag held by accounts and checked at privileged entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Role {
    /// Administers every role by default, including itself.
    Admin,
    /// May submit signed mint orders on behalf of subjects.
    Issuer,
    /// May submit signed redeem orders on behalf of subjects.
    Burner,
    /// May distribute yield into the vault. Rebases only add assets;
    /// there is no downward adjustment.
    RebaseOperator,
    /// May add and remove accounts on the share blacklist.
    BlacklistOperator,
    /// May add and remove accounts on admission allow-lists.
    AllowListOperator,
    /// May tune economic parameters such as the peg percentage.
    Accountant,
}

impl Role {
    /// Every role, in a fixed order. Used to seed registry adjacency.
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Issuer,
        Role::Burner,
        Role::RebaseOperator,
        Role::BlacklistOperator,
        Role::AllowListOperator,
        Role::Accountant,
    ];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Issuer => write!(f, "ISSUER"),
            Self::Burner => write!(f, "BURNER"),
            Self::RebaseOperator => write!(f, "REBASE_OPERATOR"),
            Self::BlacklistOperator => write!(f, "BLACKLIST_OPERATOR"),
            Self::AllowListOperator => write!(f, "ALLOWLIST_OPERATOR"),
            Self::Accountant => write!(f, "ACCOUNTANT"),
        }
    }
}
