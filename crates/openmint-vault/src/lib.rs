//! # openmint-vault
//!
//! **Vault plane**: rebasing share accounting over the protocol token
//! and the time-delayed withdrawal queue behind it.
//!
//! ## Architecture
//!
//! 1. **math**: the four proportional conversions as explicit functions,
//!    every one rounding in the vault's favor
//! 2. **Vault**: share ledger with blacklist gating, deposit/mint and
//!    withdraw/redeem (plus permit and slippage-guarded variants),
//!    rebase, direct-exit exemptions, stray-asset rescue
//! 3. **WithdrawalQueue**: snapshot-isolated, delay-gated exit claims
//! 4. **VaultSnapshot**: versioned, digest-sealed persistence of both
//!
//! ## Invariants
//!
//! - `total_shares` equals the sum of all share balances
//!   ([`Vault::verify_share_supply`])
//! - `total_assets / total_shares` rises only through rebase and is
//!   otherwise conserved by every deposit/withdraw/redeem sequence
//! - A queued withdrawal pays exactly its creation-time snapshot, no
//!   matter what rebases land while it waits
//! - Share accounting commits before any token transfer in every entry
//!   point

pub mod math;
pub mod queue;
pub mod snapshot;
pub mod vault;

pub use queue::WithdrawalQueue;
pub use snapshot::VaultSnapshot;
pub use vault::{Vault, WithdrawOutcome};
