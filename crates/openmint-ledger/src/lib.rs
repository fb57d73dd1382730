//! # openmint-ledger
//!
//! **Account Plane**: token balances, collateral custody, roles, and
//! allow-lists.
//!
//! ## Architecture
//!
//! The Account Plane holds all balance and authorization state that the
//! gateway and vault mutate:
//! 1. **TokenLedger**: protocol token balances, supply, allowances, permits
//! 2. **AssetBook**: per-(asset, account) collateral and treasury custody
//! 3. **RoleRegistry**: role membership and administering-role adjacency
//! 4. **AllowList**: fail-loud admission sets
//!
//! ## Invariants
//!
//! - `TokenLedger::total_supply` always equals the sum of all balances
//! - Every mutation is atomic: a returned error means nothing changed
//! - Consumed permit nonces never become reusable

pub mod allowlist;
pub mod assets;
pub mod roles;
pub mod token;

pub use allowlist::AllowList;
pub use assets::AssetBook;
pub use roles::RoleRegistry;
pub use token::TokenLedger;
