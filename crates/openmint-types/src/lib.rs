//! # openmint-types
//!
//! Shared types, errors, and configuration for the **OpenMint**
//! collateral-backed token settlement core.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`OrderNonce`], [`RequestId`], [`PeriodKey`], [`EventId`]
//! - **Order model**: [`Order`], [`OrderDirection`]
//! - **Permit model**: [`Permit`]
//! - **Collateral model**: [`CollateralId`], [`CollateralMeta`]
//! - **Withdrawal model**: [`WithdrawalRequest`], [`WithdrawalStatus`]
//! - **Access control**: [`Role`]
//! - **Events**: [`ProtocolEvent`], [`EventRecord`]
//! - **Time**: [`Clock`], [`SystemClock`]
//! - **Configuration**: [`GatewayConfig`], [`VaultConfig`], [`OracleConfig`]
//! - **Errors**: [`OpenmintError`] with `MINT_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod clock;
pub mod collateral;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod permit;
pub mod role;
pub mod withdrawal;

// Re-export all primary types at crate root for ergonomic imports:
//   use openmint_types::{Order, OrderDirection, Role, WithdrawalRequest, ...};

pub use clock::*;
pub use collateral::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use permit::*;
pub use role::*;
pub use withdrawal::*;

// Constants are accessed via `openmint_types::constants::FOO`
// (not re-exported to avoid name collisions).
