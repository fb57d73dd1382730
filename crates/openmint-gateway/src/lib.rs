//! # openmint-gateway
//!
//! **Order Gateway plane**: admission control and settlement for signed
//! mint/redeem orders, plus oracle-priced direct redemption.
//!
//! ## Architecture
//!
//! The gateway is the only writer of monetary effects on the order path.
//! Each entry point runs a strict pipeline:
//!
//! 1. Caller role check (issuer for mint, burner for redeem)
//! 2. Order shape, expiry, and Ed25519 signature verification
//! 3. Subject allow-list and collateral registry admission
//! 4. Mint-side collateral/token ratio guard
//! 5. Balance probes for every effect about to be issued
//! 6. Per-period volume window charge and nonce burn
//! 7. Ledger effects and event emission
//!
//! Steps 1-5 are pure reads. The first mutation is the window charge in
//! step 6, and nothing after it can fail, so a rejected order leaves no
//! trace and a settled order is complete.
//!
//! ## Security Properties
//!
//! - Replay protection: consumed nonces are burned forever ([`UsedNonceSet`])
//! - Volume containment: per-period caps on both directions ([`RateLimitWindow`])
//! - Depeg containment: oracle redemptions price collateral at no less
//!   than the peg ([`OrderGateway::redeem_with_oracle`])
//! - Restart safety: durable state snapshots with schema migration
//!   ([`GatewaySnapshot`])

pub mod gateway;
pub mod nonces;
pub mod oracle;
pub mod rate_limit;
pub mod registry;
pub mod snapshot;

pub use gateway::OrderGateway;
pub use nonces::UsedNonceSet;
pub use oracle::{PriceOracle, PricePoint, StaticOracle};
pub use rate_limit::RateLimitWindow;
pub use registry::CollateralRegistry;
pub use snapshot::{GatewaySnapshot, WindowState};
