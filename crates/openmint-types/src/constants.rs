//! System-wide constants for the OpenMint settlement core.

/// Decimal precision of the protocol token (18 decimal places).
pub const TOKEN_DECIMALS: u32 = 18;

/// Default cumulative mint capacity per rate-limit period.
pub const DEFAULT_MINT_CAPACITY: u64 = 1_000_000;

/// Default cumulative redeem capacity per rate-limit period.
pub const DEFAULT_REDEEM_CAPACITY: u64 = 1_000_000;

/// Default rate-limit period length in seconds.
pub const DEFAULT_PERIOD_SECS: u64 = 12;

/// Allowed deviation between counter and token amounts on mint orders,
/// in basis points (200 = 2%).
pub const RATIO_TOLERANCE_BPS: u32 = 200;

/// Basis-point scale (100% = 10000 bps).
pub const PEG_SCALE_BPS: u32 = 10_000;

/// Default peg percentage applied to oracle redemptions (no haircut).
pub const DEFAULT_PEG_PERCENTAGE_BPS: u32 = 10_000;

/// Default delay between withdrawal request and claimability, in seconds.
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 86_400;

/// Maximum age of an oracle price before it is considered stale, in seconds.
pub const ORACLE_STALENESS_THRESHOLD_SECS: i64 = 86_400;

/// Maximum byte length of the free-form message field on signed orders.
pub const MAX_ORDER_MESSAGE_LEN: usize = 256;

/// Schema version written into persisted snapshots.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenMint";
