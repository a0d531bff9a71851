//! Protocol Constants
//!
//! All magic numbers and default configuration values for the savings vault.
//! Runtime overrides live in [`crate::types::VaultConfig`]; these are the
//! values it defaults to.

/// Fixed-point scales
pub mod scale {
    /// Full scale for ScaledValue quantities (1.0 = 1e18)
    pub const FULL_SCALE: u128 = 1_000_000_000_000_000_000;

    /// Ratio scale for unwrap adapter conversion rates (1.0 = 1e8)
    pub const RATIO_SCALE: u128 = 100_000_000;

    /// Percentage helper: 1% at full scale
    pub const ONE_PERCENT: u128 = FULL_SCALE / 100;
}

/// Exchange rate configuration
pub mod exchange {
    use super::scale::FULL_SCALE;

    /// Starting rate for a fresh vault: 1 credit = 0.1 underlying
    pub const INITIAL_EXCHANGE_RATE: u128 = FULL_SCALE / 10;
}

/// Time-related constants (seconds)
pub mod time {
    /// Seconds in a (non-leap) year
    pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

    /// Window below which yield is judged by raw increase instead of APY
    pub const SHORT_WINDOW: u64 = 30 * 60;

    /// One hour
    pub const HOUR: u64 = 60 * 60;
}

/// Yield validation bounds
pub mod yield_bounds {
    use super::scale::{FULL_SCALE, ONE_PERCENT};

    /// Maximum extrapolated APY accepted from a connector (4%)
    pub const MAX_APY: u128 = 4 * ONE_PERCENT;

    /// Maximum raw increase accepted inside the short window (0.1%)
    pub const BASE_APY: u128 = FULL_SCALE / 1_000;
}

/// Connector allocation configuration
pub mod allocator {
    use super::scale::{FULL_SCALE, ONE_PERCENT};
    use super::time::HOUR;

    /// Minimum time between unforced rebalances (4 hours)
    pub const POKE_CADENCE: u64 = 4 * HOUR;

    /// Highest fraction of capital that may target the connector (50%)
    pub const MAX_FRACTION: u128 = FULL_SCALE / 2;

    /// Headroom above the target fraction before a withdrawal forces a
    /// rebalance (20%)
    pub const EXPOSURE_HEADROOM: u128 = 20 * ONE_PERCENT;
}

/// Underlying asset metadata
pub mod asset {
    /// Default identifier of the underlying asset
    pub const DEFAULT_UNDERLYING: [u8; 32] = [0xAA; 32];
}
