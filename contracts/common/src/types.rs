//! Core Types for the Savings Vault
//!
//! Data structures shared between the exchange rate engine, the connector
//! allocator and the vault orchestration layer.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{allocator, asset, exchange, scale, yield_bounds};
use crate::errors::{VaultError, VaultResult};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for asset identifiers
pub type AssetId = [u8; 32];

/// Type alias for connector handles
pub type ConnectorId = [u8; 32];

/// The zero address, never a valid holder or connector
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Returns an error naming `param` if `addr` is the zero address
pub fn require_address(addr: &Address, param: &'static str) -> VaultResult<()> {
    if *addr == ZERO_ADDRESS {
        return Err(VaultError::invalid(param, "zero address"));
    }
    Ok(())
}

// ============ Call Context ============

/// Who is calling and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Caller address
    pub caller: Address,
    /// Current unix time in seconds
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }
}

// ============ Connector Types ============

/// Allocation state against the external yield source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ConnectorState {
    /// Active connector, if any
    pub connector: Option<ConnectorId>,
    /// Target share of capital held in the connector (1e18 scale)
    pub fraction: u128,
    /// Connector balance recorded at the end of the last rebalance
    pub last_balance: u128,
    /// Unix time of the last accepted rebalance
    pub last_poke: u64,
}

impl ConnectorState {
    /// Returns true if a connector is attached
    pub fn is_connected(&self) -> bool {
        self.connector.is_some()
    }
}

/// One consistent read of the mutable quantities an operation works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedSnapshot {
    /// Target connector fraction (1e18 scale)
    pub fraction: u128,
    /// Underlying held in local custody
    pub raw_balance: u128,
    /// Credits outstanding
    pub total_credits: u128,
}

/// Connector exposure measured against its allowed ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorStatus {
    /// Maximum underlying that may sit in the connector
    pub limit: u128,
    /// Underlying currently attributed to the connector
    pub in_connector: u128,
}

impl ConnectorStatus {
    /// Returns true if the connector holds more than its ceiling
    pub fn is_over_limit(&self) -> bool {
        self.in_connector > self.limit
    }
}

// ============ Configuration ============

/// Runtime configuration for a vault instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Underlying asset handled by this vault
    pub underlying: AssetId,
    /// Exchange rate a fresh vault starts at (1e18 scale)
    pub initial_exchange_rate: u128,
    /// Minimum seconds between unforced rebalances
    pub poke_cadence: u64,
    /// Maximum extrapolated connector APY (1e18 scale)
    pub max_apy: u128,
    /// Maximum raw increase inside the short window (1e18 scale)
    pub base_apy: u128,
    /// Highest settable target fraction (1e18 scale)
    pub max_fraction: u128,
    /// Headroom over the fraction before withdrawals force a rebalance
    pub exposure_headroom: u128,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            underlying: asset::DEFAULT_UNDERLYING,
            initial_exchange_rate: exchange::INITIAL_EXCHANGE_RATE,
            poke_cadence: allocator::POKE_CADENCE,
            max_apy: yield_bounds::MAX_APY,
            base_apy: yield_bounds::BASE_APY,
            max_fraction: allocator::MAX_FRACTION,
            exposure_headroom: allocator::EXPOSURE_HEADROOM,
        }
    }
}

impl VaultConfig {
    /// Reject configurations the core cannot operate under
    pub fn validate(&self) -> VaultResult<()> {
        if self.initial_exchange_rate == 0 {
            return Err(VaultError::invalid("initial_exchange_rate", "must be positive"));
        }
        if self.max_fraction > allocator::MAX_FRACTION {
            return Err(VaultError::invalid("max_fraction", "must not exceed 50%"));
        }
        if self.max_apy == 0 || self.base_apy == 0 {
            return Err(VaultError::invalid("max_apy", "yield bounds must be positive"));
        }
        if self.exposure_headroom > scale::FULL_SCALE {
            return Err(VaultError::invalid("exposure_headroom", "must not exceed 100%"));
        }
        Ok(())
    }
}
