//! Vault State
//!
//! Everything the core owns, in one value. Operations work on a staged
//! clone and the vault swaps it in only when the whole operation succeeds.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::VaultResult;
use crate::events::{EventLog, VaultEvent};
use crate::exchange_rate::{ExchangeRateEngine, RateRefresh};
use crate::types::{CachedSnapshot, ConnectorState, VaultConfig};
use crate::yield_validator::YieldBounds;

/// Owned accounting state of a single vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultState {
    /// Credit/underlying exchange rate
    pub engine: ExchangeRateEngine,
    /// Allocation against the external yield source
    pub connector: ConnectorState,
    /// Collect interest before deposits and redemptions
    pub automate_interest_collection: bool,
    pub config: VaultConfig,
}

impl VaultState {
    /// Fresh state: initial rate, no connector, automatic collection on
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: ExchangeRateEngine::new(config.initial_exchange_rate)?,
            connector: ConnectorState::default(),
            automate_interest_collection: true,
            config,
        })
    }

    /// Yield bounds from the configuration
    pub fn yield_bounds(&self) -> YieldBounds {
        YieldBounds {
            max_apy: self.config.max_apy,
            base_apy: self.config.base_apy,
        }
    }

    /// Refresh the rate and emit the resulting `ExchangeRateUpdated`
    pub fn refresh_rate(
        &mut self,
        observed_total: u128,
        total_credits: u128,
        allow_decrease: bool,
        events: &mut EventLog,
        now: u64,
    ) -> VaultResult<RateRefresh> {
        let refresh = self
            .engine
            .refresh_rate(observed_total, total_credits, allow_decrease)?;
        events.emit(VaultEvent::ExchangeRateUpdated {
            new_rate: refresh.new_rate,
            interest_collected: refresh.interest_collected,
            timestamp: now,
        });
        Ok(refresh)
    }

    /// Snapshot of the quantities an operation works on
    pub fn snapshot(&self, raw_balance: u128, total_credits: u128) -> CachedSnapshot {
        CachedSnapshot {
            fraction: self.connector.fraction,
            raw_balance,
            total_credits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::exchange::INITIAL_EXCHANGE_RATE;

    #[test]
    fn test_new_state_defaults() {
        let state = VaultState::new(VaultConfig::default()).unwrap();
        assert_eq!(state.engine.rate(), INITIAL_EXCHANGE_RATE);
        assert!(!state.connector.is_connected());
        assert!(state.automate_interest_collection);
        assert_eq!(state.yield_bounds(), YieldBounds::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VaultConfig {
            initial_exchange_rate: 0,
            ..VaultConfig::default()
        };
        assert!(VaultState::new(config).is_err());
    }

    #[test]
    fn test_snapshot_reads_fraction() {
        let mut state = VaultState::new(VaultConfig::default()).unwrap();
        state.connector.fraction = 7;
        let snapshot = state.snapshot(80, 1001);
        assert_eq!(snapshot, CachedSnapshot { fraction: 7, raw_balance: 80, total_credits: 1001 });
    }

    #[test]
    fn test_refresh_emits_rate_update() {
        let mut state = VaultState::new(VaultConfig::default()).unwrap();
        let mut events = EventLog::new();
        state.refresh_rate(110, 1001, false, &mut events, 42).unwrap();
        assert_eq!(
            events.events(),
            &[VaultEvent::ExchangeRateUpdated {
                new_rate: 110_000_000_000_000_000,
                interest_collected: 10,
                timestamp: 42,
            }]
        );

        // A rejected refresh emits nothing
        assert!(state.refresh_rate(1, 1001, false, &mut events, 43).is_err());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_state_borsh_roundtrip() {
        let state = VaultState::new(VaultConfig::default()).unwrap();
        let bytes = borsh::to_vec(&state).unwrap();
        let restored: VaultState = borsh::from_slice(&bytes).unwrap();
        assert_eq!(state, restored);
    }
}
