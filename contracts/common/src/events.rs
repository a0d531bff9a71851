//! Savings Vault Events
//!
//! Notifications emitted while an operation runs. They are staged in an
//! [`EventLog`] belonging to the unit of work and only reach the vault's
//! committed log if the operation succeeds.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, ConnectorId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Rate Events (0x01 - 0x0F)
    ExchangeRateUpdated = 0x01,

    // Savings Events (0x10 - 0x1F)
    SavingsDeposited = 0x10,
    CreditsRedeemed = 0x11,
    Referral = 0x12,

    // Allocation Events (0x20 - 0x2F)
    Poked = 0x20,
    PokedRaw = 0x21,

    // Governance Events (0x30 - 0x3F)
    ConnectorUpdated = 0x30,
    FractionUpdated = 0x31,
    EmergencyUpdate = 0x32,
    AutomaticInterestCollectionSwitched = 0x33,
}

/// Every notification the vault can emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultEvent {
    // ============ Rate Events ============

    /// Emitted whenever the exchange rate is recomputed
    ExchangeRateUpdated {
        new_rate: u128,
        interest_collected: u128,
        timestamp: u64,
    },

    // ============ Savings Events ============

    /// Emitted when underlying is converted into credits
    SavingsDeposited {
        saver: Address,
        assets_deposited: u128,
        credits_issued: u128,
        timestamp: u64,
    },

    /// Emitted when credits are burned for underlying
    CreditsRedeemed {
        owner: Address,
        receiver: Address,
        credits_redeemed: u128,
        assets_returned: u128,
        timestamp: u64,
    },

    /// Emitted alongside a deposit that names a referrer
    Referral {
        referrer: Address,
        beneficiary: Address,
        amount: u128,
        timestamp: u64,
    },

    // ============ Allocation Events ============

    /// Emitted when a rebalance completes against a connector
    Poked {
        old_balance: u128,
        new_balance: u128,
        interest_detected: u128,
        timestamp: u64,
    },

    /// Emitted when a rebalance completes with no connector attached
    PokedRaw { timestamp: u64 },

    // ============ Governance Events ============

    /// Emitted when the active connector changes
    ConnectorUpdated {
        connector: Option<ConnectorId>,
        timestamp: u64,
    },

    /// Emitted when the target fraction changes
    FractionUpdated { fraction: u128, timestamp: u64 },

    /// Emitted after an emergency detach and rebase
    EmergencyUpdate { withdrawn: u128, timestamp: u64 },

    /// Emitted when automatic interest collection is toggled
    AutomaticInterestCollectionSwitched { enabled: bool, timestamp: u64 },
}

impl VaultEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ExchangeRateUpdated { .. } => EventType::ExchangeRateUpdated,
            Self::SavingsDeposited { .. } => EventType::SavingsDeposited,
            Self::CreditsRedeemed { .. } => EventType::CreditsRedeemed,
            Self::Referral { .. } => EventType::Referral,
            Self::Poked { .. } => EventType::Poked,
            Self::PokedRaw { .. } => EventType::PokedRaw,
            Self::ConnectorUpdated { .. } => EventType::ConnectorUpdated,
            Self::FractionUpdated { .. } => EventType::FractionUpdated,
            Self::EmergencyUpdate { .. } => EventType::EmergencyUpdate,
            Self::AutomaticInterestCollectionSwitched { .. } => {
                EventType::AutomaticInterestCollectionSwitched
            }
        }
    }

    /// Unix time the event was emitted at
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::ExchangeRateUpdated { timestamp, .. }
            | Self::SavingsDeposited { timestamp, .. }
            | Self::CreditsRedeemed { timestamp, .. }
            | Self::Referral { timestamp, .. }
            | Self::Poked { timestamp, .. }
            | Self::PokedRaw { timestamp }
            | Self::ConnectorUpdated { timestamp, .. }
            | Self::FractionUpdated { timestamp, .. }
            | Self::EmergencyUpdate { timestamp, .. }
            | Self::AutomaticInterestCollectionSwitched { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Ordered collection of events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<VaultEvent> {
        self.events
    }

    /// Move every event of `staged` onto the end of this log
    pub fn append(&mut self, staged: EventLog) {
        self.events.extend(staged.events);
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&VaultEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Last event emitted, if any
    pub fn last(&self) -> Option<&VaultEvent> {
        self.events.last()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
