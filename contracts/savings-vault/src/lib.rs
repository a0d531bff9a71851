//! Savings Vault
//!
//! Orchestrates deposits, redemptions and governance actions over the
//! accounting core in `savings-common`. A [`SavingsVault`] owns its
//! [`VaultState`] and its collaborators; every public operation runs as a
//! unit of work:
//!
//! 1. the state is cloned and every collaborator opens a checkpoint
//! 2. the operation runs against the staged copy, staging its events
//! 3. on success the copy replaces the state, collaborators commit and the
//!    staged events are appended to the vault's log
//! 4. on failure the copy and staged events are dropped and collaborators
//!    roll back
//!
//! ## Modules
//!
//! - **savings**: deposit, mint, redeem and redeem-and-unwrap
//! - **admin**: interest deposits, pokes, connector and fraction changes,
//!   emergency detach
//! - **views**: rate, previews and exposure

use tracing::{debug, warn};

use savings_common::{
    connector_allocator::AllocationContext,
    errors::{VaultError, VaultResult},
    events::EventLog,
    interfaces::{ConnectorDirectory, InterestDistributor, Ledger, PermissionSource},
    state::VaultState,
    types::{Address, VaultConfig},
};

pub mod admin;
pub mod savings;
pub mod views;

pub use savings::{UnwrapRequest, UnwrapResult};

#[cfg(test)]
mod testing;


// ============ Vault ============

/// A savings vault and the collaborators it is wired to
#[derive(Debug)]
pub struct SavingsVault<L, C, P, D> {
    state: VaultState,
    events: EventLog,
    ledger: L,
    connectors: C,
    permissions: P,
    distributor: D,
}

impl<L, C, P, D> SavingsVault<L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    /// Create a vault with fresh state from `config`
    pub fn new(config: VaultConfig, ledger: L, connectors: C, permissions: P, distributor: D) -> VaultResult<Self> {
        Ok(Self {
            state: VaultState::new(config)?,
            events: EventLog::new(),
            ledger,
            connectors,
            permissions,
            distributor,
        })
    }

    /// Committed accounting state
    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// Events of every committed operation, oldest first
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drain the committed event log
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn connectors(&self) -> &C {
        &self.connectors
    }

    pub fn connectors_mut(&mut self) -> &mut C {
        &mut self.connectors
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    pub fn permissions_mut(&mut self) -> &mut P {
        &mut self.permissions
    }

    pub fn distributor_mut(&mut self) -> &mut D {
        &mut self.distributor
    }

    /// Run `op` as a unit of work
    pub(crate) fn execute<T>(
        &mut self,
        operation: &'static str,
        now: u64,
        op: impl FnOnce(&mut Work<'_, L, C, P, D>) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let mut staged = self.state.clone();
        let mut events = EventLog::new();

        self.ledger.begin();
        self.connectors.begin();
        self.distributor.begin();

        let result = {
            let mut work = Work {
                state: &mut staged,
                events: &mut events,
                ledger: &mut self.ledger,
                connectors: &mut self.connectors,
                permissions: &self.permissions,
                distributor: &mut self.distributor,
                now,
            };
            op(&mut work)
        };

        match result {
            Ok(value) => {
                self.ledger.commit();
                self.connectors.commit();
                self.distributor.commit();
                self.state = staged;
                debug!(operation, events = events.len(), "operation committed");
                self.events.append(events);
                Ok(value)
            }
            Err(err) => {
                self.ledger.rollback();
                self.connectors.rollback();
                self.distributor.rollback();
                warn!(operation, code = err.code(), error = %err, "operation rolled back");
                Err(err)
            }
        }
    }
}

// ============ Unit of Work ============

/// Staged state plus collaborators for one operation
pub(crate) struct Work<'a, L, C, P, D> {
    pub state: &'a mut VaultState,
    pub events: &'a mut EventLog,
    pub ledger: &'a mut L,
    pub connectors: &'a mut C,
    pub permissions: &'a P,
    pub distributor: &'a mut D,
    pub now: u64,
}

impl<'a, L, C, P, D> Work<'a, L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    /// Split into the staged state and an allocator context
    pub fn allocation(&mut self) -> (&mut VaultState, AllocationContext<'_>) {
        (
            &mut *self.state,
            AllocationContext {
                ledger: &mut *self.ledger,
                connectors: &mut *self.connectors,
                events: &mut *self.events,
                now: self.now,
            },
        )
    }

    pub fn require_governor(&self, caller: &Address) -> VaultResult<()> {
        if !self.permissions.is_authorized_governor(caller, self.now) {
            return Err(VaultError::PermissionDenied {
                caller: *caller,
                required: "governor",
            });
        }
        Ok(())
    }

    pub fn require_poker(&self, caller: &Address) -> VaultResult<()> {
        if !self.permissions.is_authorized_poker(caller, self.now) {
            return Err(VaultError::PermissionDenied {
                caller: *caller,
                required: "poker",
            });
        }
        Ok(())
    }

    pub fn require_interest_distributor(&self, caller: &Address) -> VaultResult<()> {
        if !self.permissions.is_authorized_interest_distributor(caller, self.now) {
            return Err(VaultError::PermissionDenied {
                caller: *caller,
                required: "interest distributor",
            });
        }
        Ok(())
    }
}
