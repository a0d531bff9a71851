//! Credit Ledger
//!
//! In-memory implementation of the savings vault [`Ledger`] capability.
//! Tracks three things:
//!
//! - credit balances, total credit supply and allowances
//! - underlying balances of outside accounts (holders, connectors, adapters)
//! - underlying held in vault custody
//!
//! Every [`Transactional::begin`] checkpoints the whole book so that a
//! failed vault operation can be rolled back without a trace.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use savings_common::{
    errors::{VaultError, VaultResult},
    interfaces::{Ledger, Transactional},
    math::{safe_add, safe_sub},
    types::{require_address, Address},
};

// ============ Ledger State ============

/// Balances at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LedgerBook {
    /// Credits per holder
    pub credits: BTreeMap<Address, u128>,
    /// Credits outstanding
    pub total_credits: u128,
    /// Credit allowances keyed by (owner, spender)
    pub allowances: BTreeMap<(Address, Address), u128>,
    /// Underlying per outside account
    pub assets: BTreeMap<Address, u128>,
    /// Underlying in vault custody
    pub custody: u128,
}

impl LedgerBook {
    fn credits_of(&self, holder: &Address) -> u128 {
        self.credits.get(holder).copied().unwrap_or(0)
    }

    fn assets_of(&self, holder: &Address) -> u128 {
        self.assets.get(holder).copied().unwrap_or(0)
    }

    fn set_credits(&mut self, holder: Address, amount: u128) {
        if amount == 0 {
            self.credits.remove(&holder);
        } else {
            self.credits.insert(holder, amount);
        }
    }

    fn set_assets(&mut self, holder: Address, amount: u128) {
        if amount == 0 {
            self.assets.remove(&holder);
        } else {
            self.assets.insert(holder, amount);
        }
    }
}

/// Ledger with checkpointed rollback
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    book: LedgerBook,
    checkpoints: Vec<LedgerBook>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balances
    pub fn book(&self) -> &LedgerBook {
        &self.book
    }

    /// Credit `amount` underlying to an outside account
    pub fn fund(&mut self, holder: &Address, amount: u128) -> VaultResult<()> {
        require_address(holder, "holder")?;
        let balance = safe_add(self.book.assets_of(holder), amount)?;
        self.book.set_assets(*holder, balance);
        Ok(())
    }

    /// Underlying held by an outside account
    pub fn asset_balance(&self, holder: &Address) -> u128 {
        self.book.assets_of(holder)
    }

    /// Let `spender` burn up to `amount` of `owner`'s credits
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> VaultResult<()> {
        require_address(owner, "owner")?;
        require_address(spender, "spender")?;
        self.book.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    /// Number of open checkpoints
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
}

// ============ Unit of Work ============

impl Transactional for MemoryLedger {
    fn begin(&mut self) {
        self.checkpoints.push(self.book.clone());
    }

    fn commit(&mut self) {
        if self.checkpoints.pop().is_none() {
            warn!("commit without an open checkpoint");
        }
    }

    fn rollback(&mut self) {
        match self.checkpoints.pop() {
            Some(book) => self.book = book,
            None => warn!("rollback without an open checkpoint"),
        }
    }
}

// ============ Ledger Capability ============

impl Ledger for MemoryLedger {
    fn transfer_in(&mut self, from: &Address, amount: u128) -> VaultResult<()> {
        let available = self.book.assets_of(from);
        if available < amount {
            return Err(VaultError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.book.set_assets(*from, available - amount);
        self.book.custody = safe_add(self.book.custody, amount)?;
        debug!(amount, custody = self.book.custody, "underlying transferred in");
        Ok(())
    }

    fn transfer_out(&mut self, to: &Address, amount: u128) -> VaultResult<()> {
        require_address(to, "receiver")?;
        if self.book.custody < amount {
            return Err(VaultError::InsufficientBalance {
                available: self.book.custody,
                requested: amount,
            });
        }
        let balance = safe_add(self.book.assets_of(to), amount)?;
        self.book.custody -= amount;
        self.book.set_assets(*to, balance);
        debug!(amount, custody = self.book.custody, "underlying transferred out");
        Ok(())
    }

    fn raw_balance(&self) -> u128 {
        self.book.custody
    }

    fn balance_of(&self, holder: &Address) -> u128 {
        self.book.credits_of(holder)
    }

    fn total_supply(&self) -> u128 {
        self.book.total_credits
    }

    fn mint(&mut self, to: &Address, credits: u128) -> VaultResult<()> {
        require_address(to, "beneficiary")?;
        let balance = safe_add(self.book.credits_of(to), credits)?;
        self.book.total_credits = safe_add(self.book.total_credits, credits)?;
        self.book.set_credits(*to, balance);
        Ok(())
    }

    fn burn(&mut self, from: &Address, credits: u128) -> VaultResult<()> {
        let available = self.book.credits_of(from);
        if available < credits {
            return Err(VaultError::InsufficientBalance {
                available,
                requested: credits,
            });
        }
        self.book.total_credits = safe_sub(self.book.total_credits, credits)?;
        self.book.set_credits(*from, available - credits);
        Ok(())
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.book
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) -> VaultResult<()> {
        let allowed = self.allowance(owner, spender);
        // Unlimited approvals are never drawn down
        if allowed == u128::MAX {
            return Ok(());
        }
        if allowed < amount {
            return Err(VaultError::InsufficientAllowance {
                allowed,
                requested: amount,
            });
        }
        self.book.allowances.insert((*owner, *spender), allowed - amount);
        Ok(())
    }
}

// ============ Tests ============
