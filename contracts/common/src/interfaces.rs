//! Collaborator Capabilities
//!
//! The core never owns balances, permissions or the yield source. It talks
//! to them through these narrow traits, so the same accounting runs against
//! an in-memory ledger in tests and a real token elsewhere.
//!
//! Mutable collaborators are [`Transactional`]: the vault opens a scope
//! before an operation and either commits or rolls it back, so a failed
//! operation leaves no trace in any of them.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::VaultResult;
use crate::types::{Address, AssetId, ConnectorId};

// ============ Unit of Work ============

/// Staging scope around an operation
pub trait Transactional {
    /// Open a scope; everything after this is provisional
    fn begin(&mut self);
    /// Keep everything done since the matching `begin`
    fn commit(&mut self);
    /// Discard everything done since the matching `begin`
    fn rollback(&mut self);
}

// ============ Ledger ============

/// Credit balances plus custody of the underlying asset.
///
/// Credit methods work in credits, transfer methods in underlying units.
/// Connector handles double as ledger accounts, so moving underlying to or
/// from a connector is an ordinary transfer.
pub trait Ledger: Transactional {
    /// Pull `amount` underlying from `from` into vault custody
    fn transfer_in(&mut self, from: &Address, amount: u128) -> VaultResult<()>;

    /// Push `amount` underlying from vault custody to `to`
    fn transfer_out(&mut self, to: &Address, amount: u128) -> VaultResult<()>;

    /// Underlying currently held in vault custody
    fn raw_balance(&self) -> u128;

    /// Credits held by `holder`
    fn balance_of(&self, holder: &Address) -> u128;

    /// Credits outstanding
    fn total_supply(&self) -> u128;

    fn mint(&mut self, to: &Address, credits: u128) -> VaultResult<()>;

    fn burn(&mut self, from: &Address, credits: u128) -> VaultResult<()>;

    /// Credits `spender` may burn on behalf of `owner`
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Debit `amount` from the allowance, failing with
    /// `InsufficientAllowance` if it does not cover it
    fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) -> VaultResult<()>;
}

// ============ Permissions ============

/// Read-only capability lookups
pub trait PermissionSource {
    fn is_authorized_governor(&self, who: &Address, now: u64) -> bool;
    fn is_authorized_interest_distributor(&self, who: &Address, now: u64) -> bool;
    fn is_authorized_poker(&self, who: &Address, now: u64) -> bool;
}

// ============ Yield Source ============

/// An external yield source. Balances are in underlying units and are
/// expected to only grow between rebalances.
pub trait Connector {
    /// Accept `amount` underlying already transferred to the connector
    fn deposit(&mut self, amount: u128) -> VaultResult<()>;

    /// Release `amount` underlying to the connector's ledger account
    fn withdraw(&mut self, amount: u128) -> VaultResult<()>;

    /// Release everything, returning the amount released
    fn withdraw_all(&mut self) -> VaultResult<u128>;

    /// Current balance including accrued yield
    fn check_balance(&self) -> VaultResult<u128>;
}

/// Resolves connector handles to live connectors
pub trait ConnectorDirectory: Transactional {
    fn connector(&self, id: &ConnectorId) -> VaultResult<&dyn Connector>;
    fn connector_mut(&mut self, id: &ConnectorId) -> VaultResult<&mut dyn Connector>;
}

// ============ Interest ============

/// Underlying an interest distributor is about to hand to the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InterestPayout {
    /// Account the underlying is pulled from
    pub source: Address,
    pub amount: u128,
}

/// Upstream platform that accrues interest for the vault's asset
pub trait InterestDistributor: Transactional {
    /// Settle pending interest for `asset`. `None` when nothing accrued.
    fn collect_and_distribute_interest(&mut self, asset: &AssetId) -> VaultResult<Option<InterestPayout>>;
}

// ============ Unwrap ============

/// Converts redeemed underlying into another asset for payout
pub trait UnwrapAdapter: Transactional {
    /// Ledger account redeemed underlying is sent to before unwrapping
    fn address(&self) -> Address;

    /// Expected output of unwrapping `amount` of `input` into `output`
    fn estimate_output(&self, input: &AssetId, output: &AssetId, amount: u128) -> VaultResult<u128>;

    /// Unwrap `amount` and send the proceeds to `beneficiary`, returning
    /// the output amount
    fn unwrap_and_send(
        &mut self,
        input: &AssetId,
        output: &AssetId,
        amount: u128,
        min_amount_out: u128,
        beneficiary: &Address,
    ) -> VaultResult<u128>;
}
