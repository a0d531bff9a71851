//! Test doubles and a wired-up vault for the unit and scenario tests

use std::collections::BTreeMap;

use credit_ledger::MemoryLedger;
use savings_common::{
    access_control::{AccessControl, Role},
    constants::scale::RATIO_SCALE,
    errors::{VaultError, VaultResult},
    interfaces::{Connector, ConnectorDirectory, InterestDistributor, InterestPayout, Transactional, UnwrapAdapter},
    math::{mul_truncate_scale, safe_sub},
    types::{Address, AssetId, CallContext, ConnectorId, VaultConfig},
};

use crate::SavingsVault;

pub const ALICE: Address = [1u8; 32];
pub const BOB: Address = [2u8; 32];
pub const GOVERNOR: Address = [3u8; 32];
pub const POKER: Address = [4u8; 32];
pub const DISTRIBUTOR: Address = [5u8; 32];
pub const ADAPTER: Address = [6u8; 32];
pub const CONNECTOR: ConnectorId = [7u8; 32];
pub const OTHER_CONNECTOR: ConnectorId = [8u8; 32];
pub const OUTPUT_ASSET: AssetId = [0xBB; 32];

pub const START: u64 = 1_700_000_000;
pub const HOUR: u64 = 60 * 60;
pub const DAY: u64 = 24 * HOUR;
pub const INITIAL_FUNDS: u128 = 1_000_000_000;

pub type TestVault = SavingsVault<MemoryLedger, MockConnectors, AccessControl, MockDistributor>;

// ============ Connector ============

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockConnector {
    pub balance: u128,
    /// Reported instead of `balance` when set
    pub reported: Option<u128>,
    /// Every read fails
    pub unreachable: bool,
}

impl Connector for MockConnector {
    fn deposit(&mut self, amount: u128) -> VaultResult<()> {
        self.balance += amount;
        Ok(())
    }

    fn withdraw(&mut self, amount: u128) -> VaultResult<()> {
        self.balance = safe_sub(self.balance, amount)?;
        Ok(())
    }

    fn withdraw_all(&mut self) -> VaultResult<u128> {
        Ok(std::mem::take(&mut self.balance))
    }

    fn check_balance(&self) -> VaultResult<u128> {
        if self.unreachable {
            return Err(VaultError::ExternalCallFailed {
                collaborator: "connector",
                reason: "unreachable",
            });
        }
        Ok(self.reported.unwrap_or(self.balance))
    }
}

#[derive(Debug, Default)]
pub struct MockConnectors {
    pub connectors: BTreeMap<ConnectorId, MockConnector>,
    checkpoints: Vec<BTreeMap<ConnectorId, MockConnector>>,
}

impl Transactional for MockConnectors {
    fn begin(&mut self) {
        self.checkpoints.push(self.connectors.clone());
    }

    fn commit(&mut self) {
        self.checkpoints.pop();
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.checkpoints.pop() {
            self.connectors = saved;
        }
    }
}

impl ConnectorDirectory for MockConnectors {
    fn connector(&self, id: &ConnectorId) -> VaultResult<&dyn Connector> {
        self.connectors
            .get(id)
            .map(|c| c as &dyn Connector)
            .ok_or(VaultError::invalid("connector", "unknown connector"))
    }

    fn connector_mut(&mut self, id: &ConnectorId) -> VaultResult<&mut dyn Connector> {
        self.connectors
            .get_mut(id)
            .map(|c| c as &mut dyn Connector)
            .ok_or(VaultError::invalid("connector", "unknown connector"))
    }
}

// ============ Interest Distributor ============

#[derive(Debug, Default)]
pub struct MockDistributor {
    pub pending: Option<InterestPayout>,
    checkpoints: Vec<Option<InterestPayout>>,
}

impl Transactional for MockDistributor {
    fn begin(&mut self) {
        self.checkpoints.push(self.pending);
    }

    fn commit(&mut self) {
        self.checkpoints.pop();
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.checkpoints.pop() {
            self.pending = saved;
        }
    }
}

impl InterestDistributor for MockDistributor {
    fn collect_and_distribute_interest(&mut self, _asset: &AssetId) -> VaultResult<Option<InterestPayout>> {
        Ok(self.pending.take())
    }
}

// ============ Unwrap Adapter ============

/// Pays out `amount * ratio / 1e8` of the output asset
#[derive(Debug)]
pub struct MockUnwrapAdapter {
    pub ratio: u128,
    sent: BTreeMap<Address, u128>,
    checkpoints: Vec<BTreeMap<Address, u128>>,
}

impl MockUnwrapAdapter {
    pub fn new(ratio: u128) -> Self {
        Self {
            ratio,
            sent: BTreeMap::new(),
            checkpoints: Vec::new(),
        }
    }

    pub fn sent_to(&self, beneficiary: &Address) -> u128 {
        self.sent.get(beneficiary).copied().unwrap_or(0)
    }
}

impl Transactional for MockUnwrapAdapter {
    fn begin(&mut self) {
        self.checkpoints.push(self.sent.clone());
    }

    fn commit(&mut self) {
        self.checkpoints.pop();
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.checkpoints.pop() {
            self.sent = saved;
        }
    }
}

impl UnwrapAdapter for MockUnwrapAdapter {
    fn address(&self) -> Address {
        ADAPTER
    }

    fn estimate_output(&self, _input: &AssetId, _output: &AssetId, amount: u128) -> VaultResult<u128> {
        mul_truncate_scale(amount, self.ratio, RATIO_SCALE)
    }

    fn unwrap_and_send(
        &mut self,
        input: &AssetId,
        output: &AssetId,
        amount: u128,
        _min_amount_out: u128,
        beneficiary: &Address,
    ) -> VaultResult<u128> {
        let out = self.estimate_output(input, output, amount)?;
        *self.sent.entry(*beneficiary).or_default() += out;
        Ok(out)
    }
}

// ============ Harness ============

pub struct Harness {
    pub vault: TestVault,
    pub now: u64,
}

impl Harness {
    /// Funded savers, roles granted, two known connectors, nothing deposited
    pub fn new() -> Self {
        let mut ledger = MemoryLedger::new();
        for holder in [ALICE, BOB, DISTRIBUTOR] {
            ledger.fund(&holder, INITIAL_FUNDS).unwrap();
        }

        let mut acl = AccessControl::new(GOVERNOR, START);
        acl.grant_role(GOVERNOR, POKER, Role::Poker, START).unwrap();
        acl.grant_role(GOVERNOR, DISTRIBUTOR, Role::InterestDistributor, START)
            .unwrap();

        let mut connectors = MockConnectors::default();
        connectors.connectors.insert(CONNECTOR, MockConnector::default());
        connectors.connectors.insert(OTHER_CONNECTOR, MockConnector::default());

        let vault = SavingsVault::new(
            VaultConfig::default(),
            ledger,
            connectors,
            acl,
            MockDistributor::default(),
        )
        .unwrap();

        Self { vault, now: START }
    }

    /// Alice holds 1001 credits for 100 underlying and CONNECTOR holds
    /// `fraction` of it
    pub fn connected(fraction: u128) -> Self {
        let mut h = Self::new();
        h.vault.deposit_savings(h.ctx(ALICE), 100, ALICE).unwrap();
        h.vault.set_fraction(h.ctx(GOVERNOR), fraction).unwrap();
        h.vault.set_connector(h.ctx(GOVERNOR), Some(CONNECTOR)).unwrap();
        h
    }

    pub fn ctx(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.now)
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    /// Have the distributor hand over `amount` on the next collection
    pub fn queue_interest(&mut self, amount: u128) {
        self.vault.distributor_mut().pending = Some(InterestPayout {
            source: DISTRIBUTOR,
            amount,
        });
    }

    pub fn connector(&mut self, id: ConnectorId) -> &mut MockConnector {
        self.vault
            .connectors_mut()
            .connectors
            .get_mut(&id)
            .unwrap()
    }

    pub fn connector_balance(&self, id: ConnectorId) -> u128 {
        self.vault.connectors().connectors[&id].balance
    }

    /// Connector earns `amount`, backed by underlying in its ledger account
    pub fn accrue(&mut self, id: ConnectorId, amount: u128) {
        self.connector(id).balance += amount;
        self.vault.ledger_mut().fund(&id, amount).unwrap();
    }
}
