//! Connector Allocator
//!
//! Control loop that keeps a target fraction of the vault's capital in an
//! external yield source (the connector) and recognizes the yield it earns.
//!
//! ## States
//!
//! - **NoConnector**: all capital sits in local custody; a rebalance only
//!   refreshes the rate from the raw balance.
//! - **Connected**: each rebalance reads the connector, rejects regressions
//!   and implausible yield, levels the connector to `total * fraction`, then
//!   refreshes the rate from local plus connector capital.
//!
//! Unforced rebalances are rate limited by the poke cadence. Governance
//! transitions ([`attach_connector`], [`set_target_fraction`]) force one.
//! [`detach_emergency`] is the only path allowed to lower the rate.

use tracing::{debug, info, warn};

use crate::errors::{InvariantKind, VaultError, VaultResult};
use crate::events::{EventLog, VaultEvent};
use crate::exchange_rate::RateRefresh;
use crate::interfaces::{ConnectorDirectory, Ledger};
use crate::math::{mul_truncate, safe_add};
use crate::state::VaultState;
use crate::types::{require_address, CachedSnapshot, ConnectorId, ConnectorStatus};
use crate::yield_validator::validate_collection;

// ============================================================================
// Types
// ============================================================================

/// Collaborators and clock for one allocation step
pub struct AllocationContext<'a> {
    pub ledger: &'a mut dyn Ledger,
    pub connectors: &'a mut dyn ConnectorDirectory,
    pub events: &'a mut EventLog,
    /// Current unix time
    pub now: u64,
}

/// What a rebalance did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceOutcome {
    /// Capital recognized across local custody and the connector
    pub total: u128,
    /// Target connector balance (0 without a connector)
    pub ideal: u128,
    /// Underlying moved into the connector
    pub deposited: u128,
    /// Underlying moved out of the connector
    pub withdrawn: u128,
    pub refresh: RateRefresh,
}

// ============================================================================
// Snapshot & Exposure
// ============================================================================

/// Read fraction, raw balance and credits once
pub fn take_snapshot(state: &VaultState, ledger: &dyn Ledger) -> CachedSnapshot {
    state.snapshot(ledger.raw_balance(), ledger.total_supply())
}

/// Connector exposure against its ceiling of `fraction + headroom`.
///
/// Works from what credits are worth rather than a connector read, so it
/// stays cheap enough to run after every withdrawal.
pub fn connector_exposure_status(
    snapshot: &CachedSnapshot,
    rate: u128,
    headroom: u128,
) -> VaultResult<ConnectorStatus> {
    let total_collateral = mul_truncate(snapshot.total_credits, rate)?;
    let limit = mul_truncate(total_collateral, safe_add(snapshot.fraction, headroom)?)?;
    let in_connector = total_collateral.saturating_sub(snapshot.raw_balance);
    Ok(ConnectorStatus { limit, in_connector })
}

// ============================================================================
// Rebalance
// ============================================================================

/// Level the connector to `snapshot.fraction` of total capital and refresh
/// the rate.
///
/// # Errors
/// - `NothingToRebalance` with no credits outstanding
/// - `CadenceViolation` when unforced inside the cadence window
/// - `InvariantViolation` when the connector regressed or ends short
/// - `YieldAnomaly` when connector growth is implausible
pub fn rebalance(
    state: &mut VaultState,
    ctx: &mut AllocationContext<'_>,
    snapshot: CachedSnapshot,
    force: bool,
) -> VaultResult<RebalanceOutcome> {
    if snapshot.total_credits == 0 {
        return Err(VaultError::NothingToRebalance);
    }

    let elapsed = ctx.now.saturating_sub(state.connector.last_poke);
    let cadence = state.config.poke_cadence;
    if !force && elapsed <= cadence {
        return Err(VaultError::CadenceViolation {
            elapsed,
            required: cadence,
        });
    }
    state.connector.last_poke = ctx.now;

    let Some(id) = state.connector.connector else {
        let refresh = state.refresh_rate(
            snapshot.raw_balance,
            snapshot.total_credits,
            false,
            ctx.events,
            ctx.now,
        )?;
        ctx.events.emit(VaultEvent::PokedRaw { timestamp: ctx.now });
        debug!(raw_balance = snapshot.raw_balance, new_rate = refresh.new_rate, "rebalanced without connector");
        return Ok(RebalanceOutcome {
            total: snapshot.raw_balance,
            ideal: 0,
            deposited: 0,
            withdrawn: 0,
            refresh,
        });
    };

    let last_balance = state.connector.last_balance;
    let connector = ctx.connectors.connector_mut(&id)?;

    // 1. Yield since the last poke must be non-negative and plausible
    let connector_balance = connector.check_balance()?;
    if connector_balance < last_balance {
        warn!(connector_balance, last_balance, "connector balance regressed");
        return Err(VaultError::InvariantViolation {
            kind: InvariantKind::ConnectorRegressed,
            observed: connector_balance,
            expected: last_balance,
        });
    }
    let interest_detected = connector_balance - last_balance;
    if connector_balance > 0 {
        validate_collection(connector_balance, interest_detected, elapsed, state.yield_bounds())?;
    }

    // 2. Level the connector to the ideal share
    let mut total = safe_add(snapshot.raw_balance, connector_balance)?;
    let ideal = mul_truncate(total, snapshot.fraction)?;
    let mut deposited = 0;
    let mut withdrawn = 0;

    if ideal > connector_balance {
        deposited = ideal - connector_balance;
        ctx.ledger.transfer_out(&id, deposited)?;
        connector.deposit(deposited)?;
    } else if ideal < connector_balance {
        if ideal == 0 {
            withdrawn = connector.withdraw_all()?;
            ctx.ledger.transfer_in(&id, withdrawn)?;
            total = ctx.ledger.raw_balance();
        } else {
            withdrawn = connector_balance - ideal;
            connector.withdraw(withdrawn)?;
            ctx.ledger.transfer_in(&id, withdrawn)?;
        }
    }

    // 3. The connector must now hold at least the ideal amount
    let settled = connector.check_balance()?;
    if settled < ideal {
        return Err(VaultError::InvariantViolation {
            kind: InvariantKind::PostRebalanceShortfall,
            observed: settled,
            expected: ideal,
        });
    }

    // 4. Record and recognize
    state.connector.last_balance = ideal;
    let refresh = state.refresh_rate(total, snapshot.total_credits, false, ctx.events, ctx.now)?;
    ctx.events.emit(VaultEvent::Poked {
        old_balance: last_balance,
        new_balance: ideal,
        interest_detected,
        timestamp: ctx.now,
    });

    info!(
        total,
        ideal,
        deposited,
        withdrawn,
        interest_detected,
        new_rate = refresh.new_rate,
        "rebalanced connector"
    );

    Ok(RebalanceOutcome {
        total,
        ideal,
        deposited,
        withdrawn,
        refresh,
    })
}

// ============================================================================
// Governance Transitions
// ============================================================================

/// Drain the current connector, switch to `new_connector`, then level the
/// new one. `None` detaches without writing anything off.
///
/// With no credits outstanding there is nothing to move and only the
/// handle changes.
pub fn attach_connector(
    state: &mut VaultState,
    ctx: &mut AllocationContext<'_>,
    new_connector: Option<ConnectorId>,
) -> VaultResult<()> {
    if let Some(id) = &new_connector {
        require_address(id, "connector")?;
        ctx.connectors.connector(id)?;
    }

    let has_credits = ctx.ledger.total_supply() > 0;

    if has_credits {
        let mut drain = take_snapshot(state, &*ctx.ledger);
        drain.fraction = 0;
        rebalance(state, ctx, drain, true)?;
    }

    state.connector.connector = new_connector;
    state.connector.last_balance = 0;
    ctx.events.emit(VaultEvent::ConnectorUpdated {
        connector: new_connector,
        timestamp: ctx.now,
    });
    info!(connected = new_connector.is_some(), "connector updated");

    if has_credits {
        let snapshot = take_snapshot(state, &*ctx.ledger);
        rebalance(state, ctx, snapshot, true)?;
    }
    Ok(())
}

/// Set the share of capital targeted at the connector and rebalance to it
pub fn set_target_fraction(
    state: &mut VaultState,
    ctx: &mut AllocationContext<'_>,
    fraction: u128,
) -> VaultResult<()> {
    if fraction > state.config.max_fraction {
        return Err(VaultError::invalid("fraction", "must be <= 50%"));
    }
    state.connector.fraction = fraction;

    let snapshot = take_snapshot(state, &*ctx.ledger);
    if snapshot.total_credits > 0 {
        rebalance(state, ctx, snapshot, true)?;
    }

    ctx.events.emit(VaultEvent::FractionUpdated {
        fraction,
        timestamp: ctx.now,
    });
    debug!(fraction, "target fraction updated");
    Ok(())
}

/// Detach the connector without trusting its reported balance.
///
/// Pulls back `withdraw_amount` first if non-zero, then writes off
/// whatever is left and recomputes the rate from local custody alone.
pub fn detach_emergency(
    state: &mut VaultState,
    ctx: &mut AllocationContext<'_>,
    withdraw_amount: u128,
) -> VaultResult<RateRefresh> {
    let id = state
        .connector
        .connector
        .ok_or(VaultError::invalid("connector", "no connector attached"))?;

    // Detach before calling out
    state.connector.connector = None;
    state.connector.last_balance = 0;
    state.connector.fraction = 0;

    if withdraw_amount > 0 {
        ctx.connectors.connector_mut(&id)?.withdraw(withdraw_amount)?;
        ctx.ledger.transfer_in(&id, withdraw_amount)?;
    }

    ctx.events.emit(VaultEvent::ConnectorUpdated {
        connector: None,
        timestamp: ctx.now,
    });
    ctx.events.emit(VaultEvent::FractionUpdated {
        fraction: 0,
        timestamp: ctx.now,
    });

    let snapshot = take_snapshot(state, &*ctx.ledger);
    let refresh = state.refresh_rate(snapshot.raw_balance, snapshot.total_credits, true, ctx.events, ctx.now)?;
    ctx.events.emit(VaultEvent::EmergencyUpdate {
        withdrawn: withdraw_amount,
        timestamp: ctx.now,
    });

    warn!(
        withdrawn = withdraw_amount,
        raw_balance = snapshot.raw_balance,
        old_rate = refresh.old_rate,
        new_rate = refresh.new_rate,
        "emergency detach wrote off connector balance"
    );
    Ok(refresh)
}

// ============================================================================
// Tests
// ============================================================================
