//! Privileged Operations
//!
//! Entry points gated on the injected [`PermissionSource`]: interest
//! deposits, pokes, connector and fraction changes, the emergency detach
//! and the automatic interest collection switch.

use tracing::info;

use savings_common::{
    connector_allocator::{attach_connector, detach_emergency, rebalance, set_target_fraction, take_snapshot, RebalanceOutcome},
    errors::VaultResult,
    events::VaultEvent,
    exchange_rate::RateRefresh,
    interfaces::{ConnectorDirectory, InterestDistributor, Ledger, PermissionSource},
    types::{CallContext, ConnectorId},
};

use crate::SavingsVault;

impl<L, C, P, D> SavingsVault<L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    // ============ Interest ============

    /// Pull `amount` underlying from the caller, an authorized interest
    /// distributor, and raise the rate by it
    pub fn deposit_interest(&mut self, ctx: CallContext, amount: u128) -> VaultResult<()> {
        self.execute("deposit_interest", ctx.now, |work| work.deposit_interest(&ctx.caller, amount))
    }

    /// Toggle interest collection ahead of deposits and redemptions
    pub fn set_automate_interest_collection(&mut self, ctx: CallContext, enabled: bool) -> VaultResult<()> {
        self.execute("set_automate_interest_collection", ctx.now, |work| {
            work.require_governor(&ctx.caller)?;
            work.state.automate_interest_collection = enabled;
            work.events.emit(VaultEvent::AutomaticInterestCollectionSwitched {
                enabled,
                timestamp: work.now,
            });
            Ok(())
        })
    }

    // ============ Allocation ============

    /// Unforced rebalance; fails inside the cadence window
    pub fn poke(&mut self, ctx: CallContext) -> VaultResult<RebalanceOutcome> {
        self.execute("poke", ctx.now, |work| {
            work.require_poker(&ctx.caller)?;
            let snapshot = take_snapshot(&*work.state, &*work.ledger);
            let (state, mut alloc) = work.allocation();
            rebalance(state, &mut alloc, snapshot, false)
        })
    }

    /// Move capital from the current connector to `connector`, or back
    /// into custody with `None`
    pub fn set_connector(&mut self, ctx: CallContext, connector: Option<ConnectorId>) -> VaultResult<()> {
        self.execute("set_connector", ctx.now, |work| {
            work.require_governor(&ctx.caller)?;
            let (state, mut alloc) = work.allocation();
            attach_connector(state, &mut alloc, connector)
        })
    }

    /// Change the share of capital targeted at the connector (1e18 scale)
    pub fn set_fraction(&mut self, ctx: CallContext, fraction: u128) -> VaultResult<()> {
        self.execute("set_fraction", ctx.now, |work| {
            work.require_governor(&ctx.caller)?;
            let (state, mut alloc) = work.allocation();
            set_target_fraction(state, &mut alloc, fraction)
        })
    }

    /// Detach the connector after pulling back `withdraw_amount`, writing
    /// off whatever it still holds. The only operation that can lower the
    /// exchange rate.
    pub fn emergency_withdraw(&mut self, ctx: CallContext, withdraw_amount: u128) -> VaultResult<RateRefresh> {
        let refresh = self.execute("emergency_withdraw", ctx.now, |work| {
            work.require_governor(&ctx.caller)?;
            let (state, mut alloc) = work.allocation();
            detach_emergency(state, &mut alloc, withdraw_amount)
        })?;
        info!(old_rate = refresh.old_rate, new_rate = refresh.new_rate, "emergency withdrawal committed");
        Ok(refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use savings_common::{
        constants::scale::{FULL_SCALE, ONE_PERCENT},
        errors::VaultError,
        events::EventType,
    };

    #[test]
    fn test_deposit_interest_requires_distributor() {
        let mut h = Harness::new();
        h.vault.deposit_savings(h.ctx(ALICE), 100, ALICE).unwrap();

        let result = h.vault.deposit_interest(h.ctx(ALICE), 10);
        assert!(matches!(
            result,
            Err(VaultError::PermissionDenied { caller: ALICE, required: "interest distributor" })
        ));

        h.vault.deposit_interest(h.ctx(DISTRIBUTOR), 10).unwrap();
        assert_eq!(h.vault.exchange_rate(), 110_000_000_000_000_000);
        let last = h.vault.events().filter_by_type(EventType::ExchangeRateUpdated);
        assert_eq!(
            last.last(),
            Some(&&VaultEvent::ExchangeRateUpdated {
                new_rate: 110_000_000_000_000_000,
                interest_collected: 10,
                timestamp: START,
            })
        );
    }

    #[test]
    fn test_deposit_interest_before_any_credits() {
        let mut h = Harness::new();
        h.vault.deposit_interest(h.ctx(DISTRIBUTOR), 10).unwrap();
        assert_eq!(h.vault.exchange_rate(), FULL_SCALE / 10);
        assert_eq!(h.vault.ledger().raw_balance(), 10);
        assert!(h.vault.events().filter_by_type(EventType::ExchangeRateUpdated).is_empty());
    }

    #[test]
    fn test_zero_interest_rejected() {
        let mut h = Harness::new();
        assert!(matches!(
            h.vault.deposit_interest(h.ctx(DISTRIBUTOR), 0),
            Err(VaultError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_governance_gates() {
        let mut h = Harness::new();
        h.vault.deposit_savings(h.ctx(ALICE), 100, ALICE).unwrap();
        let denied = |r: VaultResult<()>| matches!(r, Err(VaultError::PermissionDenied { required: "governor", .. }));

        assert!(denied(h.vault.set_connector(h.ctx(ALICE), Some(CONNECTOR))));
        assert!(denied(h.vault.set_fraction(h.ctx(ALICE), 10 * ONE_PERCENT)));
        assert!(denied(h.vault.set_automate_interest_collection(h.ctx(ALICE), false)));
        assert!(matches!(
            h.vault.emergency_withdraw(h.ctx(POKER), 0),
            Err(VaultError::PermissionDenied { .. })
        ));
        assert!(matches!(
            h.vault.poke(h.ctx(GOVERNOR)),
            Err(VaultError::PermissionDenied { required: "poker", .. })
        ));
    }

    #[test]
    fn test_poke_respects_cadence() {
        let mut h = Harness::connected(20 * ONE_PERCENT);

        let result = h.vault.poke(h.ctx(POKER));
        assert!(matches!(result, Err(VaultError::CadenceViolation { .. })));

        h.advance(4 * HOUR + 1);
        let outcome = h.vault.poke(h.ctx(POKER)).unwrap();
        assert_eq!(outcome.ideal, 20);
        assert_eq!(h.vault.state().connector.last_poke, h.now);
    }

    #[test]
    fn test_toggle_interest_collection_event() {
        let mut h = Harness::new();
        h.vault
            .set_automate_interest_collection(h.ctx(GOVERNOR), false)
            .unwrap();
        assert!(!h.vault.state().automate_interest_collection);
        assert_eq!(
            h.vault.events().last(),
            Some(&VaultEvent::AutomaticInterestCollectionSwitched { enabled: false, timestamp: START })
        );
    }

    #[test]
    fn test_set_connector_before_deposits() {
        let mut h = Harness::new();
        h.vault.set_fraction(h.ctx(GOVERNOR), 20 * ONE_PERCENT).unwrap();
        h.vault.set_connector(h.ctx(GOVERNOR), Some(CONNECTOR)).unwrap();
        assert_eq!(h.vault.state().connector.connector, Some(CONNECTOR));

        // First poke after deposits moves the target share out
        h.vault.deposit_savings(h.ctx(ALICE), 100, ALICE).unwrap();
        h.advance(4 * HOUR + 1);
        h.vault.poke(h.ctx(POKER)).unwrap();
        assert_eq!(h.connector_balance(CONNECTOR), 20);
        assert_eq!(h.vault.ledger().raw_balance(), 80);
    }
}
