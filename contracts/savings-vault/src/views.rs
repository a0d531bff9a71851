//! Read-only views
//!
//! Previews convert at the committed rate and do not collect pending
//! interest, so an actual deposit or redemption can land on a higher rate.

use savings_common::{
    connector_allocator::{connector_exposure_status, take_snapshot},
    errors::VaultResult,
    interfaces::{ConnectorDirectory, InterestDistributor, Ledger, PermissionSource, UnwrapAdapter},
    math::safe_add,
    types::{Address, AssetId, ConnectorStatus},
};

use crate::SavingsVault;

impl<L, C, P, D> SavingsVault<L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    /// Current exchange rate (1e18 scale)
    pub fn exchange_rate(&self) -> u128 {
        self.state.engine.rate()
    }

    /// Credits held by `holder`
    pub fn credit_balance(&self, holder: &Address) -> u128 {
        self.ledger.balance_of(holder)
    }

    /// Underlying `holder`'s credits redeem for
    pub fn balance_of_underlying(&self, holder: &Address) -> VaultResult<u128> {
        let (assets, _) = self
            .state
            .engine
            .credits_to_underlying(self.ledger.balance_of(holder))?;
        Ok(assets)
    }

    /// Underlying all outstanding credits redeem for
    pub fn total_assets(&self) -> VaultResult<u128> {
        let (assets, _) = self
            .state
            .engine
            .credits_to_underlying(self.ledger.total_supply())?;
        Ok(assets)
    }

    /// Underlying in custody plus what the connector reports
    pub fn total_holdings(&self) -> VaultResult<u128> {
        let in_connector = match &self.state.connector.connector {
            Some(id) => self.connectors.connector(id)?.check_balance()?,
            None => 0,
        };
        safe_add(self.ledger.raw_balance(), in_connector)
    }

    /// Credits a deposit of `assets` would issue
    pub fn preview_deposit(&self, assets: u128) -> VaultResult<u128> {
        Ok(self.state.engine.credits_for_deposit(assets)?.0)
    }

    /// Underlying `mint_exact` would pull for `credits`
    pub fn preview_mint(&self, credits: u128) -> VaultResult<u128> {
        Ok(self.state.engine.underlying_for_exact_credits(credits)?.0)
    }

    /// Underlying a redemption of `credits` would pay
    pub fn preview_redeem(&self, credits: u128) -> VaultResult<u128> {
        Ok(self.state.engine.credits_to_underlying(credits)?.0)
    }

    /// Credits a redemption of exactly `assets` would burn
    pub fn preview_withdraw(&self, assets: u128) -> VaultResult<u128> {
        Ok(self.state.engine.underlying_to_credits(assets)?.0)
    }

    /// Most credits `owner` can redeem
    pub fn max_redeem(&self, owner: &Address) -> u128 {
        self.ledger.balance_of(owner)
    }

    /// Most underlying `owner` can withdraw
    pub fn max_withdraw(&self, owner: &Address) -> VaultResult<u128> {
        self.balance_of_underlying(owner)
    }

    /// Connector exposure against its ceiling
    pub fn connector_status(&self) -> VaultResult<ConnectorStatus> {
        let snapshot = take_snapshot(&self.state, &self.ledger);
        connector_exposure_status(
            &snapshot,
            self.state.engine.rate(),
            self.state.config.exposure_headroom,
        )
    }

    /// Output `adapter` expects for redeeming `amount` into `output`
    pub fn estimate_redeem_and_unwrap<A: UnwrapAdapter>(
        &self,
        amount: u128,
        is_credit_amount: bool,
        output: &AssetId,
        adapter: &A,
    ) -> VaultResult<u128> {
        let assets = if is_credit_amount {
            self.preview_redeem(amount)?
        } else {
            amount
        };
        adapter.estimate_output(&self.state.config.underlying, output, assets)
    }
}
