//! Deposits and Redemptions
//!
//! Converting underlying into credits and back. Deposits and redemptions
//! collect pending interest first when automatic collection is on, so the
//! conversion uses an up-to-date rate.
//!
//! Redemptions burn before anything leaves custody, then check whether the
//! outflow pushed the connector above its ceiling and, if so, rebalance.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savings_common::{
    connector_allocator::{connector_exposure_status, rebalance, take_snapshot},
    errors::{VaultError, VaultResult},
    events::VaultEvent,
    interfaces::{ConnectorDirectory, InterestDistributor, Ledger, PermissionSource, UnwrapAdapter},
    types::{require_address, Address, AssetId, CallContext},
};

use crate::{SavingsVault, Work};

// ============ Request / Result Types ============

/// Redeem and convert the proceeds through an unwrap adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UnwrapRequest {
    /// Credits if `is_credit_amount`, otherwise underlying
    pub amount: u128,
    pub is_credit_amount: bool,
    /// Minimum output of the adapter
    pub min_amount_out: u128,
    /// Asset the adapter pays out
    pub output: AssetId,
    pub beneficiary: Address,
}

/// Outcome of a redeem-and-unwrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UnwrapResult {
    pub credits_burned: u128,
    pub underlying_redeemed: u128,
    /// Amount of the output asset sent to the beneficiary
    pub output_amount: u128,
}

/// Amounts settled by a burn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Burned {
    pub credits: u128,
    pub assets: u128,
}

// ============ Public Operations ============

impl<L, C, P, D> SavingsVault<L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    /// Deposit `assets` underlying from the caller and credit `beneficiary`.
    ///
    /// # Returns
    /// Credits issued
    pub fn deposit_savings(&mut self, ctx: CallContext, assets: u128, beneficiary: Address) -> VaultResult<u128> {
        self.execute("deposit_savings", ctx.now, |work| {
            let collect = work.state.automate_interest_collection;
            work.deposit_and_mint(&ctx.caller, assets, &beneficiary, collect)
        })
    }

    /// [`deposit_savings`](Self::deposit_savings), recording `referrer`
    pub fn deposit_savings_with_referrer(
        &mut self,
        ctx: CallContext,
        assets: u128,
        beneficiary: Address,
        referrer: Address,
    ) -> VaultResult<u128> {
        self.execute("deposit_savings_with_referrer", ctx.now, |work| {
            require_address(&referrer, "referrer")?;
            let collect = work.state.automate_interest_collection;
            let credits = work.deposit_and_mint(&ctx.caller, assets, &beneficiary, collect)?;
            work.events.emit(VaultEvent::Referral {
                referrer,
                beneficiary,
                amount: assets,
                timestamp: work.now,
            });
            Ok(credits)
        })
    }

    /// Mint exactly `credits` to `receiver`, pulling the rounded-up
    /// underlying cost from the caller.
    ///
    /// # Returns
    /// Underlying pulled
    pub fn mint_exact(&mut self, ctx: CallContext, credits: u128, receiver: Address) -> VaultResult<u128> {
        self.execute("mint_exact", ctx.now, |work| {
            if credits == 0 {
                return Err(VaultError::invalid("credits", "must be positive"));
            }
            require_address(&receiver, "receiver")?;
            if work.state.automate_interest_collection {
                work.collect_interest()?;
            }

            let (assets, rate) = work.state.engine.underlying_for_exact_credits(credits)?;
            work.ledger.transfer_in(&ctx.caller, assets)?;
            work.ledger.mint(&receiver, credits)?;

            work.events.emit(VaultEvent::SavingsDeposited {
                saver: receiver,
                assets_deposited: assets,
                credits_issued: credits,
                timestamp: work.now,
            });
            info!(assets, credits, rate, "minted exact credits");
            Ok(assets)
        })
    }

    /// Burn `credits` of the caller's own balance and pay out underlying
    pub fn redeem(&mut self, ctx: CallContext, credits: u128) -> VaultResult<u128> {
        self.redeem_credits(ctx, credits, ctx.caller, ctx.caller)
    }

    /// Burn `credits` of `owner` and send the underlying to `receiver`.
    /// A caller other than `owner` spends `owner`'s allowance.
    ///
    /// # Returns
    /// Underlying paid out
    pub fn redeem_credits(
        &mut self,
        ctx: CallContext,
        credits: u128,
        receiver: Address,
        owner: Address,
    ) -> VaultResult<u128> {
        self.execute("redeem_credits", ctx.now, |work| {
            let collect = work.state.automate_interest_collection;
            let burned = work.burn_and_withdraw(&ctx.caller, credits, true, &receiver, &owner, true, collect)?;
            Ok(burned.assets)
        })
    }

    /// Pay out exactly `assets` underlying to `receiver`, burning the
    /// credits they cost from `owner`.
    ///
    /// # Returns
    /// Credits burned
    pub fn redeem_underlying(
        &mut self,
        ctx: CallContext,
        assets: u128,
        receiver: Address,
        owner: Address,
    ) -> VaultResult<u128> {
        self.execute("redeem_underlying", ctx.now, |work| {
            let collect = work.state.automate_interest_collection;
            let burned = work.burn_and_withdraw(&ctx.caller, assets, false, &receiver, &owner, true, collect)?;
            Ok(burned.credits)
        })
    }

    /// Redeem the caller's credits and route the underlying through
    /// `adapter` into `request.output`.
    ///
    /// # Errors
    /// `OutputMismatch` if the redeemed figure in the request's unit differs
    /// from the request, `SlippageExceeded` if the adapter pays out less than
    /// `min_amount_out`
    pub fn redeem_and_unwrap<A: UnwrapAdapter>(
        &mut self,
        ctx: CallContext,
        request: UnwrapRequest,
        adapter: &mut A,
    ) -> VaultResult<UnwrapResult> {
        let adapter_account = adapter.address();
        adapter.begin();
        let result = self.execute("redeem_and_unwrap", ctx.now, |work| {
            require_address(&request.beneficiary, "beneficiary")?;
            let collect = work.state.automate_interest_collection;
            let caller = ctx.caller;
            // Underlying goes to the adapter before the exposure check
            let burned = work.burn_and_withdraw(
                &caller,
                request.amount,
                request.is_credit_amount,
                &adapter_account,
                &caller,
                true,
                collect,
            )?;

            let redeemed = if request.is_credit_amount {
                burned.credits
            } else {
                burned.assets
            };
            if redeemed != request.amount {
                return Err(VaultError::OutputMismatch {
                    expected: request.amount,
                    actual: redeemed,
                });
            }

            let underlying = work.state.config.underlying;
            let output_amount = adapter.unwrap_and_send(
                &underlying,
                &request.output,
                burned.assets,
                request.min_amount_out,
                &request.beneficiary,
            )?;
            if output_amount < request.min_amount_out {
                return Err(VaultError::SlippageExceeded {
                    minimum: request.min_amount_out,
                    received: output_amount,
                });
            }

            Ok(UnwrapResult {
                credits_burned: burned.credits,
                underlying_redeemed: burned.assets,
                output_amount,
            })
        });

        match result {
            Ok(_) => adapter.commit(),
            Err(_) => adapter.rollback(),
        }
        result
    }
}

// ============ Core Flows ============

impl<'a, L, C, P, D> Work<'a, L, C, P, D>
where
    L: Ledger,
    C: ConnectorDirectory,
    P: PermissionSource,
    D: InterestDistributor,
{
    /// Pull pending interest from the distributor, if any
    pub fn collect_interest(&mut self) -> VaultResult<()> {
        let underlying = self.state.config.underlying;
        if let Some(payout) = self.distributor.collect_and_distribute_interest(&underlying)? {
            if payout.amount > 0 {
                self.deposit_interest(&payout.source, payout.amount)?;
            }
        }
        Ok(())
    }

    /// Take `amount` of interest from `source` and spread it over every
    /// outstanding credit
    pub fn deposit_interest(&mut self, source: &Address, amount: u128) -> VaultResult<()> {
        self.require_interest_distributor(source)?;
        if amount == 0 {
            return Err(VaultError::invalid("amount", "must deposit something"));
        }

        self.ledger.transfer_in(source, amount)?;

        let total_credits = self.ledger.total_supply();
        if total_credits > 0 {
            let (total_collateral, _) = self.state.engine.credits_to_underlying(total_credits)?;
            let observed = total_collateral
                .checked_add(amount)
                .ok_or(VaultError::Overflow)?;
            let refresh = self
                .state
                .refresh_rate(observed, total_credits, false, self.events, self.now)?;
            info!(amount, new_rate = refresh.new_rate, "interest deposited");
        }
        Ok(())
    }

    /// Take `assets` from `saver` and mint the credits they buy to
    /// `beneficiary`
    pub fn deposit_and_mint(
        &mut self,
        saver: &Address,
        assets: u128,
        beneficiary: &Address,
        collect_interest_first: bool,
    ) -> VaultResult<u128> {
        if assets == 0 {
            return Err(VaultError::invalid("assets", "must deposit something"));
        }
        require_address(beneficiary, "beneficiary")?;

        if collect_interest_first {
            self.collect_interest()?;
        }

        let (credits, rate) = self.state.engine.credits_for_deposit(assets)?;
        if credits == 0 {
            return Err(VaultError::invalid("assets", "worth less than one credit"));
        }
        self.ledger.transfer_in(saver, assets)?;
        self.ledger.mint(beneficiary, credits)?;

        self.events.emit(VaultEvent::SavingsDeposited {
            saver: *beneficiary,
            assets_deposited: assets,
            credits_issued: credits,
            timestamp: self.now,
        });
        info!(assets, credits, rate, "savings deposited");
        Ok(credits)
    }

    /// Burn `owner`'s credits for `amount` (credits or underlying) and
    /// optionally send the underlying to `receiver`
    #[allow(clippy::too_many_arguments)]
    pub fn burn_and_withdraw(
        &mut self,
        caller: &Address,
        amount: u128,
        is_credit_amount: bool,
        receiver: &Address,
        owner: &Address,
        transfer_assets_out: bool,
        collect_interest_first: bool,
    ) -> VaultResult<Burned> {
        if amount == 0 {
            return Err(VaultError::invalid("amount", "must withdraw something"));
        }
        require_address(receiver, "receiver")?;
        require_address(owner, "owner")?;

        if collect_interest_first {
            self.collect_interest()?;
        }

        let engine = &self.state.engine;
        let (credits, assets) = if is_credit_amount {
            let (assets, _) = engine.credits_to_underlying(amount)?;
            (amount, assets)
        } else {
            let (credits, _) = engine.underlying_to_credits(amount)?;
            (credits, amount)
        };

        if caller != owner {
            self.ledger.spend_allowance(owner, caller, credits)?;
        }

        // Burn before anything leaves custody
        self.ledger.burn(owner, credits)?;
        if transfer_assets_out {
            self.ledger.transfer_out(receiver, assets)?;
        }

        let snapshot = take_snapshot(&*self.state, &*self.ledger);
        let status = connector_exposure_status(
            &snapshot,
            self.state.engine.rate(),
            self.state.config.exposure_headroom,
        )?;
        if status.is_over_limit() {
            debug!(limit = status.limit, in_connector = status.in_connector, "connector over limit after withdrawal");
            let (state, mut ctx) = self.allocation();
            rebalance(state, &mut ctx, snapshot, false)?;
        }

        self.events.emit(VaultEvent::CreditsRedeemed {
            owner: *owner,
            receiver: *receiver,
            credits_redeemed: credits,
            assets_returned: assets,
            timestamp: self.now,
        });
        info!(credits, assets, "credits redeemed");
        Ok(Burned { credits, assets })
    }
}
