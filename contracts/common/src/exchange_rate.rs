//! Exchange Rate Engine
//!
//! Owns the credit/underlying exchange rate (1e18 scale, 1 credit = rate
//! underlying). The rate only moves through [`ExchangeRateEngine::refresh_rate`],
//! which refuses to recognize less capital than outstanding credits are
//! already worth unless the caller explicitly allows a write-down.
//!
//! ## Rounding
//!
//! - Conversions mint one extra credit on top of the floored conversion.
//!   Deposits drop it when it would be worth more than was paid in.
//! - Rate recomputation divides by `total_credits - 1`, pricing that extra
//!   credit back out of the rate.
//! - Redemptions floor; exact-credit mints take the ceiling.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{InvariantKind, VaultError, VaultResult};
use crate::math::{div_precisely, max, mul_truncate, mul_truncate_ceil, safe_add};

/// Outcome of a rate refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRefresh {
    pub old_rate: u128,
    pub new_rate: u128,
    /// Observed capital in excess of what credits were worth before
    pub interest_collected: u128,
}

/// The monotonic credit/underlying exchange rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ExchangeRateEngine {
    rate: u128,
}

impl ExchangeRateEngine {
    /// Start at `initial_rate`
    pub fn new(initial_rate: u128) -> VaultResult<Self> {
        if initial_rate == 0 {
            return Err(VaultError::invalid("initial_rate", "must be positive"));
        }
        Ok(Self { rate: initial_rate })
    }

    /// Current rate (1e18 scale)
    pub fn rate(&self) -> u128 {
        self.rate
    }

    /// Credits issued for `assets`, with the rate used
    pub fn underlying_to_credits(&self, assets: u128) -> VaultResult<(u128, u128)> {
        let credits = safe_add(div_precisely(assets, self.rate)?, 1)?;
        Ok((credits, self.rate))
    }

    /// Credits a deposit of `assets` mints, with the rate used.
    ///
    /// Starts from [`underlying_to_credits`](Self::underlying_to_credits)
    /// and drops the bias credit when it would redeem for more than
    /// `assets`, which happens once the rate passes 1.0. May be zero for
    /// deposits worth less than one credit.
    pub fn credits_for_deposit(&self, assets: u128) -> VaultResult<(u128, u128)> {
        let (credits, rate) = self.underlying_to_credits(assets)?;
        let (worth, _) = self.credits_to_underlying(credits)?;
        if worth > assets {
            return Ok((credits - 1, rate));
        }
        Ok((credits, rate))
    }

    /// Underlying paid out for `credits`, with the rate used
    pub fn credits_to_underlying(&self, credits: u128) -> VaultResult<(u128, u128)> {
        Ok((mul_truncate(credits, self.rate)?, self.rate))
    }

    /// Underlying required to mint exactly `credits`
    pub fn underlying_for_exact_credits(&self, credits: u128) -> VaultResult<(u128, u128)> {
        Ok((mul_truncate_ceil(credits, self.rate)?, self.rate))
    }

    /// Rate implied by `total_collateral` backing `total_credits`.
    /// Needs at least two credits outstanding.
    pub fn recompute_rate(total_collateral: u128, total_credits: u128) -> VaultResult<u128> {
        if total_credits <= 1 {
            return Err(VaultError::DivisionByZero);
        }
        div_precisely(total_collateral, total_credits - 1)
    }

    /// Recognize `observed_total` as the capital backing `total_credits`.
    ///
    /// Without `allow_decrease` this fails with `InvariantViolation` if the
    /// observed capital is below what credits are already worth, and never
    /// lowers the rate. With one credit or fewer outstanding the check still
    /// runs but the rate is left untouched.
    pub fn refresh_rate(
        &mut self,
        observed_total: u128,
        total_credits: u128,
        allow_decrease: bool,
    ) -> VaultResult<RateRefresh> {
        let old_rate = self.rate;
        let (committed, _) = self.credits_to_underlying(total_credits)?;

        if !allow_decrease && observed_total < committed {
            return Err(VaultError::InvariantViolation {
                kind: InvariantKind::RateDecrease,
                observed: observed_total,
                expected: committed,
            });
        }

        let interest_collected = observed_total.saturating_sub(committed);

        if total_credits <= 1 {
            return Ok(RateRefresh {
                old_rate,
                new_rate: old_rate,
                interest_collected,
            });
        }

        let recomputed = Self::recompute_rate(observed_total, total_credits)?;
        let new_rate = if allow_decrease {
            recomputed
        } else {
            // Dust rounding can land a hair below the current rate
            max(recomputed, old_rate)
        };
        self.rate = new_rate;

        debug!(old_rate, new_rate, observed_total, total_credits, "exchange rate refreshed");

        Ok(RateRefresh {
            old_rate,
            new_rate,
            interest_collected,
        })
    }
}
