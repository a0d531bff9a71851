//! Yield Validator
//!
//! Sanity bounds on a yield figure reported by an untrusted source. Over a
//! long window the increase is annualized and compared against `max_apy`;
//! inside the short window a flat cap on the raw increase applies, so a
//! single cadence window cannot be used to inflate the rate.

use tracing::warn;

use crate::constants::{time, yield_bounds};
use crate::errors::{VaultError, VaultResult};
use crate::math::{div_precisely, max};

/// Bounds a collection must fall within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldBounds {
    /// Maximum extrapolated APY for windows longer than 30 minutes
    pub max_apy: u128,
    /// Maximum raw increase for windows of 30 minutes or less
    pub base_apy: u128,
}

impl Default for YieldBounds {
    fn default() -> Self {
        Self {
            max_apy: yield_bounds::MAX_APY,
            base_apy: yield_bounds::BASE_APY,
        }
    }
}

/// Validate that `interest` accrued on top of `new_supply - interest` over
/// `elapsed` seconds is plausible.
///
/// # Returns
/// The extrapolated APY (1e18 scale)
///
/// # Errors
/// `YieldAnomaly` when a bound is exceeded, including any positive interest
/// on a zero base. `Underflow` when `interest > new_supply`.
pub fn validate_collection(
    new_supply: u128,
    interest: u128,
    elapsed: u64,
    bounds: YieldBounds,
) -> VaultResult<u128> {
    // Protect against division by 0
    let protected_time = max(1, elapsed as u128);

    let old_supply = new_supply
        .checked_sub(interest)
        .ok_or(VaultError::Underflow)?;

    if old_supply == 0 {
        if interest == 0 {
            return Ok(0);
        }
        warn!(interest, "yield reported on an empty base");
        return Err(VaultError::YieldAnomaly {
            measured: u128::MAX,
            limit: bounds.base_apy,
            elapsed,
        });
    }

    let percent_increase = saturate(div_precisely(interest, old_supply))?;
    let years_elapsed = div_precisely(protected_time, time::SECONDS_PER_YEAR as u128)?;
    let extrapolated_apy = saturate(div_precisely(percent_increase, years_elapsed))?;

    if protected_time > time::SHORT_WINDOW as u128 {
        if extrapolated_apy >= bounds.max_apy {
            warn!(extrapolated_apy, limit = bounds.max_apy, elapsed, "extrapolated APY out of bounds");
            return Err(VaultError::YieldAnomaly {
                measured: extrapolated_apy,
                limit: bounds.max_apy,
                elapsed,
            });
        }
    } else if percent_increase >= bounds.base_apy {
        warn!(percent_increase, limit = bounds.base_apy, elapsed, "short-window increase out of bounds");
        return Err(VaultError::YieldAnomaly {
            measured: percent_increase,
            limit: bounds.base_apy,
            elapsed,
        });
    }

    Ok(extrapolated_apy)
}

// Ratios too large for u128 are still just "too large"
fn saturate(result: VaultResult<u128>) -> VaultResult<u128> {
    match result {
        Err(VaultError::Overflow) => Ok(u128::MAX),
        other => other,
    }
}
