//! Fixed-Point Math for the Savings Vault
//!
//! Scaled-integer primitives. Quantities are `u128`; products are formed in
//! 256 bits so that `1e18`-scaled values can be multiplied without loss.
//! Any result that does not fit back into `u128` is an `Overflow` error.
//!
//! Rounding is part of the contract: callers pick the truncating or ceiling
//! variant so that rounding always lands in the vault's favour.

use uint::construct_uint;

use crate::constants::scale::FULL_SCALE;
use crate::errors::{VaultError, VaultResult};

construct_uint! {
    /// 256-bit unsigned integer for intermediate products
    pub struct U256(4);
}

fn narrow(value: U256) -> VaultResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(VaultError::Overflow);
    }
    Ok(value.as_u128())
}

/// `floor(x * y / FULL_SCALE)`
pub fn mul_truncate(x: u128, y: u128) -> VaultResult<u128> {
    mul_truncate_scale(x, y, FULL_SCALE)
}

/// `floor(x * y / scale)`
pub fn mul_truncate_scale(x: u128, y: u128, scale: u128) -> VaultResult<u128> {
    if scale == 0 {
        return Err(VaultError::DivisionByZero);
    }
    narrow(U256::from(x) * U256::from(y) / U256::from(scale))
}

/// `ceil(x * y / FULL_SCALE)`
pub fn mul_truncate_ceil(x: u128, y: u128) -> VaultResult<u128> {
    let scale = U256::from(FULL_SCALE);
    // Two u128 factors stay below 2^256 - 2^129, so adding the scale cannot wrap
    let product = U256::from(x) * U256::from(y);
    narrow((product + scale - U256::one()) / scale)
}

/// `floor(x * FULL_SCALE / y)`
pub fn div_precisely(x: u128, y: u128) -> VaultResult<u128> {
    if y == 0 {
        return Err(VaultError::DivisionByZero);
    }
    narrow(U256::from(x) * U256::from(FULL_SCALE) / U256::from(y))
}

/// Smaller of two values
pub fn min(x: u128, y: u128) -> u128 {
    if x < y { x } else { y }
}

/// Larger of two values
pub fn max(x: u128, y: u128) -> u128 {
    if x > y { x } else { y }
}

/// Clamp `x` to at most `upper_bound`
pub fn clamp(x: u128, upper_bound: u128) -> u128 {
    min(x, upper_bound)
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> VaultResult<u128> {
    a.checked_add(b).ok_or(VaultError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> VaultResult<u128> {
    a.checked_sub(b).ok_or(VaultError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::scale::RATIO_SCALE;

    const ONE: u128 = FULL_SCALE;

    #[test]
    fn test_mul_truncate_floors() {
        // 3 * 0.5 = 1.5 -> 1
        assert_eq!(mul_truncate(3, ONE / 2).unwrap(), 1);
        // 1001 credits at 0.1 = 100.1 -> 100
        assert_eq!(mul_truncate(1001, ONE / 10).unwrap(), 100);
        assert_eq!(mul_truncate(0, ONE).unwrap(), 0);
    }

    #[test]
    fn test_mul_truncate_custom_scale() {
        // 250 at ratio 1.5 (1e8 scale) = 375
        assert_eq!(mul_truncate_scale(250, 150_000_000, RATIO_SCALE).unwrap(), 375);
        assert_eq!(mul_truncate_scale(1, 1, 0), Err(VaultError::DivisionByZero));
    }

    #[test]
    fn test_mul_truncate_ceil_rounds_up() {
        assert_eq!(mul_truncate_ceil(3, ONE / 2).unwrap(), 2);
        // Exact products do not round
        assert_eq!(mul_truncate_ceil(4, ONE / 2).unwrap(), 2);
        assert_eq!(mul_truncate_ceil(0, ONE).unwrap(), 0);
    }

    #[test]
    fn test_div_precisely() {
        // 100 / 0.1 = 1000
        assert_eq!(div_precisely(100, ONE / 10).unwrap(), 1000);
        // 110 / 1000 = 0.11
        assert_eq!(div_precisely(110, 1000).unwrap(), 11 * ONE / 100);
        assert_eq!(div_precisely(1, 0), Err(VaultError::DivisionByZero));
    }

    #[test]
    fn test_wide_intermediates() {
        // 1e30 * 1e18 overflows u128 but the quotient fits
        let big = 1_000_000_000_000_000_000_000_000_000_000u128;
        assert_eq!(mul_truncate(big, ONE).unwrap(), big);
        assert_eq!(div_precisely(big, ONE).unwrap(), big);
    }

    #[test]
    fn test_overflow_traps() {
        assert_eq!(mul_truncate(u128::MAX, 2 * ONE), Err(VaultError::Overflow));
        assert_eq!(div_precisely(u128::MAX, 1), Err(VaultError::Overflow));
        assert_eq!(mul_truncate_ceil(u128::MAX, u128::MAX), Err(VaultError::Overflow));
    }

    #[test]
    fn test_min_max_clamp() {
        assert_eq!(min(3, 7), 3);
        assert_eq!(max(3, 7), 7);
        assert_eq!(clamp(10, 7), 7);
        assert_eq!(clamp(5, 7), 5);
    }

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert_eq!(safe_add(u128::MAX, 1), Err(VaultError::Overflow));
        assert_eq!(safe_sub(1, 2), Err(VaultError::Underflow));
    }
}
