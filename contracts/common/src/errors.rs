//! Error Types for the Savings Vault
//!
//! Every failure aborts the in-flight operation as a unit. The variants
//! carry enough context to tell the caller which guard tripped.

use thiserror::Error;

use crate::types::Address;

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Which core invariant was about to be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    /// Observed capital is below what credits are already worth
    RateDecrease,
    /// Connector reported less than it held at the last poke
    ConnectorRegressed,
    /// Connector holds less than the ideal amount after leveling
    PostRebalanceShortfall,
}

impl core::fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::RateDecrease => "exchange rate must not decrease",
            Self::ConnectorRegressed => "connector balance regressed",
            Self::PostRebalanceShortfall => "connector shortfall after rebalance",
        };
        f.write_str(s)
    }
}

/// Main error enum for all vault errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // ============ Invariant Errors ============
    /// A core accounting invariant would be violated
    #[error("invariant violation: {kind} (observed {observed}, expected at least {expected})")]
    InvariantViolation {
        kind: InvariantKind,
        observed: u128,
        expected: u128,
    },

    /// Connector yield exceeds the sanity bounds
    #[error("yield anomaly: measured {measured} exceeds limit {limit} over {elapsed}s")]
    YieldAnomaly {
        measured: u128,
        limit: u128,
        elapsed: u64,
    },

    /// Rebalance attempted inside the cadence window
    #[error("rebalance cadence not elapsed: {elapsed}s since last poke, need more than {required}s")]
    CadenceViolation { elapsed: u64, required: u64 },

    /// Rebalance requested while no credits are outstanding
    #[error("nothing to rebalance: no credits outstanding")]
    NothingToRebalance,

    // ============ Authorization Errors ============
    /// Caller lacks the capability for this operation
    #[error("permission denied: caller lacks {required} rights")]
    PermissionDenied {
        caller: Address,
        required: &'static str,
    },

    // ============ Amount Errors ============
    /// Holder does not have enough to cover the request
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// Spender allowance does not cover the request
    #[error("insufficient allowance: allowed {allowed}, requested {requested}")]
    InsufficientAllowance { allowed: u128, requested: u128 },

    /// Invalid input parameter (zero amount, zero address, fraction too high)
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument {
        param: &'static str,
        reason: &'static str,
    },

    /// The redeemed figure differs from the figure the caller asked for
    #[error("output mismatch: expected {expected}, got {actual}")]
    OutputMismatch { expected: u128, actual: u128 },

    /// Unwrapped output below the caller's minimum
    #[error("slippage exceeded: minimum {minimum}, received {received}")]
    SlippageExceeded { minimum: u128, received: u128 },

    // ============ Collaborator Errors ============
    /// An external collaborator refused or failed the call
    #[error("external call to {collaborator} failed: {reason}")]
    ExternalCallFailed {
        collaborator: &'static str,
        reason: &'static str,
    },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
}

impl VaultError {
    /// Shorthand for an [`VaultError::InvalidArgument`]
    pub fn invalid(param: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { param, reason }
    }

    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvariantViolation { .. } => "E001_INVARIANT",
            Self::YieldAnomaly { .. } => "E002_YIELD_ANOMALY",
            Self::CadenceViolation { .. } => "E003_CADENCE",
            Self::NothingToRebalance => "E004_NOTHING_TO_REBALANCE",
            Self::PermissionDenied { .. } => "E010_PERMISSION_DENIED",
            Self::InsufficientBalance { .. } => "E020_INSUFFICIENT_BALANCE",
            Self::InsufficientAllowance { .. } => "E021_INSUFFICIENT_ALLOWANCE",
            Self::InvalidArgument { .. } => "E022_INVALID_ARGUMENT",
            Self::OutputMismatch { .. } => "E023_OUTPUT_MISMATCH",
            Self::SlippageExceeded { .. } => "E024_SLIPPAGE",
            Self::ExternalCallFailed { .. } => "E030_EXTERNAL_CALL",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if the caller can fix the failure by changing inputs
    /// or waiting, as opposed to a guard that needs governance attention
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CadenceViolation { .. } => true,     // Wait for the window
            Self::InsufficientBalance { .. } => true,  // Get more funds
            Self::InsufficientAllowance { .. } => true, // Raise the allowance
            Self::InvalidArgument { .. } => true,
            Self::SlippageExceeded { .. } => true,
            _ => false,
        }
    }
}
