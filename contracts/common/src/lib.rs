//! Savings Vault Common Library
//!
//! Accounting core of a yield-bearing savings vault. Depositors hold
//! credits whose value in the underlying asset only grows: an exchange
//! rate converts between the two, and a control loop parks part of the
//! vault's capital in an external yield source (a connector), recognizing
//! what it earns once the growth passes a sanity check.
//!
//! ## Layout
//!
//! - **math**: 1e18 fixed-point helpers with 256-bit intermediates
//! - **yield_validator**: plausibility bounds on reported yield
//! - **exchange_rate**: the monotonic credit/underlying rate
//! - **connector_allocator**: rebalancing against the connector
//! - **state**: everything the core owns, staged per operation
//! - **interfaces**: ledger, permissions, connector and adapter traits
//! - **access_control**: in-memory role registry
//! - **events**: notifications emitted by committed operations
//!
//! Orchestration (deposits, redemptions, governance entry points) lives in
//! the `savings-vault` crate.

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod interfaces;
pub mod access_control;
pub mod yield_validator;
pub mod exchange_rate;
pub mod state;
pub mod connector_allocator;


// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use interfaces::*;
pub use access_control::*;
pub use yield_validator::*;
pub use exchange_rate::*;
pub use state::*;
pub use connector_allocator::*;
