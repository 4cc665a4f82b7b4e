//! Actor-based fungible token ledger.
//!
//! This crate re-exports all the components of the tally system.

pub use tally_core::*;
pub use tally_runtime::*;
