//! # ccmarket-types
//!
//! Shared types, errors, and configuration for the **ccmarket** contract core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TxId`], [`AssetId`], [`PubKey`], [`Address`], [`EvalCode`]
//! - **Transaction model**: [`Transaction`], [`TxIn`], [`TxOut`], [`OutPoint`], [`Units`]
//! - **Script model**: [`Script`], [`Condition`], [`Fulfillment`]
//! - **Ledger access**: [`LedgerView`], [`LedgerEntry`], [`BlockRef`], [`AddressOutput`]
//! - **Validation context**: [`ValidationContext`], [`LookupMode`], [`Verdict`]
//! - **Construction**: [`TxBuilder`] and normal-input selection
//! - **Configuration**: [`ContractConfig`], [`ValidationConfig`], [`BuilderConfig`]
//! - **Errors**: [`CcMarketError`] with `CM_ERR_` prefix codes
//! - **Constants**: module eval codes, fees, limits
//!
//! With the `test-helpers` feature the crate also ships [`MemoryLedger`], an
//! in-memory [`LedgerView`] used by the integration tests of every plane.

pub mod builder;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod ids;
pub mod ledger;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod script;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use ccmarket_types::{Transaction, TxOut, Script, LedgerView, ...};

pub use builder::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use ids::*;
pub use ledger::*;
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::*;
pub use script::*;
pub use transaction::*;

// Constants are accessed via `ccmarket_types::constants::FOO`
// (not re-exported to avoid name collisions).
