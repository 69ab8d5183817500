//! # ccmarket-provenance
//!
//! **Provenance validation for ccmarket token units.**
//!
//! Proves a transaction does not fabricate token units: every contract input
//! is matched against the actual output of the ancestor it spends, and the
//! matched input total must equal the transaction's contract output total.
//!
//! - [`contract_vout_value`]: is this output a genuine contract vout for an asset
//! - [`ProvenanceValidator`]: single-level (order book) or transitive (escrow)
//!   conservation check over the ancestor graph, iterative and bounded
//! - [`add_token_inputs`] / [`token_balance`]: token UTXO discovery for builders
//!
//! The only exemption is the genesis transaction of an asset, whose id is the
//! asset id.

pub mod classifier;
pub mod inputs;
pub mod validator;

pub use classifier::{contract_vout_value, discover_asset};
pub use inputs::{add_token_inputs, token_balance, token_outputs};
pub use validator::{ProvenanceRules, ProvenanceTally, ProvenanceValidator};
