//! # ccmarket-consensus
//!
//! **Validation entry point for ccmarket contract transactions.**
//!
//! The consensus engine calls [`ContractValidator::validate`] once per
//! contract input it meets. The input's fulfillment names the module that
//! must approve the spend:
//!
//! - `HEIR` inputs go to [`ccmarket_escrow::HeirValidator`]
//! - `ASSETS` inputs go to [`ccmarket_orderbook::OrderBookValidator`]
//! - anything else is not handled here
//!
//! Every failure becomes a [`Verdict::Reject`] carrying the error's
//! `CM_ERR_nnn` message. [`logging::init_logging`] installs the tracing
//! subscriber for embedders that have none.

pub mod dispatch;
pub mod logging;

pub use ccmarket_types::Verdict;
pub use dispatch::{ContractValidator, Module};
pub use logging::{LogFormat, init_logging};
