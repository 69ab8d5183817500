//! # ccmarket-orderbook
//!
//! **On-chain token order book with partial fills.**
//!
//! A bid locks coin for token units, an ask locks token units for coin. Both
//! rest in vout0 of their latest transaction under a lock only the order-book
//! module can release, and every fill or cancel spends that vout0 as vin1.
//!
//! ## Architecture
//!
//! - [`locks`]: the bid lock, the ask lock and token holder conditions
//! - [`OrderBookValidator`]: consensus validation of cancels and fills; every
//!   accepted transaction also passes single-level provenance
//! - [`OrderBuilder`]: create, cancel and fill transaction construction
//! - [`list_orders`] / [`token_info`] / [`token_balance_of`]: read-only queries
//!
//! Swaps between two tokens decode and price like asks but are rejected on
//! every path.

pub mod builder;
pub mod locks;
pub mod orders;
pub mod validate;
pub mod validators;

pub use builder::OrderBuilder;
pub use locks::{ask_lock, bid_lock, token_holder};
pub use orders::{OrderSummary, TokenInfo, list_orders, token_balance_of, token_info};
pub use validate::{OrderBookValidator, RestingOrder};
pub use validators::{Receiver, ReceiverValidator};
