//! # ccmarket-matchcore
//!
//! **Pure deterministic fill engine for the ccmarket order book.**
//!
//! MatchCore is the arithmetic plane: given a resting order's recorded totals
//! and a proposed fill quantity it computes the split, and its paired
//! remainder validators re-derive the same invariants from the numbers a
//! filler submitted. It has:
//!
//! - **Zero side effects**: no ledger access, no logging above `debug`
//! - **Exact arithmetic**: integer and `u128` rational comparisons only,
//!   identical results on every node
//! - **Full-fill short-circuit**: paying at least the remaining requirement
//!   takes the whole order and clamps the payment

pub mod fill;
pub mod price;
pub mod remainder;

pub use fill::{Fill, compute_ask_fill, compute_bid_fill, compute_swap_fill};
pub use price::UnitPrice;
pub use remainder::{validate_ask_remainder, validate_bid_remainder, validate_swap_remainder};
