//! # ccmarket-plans
//!
//! **Validator-plan engine.**
//!
//! A contract validator is assembled per function tag from small,
//! independently testable rules instead of one hand-written procedure:
//!
//! - [`InputIdentifier`]: classifies an input as normal (fee paying) or as
//!   spending a contract condition, without judging it
//! - [`Validator`]: one pass/fail rule over a [`Subject`], an identified input
//!   with the output it spends or a designated output slot
//! - [`InputPlan`] / [`OutputPlan`]: ordered `(identifier or slot, validators)`
//!   pairs
//! - [`ValidationPlan`]: both plans; evaluation stops at the first failure and
//!   reports its reason
//!
//! Plans borrow their validators, so one validator instance can sit in both
//! the input and the output plan.

pub mod identifier;
pub mod plan;
pub mod validators;

pub use identifier::InputIdentifier;
pub use plan::{InputPlan, OutputPlan, OutputSlot, Subject, ValidationPlan, Validator};
pub use validators::DestinationValidator;
