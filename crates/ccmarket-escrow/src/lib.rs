//! # ccmarket-escrow
//!
//! **Time-locked inheritance escrow.**
//!
//! An owner locks coin or tokens at a one-of-two custody address shared with
//! an heir. The owner may spend at any time; the heir only after the plan has
//! been inactive longer than its timeout, or forever once the heir has
//! claimed once.
//!
//! ## Architecture
//!
//! - [`CustodyInstrument`]: coin vs token custody ([`CoinCustody`],
//!   [`TokenCustody`]); how owner funds are gathered and how settlement
//!   outputs and metadata are shaped
//! - [`EscrowResolver`]: from a funding id to the plan's current
//!   [`PlanState`] and heir eligibility
//! - [`HeirValidator`]: consensus validation of escrow transactions through
//!   per-function validator plans
//! - [`HeirBuilder`]: fund, add and claim transaction construction
//! - [`plan_info`] / [`list_plans`]: read-only plan queries

pub mod builder;
pub mod custody;
pub mod info;
pub mod resolver;
pub mod validate;
pub mod validators;

pub use builder::HeirBuilder;
pub use custody::{COIN_CUSTODY, CoinCustody, CustodyInstrument, TOKEN_CUSTODY, TokenCustody, instrument_for};
pub use info::{PlanInfo, PlanSummary, list_plans, plan_info};
pub use resolver::{EscrowResolver, PlanState, custody_outputs, resolve_plan};
pub use validate::HeirValidator;
pub use validators::{CustodyValidator, HeirSpendValidator, SuccessorValidator};
