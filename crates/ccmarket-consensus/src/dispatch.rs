//! Routing of contract inputs to their module validator.

use std::fmt;

use ccmarket_escrow::HeirValidator;
use ccmarket_orderbook::OrderBookValidator;
use ccmarket_types::{
    CcMarketError, ContractConfig, EvalCode, Fulfillment, LedgerView, Result, Transaction, ValidationConfig,
    ValidationContext, Verdict,
};

/// A module this crate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    OrderBook,
    Escrow,
}

impl Module {
    /// The module that must approve a spend carrying `evals`. Escrow wins
    /// over the order book when both appear.
    #[must_use]
    pub fn for_evals(evals: &[EvalCode]) -> Option<Self> {
        if evals.contains(&EvalCode::HEIR) {
            Some(Self::Escrow)
        } else if evals.contains(&EvalCode::ASSETS) {
            Some(Self::OrderBook)
        } else {
            None
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderBook => write!(f, "orderbook"),
            Self::Escrow => write!(f, "escrow"),
        }
    }
}

/// Validation entry point bound to one ledger view and context.
pub struct ContractValidator<'a> {
    ledger: &'a dyn LedgerView,
    ctx: ValidationContext,
    config: ValidationConfig,
}

impl<'a> ContractValidator<'a> {
    pub fn new(ledger: &'a dyn LedgerView, ctx: ValidationContext, config: ValidationConfig) -> Self {
        Self { ledger, ctx, config }
    }

    pub fn from_config(ledger: &'a dyn LedgerView, ctx: ValidationContext, config: &ContractConfig) -> Self {
        Self::new(ledger, ctx, config.validation.clone())
    }

    /// Judge `tx` on behalf of the module owning input `n_in`.
    pub fn validate(&self, tx: &Transaction, n_in: usize) -> Verdict {
        let result = self.route(tx, n_in);
        if let Err(err) = &result {
            tracing::warn!(
                txid = %tx.txid(),
                n_in,
                code = err.code(),
                %err,
                mode = %self.ctx.mode,
                "Contract tx rejected"
            );
        }
        Verdict::from(result)
    }

    /// Which module input `n_in` belongs to.
    pub fn module_of(tx: &Transaction, n_in: usize) -> Result<Module> {
        let input = tx.inputs.get(n_in).ok_or_else(|| {
            CcMarketError::invalid_argument(format!("input {n_in} out of range ({} inputs)", tx.inputs.len()))
        })?;
        match &input.fulfillment {
            Fulfillment::Condition { evals, .. } => {
                Module::for_evals(evals).ok_or_else(|| {
                    CcMarketError::UnsupportedModule(evals.first().map_or(0, |e| e.0))
                })
            }
            Fulfillment::Signature { .. } => Err(CcMarketError::invalid_argument(format!(
                "input {n_in} is not a contract input"
            ))),
        }
    }

    fn route(&self, tx: &Transaction, n_in: usize) -> Result<()> {
        let module = Self::module_of(tx, n_in)?;
        tracing::debug!(txid = %tx.txid(), n_in, %module, "Dispatching contract input");
        match module {
            Module::Escrow => HeirValidator::new(self.ledger, self.ctx, self.config.clone()).validate(tx),
            Module::OrderBook => OrderBookValidator::new(self.ledger, self.ctx, self.config.clone()).validate(tx),
        }
    }
}
