//! Error types for the ccmarket contract core.
//!
//! All errors use the `CM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Metadata (malformed payload) errors
//! - 2xx: Fill arithmetic errors
//! - 3xx: Provenance errors
//! - 4xx: Escrow errors
//! - 5xx: Order-book errors
//! - 6xx: Construction errors
//! - 9xx: General / internal errors
//!
//! Every variant is a rejection reason. Nothing here is retried internally.

use thiserror::Error;

use crate::{AssetId, TxId, Units};

/// Central error enum for all ccmarket operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CcMarketError {
    // =================================================================
    // Metadata Errors (1xx)
    // =================================================================
    /// The transaction has no trailing metadata output.
    #[error("CM_ERR_100: no valid payload: transaction carries no metadata output")]
    MissingMetadata,

    /// The metadata payload is shorter than the two-byte prefix.
    #[error("CM_ERR_101: no valid payload: {len} byte(s) is shorter than module+tag")]
    MetadataTooShort { len: usize },

    /// The leading module identifier does not belong to the decoder.
    #[error("CM_ERR_102: no valid payload: module 0x{actual:02x}, expected 0x{expected:02x}")]
    WrongModule { expected: u8, actual: u8 },

    /// The tag byte is not one the decoder knows.
    #[error("CM_ERR_103: no valid payload: unknown function tag {tag:?}")]
    UnknownTag { tag: char },

    /// The payload fields do not parse.
    #[error("CM_ERR_104: malformed payload: {reason}")]
    MalformedPayload { reason: String },

    // =================================================================
    // Fill Arithmetic Errors (2xx)
    // =================================================================
    /// The resting order cannot be priced (zero totals).
    #[error("CM_ERR_200: degenerate order: {reason}")]
    DegenerateOrder { reason: String },

    /// A quantity that must be positive is zero.
    #[error("CM_ERR_201: zero quantity: {field} must be positive")]
    ZeroQuantity { field: &'static str },

    /// `orig == remaining + transferred` does not hold.
    #[error("CM_ERR_202: conservation violated: {reason}")]
    ConservationViolation { reason: String },

    /// The filler's realised price is worse for the order owner than the advertised one.
    #[error("CM_ERR_203: price regression: {reason}")]
    PriceRegression { reason: String },

    /// A computation left the 64-bit unit range.
    #[error("CM_ERR_204: arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    /// The ask unit price is below the minimum significant value.
    #[error("CM_ERR_205: unit price {orig_coin}/{orig_units} is below the minimum significant value")]
    PriceBelowEpsilon { orig_coin: Units, orig_units: Units },

    /// The computed fill quantity is zero or exceeds the order.
    #[error("CM_ERR_206: fill out of range: {reason}")]
    FillOutOfRange { reason: String },

    // =================================================================
    // Provenance Errors (3xx)
    // =================================================================
    /// A referenced ancestor transaction could not be loaded.
    #[error("CM_ERR_300: cannot load ancestor {0}")]
    AncestorNotFound(TxId),

    /// An ancestor's own contract inputs and outputs do not balance.
    #[error("CM_ERR_301: ancestor {txid} is unbalanced: inputs {inputs} != outputs {outputs}")]
    AncestorImbalance {
        txid: TxId,
        inputs: Units,
        outputs: Units,
    },

    /// The transaction under test creates or destroys contract units.
    #[error("CM_ERR_302: units not conserved in {txid} for asset {asset}: inputs {inputs} != outputs {outputs}")]
    UnitsNotConserved {
        txid: TxId,
        asset: AssetId,
        inputs: Units,
        outputs: Units,
    },

    /// The ancestor walk went deeper than the configured limit.
    #[error("CM_ERR_303: provenance depth limit {limit} exceeded")]
    ProvenanceDepthExceeded { limit: usize },

    /// The ancestor walk loaded more transactions than the configured limit.
    #[error("CM_ERR_304: provenance walk exceeded {limit} transactions")]
    ProvenanceTooLarge { limit: usize },

    /// The ancestor is only in the pending pool where confirmation is required.
    #[error("CM_ERR_305: ancestor {0} is not confirmed")]
    AncestorUnconfirmed(TxId),

    /// The asset id could not be discovered from the transaction's own metadata.
    #[error("CM_ERR_306: cannot discover asset id from metadata of {0}")]
    AssetUndiscoverable(TxId),

    /// The spend graph revisits a transaction that is still being evaluated.
    #[error("CM_ERR_307: provenance cycle through {0}")]
    ProvenanceCycle(TxId),

    // =================================================================
    // Escrow Errors (4xx)
    // =================================================================
    /// The plan's funding transaction is not on the ledger.
    #[error("CM_ERR_400: no funding tx found: {0}")]
    FundingTxNotFound(TxId),

    /// A non-create escrow transaction carries no funding id.
    #[error("CM_ERR_401: invalid tx opreturn format: no fundingtxid present")]
    MissingFundingId,

    /// The heir tried to receive funds before becoming eligible.
    #[error("CM_ERR_402: spending is not allowed yet for the heir: {elapsed}s elapsed of {timeout}s")]
    HeirNotEligible { elapsed: u64, timeout: u64 },

    /// An output or spent input is not the plan's custody address.
    #[error("CM_ERR_403: wrong custody address: {reason}")]
    WrongCustodyAddress { reason: String },

    /// This transaction's metadata does not succeed the latest state.
    #[error("CM_ERR_404: metadata chain broken: {reason}")]
    MetadataChainBroken { reason: String },

    /// The function tag is not valid for this validator or instrument.
    #[error("CM_ERR_405: unexpected function {tag:?}: {reason}")]
    UnexpectedFunction { tag: char, reason: String },

    /// An input or output pays a destination the plan does not allow.
    #[error("CM_ERR_406: invalid destination: {reason}")]
    InvalidDestination { reason: String },

    /// Only the plan owner may perform the operation.
    #[error("CM_ERR_407: adding funds is only allowed for the owner of this contract")]
    OwnerOnly,

    /// No identifier in the input plan claimed this input.
    #[error("CM_ERR_408: input {index} matches no input identifier")]
    UnclassifiedInput { index: usize },

    /// A plan referenced an output slot the transaction does not have.
    #[error("CM_ERR_409: missing output slot {index} ({available} outputs)")]
    MissingOutput { index: usize, available: usize },

    // =================================================================
    // Order-Book Errors (5xx)
    // =================================================================
    /// Swap creation and swap fills are switched off.
    #[error("CM_ERR_500: asset swaps disabled")]
    SwapsDisabled,

    /// The transaction shape does not match its order-book function.
    #[error("CM_ERR_501: invalid order transaction: {reason}")]
    InvalidOrderTx { reason: String },

    /// The referenced resting order does not exist.
    #[error("CM_ERR_502: order not found: {0}")]
    OrderNotFound(TxId),

    /// The token genesis transaction does not exist or is not a creation.
    #[error("CM_ERR_503: asset {0} is not a token creation tx")]
    UnknownAsset(AssetId),

    /// The module does not handle this input's eval code.
    #[error("CM_ERR_504: no validator for eval code 0x{0:02x}")]
    UnsupportedModule(u8),

    // =================================================================
    // Construction Errors (6xx)
    // =================================================================
    /// Not enough spendable units were found.
    #[error("CM_ERR_600: insufficient funds: need {needed}, found {available}")]
    InsufficientFunds { needed: Units, available: Units },

    /// A caller-supplied argument is out of range.
    #[error("CM_ERR_601: invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (bad config, logging already initialised, etc.).
    #[error("CM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl CcMarketError {
    /// Shorthand for [`CcMarketError::MalformedPayload`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CcMarketError::InvalidOrderTx`].
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidOrderTx {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CcMarketError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// The numeric `CM_ERR_` code of this error.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::MissingMetadata => 100,
            Self::MetadataTooShort { .. } => 101,
            Self::WrongModule { .. } => 102,
            Self::UnknownTag { .. } => 103,
            Self::MalformedPayload { .. } => 104,
            Self::DegenerateOrder { .. } => 200,
            Self::ZeroQuantity { .. } => 201,
            Self::ConservationViolation { .. } => 202,
            Self::PriceRegression { .. } => 203,
            Self::ArithmeticOverflow { .. } => 204,
            Self::PriceBelowEpsilon { .. } => 205,
            Self::FillOutOfRange { .. } => 206,
            Self::AncestorNotFound(_) => 300,
            Self::AncestorImbalance { .. } => 301,
            Self::UnitsNotConserved { .. } => 302,
            Self::ProvenanceDepthExceeded { .. } => 303,
            Self::ProvenanceTooLarge { .. } => 304,
            Self::AncestorUnconfirmed(_) => 305,
            Self::AssetUndiscoverable(_) => 306,
            Self::ProvenanceCycle(_) => 307,
            Self::FundingTxNotFound(_) => 400,
            Self::MissingFundingId => 401,
            Self::HeirNotEligible { .. } => 402,
            Self::WrongCustodyAddress { .. } => 403,
            Self::MetadataChainBroken { .. } => 404,
            Self::UnexpectedFunction { .. } => 405,
            Self::InvalidDestination { .. } => 406,
            Self::OwnerOnly => 407,
            Self::UnclassifiedInput { .. } => 408,
            Self::MissingOutput { .. } => 409,
            Self::SwapsDisabled => 500,
            Self::InvalidOrderTx { .. } => 501,
            Self::OrderNotFound(_) => 502,
            Self::UnknownAsset(_) => 503,
            Self::UnsupportedModule(_) => 504,
            Self::InsufficientFunds { .. } => 600,
            Self::InvalidArgument { .. } => 601,
            Self::Internal(_) => 900,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CcMarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CcMarketError::AncestorNotFound(TxId::ZERO);
        let msg = format!("{err}");
        assert!(msg.starts_with("CM_ERR_300"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = CcMarketError::InsufficientFunds {
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CM_ERR_600"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn wrong_module_display_is_hex() {
        let err = CcMarketError::WrongModule {
            expected: 0xe3,
            actual: 0xf2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("0xf2"));
        assert!(msg.contains("0xe3"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            CcMarketError::MissingMetadata,
            CcMarketError::ZeroQuantity { field: "paid" },
            CcMarketError::ProvenanceDepthExceeded { limit: 3 },
            CcMarketError::MissingFundingId,
            CcMarketError::SwapsDisabled,
            CcMarketError::invalid_argument("x"),
            CcMarketError::Internal("test".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            let prefix = format!("CM_ERR_{}", err.code());
            assert!(msg.starts_with(&prefix), "{msg} vs {prefix}");
        }
    }

    #[test]
    fn all_errors_have_cm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CcMarketError::OwnerOnly),
            Box::new(CcMarketError::UnknownTag { tag: 'q' }),
            Box::new(CcMarketError::HeirNotEligible {
                elapsed: 1,
                timeout: 2,
            }),
            Box::new(CcMarketError::malformed("short")),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CM_ERR_"),
                "Error missing CM_ERR_ prefix: {msg}"
            );
        }
    }
}
