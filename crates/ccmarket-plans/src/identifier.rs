//! Input identifiers.

use std::fmt;

use ccmarket_types::{EvalCode, TxIn};

/// Classifies an input without checking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputIdentifier {
    /// Plain signature input, usually paying the fee.
    Normal,
    /// Any condition input.
    Contract,
    /// Condition input bound to one module.
    ContractEval(EvalCode),
}

impl InputIdentifier {
    #[must_use]
    pub fn identifies(&self, input: &TxIn) -> bool {
        match self {
            Self::Normal => !input.fulfillment.is_condition(),
            Self::Contract => input.fulfillment.is_condition(),
            Self::ContractEval(eval) => input.fulfillment.spends_eval(*eval),
        }
    }
}

impl fmt::Display for InputIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Contract => write!(f, "contract"),
            Self::ContractEval(eval) => write!(f, "contract({eval})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmarket_types::{Fulfillment, OutPoint, PubKey, TxId};

    fn input(fulfillment: Fulfillment) -> TxIn {
        TxIn {
            prevout: OutPoint::new(TxId::ZERO, 0),
            fulfillment,
        }
    }

    #[test]
    fn normal_and_contract_are_disjoint() {
        let key = PubKey::from_label("k");
        let plain = input(Fulfillment::Signature { signer: key });
        let cc = input(Fulfillment::Condition {
            evals: vec![EvalCode::TOKENS, EvalCode::HEIR],
            signer: key,
        });
        assert!(InputIdentifier::Normal.identifies(&plain));
        assert!(!InputIdentifier::Contract.identifies(&plain));
        assert!(InputIdentifier::Contract.identifies(&cc));
        assert!(!InputIdentifier::Normal.identifies(&cc));
        assert!(InputIdentifier::ContractEval(EvalCode::HEIR).identifies(&cc));
        assert!(!InputIdentifier::ContractEval(EvalCode::ASSETS).identifies(&cc));
    }
}
