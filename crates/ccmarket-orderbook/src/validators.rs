//! Order-book validators for the plan engine.

use ccmarket_plans::{Subject, Validator};
use ccmarket_types::{CcMarketError, EvalCode, Result, Script, Transaction};

/// What kind of output a filler receives into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// A normal pay-to-pubkey output.
    Coin,
    /// A single-key token holder condition.
    Token,
}

/// The subject output can be received by a single key: a normal output for
/// coin, a token holder condition for token units. Order locks never qualify.
#[derive(Debug, Clone, Copy)]
pub struct ReceiverValidator {
    kind: Receiver,
}

impl ReceiverValidator {
    #[must_use]
    pub fn new(kind: Receiver) -> Self {
        Self { kind }
    }
}

impl Validator for ReceiverValidator {
    fn name(&self) -> &str {
        match self.kind {
            Receiver::Coin => "coin receiver",
            Receiver::Token => "token receiver",
        }
    }

    fn validate(&self, _tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
        let script = &subject.output().script;
        let ok = match (self.kind, script) {
            (Receiver::Coin, Script::PayToPubkey(_)) => true,
            (Receiver::Token, Script::Condition(c)) => {
                c.evals == [EvalCode::TOKENS] && c.keys.len() == 1
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(CcMarketError::InvalidDestination {
                reason: format!("{subject} is not a {}", self.name()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ask_lock, token_holder};
    use ccmarket_types::{PubKey, TxOut};

    fn check(kind: Receiver, output: &TxOut) -> Result<()> {
        let tx = Transaction::new(vec![], vec![]);
        ReceiverValidator::new(kind).validate(&tx, &Subject::Output { index: 1, output })
    }

    #[test]
    fn coin_and_token_receivers() {
        let key = PubKey::from_label("filler");
        let plain = TxOut::new(10, Script::PayToPubkey(key));
        let tokens = TxOut::new(10, token_holder(key));
        let locked = TxOut::new(10, ask_lock());

        check(Receiver::Coin, &plain).unwrap();
        check(Receiver::Token, &tokens).unwrap();
        assert!(check(Receiver::Coin, &tokens).is_err());
        assert!(matches!(
            check(Receiver::Token, &locked),
            Err(CcMarketError::InvalidDestination { .. })
        ));
    }
}
