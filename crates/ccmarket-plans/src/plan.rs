//! Input and output plans and the validator seam.

use std::collections::HashMap;
use std::fmt;

use ccmarket_types::{
    CcMarketError, LedgerView, LookupMode, Result, Transaction, TxId, TxIn, TxOut,
};

use crate::InputIdentifier;

/// What a validator is asked about.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// An identified input and the output it spends.
    Input {
        index: usize,
        input: &'a TxIn,
        spent: &'a TxOut,
    },
    /// An output slot of the transaction under test.
    Output { index: usize, output: &'a TxOut },
}

impl<'a> Subject<'a> {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Input { index, .. } | Self::Output { index, .. } => *index,
        }
    }

    /// The output whose destination matters: the spent output for an input,
    /// the output itself otherwise.
    #[must_use]
    pub fn output(&self) -> &'a TxOut {
        match self {
            Self::Input { spent, .. } => spent,
            Self::Output { output, .. } => output,
        }
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, .. } => write!(f, "vin.{index}"),
            Self::Output { index, .. } => write!(f, "vout.{index}"),
        }
    }
}

/// One pass/fail rule.
///
/// Context such as this transaction's or the latest state transaction's
/// metadata is captured by the implementor when it is built.
pub trait Validator {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn validate(&self, tx: &Transaction, subject: &Subject<'_>) -> Result<()>;
}

/// Designated output position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSlot {
    Index(usize),
    /// The trailing metadata output.
    Metadata,
}

impl OutputSlot {
    fn resolve(self, n_outputs: usize) -> Option<usize> {
        match self {
            Self::Index(i) if i < n_outputs => Some(i),
            Self::Index(_) => None,
            Self::Metadata => n_outputs.checked_sub(1),
        }
    }
}

fn run(validators: &[&dyn Validator], tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
    for validator in validators {
        if let Err(err) = validator.validate(tx, subject) {
            tracing::warn!(validator = validator.name(), %subject, %err, "Validator rejected");
            return Err(err);
        }
    }
    Ok(())
}

/// Validators keyed by input identifier. Each input is handled by the first
/// identifier that claims it; an input no identifier claims is rejected.
#[derive(Default)]
pub struct InputPlan<'v> {
    rules: Vec<(InputIdentifier, Vec<&'v dyn Validator>)>,
}

impl<'v> InputPlan<'v> {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, identifier: InputIdentifier, validators: Vec<&'v dyn Validator>) {
        self.rules.push((identifier, validators));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate<L: LedgerView + ?Sized>(
        &self,
        tx: &Transaction,
        ledger: &L,
        mode: LookupMode,
    ) -> Result<()> {
        let mut parents: HashMap<TxId, Transaction> = HashMap::new();
        for (index, input) in tx.inputs.iter().enumerate() {
            let Some((identifier, validators)) =
                self.rules.iter().find(|(id, _)| id.identifies(input))
            else {
                tracing::warn!(index, "Input matches no identifier");
                return Err(CcMarketError::UnclassifiedInput { index });
            };
            let parent_id = input.prevout.txid;
            if !parents.contains_key(&parent_id) {
                let entry = mode.require(ledger, &parent_id)?;
                parents.insert(parent_id, entry.tx);
            }
            let spent = parents
                .get(&parent_id)
                .and_then(|parent| parent.output(input.prevout.vout))
                .ok_or_else(|| {
                    CcMarketError::malformed(format!(
                        "vin.{index} spends missing output {parent_id}:{}",
                        input.prevout.vout
                    ))
                })?;
            tracing::debug!(index, %identifier, "Validating input");
            run(validators, tx, &Subject::Input { index, input, spent })?;
        }
        Ok(())
    }
}

/// Validators keyed by output slot.
#[derive(Default)]
pub struct OutputPlan<'v> {
    rules: Vec<(OutputSlot, Vec<&'v dyn Validator>)>,
}

impl<'v> OutputPlan<'v> {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, slot: OutputSlot, validators: Vec<&'v dyn Validator>) {
        self.rules.push((slot, validators));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self, tx: &Transaction) -> Result<()> {
        let available = tx.outputs.len();
        for (slot, validators) in &self.rules {
            let index = slot.resolve(available).ok_or(CcMarketError::MissingOutput {
                index: match slot {
                    OutputSlot::Index(i) => *i,
                    OutputSlot::Metadata => 0,
                },
                available,
            })?;
            let output = &tx.outputs[index];
            run(validators, tx, &Subject::Output { index, output })?;
        }
        Ok(())
    }
}

/// Input plan then output plan; the first failure wins.
#[derive(Default)]
pub struct ValidationPlan<'v> {
    pub inputs: InputPlan<'v>,
    pub outputs: OutputPlan<'v>,
}

impl<'v> ValidationPlan<'v> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, identifier: InputIdentifier, validators: Vec<&'v dyn Validator>) -> &mut Self {
        self.inputs.push(identifier, validators);
        self
    }

    pub fn output(&mut self, slot: OutputSlot, validators: Vec<&'v dyn Validator>) -> &mut Self {
        self.outputs.push(slot, validators);
        self
    }

    pub fn validate<L: LedgerView + ?Sized>(
        &self,
        tx: &Transaction,
        ledger: &L,
        mode: LookupMode,
    ) -> Result<()> {
        self.inputs.validate(tx, ledger, mode)?;
        self.outputs.validate(tx)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use ccmarket_types::{
        BlockRef, Condition, EvalCode, Fulfillment, MemoryLedger, OutPoint, PubKey, Script,
    };

    /// Counts calls and fails on a chosen index.
    struct Probe {
        calls: Cell<usize>,
        fail_on: Option<usize>,
    }

    impl Probe {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: Cell::new(0),
                fail_on,
            }
        }
    }

    impl Validator for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn validate(&self, _tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_on == Some(subject.index()) {
                return Err(CcMarketError::invalid_argument(format!("probe failed at {subject}")));
            }
            Ok(())
        }
    }

    fn setup() -> (MemoryLedger, Transaction) {
        let key = PubKey::from_label("owner");
        let cond = Condition::single(EvalCode::HEIR, key);
        let mut ledger = MemoryLedger::new();
        let parent = ledger.confirm(
            Transaction::new(
                vec![],
                vec![
                    TxOut::new(50_000, Script::PayToPubkey(key)),
                    TxOut::new(700, cond.clone()),
                ],
            ),
            BlockRef {
                height: 1,
                time: 10,
            },
        );
        let tx = Transaction::new(
            vec![
                TxIn {
                    prevout: OutPoint::new(parent, 0),
                    fulfillment: Fulfillment::Signature { signer: key },
                },
                TxIn {
                    prevout: OutPoint::new(parent, 1),
                    fulfillment: Fulfillment::for_condition(&cond, key),
                },
            ],
            vec![
                TxOut::new(700, cond),
                TxOut::metadata(vec![EvalCode::HEIR.0, b'C']),
            ],
        );
        (ledger, tx)
    }

    #[test]
    fn inputs_route_to_their_identifier() {
        let (ledger, tx) = setup();
        let normal = Probe::new(None);
        let contract = Probe::new(None);
        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&normal])
            .input(InputIdentifier::Contract, vec![&contract, &normal]);
        plan.validate(&tx, &ledger, LookupMode::Chain).unwrap();
        assert_eq!(normal.calls.get(), 2);
        assert_eq!(contract.calls.get(), 1);
    }

    #[test]
    fn first_failure_short_circuits() {
        let (ledger, tx) = setup();
        let failing = Probe::new(Some(0));
        let later = Probe::new(None);
        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&failing, &later])
            .input(InputIdentifier::Contract, vec![&later])
            .output(OutputSlot::Index(0), vec![&later]);
        let err = plan.validate(&tx, &ledger, LookupMode::Chain).unwrap_err();
        assert!(err.to_string().contains("vin.0"));
        assert_eq!(later.calls.get(), 0);
    }

    #[test]
    fn unclassified_input_rejected() {
        let (ledger, tx) = setup();
        let probe = Probe::new(None);
        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&probe]);
        assert_eq!(
            plan.validate(&tx, &ledger, LookupMode::Chain).unwrap_err(),
            CcMarketError::UnclassifiedInput { index: 1 }
        );
    }

    #[test]
    fn output_slots_resolve() {
        let (_, tx) = setup();
        let probe = Probe::new(Some(1));
        let mut plan = OutputPlan::new();
        plan.push(OutputSlot::Index(0), vec![&probe]);
        plan.validate(&tx).unwrap();
        plan.push(OutputSlot::Metadata, vec![&probe]);
        assert!(plan.validate(&tx).is_err());

        let mut missing = OutputPlan::new();
        missing.push(OutputSlot::Index(5), vec![&probe]);
        assert_eq!(
            missing.validate(&tx).unwrap_err(),
            CcMarketError::MissingOutput {
                index: 5,
                available: 2
            }
        );
    }

    #[test]
    fn missing_parent_is_reported() {
        let (_, tx) = setup();
        let probe = Probe::new(None);
        let mut plan = InputPlan::new();
        plan.push(InputIdentifier::Normal, vec![&probe]);
        plan.push(InputIdentifier::Contract, vec![&probe]);
        let empty = MemoryLedger::new();
        assert!(matches!(
            plan.validate(&tx, &empty, LookupMode::Pool),
            Err(CcMarketError::AncestorNotFound(_))
        ));
    }
}
