//! Escrow-specific validators for the plan engine.

use ccmarket_codec::HeirOpRet;
use ccmarket_plans::{Subject, Validator};
use ccmarket_types::{CcMarketError, Result, Transaction, TxId};

use crate::{CustodyInstrument, PlanState};

/// The subject pays the custody address derived from one plan's metadata.
pub struct CustodyValidator<'a> {
    name: &'static str,
    plan: &'a HeirOpRet,
    instrument: &'a dyn CustodyInstrument,
}

impl<'a> CustodyValidator<'a> {
    pub fn new(name: &'static str, plan: &'a HeirOpRet, instrument: &'a dyn CustodyInstrument) -> Self {
        Self {
            name,
            plan,
            instrument,
        }
    }
}

impl Validator for CustodyValidator<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn validate(&self, _tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
        let expected = self.instrument.custody_address(&self.plan.owner, &self.plan.heir);
        if subject.output().script.address() == Some(expected) {
            Ok(())
        } else {
            Err(CcMarketError::WrongCustodyAddress {
                reason: format!("{subject} is not at {} custody {expected}", self.instrument.label()),
            })
        }
    }
}

/// Heir eligibility over a claim.
///
/// On a custody input: an input signed by the heir needs an eligible plan.
/// On vout0: the payout goes to the owner or the heir, and every payload
/// output paying the heir needs an eligible plan.
pub struct HeirSpendValidator<'a> {
    state: &'a PlanState,
    now: u64,
    instrument: &'a dyn CustodyInstrument,
}

impl<'a> HeirSpendValidator<'a> {
    pub fn new(state: &'a PlanState, now: u64, instrument: &'a dyn CustodyInstrument) -> Self {
        Self {
            state,
            now,
            instrument,
        }
    }

    fn require_eligible(&self, subject: &Subject<'_>, what: &str) -> Result<()> {
        if self.state.heir_eligible(self.now) {
            return Ok(());
        }
        tracing::warn!(
            funding = %self.state.funding_txid,
            %subject,
            what,
            elapsed = self.state.elapsed(self.now),
            timeout = self.state.latest.inactivity_secs,
            "Heir spend before inactivity timeout"
        );
        Err(self.state.heir_error(self.now))
    }
}

impl Validator for HeirSpendValidator<'_> {
    fn name(&self) -> &str {
        "heir spend"
    }

    fn validate(&self, tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
        let plan = &self.state.latest;
        if let Subject::Input { input, .. } = subject {
            if *input.fulfillment.signer() == plan.heir {
                return self.require_eligible(subject, "heir signed custody input");
            }
            return Ok(());
        }

        let script = &subject.output().script;
        let to_heir = self.instrument.pays_claimer(script, &plan.heir);
        if !to_heir && !self.instrument.pays_claimer(script, &plan.owner) {
            return Err(CcMarketError::InvalidDestination {
                reason: format!("{subject} pays neither owner nor heir"),
            });
        }
        if to_heir
            || tx
                .payload_outputs()
                .iter()
                .any(|out| self.instrument.pays_claimer(&out.script, &plan.heir))
        {
            return self.require_eligible(subject, "output pays heir");
        }
        Ok(())
    }
}

/// The transaction's metadata continues the plan's latest state: same
/// parties, timeout and asset, and the plan's funding id.
pub struct SuccessorValidator<'a> {
    latest_txid: TxId,
    latest: &'a HeirOpRet,
    instrument: &'a dyn CustodyInstrument,
}

impl<'a> SuccessorValidator<'a> {
    pub fn new(latest_txid: TxId, latest: &'a HeirOpRet, instrument: &'a dyn CustodyInstrument) -> Self {
        Self {
            latest_txid,
            latest,
            instrument,
        }
    }

    fn expected_funding(&self) -> TxId {
        if self.latest.function.is_create() {
            self.latest_txid
        } else {
            self.latest.funding_txid
        }
    }
}

fn broken(reason: impl Into<String>) -> CcMarketError {
    CcMarketError::MetadataChainBroken {
        reason: reason.into(),
    }
}

impl Validator for SuccessorValidator<'_> {
    fn name(&self) -> &str {
        "metadata successor"
    }

    fn validate(&self, _tx: &Transaction, subject: &Subject<'_>) -> Result<()> {
        let bytes = subject
            .output()
            .script
            .op_return_data()
            .ok_or(CcMarketError::MissingMetadata)?;
        let this = self.instrument.decode(bytes)?;
        if this.function.is_create() {
            return Err(broken("a plan cannot be created twice"));
        }
        if this.owner != self.latest.owner || this.heir != self.latest.heir {
            return Err(broken("owner or heir changed"));
        }
        if this.inactivity_secs != self.latest.inactivity_secs {
            return Err(broken(format!(
                "inactivity timeout changed from {} to {}",
                self.latest.inactivity_secs, this.inactivity_secs
            )));
        }
        if this.asset_id != self.latest.asset_id {
            return Err(broken("asset changed"));
        }
        let expected = self.expected_funding();
        if this.funding_txid != expected {
            return Err(broken(format!(
                "funding id {} does not continue {expected}",
                this.funding_txid
            )));
        }
        Ok(())
    }
}
