//! Consensus validation of escrow transactions.
//!
//! The transaction's own metadata selects the custody instrument and the
//! validator plan. Follow-up transactions are checked against the plan's
//! latest state as recomputed by [`EscrowResolver`].

use ccmarket_codec::{HeirFunction, HeirOpRet, decode_heir};
use ccmarket_plans::{DestinationValidator, InputIdentifier, OutputSlot, ValidationPlan};
use ccmarket_provenance::{ProvenanceRules, ProvenanceValidator};
use ccmarket_types::{
    CcMarketError, LedgerView, Result, Transaction, ValidationConfig, ValidationContext,
    plain_address,
};

use crate::validators::{CustodyValidator, HeirSpendValidator, SuccessorValidator};
use crate::{CustodyInstrument, EscrowResolver, PlanState, instrument_for};

/// Validates escrow transactions against one ledger view.
pub struct HeirValidator<'a> {
    ledger: &'a dyn LedgerView,
    ctx: ValidationContext,
    config: ValidationConfig,
}

impl<'a> HeirValidator<'a> {
    pub fn new(ledger: &'a dyn LedgerView, ctx: ValidationContext, config: ValidationConfig) -> Self {
        Self {
            ledger,
            ctx,
            config,
        }
    }

    pub fn validate(&self, tx: &Transaction) -> Result<()> {
        let txid = tx.txid();
        let metadata = tx.metadata().ok_or(CcMarketError::MissingMetadata)?;
        let op = decode_heir(metadata)?;
        let instrument = instrument_for(op.function);
        tracing::debug!(%txid, function = %op.function, instrument = instrument.label(), "Validating escrow tx");

        let state = match op.funding() {
            Some(funding) => Some(EscrowResolver::new(self.ledger, instrument).resolve(&funding)?),
            None if op.function.is_create() => None,
            None => {
                tracing::warn!(%txid, function = %op.function, "Follow-up without funding id");
                return Err(CcMarketError::MissingFundingId);
            }
        };

        if op.function == HeirFunction::ClaimTokens {
            ProvenanceValidator::new(self.ledger, self.ctx, ProvenanceRules::heir(), self.config.clone())
                .validate(tx, op.asset_id)?;
        }

        match op.function {
            HeirFunction::FundCoins | HeirFunction::AddCoins => {
                tracing::warn!(%txid, function = %op.function, "Coin funding reached escrow validation");
                return Err(CcMarketError::UnexpectedFunction {
                    tag: op.function.tag(),
                    reason: "coin funding spends no contract inputs".into(),
                });
            }
            HeirFunction::FundTokens => self.validate_fund(tx, &op, instrument)?,
            HeirFunction::AddTokens => self.validate_add(tx, &op, planned(state.as_ref())?, instrument)?,
            HeirFunction::ClaimCoins | HeirFunction::ClaimTokens => {
                self.validate_claim(tx, &op, planned(state.as_ref())?, instrument)?;
            }
        }

        tracing::info!(
            %txid,
            function = %op.function,
            funding = ?op.funding(),
            mode = %self.ctx.mode,
            "Escrow tx accepted"
        );
        Ok(())
    }

    fn validate_fund(&self, tx: &Transaction, op: &HeirOpRet, instrument: &dyn CustodyInstrument) -> Result<()> {
        let owner_funds = DestinationValidator::new("owner funds", vec![plain_address(&op.owner)]);
        let owner_tokens = DestinationValidator::new("owner tokens", vec![instrument.user_address(&op.owner)]);
        let custody = CustodyValidator::new("custody", op, instrument);

        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&owner_funds])
            .input(InputIdentifier::Contract, vec![&owner_tokens])
            .output(OutputSlot::Index(0), vec![&custody]);
        plan.validate(tx, self.ledger, self.ctx.mode)
    }

    fn validate_add(
        &self,
        tx: &Transaction,
        op: &HeirOpRet,
        state: &PlanState,
        instrument: &dyn CustodyInstrument,
    ) -> Result<()> {
        let owner_funds = DestinationValidator::new("owner funds", vec![plain_address(&state.latest.owner)]);
        let owner_tokens = DestinationValidator::new("owner tokens", vec![instrument.user_address(&op.owner)]);
        let custody = CustodyValidator::new("custody", op, instrument);
        let successor = SuccessorValidator::new(state.latest_txid, &state.latest, instrument);

        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&owner_funds])
            .input(InputIdentifier::Contract, vec![&owner_tokens])
            .output(OutputSlot::Index(0), vec![&custody])
            .output(OutputSlot::Metadata, vec![&successor]);
        plan.validate(tx, self.ledger, self.ctx.mode)
    }

    fn validate_claim(
        &self,
        tx: &Transaction,
        op: &HeirOpRet,
        state: &PlanState,
        instrument: &dyn CustodyInstrument,
    ) -> Result<()> {
        let latest = &state.latest;
        let party_funds = DestinationValidator::new(
            "owner or heir funds",
            vec![plain_address(&latest.owner), plain_address(&latest.heir)],
        );
        let this_custody = CustodyValidator::new("custody of this tx", op, instrument);
        let latest_custody = CustodyValidator::new("custody of latest tx", latest, instrument);
        let heir_spend = HeirSpendValidator::new(state, self.ctx.now, instrument);
        let successor = SuccessorValidator::new(state.latest_txid, latest, instrument);

        let mut plan = ValidationPlan::new();
        plan.input(InputIdentifier::Normal, vec![&party_funds])
            .input(InputIdentifier::Contract, vec![&this_custody, &latest_custody, &heir_spend])
            .output(OutputSlot::Index(0), vec![&heir_spend])
            .output(OutputSlot::Metadata, vec![&successor]);
        plan.validate(tx, self.ledger, self.ctx.mode)
    }
}

fn planned(state: Option<&PlanState>) -> Result<&PlanState> {
    state.ok_or(CcMarketError::MissingFundingId)
}
