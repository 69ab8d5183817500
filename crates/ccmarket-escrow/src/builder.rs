//! Escrow operations: fund, add and claim.
//!
//! Each returns an unsigned transaction shaped so that [`crate::HeirValidator`]
//! accepts it. Normal inputs of the caller pay the fee; normal change goes
//! back to the caller.

use ccmarket_codec::encodable_units;
use ccmarket_types::{
    AssetId, BuilderConfig, CcMarketError, EvalCode, Fulfillment, LedgerView, PubKey, Result,
    Script, Transaction, TxBuilder, TxId, TxOut, Units, add_normal_inputs,
};

use crate::{COIN_CUSTODY, CustodyInstrument, TOKEN_CUSTODY, custody_outputs, resolve_plan};

/// Builds escrow transactions from ledger state.
pub struct HeirBuilder<'a> {
    ledger: &'a dyn LedgerView,
    config: BuilderConfig,
}

impl<'a> HeirBuilder<'a> {
    pub fn new(ledger: &'a dyn LedgerView, config: BuilderConfig) -> Self {
        Self { ledger, config }
    }

    fn fee_inputs(&self, builder: &mut TxBuilder, payer: &PubKey, needed: Units) -> Result<()> {
        let added = add_normal_inputs(self.ledger, builder, payer, needed, self.config.max_fee_inputs)?;
        if added < needed {
            tracing::warn!(%payer, needed, added, "Not enough normal inputs for fee");
            return Err(CcMarketError::InsufficientFunds {
                needed,
                available: added,
            });
        }
        Ok(())
    }

    /// Gather `amount` of the plan's holding plus `overhead` of coin for fee
    /// and marker. Coin plans draw both from the same normal outputs, token
    /// plans pay the overhead separately. Returns token change.
    fn gather(
        &self,
        builder: &mut TxBuilder,
        instrument: &dyn CustodyInstrument,
        owner: &PubKey,
        asset: Option<&AssetId>,
        amount: Units,
        overhead: Units,
    ) -> Result<Units> {
        let needed = if asset.is_some() {
            self.fee_inputs(builder, owner, overhead)?;
            amount
        } else {
            amount
                .checked_add(overhead)
                .ok_or(CcMarketError::ArithmeticOverflow { context: "amount plus fee" })?
        };
        let added = instrument.add_owner_inputs(self.ledger, builder, owner, asset, needed, self.config.max_inputs)?;
        if added < needed {
            tracing::warn!(%owner, needed, added, instrument = instrument.label(), "Owner funds too low");
            return Err(CcMarketError::InsufficientFunds {
                needed,
                available: added,
            });
        }
        Ok(if asset.is_some() { added - needed } else { 0 })
    }

    /// Create a plan holding `amount` of coin, or of token `asset`.
    ///
    /// vout0 is the custody output, vout1 the plan marker at the escrow
    /// global key (what [`crate::list_plans`] scans), then change.
    pub fn fund(
        &self,
        owner: PubKey,
        heir: PubKey,
        amount: Units,
        inactivity_secs: u64,
        name: &str,
        asset: Option<AssetId>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(CcMarketError::invalid_argument("funding amount must be positive"));
        }
        if name.len() > self.config.max_name_len {
            return Err(CcMarketError::invalid_argument(format!(
                "plan name longer than {} bytes",
                self.config.max_name_len
            )));
        }
        if owner == heir {
            return Err(CcMarketError::invalid_argument("owner and heir must differ"));
        }
        encodable_units(inactivity_secs, "inactivity timeout")?;
        let instrument: &dyn CustodyInstrument = if asset.is_some() { &TOKEN_CUSTODY } else { &COIN_CUSTODY };
        let fee = self.config.tx_fee;

        let mut builder = TxBuilder::new();
        // marker plus fee
        let change = self.gather(&mut builder, instrument, &owner, asset.as_ref(), amount, fee.saturating_mul(2))?;
        builder.push_output(TxOut::new(amount, instrument.custody_condition(&owner, &heir)));
        builder.push_output(TxOut::new(fee, Script::PayToPubkey(PubKey::module_global(EvalCode::HEIR))));
        if change > 0 {
            builder.push_output(instrument.make_user_output(change, &owner));
        }
        let metadata = instrument.encode_create_metadata(asset, owner, heir, inactivity_secs, name);
        let tx = builder.finalize(owner, fee, metadata)?;
        tracing::info!(
            txid = %tx.txid(),
            instrument = instrument.label(),
            amount,
            inactivity_secs,
            name,
            "Built escrow funding tx"
        );
        Ok(tx)
    }

    /// Add `amount` to an existing plan. Owner only.
    pub fn add(&self, funding_txid: &TxId, caller: PubKey, amount: Units) -> Result<Transaction> {
        if amount == 0 {
            return Err(CcMarketError::invalid_argument("amount must be positive"));
        }
        let (instrument, state) = resolve_plan(self.ledger, funding_txid)?;
        if caller != state.latest.owner {
            tracing::warn!(%funding_txid, %caller, "Add attempted by non-owner");
            return Err(CcMarketError::OwnerOnly);
        }
        let plan = &state.latest;
        let fee = self.config.tx_fee;

        let mut builder = TxBuilder::new();
        let change = self.gather(&mut builder, instrument, &caller, plan.asset_id.as_ref(), amount, fee)?;
        builder.push_output(TxOut::new(amount, instrument.custody_condition(&plan.owner, &plan.heir)));
        if change > 0 {
            builder.push_output(instrument.make_user_output(change, &caller));
        }
        let metadata = instrument.encode_add_metadata(plan, *funding_txid);
        let tx = builder.finalize(caller, fee, metadata)?;
        tracing::info!(txid = %tx.txid(), %funding_txid, amount, "Built escrow add tx");
        Ok(tx)
    }

    /// Withdraw `amount` from a plan to `caller`, who must be the owner or an
    /// eligible heir at chain time `now`.
    pub fn claim(&self, funding_txid: &TxId, caller: PubKey, amount: Units, now: u64) -> Result<Transaction> {
        if amount == 0 {
            return Err(CcMarketError::invalid_argument("amount must be positive"));
        }
        let (instrument, state) = resolve_plan(self.ledger, funding_txid)?;
        let plan = &state.latest;
        if caller != plan.owner && caller != plan.heir {
            return Err(CcMarketError::invalid_argument("caller is neither owner nor heir"));
        }
        if !state.may_spend(&caller, now) {
            tracing::warn!(%funding_txid, elapsed = state.elapsed(now), timeout = plan.inactivity_secs, "Heir not yet eligible");
            return Err(state.heir_error(now));
        }
        let fee = self.config.tx_fee;
        let custody = instrument.custody_condition(&plan.owner, &plan.heir);

        let mut builder = TxBuilder::new();
        self.fee_inputs(&mut builder, &caller, fee)?;
        let mut gathered: Units = 0;
        for (row, units) in custody_outputs(self.ledger, instrument, &state)
            .into_iter()
            .take(self.config.max_inputs)
        {
            if gathered >= amount {
                break;
            }
            builder.add_input(row.outpoint(), units, Fulfillment::for_condition(&custody, caller))?;
            gathered = gathered
                .checked_add(units)
                .ok_or(CcMarketError::ArithmeticOverflow { context: "custody inputs" })?;
        }
        if gathered < amount {
            tracing::warn!(%funding_txid, amount, gathered, "Not enough funds in plan");
            return Err(CcMarketError::InsufficientFunds {
                needed: amount,
                available: gathered,
            });
        }

        builder.push_output(instrument.make_claimer_output(amount, &caller));
        if gathered > amount {
            builder.push_output(TxOut::new(gathered - amount, custody));
        }
        let metadata = instrument.encode_claim_metadata(plan, *funding_txid);
        let tx = builder.finalize(caller, fee, metadata)?;
        tracing::info!(
            txid = %tx.txid(),
            %funding_txid,
            amount,
            heir = caller == plan.heir,
            "Built escrow claim tx"
        );
        Ok(tx)
    }
}
