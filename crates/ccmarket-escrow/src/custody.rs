//! Custody instruments.
//!
//! A plan holds either coin or one token. The two instruments differ only in
//! how the owner's funds are found, how settlement outputs look, which
//! function tags they own, and how units on an output are measured.

use ccmarket_codec::{HeirFunction, HeirOpRet, decode_heir};
use ccmarket_provenance::{add_token_inputs, contract_vout_value};
use ccmarket_types::{
    Address, AssetId, CcMarketError, Condition, EvalCode, LedgerView, PubKey, Result, Script,
    Transaction, TxBuilder, TxId, TxOut, Units, add_normal_inputs, condition_address,
    plain_address,
};

/// Coin or token custody strategy.
pub trait CustodyInstrument {
    /// `"coin"` or `"token"`, for logs.
    fn label(&self) -> &'static str;

    fn is_own_function(&self, function: HeirFunction) -> bool;

    /// This instrument's claim functions.
    fn is_spending(&self, function: HeirFunction) -> bool {
        self.is_own_function(function) && function.is_claim()
    }

    /// One-of-two condition holding the plan's funds.
    fn custody_condition(&self, owner: &PubKey, heir: &PubKey) -> Condition;

    fn custody_address(&self, owner: &PubKey, heir: &PubKey) -> Address {
        condition_address(&self.custody_condition(owner, heir))
    }

    /// Where a key's own funds of this instrument live.
    fn user_address(&self, key: &PubKey) -> Address;

    /// Change back to a key's own funds.
    fn make_user_output(&self, value: Units, key: &PubKey) -> TxOut;

    /// Payout of a claim to `claimer`.
    fn make_claimer_output(&self, value: Units, claimer: &PubKey) -> TxOut;

    /// Add `owner`'s own funds of `asset` until `amount` is covered.
    fn add_owner_inputs(
        &self,
        ledger: &dyn LedgerView,
        builder: &mut TxBuilder,
        owner: &PubKey,
        asset: Option<&AssetId>,
        amount: Units,
        max_inputs: usize,
    ) -> Result<Units>;

    fn encode_create_metadata(
        &self,
        asset: Option<AssetId>,
        owner: PubKey,
        heir: PubKey,
        inactivity_secs: u64,
        name: &str,
    ) -> Vec<u8>;

    fn encode_add_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8>;

    fn encode_claim_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8>;

    /// Units of the plan's holding carried by output `vout` of `tx`, or 0
    /// when that output is not at the plan's custody address.
    fn custody_units(&self, tx: &Transaction, txid: &TxId, vout: usize, plan: &HeirOpRet) -> Units;

    /// Decode escrow metadata, accepting only this instrument's functions.
    fn decode(&self, bytes: &[u8]) -> Result<HeirOpRet> {
        let op = decode_heir(bytes)?;
        if !self.is_own_function(op.function) {
            return Err(CcMarketError::UnexpectedFunction {
                tag: op.function.tag(),
                reason: format!("not a {} plan function", self.label()),
            });
        }
        Ok(op)
    }

    /// True when `script` pays `key` as a claim payout would.
    fn pays_claimer(&self, script: &Script, key: &PubKey) -> bool {
        script.pays_plain(key) || *script == self.make_claimer_output(0, key).script
    }
}

fn at_custody(instrument: &dyn CustodyInstrument, output: &TxOut, plan: &HeirOpRet) -> bool {
    output.script.address() == Some(instrument.custody_address(&plan.owner, &plan.heir))
}

/// Plans holding the ledger's native coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinCustody;

impl CustodyInstrument for CoinCustody {
    fn label(&self) -> &'static str {
        "coin"
    }

    fn is_own_function(&self, function: HeirFunction) -> bool {
        !function.is_token()
    }

    fn custody_condition(&self, owner: &PubKey, heir: &PubKey) -> Condition {
        Condition::one_of_two(vec![EvalCode::HEIR], *owner, *heir)
    }

    fn user_address(&self, key: &PubKey) -> Address {
        plain_address(key)
    }

    fn make_user_output(&self, value: Units, key: &PubKey) -> TxOut {
        TxOut::new(value, Script::PayToPubkey(*key))
    }

    fn make_claimer_output(&self, value: Units, claimer: &PubKey) -> TxOut {
        TxOut::new(value, Script::PayToPubkey(*claimer))
    }

    fn add_owner_inputs(
        &self,
        ledger: &dyn LedgerView,
        builder: &mut TxBuilder,
        owner: &PubKey,
        _asset: Option<&AssetId>,
        amount: Units,
        max_inputs: usize,
    ) -> Result<Units> {
        add_normal_inputs(ledger, builder, owner, amount, max_inputs)
    }

    fn encode_create_metadata(
        &self,
        _asset: Option<AssetId>,
        owner: PubKey,
        heir: PubKey,
        inactivity_secs: u64,
        name: &str,
    ) -> Vec<u8> {
        HeirOpRet::fund(None, owner, heir, inactivity_secs, name).encode()
    }

    fn encode_add_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8> {
        plan.follow_up(HeirFunction::AddCoins, funding_txid).encode()
    }

    fn encode_claim_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8> {
        plan.follow_up(HeirFunction::ClaimCoins, funding_txid).encode()
    }

    fn custody_units(&self, tx: &Transaction, _txid: &TxId, vout: usize, plan: &HeirOpRet) -> Units {
        match tx.payload_outputs().get(vout) {
            Some(output) if at_custody(self, output, plan) => output.value,
            _ => 0,
        }
    }
}

/// Plans holding units of one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCustody;

impl TokenCustody {
    fn token_condition(key: &PubKey) -> Condition {
        Condition::single(EvalCode::TOKENS, *key)
    }
}

impl CustodyInstrument for TokenCustody {
    fn label(&self) -> &'static str {
        "token"
    }

    fn is_own_function(&self, function: HeirFunction) -> bool {
        function.is_token()
    }

    fn custody_condition(&self, owner: &PubKey, heir: &PubKey) -> Condition {
        Condition::one_of_two(vec![EvalCode::TOKENS, EvalCode::HEIR], *owner, *heir)
    }

    fn user_address(&self, key: &PubKey) -> Address {
        condition_address(&Self::token_condition(key))
    }

    fn make_user_output(&self, value: Units, key: &PubKey) -> TxOut {
        TxOut::new(value, Self::token_condition(key))
    }

    fn make_claimer_output(&self, value: Units, claimer: &PubKey) -> TxOut {
        TxOut::new(value, Self::token_condition(claimer))
    }

    fn add_owner_inputs(
        &self,
        ledger: &dyn LedgerView,
        builder: &mut TxBuilder,
        owner: &PubKey,
        asset: Option<&AssetId>,
        amount: Units,
        max_inputs: usize,
    ) -> Result<Units> {
        let asset = asset.ok_or_else(|| CcMarketError::invalid_argument("token plan without asset id"))?;
        add_token_inputs(
            ledger,
            builder,
            &Self::token_condition(owner),
            *owner,
            asset,
            amount,
            max_inputs,
        )
    }

    fn encode_create_metadata(
        &self,
        asset: Option<AssetId>,
        owner: PubKey,
        heir: PubKey,
        inactivity_secs: u64,
        name: &str,
    ) -> Vec<u8> {
        HeirOpRet::fund(Some(asset.unwrap_or_default()), owner, heir, inactivity_secs, name).encode()
    }

    fn encode_add_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8> {
        plan.follow_up(HeirFunction::AddTokens, funding_txid).encode()
    }

    fn encode_claim_metadata(&self, plan: &HeirOpRet, funding_txid: TxId) -> Vec<u8> {
        plan.follow_up(HeirFunction::ClaimTokens, funding_txid).encode()
    }

    fn custody_units(&self, tx: &Transaction, txid: &TxId, vout: usize, plan: &HeirOpRet) -> Units {
        let Some(asset) = plan.asset_id else {
            return 0;
        };
        match tx.payload_outputs().get(vout) {
            Some(output) if at_custody(self, output, plan) => contract_vout_value(tx, txid, vout, &asset),
            _ => 0,
        }
    }
}

pub static COIN_CUSTODY: CoinCustody = CoinCustody;
pub static TOKEN_CUSTODY: TokenCustody = TokenCustody;

/// The instrument owning `function`.
#[must_use]
pub fn instrument_for(function: HeirFunction) -> &'static dyn CustodyInstrument {
    if function.is_token() {
        &TOKEN_CUSTODY
    } else {
        &COIN_CUSTODY
    }
}
