//! Read-only plan queries.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ccmarket_codec::decode_heir;
use ccmarket_provenance::token_balance;
use ccmarket_types::{
    AssetId, Condition, EvalCode, LedgerView, PubKey, Result, TxId, Units, constants,
    plain_address,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{EscrowResolver, custody_outputs, resolve_plan};

/// One plan as listed from its funding marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub funding_txid: TxId,
    pub name: String,
    pub asset_id: Option<AssetId>,
}

/// Full state of one plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInfo {
    pub funding_txid: TxId,
    pub name: String,
    pub asset_id: Option<AssetId>,
    pub owner: PubKey,
    pub heir: PubKey,
    /// Units ever deposited by fund and add transactions.
    pub lifetime_funding: Units,
    /// Units currently spendable from custody.
    pub available_funding: Units,
    /// Owner's own balance of the plan's token.
    pub owner_token_balance: Option<Units>,
    /// Coin plans only, in whole coins.
    pub lifetime_coins: Option<Decimal>,
    pub available_coins: Option<Decimal>,
    pub inactivity_secs: u64,
    pub heir_spending_allowed: bool,
    pub heir_spending_begun: bool,
    pub latest_txid: TxId,
    pub latest_activity: Option<DateTime<Utc>>,
}

fn to_coins(units: Units) -> Option<Decimal> {
    Decimal::from(units).checked_div(Decimal::from(constants::COIN))
}

/// Describe the plan funded by `funding_txid` at chain time `now`.
pub fn plan_info(ledger: &dyn LedgerView, funding_txid: &TxId, now: u64) -> Result<PlanInfo> {
    let (instrument, state) = resolve_plan(ledger, funding_txid)?;
    let lifetime = EscrowResolver::new(ledger, instrument).lifetime_funding(&state);
    let available = custody_outputs(ledger, instrument, &state)
        .iter()
        .fold(0, |acc: Units, (_, units)| acc.saturating_add(*units));
    let asset_id = state.funding.asset_id;
    let owner_token_balance = asset_id.map(|asset| {
        token_balance(ledger, &Condition::single(EvalCode::TOKENS, state.latest.owner), &asset)
    });
    let coin_plan = asset_id.is_none();

    tracing::debug!(%funding_txid, lifetime, available, "Plan info");
    Ok(PlanInfo {
        funding_txid: *funding_txid,
        name: state.funding.name.clone(),
        asset_id,
        owner: state.latest.owner,
        heir: state.latest.heir,
        lifetime_funding: lifetime,
        available_funding: available,
        owner_token_balance,
        lifetime_coins: coin_plan.then(|| to_coins(lifetime)).flatten(),
        available_coins: coin_plan.then(|| to_coins(available)).flatten(),
        inactivity_secs: state.latest.inactivity_secs,
        heir_spending_allowed: state.heir_eligible(now),
        heir_spending_begun: state.heir_spending_begun,
        latest_txid: state.latest_txid,
        latest_activity: state.latest_activity(),
    })
}

/// Every plan whose funding marker is still unspent at the escrow global
/// address, in ledger order.
pub fn list_plans(ledger: &dyn LedgerView) -> Vec<PlanSummary> {
    let markers = plain_address(&PubKey::module_global(EvalCode::HEIR));
    let mut seen = HashSet::new();
    ledger
        .find_unspent_outputs(&markers)
        .into_iter()
        .filter(|row| seen.insert(row.txid))
        .filter_map(|row| {
            let entry = ledger.get_transaction(&row.txid)?;
            let op = decode_heir(entry.tx.metadata()?).ok()?;
            op.function.is_create().then(|| PlanSummary {
                funding_txid: row.txid,
                name: op.name,
                asset_id: op.asset_id,
            })
        })
        .collect()
}
