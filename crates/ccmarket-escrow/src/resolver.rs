//! Plan resolution: from a funding id to the plan's current state.
//!
//! Every transaction of a plan pays the plan's custody address at least once
//! (funding, additions, claim change), so scanning the address history finds
//! them all. The latest confirmed one carries the live custody terms; any
//! claim among them that paid the heir makes heir eligibility permanent.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ccmarket_codec::{HeirOpRet, decode_heir};
use ccmarket_types::{
    AddressOutput, CcMarketError, LedgerView, PubKey, Result, TxId, Units,
};
use serde::Serialize;

use crate::{CustodyInstrument, instrument_for};

/// Resolved state of one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanState {
    pub funding_txid: TxId,
    /// Metadata of the fund transaction.
    pub funding: HeirOpRet,
    pub latest_txid: TxId,
    /// Metadata of the latest state transaction.
    pub latest: HeirOpRet,
    pub latest_height: u32,
    /// Block time of the latest state transaction.
    pub latest_time: u64,
    /// The heir has claimed at least once.
    pub heir_spending_begun: bool,
}

impl PlanState {
    /// Seconds since the latest state transaction, at chain time `now`.
    #[must_use]
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.latest_time)
    }

    #[must_use]
    pub fn heir_eligible(&self, now: u64) -> bool {
        self.heir_spending_begun || self.elapsed(now) > self.latest.inactivity_secs
    }

    /// The owner may always spend; the heir once eligible.
    #[must_use]
    pub fn may_spend(&self, key: &PubKey, now: u64) -> bool {
        *key == self.latest.owner || (*key == self.latest.heir && self.heir_eligible(now))
    }

    /// Latest activity as a timestamp, when representable.
    #[must_use]
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.latest_time).ok()?, 0)
    }

    #[must_use]
    pub fn heir_error(&self, now: u64) -> CcMarketError {
        CcMarketError::HeirNotEligible {
            elapsed: self.elapsed(now),
            timeout: self.latest.inactivity_secs,
        }
    }
}

/// Resolves plans of one instrument against a ledger.
pub struct EscrowResolver<'a> {
    ledger: &'a dyn LedgerView,
    instrument: &'a dyn CustodyInstrument,
}

impl<'a> EscrowResolver<'a> {
    pub fn new(ledger: &'a dyn LedgerView, instrument: &'a dyn CustodyInstrument) -> Self {
        Self { ledger, instrument }
    }

    pub fn resolve(&self, funding_txid: &TxId) -> Result<PlanState> {
        let Some(entry) = self.ledger.get_transaction(funding_txid) else {
            tracing::warn!(%funding_txid, "No funding tx found");
            return Err(CcMarketError::FundingTxNotFound(*funding_txid));
        };
        let Some(block) = entry.block else {
            return Err(CcMarketError::FundingTxNotFound(*funding_txid));
        };
        let metadata = entry.tx.metadata().ok_or(CcMarketError::MissingMetadata)?;
        let funding = self.instrument.decode(metadata)?;
        if !funding.function.is_create() {
            return Err(CcMarketError::UnexpectedFunction {
                tag: funding.function.tag(),
                reason: format!("{funding_txid} is not a plan creation"),
            });
        }

        let mut state = PlanState {
            funding_txid: *funding_txid,
            funding: funding.clone(),
            latest_txid: *funding_txid,
            latest: funding.clone(),
            latest_height: block.height,
            latest_time: block.time,
            heir_spending_begun: false,
        };

        let custody = self.instrument.custody_address(&funding.owner, &funding.heir);
        let mut seen: HashSet<TxId> = HashSet::new();
        seen.insert(*funding_txid);
        for row in self.ledger.find_all_historical_outputs(&custody) {
            if !seen.insert(row.txid) {
                continue;
            }
            let Some(entry) = self.ledger.get_transaction(&row.txid) else {
                continue;
            };
            let Some(block) = entry.block else {
                continue;
            };
            let Some(op) = entry.tx.metadata().and_then(|m| self.instrument.decode(m).ok()) else {
                continue;
            };
            if op.funding() != Some(*funding_txid) {
                continue;
            }
            if self.instrument.is_spending(op.function)
                && entry
                    .tx
                    .payload_outputs()
                    .iter()
                    .any(|out| self.instrument.pays_claimer(&out.script, &funding.heir))
            {
                tracing::debug!(txid = %row.txid, "Heir spending has begun");
                state.heir_spending_begun = true;
            }
            if block.height > state.latest_height {
                state.latest_txid = row.txid;
                state.latest = op;
                state.latest_height = block.height;
                state.latest_time = block.time;
            }
        }
        tracing::debug!(
            funding = %funding_txid,
            latest = %state.latest_txid,
            height = state.latest_height,
            sticky = state.heir_spending_begun,
            instrument = self.instrument.label(),
            "Resolved plan"
        );
        Ok(state)
    }

    /// Lifetime units ever deposited: custody outputs of the plan's fund and
    /// add transactions, confirmed or pending. Claim change is not counted.
    pub fn lifetime_funding(&self, state: &PlanState) -> Units {
        let custody = self
            .instrument
            .custody_address(&state.funding.owner, &state.funding.heir);
        self.ledger
            .find_all_historical_outputs(&custody)
            .into_iter()
            .filter(|row| {
                self.ledger
                    .get_unconfirmed_transaction(&row.txid)
                    .and_then(|entry| entry.tx.metadata().and_then(|m| self.instrument.decode(m).ok()))
                    .is_some_and(|op| {
                        belongs_to(&op, &row.txid, &state.funding_txid) && !op.function.is_claim()
                    })
            })
            .fold(0, |acc: Units, row| acc.saturating_add(row.value))
    }
}

/// Resolve a plan with the instrument its funding transaction names.
pub fn resolve_plan(
    ledger: &dyn LedgerView,
    funding_txid: &TxId,
) -> Result<(&'static dyn CustodyInstrument, PlanState)> {
    let entry = ledger
        .get_transaction(funding_txid)
        .ok_or(CcMarketError::FundingTxNotFound(*funding_txid))?;
    let metadata = entry.tx.metadata().ok_or(CcMarketError::MissingMetadata)?;
    let instrument = instrument_for(decode_heir(metadata)?.function);
    let state = EscrowResolver::new(ledger, instrument).resolve(funding_txid)?;
    Ok((instrument, state))
}

fn belongs_to(op: &HeirOpRet, txid: &TxId, funding_txid: &TxId) -> bool {
    txid == funding_txid || op.funding() == Some(*funding_txid)
}

/// Spendable custody outputs of a plan with the units each holds.
///
/// Outputs spent in the pending pool are left out, as are outputs of other
/// plans sharing the address and, for token plans, outputs that are not
/// genuine contract vouts of the plan's token.
pub fn custody_outputs(
    ledger: &dyn LedgerView,
    instrument: &dyn CustodyInstrument,
    state: &PlanState,
) -> Vec<(AddressOutput, Units)> {
    let custody = instrument.custody_address(&state.funding.owner, &state.funding.heir);
    ledger
        .find_unspent_outputs(&custody)
        .into_iter()
        .filter(|row| !ledger.is_spent_in_mempool(&row.outpoint()))
        .filter_map(|row| {
            let entry = ledger.get_transaction(&row.txid)?;
            let op = instrument.decode(entry.tx.metadata()?).ok()?;
            if !belongs_to(&op, &row.txid, &state.funding_txid) {
                return None;
            }
            let units = instrument.custody_units(&entry.tx, &row.txid, row.outpoint().index(), &state.funding);
            (units > 0).then_some((row, units))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COIN_CUSTODY, TOKEN_CUSTODY};
    use ccmarket_codec::HeirFunction;
    use ccmarket_types::{
        BlockRef, Fulfillment, MemoryLedger, OutPoint, Script, Transaction, TxIn, TxOut,
    };

    fn keys() -> (PubKey, PubKey) {
        (PubKey::from_label("owner"), PubKey::from_label("heir"))
    }

    fn block(height: u32, time: u64) -> BlockRef {
        BlockRef { height, time }
    }

    fn fund(ledger: &mut MemoryLedger, amount: Units, at: BlockRef) -> TxId {
        let (owner, heir) = keys();
        ledger.confirm(
            Transaction::new(
                vec![],
                vec![
                    TxOut::new(amount, COIN_CUSTODY.custody_condition(&owner, &heir)),
                    TxOut::metadata(COIN_CUSTODY.encode_create_metadata(None, owner, heir, 1_000, "estate")),
                ],
            ),
            at,
        )
    }

    fn claim(ledger: &mut MemoryLedger, funding: TxId, spend: OutPoint, to: PubKey, paid: Units, change: Units, at: BlockRef) -> TxId {
        let (owner, heir) = keys();
        let plan = HeirOpRet::fund(None, owner, heir, 1_000, "estate");
        let custody = COIN_CUSTODY.custody_condition(&owner, &heir);
        ledger.confirm(
            Transaction::new(
                vec![TxIn {
                    prevout: spend,
                    fulfillment: Fulfillment::for_condition(&custody, to),
                }],
                vec![
                    TxOut::new(paid, Script::PayToPubkey(to)),
                    TxOut::new(change, custody),
                    TxOut::metadata(COIN_CUSTODY.encode_claim_metadata(&plan, funding)),
                ],
            ),
            at,
        )
    }

    #[test]
    fn missing_funding_tx() {
        let ledger = MemoryLedger::new();
        let resolver = EscrowResolver::new(&ledger, &COIN_CUSTODY);
        assert_eq!(
            resolver.resolve(&TxId([3; 32])).unwrap_err(),
            CcMarketError::FundingTxNotFound(TxId([3; 32]))
        );
    }

    #[test]
    fn funding_alone_is_latest() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        let state = EscrowResolver::new(&ledger, &COIN_CUSTODY).resolve(&funding).unwrap();
        assert_eq!(state.latest_txid, funding);
        assert_eq!(state.latest.function, HeirFunction::FundCoins);
        assert!(!state.heir_spending_begun);
        assert!(!state.heir_eligible(1_100));
        assert!(state.heir_eligible(1_101));
        assert!(state.may_spend(&keys().0, 100));
    }

    #[test]
    fn owner_claim_moves_latest_but_not_sticky() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        let (owner, _) = keys();
        let c = claim(&mut ledger, funding, OutPoint::new(funding, 0), owner, 1_000, 4_000, block(12, 500));
        let state = EscrowResolver::new(&ledger, &COIN_CUSTODY).resolve(&funding).unwrap();
        assert_eq!(state.latest_txid, c);
        assert_eq!(state.latest_time, 500);
        assert!(!state.heir_spending_begun);
        assert!(!state.heir_eligible(1_000));
    }

    #[test]
    fn heir_claim_is_sticky_after_owner_activity() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        let (owner, heir) = keys();
        let c1 = claim(&mut ledger, funding, OutPoint::new(funding, 0), heir, 1_000, 4_000, block(20, 2_000));
        // owner activity resets the inactivity clock
        claim(&mut ledger, funding, OutPoint::new(c1, 1), owner, 1_000, 3_000, block(30, 10_000));
        let state = EscrowResolver::new(&ledger, &COIN_CUSTODY).resolve(&funding).unwrap();
        assert_eq!(state.latest_time, 10_000);
        assert!(state.heir_spending_begun);
        assert!(state.heir_eligible(10_001));
    }

    #[test]
    fn wrong_instrument_rejected() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        assert!(matches!(
            EscrowResolver::new(&ledger, &TOKEN_CUSTODY).resolve(&funding),
            Err(CcMarketError::UnexpectedFunction { tag: 'F', .. })
        ));
    }

    #[test]
    fn resolve_plan_picks_instrument() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        let (instrument, state) = resolve_plan(&ledger, &funding).unwrap();
        assert_eq!(instrument.label(), "coin");
        assert_eq!(state.funding.name, "estate");
    }

    #[test]
    fn custody_outputs_and_lifetime() {
        let mut ledger = MemoryLedger::new();
        let funding = fund(&mut ledger, 5_000, block(10, 100));
        let (owner, _) = keys();
        claim(&mut ledger, funding, OutPoint::new(funding, 0), owner, 1_500, 3_500, block(11, 200));
        let resolver = EscrowResolver::new(&ledger, &COIN_CUSTODY);
        let state = resolver.resolve(&funding).unwrap();
        let available: Units = custody_outputs(&ledger, &COIN_CUSTODY, &state)
            .iter()
            .map(|(_, units)| units)
            .sum();
        assert_eq!(available, 3_500);
        assert_eq!(resolver.lifetime_funding(&state), 5_000);
    }
}
