//! Unit conservation across the spend graph.
//!
//! For a transaction `T` and asset `A`, each contract input of `T` is matched
//! against the output it spends in its ancestor, and the matched total must
//! equal `T`'s contract output total. `T` is exempt when it is `A`'s genesis.
//!
//! Under [`ProvenanceRules::heir`] the check is transitive: an ancestor output
//! only counts when that ancestor is itself the genesis or balanced under the
//! same rule, all the way up the spend chain. The walk is an explicit
//! post-order stack with a memo, an in-progress set, a depth cap and a node
//! cap, so adversarial chains cannot exhaust the call stack.

use std::collections::{HashMap, HashSet};

use ccmarket_types::{
    AssetId, CcMarketError, EvalCode, LedgerView, Result, Transaction, TxId, Units,
    ValidationConfig, ValidationContext,
};
use serde::{Deserialize, Serialize};

use crate::classifier::{contract_vout_value, discover_asset};

/// Which inputs count and how deep the check goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRules {
    /// An input counts when its fulfillment carries any of these modules.
    pub input_evals: Vec<EvalCode>,
    /// Require every counted ancestor to be balanced as well.
    pub transitive: bool,
    /// Reject ancestors still in the pending pool.
    pub confirmed_ancestors: bool,
}

impl ProvenanceRules {
    /// Order-book rules: immediate parents only.
    #[must_use]
    pub fn order_book() -> Self {
        Self {
            input_evals: vec![EvalCode::ASSETS, EvalCode::TOKENS],
            transitive: false,
            confirmed_ancestors: false,
        }
    }

    /// Escrow rules: transitive, confirmed ancestors only.
    #[must_use]
    pub fn heir() -> Self {
        Self {
            input_evals: vec![EvalCode::HEIR, EvalCode::TOKENS],
            transitive: true,
            confirmed_ancestors: true,
        }
    }
}

/// Matched contract input and output totals for one transaction and asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceTally {
    pub inputs: Units,
    pub outputs: Units,
}

impl ProvenanceTally {
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.inputs == self.outputs
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    sound: bool,
    tally: ProvenanceTally,
}

enum Visit {
    Enter { txid: TxId, depth: usize },
    Exit { txid: TxId },
}

/// Counted input of a transaction: the ancestor and the units its output
/// carries for the asset.
struct CountedInput {
    parent: TxId,
    value: Units,
}

/// Provenance checker bound to one ledger and validation context.
///
/// Holds no state between calls; every call builds its own memo.
pub struct ProvenanceValidator<'a, L: LedgerView + ?Sized> {
    ledger: &'a L,
    ctx: ValidationContext,
    rules: ProvenanceRules,
    config: ValidationConfig,
}

impl<'a, L: LedgerView + ?Sized> ProvenanceValidator<'a, L> {
    pub fn new(ledger: &'a L, ctx: ValidationContext, rules: ProvenanceRules, config: ValidationConfig) -> Self {
        Self {
            ledger,
            ctx,
            rules,
            config,
        }
    }

    /// Validate `tx` for `asset`, or for the asset named by its own metadata
    /// when `asset` is `None`. Returns the tally on success.
    pub fn validate(&self, tx: &Transaction, asset: Option<AssetId>) -> Result<ProvenanceTally> {
        let txid = tx.txid();
        let asset = match asset {
            Some(a) => a,
            None => discover_asset(tx).ok_or(CcMarketError::AssetUndiscoverable(txid))?,
        };
        let mut walk = Walk::new(self, asset);
        let inputs = walk.counted_inputs(tx)?;
        if self.rules.transitive {
            walk.resolve(inputs.iter().map(|i| i.parent))?;
        }
        let tally = walk.tally(tx, &txid, &inputs);

        if txid == asset {
            tracing::debug!(%txid, outputs = tally.outputs, "Genesis transaction exempt from conservation");
            return Ok(tally);
        }
        if !tally.is_balanced() {
            if let Some(bad) = inputs.iter().find_map(|i| walk.unsound(&i.parent)) {
                tracing::warn!(%txid, ancestor = %bad.0, inputs = bad.1.inputs, outputs = bad.1.outputs, "Ancestor not balanced");
                return Err(CcMarketError::AncestorImbalance {
                    txid: bad.0,
                    inputs: bad.1.inputs,
                    outputs: bad.1.outputs,
                });
            }
            tracing::warn!(%txid, asset = %asset.short(), inputs = tally.inputs, outputs = tally.outputs, "Units not conserved");
            return Err(CcMarketError::UnitsNotConserved {
                txid,
                asset,
                inputs: tally.inputs,
                outputs: tally.outputs,
            });
        }
        tracing::debug!(%txid, inputs = tally.inputs, outputs = tally.outputs, "Provenance balanced");
        Ok(tally)
    }

    /// Tally `tx` for `asset` without judging it. Counted ancestors are only
    /// checked transitively under transitive rules.
    pub fn tally(&self, tx: &Transaction, asset: &AssetId) -> Result<ProvenanceTally> {
        let txid = tx.txid();
        let mut walk = Walk::new(self, *asset);
        let inputs = walk.counted_inputs(tx)?;
        if self.rules.transitive {
            walk.resolve(inputs.iter().map(|i| i.parent))?;
        }
        Ok(walk.tally(tx, &txid, &inputs))
    }
}

/// State of one validation call.
struct Walk<'v, 'a, L: LedgerView + ?Sized> {
    validator: &'v ProvenanceValidator<'a, L>,
    asset: AssetId,
    cache: HashMap<TxId, Transaction>,
    memo: HashMap<TxId, NodeState>,
}

impl<'v, 'a, L: LedgerView + ?Sized> Walk<'v, 'a, L> {
    fn new(validator: &'v ProvenanceValidator<'a, L>, asset: AssetId) -> Self {
        Self {
            validator,
            asset,
            cache: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    fn load(&mut self, txid: &TxId) -> Result<&Transaction> {
        if !self.cache.contains_key(txid) {
            let limit = self.validator.config.max_provenance_nodes;
            if self.cache.len() >= limit {
                return Err(CcMarketError::ProvenanceTooLarge { limit });
            }
            let entry = self.validator.ctx.mode.require(self.validator.ledger, txid)?;
            if self.validator.rules.confirmed_ancestors && !entry.is_confirmed() {
                tracing::warn!(%txid, "Ancestor still pending");
                return Err(CcMarketError::AncestorUnconfirmed(*txid));
            }
            self.cache.insert(*txid, entry.tx);
        }
        self.cache
            .get(txid)
            .ok_or_else(|| CcMarketError::Internal(format!("ancestor {txid} vanished from cache")))
    }

    /// Inputs of `tx` under the rules' modules whose spent output carries the
    /// asset. Loads each parent once.
    fn counted_inputs(&mut self, tx: &Transaction) -> Result<Vec<CountedInput>> {
        let mut counted = Vec::new();
        for input in &tx.inputs {
            let relevant = self
                .validator
                .rules
                .input_evals
                .iter()
                .any(|eval| input.fulfillment.spends_eval(*eval));
            if !relevant {
                continue;
            }
            let parent = input.prevout.txid;
            let asset = self.asset;
            let parent_tx = self.load(&parent)?;
            let value = contract_vout_value(parent_tx, &parent, input.prevout.index(), &asset);
            if value > 0 {
                counted.push(CountedInput { parent, value });
            }
        }
        Ok(counted)
    }

    /// Outputs of `tx` for the asset, and counted inputs whose parent is sound.
    fn tally(&self, tx: &Transaction, txid: &TxId, inputs: &[CountedInput]) -> ProvenanceTally {
        let transitive = self.validator.rules.transitive;
        let inputs = inputs
            .iter()
            .filter(|i| !transitive || self.memo.get(&i.parent).is_some_and(|s| s.sound))
            .fold(0u128, |acc, i| acc + u128::from(i.value));
        let outputs = (0..tx.outputs.len())
            .map(|slot| contract_vout_value(tx, txid, slot, &self.asset))
            .fold(0u128, |acc, v| acc + u128::from(v));
        ProvenanceTally {
            inputs: Units::try_from(inputs).unwrap_or(Units::MAX),
            outputs: Units::try_from(outputs).unwrap_or(Units::MAX),
        }
    }

    fn unsound(&self, txid: &TxId) -> Option<(TxId, ProvenanceTally)> {
        self.memo
            .get(txid)
            .filter(|s| !s.sound)
            .map(|s| (*txid, s.tally))
    }

    /// Post-order walk deciding soundness of every ancestor reachable from
    /// `roots` through counted inputs.
    fn resolve(&mut self, roots: impl Iterator<Item = TxId>) -> Result<()> {
        let max_depth = self.validator.config.max_provenance_depth;
        let mut in_progress: HashSet<TxId> = HashSet::new();
        let mut pending: HashMap<TxId, Vec<CountedInput>> = HashMap::new();
        let mut stack: Vec<Visit> = roots.map(|txid| Visit::Enter { txid, depth: 1 }).collect();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter { txid, depth } => {
                    if self.memo.contains_key(&txid) {
                        continue;
                    }
                    if in_progress.contains(&txid) {
                        return Err(CcMarketError::ProvenanceCycle(txid));
                    }
                    if depth > max_depth {
                        return Err(CcMarketError::ProvenanceDepthExceeded { limit: max_depth });
                    }
                    if txid == self.asset {
                        self.memo.insert(
                            txid,
                            NodeState {
                                sound: true,
                                tally: ProvenanceTally::default(),
                            },
                        );
                        continue;
                    }
                    let tx = self.load(&txid)?.clone();
                    let inputs = self.counted_inputs(&tx)?;
                    in_progress.insert(txid);
                    stack.push(Visit::Exit { txid });
                    stack.extend(inputs.iter().map(|i| Visit::Enter {
                        txid: i.parent,
                        depth: depth + 1,
                    }));
                    pending.insert(txid, inputs);
                }
                Visit::Exit { txid } => {
                    let inputs = pending.remove(&txid).unwrap_or_default();
                    let tx = self.load(&txid)?.clone();
                    let tally = self.tally(&tx, &txid, &inputs);
                    let sound = tally.is_balanced();
                    if !sound {
                        tracing::debug!(%txid, inputs = tally.inputs, outputs = tally.outputs, "Unsound ancestor");
                    }
                    in_progress.remove(&txid);
                    self.memo.insert(txid, NodeState { sound, tally });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmarket_codec::{encode_token_create, encode_token_transfer};
    use ccmarket_types::{
        BlockRef, Condition, Fulfillment, MemoryLedger, OutPoint, PubKey, TxIn, TxOut,
    };

    const BLOCK: BlockRef = BlockRef {
        height: 1,
        time: 1_000,
    };

    fn holder(label: &str) -> Condition {
        Condition::single(EvalCode::TOKENS, PubKey::from_label(label))
    }

    fn spend(prev: TxId, vout: u32, signer: &str) -> TxIn {
        let cond = holder(signer);
        TxIn {
            prevout: OutPoint::new(prev, vout),
            fulfillment: Fulfillment::for_condition(&cond, PubKey::from_label(signer)),
        }
    }

    fn genesis(ledger: &mut MemoryLedger, supply: Units) -> TxId {
        let key = PubKey::from_label("issuer");
        ledger.confirm(
            Transaction::new(
                vec![],
                vec![
                    TxOut::new(supply, holder("issuer")),
                    TxOut::metadata(encode_token_create(&key, "GOLD", "")),
                ],
            ),
            BLOCK,
        )
    }

    fn transfer(inputs: Vec<TxIn>, outs: &[(Units, &str)], asset: &AssetId) -> Transaction {
        let mut outputs: Vec<TxOut> = outs.iter().map(|(v, who)| TxOut::new(*v, holder(who))).collect();
        outputs.push(TxOut::metadata(encode_token_transfer(asset, &[])));
        Transaction::new(inputs, outputs)
    }

    fn validator(ledger: &MemoryLedger, rules: ProvenanceRules) -> ProvenanceValidator<'_, MemoryLedger> {
        ProvenanceValidator::new(ledger, ValidationContext::chain(2_000), rules, ValidationConfig::default())
    }

    #[test]
    fn balanced_transfer_passes() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 1_000);
        let tx = transfer(vec![spend(asset, 0, "issuer")], &[(600, "bob"), (400, "issuer")], &asset);
        let tally = validator(&ledger, ProvenanceRules::order_book())
            .validate(&tx, None)
            .unwrap();
        assert_eq!(tally, ProvenanceTally { inputs: 1_000, outputs: 1_000 });
    }

    #[test]
    fn minting_transfer_rejected() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 1_000);
        let tx = transfer(vec![spend(asset, 0, "issuer")], &[(1_001, "bob")], &asset);
        let err = validator(&ledger, ProvenanceRules::order_book())
            .validate(&tx, None)
            .unwrap_err();
        assert!(matches!(err, CcMarketError::UnitsNotConserved { inputs: 1_000, outputs: 1_001, .. }));
    }

    #[test]
    fn genesis_is_exempt() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 5_000);
        let tx = ledger.get_transaction(&asset).unwrap().tx;
        let tally = validator(&ledger, ProvenanceRules::heir()).validate(&tx, None).unwrap();
        assert_eq!(tally.inputs, 0);
        assert_eq!(tally.outputs, 5_000);
    }

    #[test]
    fn missing_ancestor_is_distinct_failure() {
        let ledger = MemoryLedger::new();
        let asset = TxId([9; 32]);
        let tx = transfer(vec![spend(TxId([8; 32]), 0, "a")], &[(1, "b")], &asset);
        assert_eq!(
            validator(&ledger, ProvenanceRules::order_book())
                .validate(&tx, None)
                .unwrap_err(),
            CcMarketError::AncestorNotFound(TxId([8; 32]))
        );
    }

    #[test]
    fn transitive_rules_catch_minting_two_levels_up() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 100);
        // inflates 100 into 150
        let bad = ledger.confirm(transfer(vec![spend(asset, 0, "issuer")], &[(150, "a")], &asset), BLOCK);
        let tx = transfer(vec![spend(bad, 0, "a")], &[(150, "b")], &asset);

        // one level: the parent output exists, so the child balances
        validator(&ledger, ProvenanceRules::order_book())
            .validate(&tx, None)
            .unwrap();
        // transitive: the parent is unsound
        let err = validator(&ledger, ProvenanceRules::heir())
            .validate(&tx, None)
            .unwrap_err();
        assert_eq!(
            err,
            CcMarketError::AncestorImbalance {
                txid: bad,
                inputs: 100,
                outputs: 150
            }
        );
    }

    #[test]
    fn heir_rules_reject_pending_ancestors() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 100);
        let pending = ledger.submit(transfer(vec![spend(asset, 0, "issuer")], &[(100, "a")], &asset));
        let tx = transfer(vec![spend(pending, 0, "a")], &[(100, "b")], &asset);
        let v = ProvenanceValidator::new(
            &ledger,
            ValidationContext::pool(2_000),
            ProvenanceRules::heir(),
            ValidationConfig::default(),
        );
        assert_eq!(v.validate(&tx, None).unwrap_err(), CcMarketError::AncestorUnconfirmed(pending));
    }

    #[test]
    fn depth_cap_enforced() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 10);
        let mut prev = asset;
        let mut signer = "issuer".to_string();
        for i in 0..5 {
            let next = format!("k{i}");
            prev = ledger.confirm(transfer(vec![spend(prev, 0, &signer)], &[(10, next.as_str())], &asset), BLOCK);
            signer = next;
        }
        let tx = transfer(vec![spend(prev, 0, &signer)], &[(10, "end")], &asset);
        let config = ValidationConfig {
            max_provenance_depth: 3,
            ..ValidationConfig::default()
        };
        let v = ProvenanceValidator::new(&ledger, ValidationContext::chain(0), ProvenanceRules::heir(), config);
        assert_eq!(
            v.validate(&tx, None).unwrap_err(),
            CcMarketError::ProvenanceDepthExceeded { limit: 3 }
        );
        let deep = validator(&ledger, ProvenanceRules::heir()).validate(&tx, None).unwrap();
        assert!(deep.is_balanced());
    }

    #[test]
    fn node_cap_enforced() {
        let mut ledger = MemoryLedger::new();
        let asset = genesis(&mut ledger, 10);
        let a = ledger.confirm(transfer(vec![spend(asset, 0, "issuer")], &[(10, "a")], &asset), BLOCK);
        let tx = transfer(vec![spend(a, 0, "a")], &[(10, "b")], &asset);
        let config = ValidationConfig {
            max_provenance_nodes: 1,
            ..ValidationConfig::default()
        };
        let v = ProvenanceValidator::new(&ledger, ValidationContext::chain(0), ProvenanceRules::heir(), config);
        assert_eq!(
            v.validate(&tx, None).unwrap_err(),
            CcMarketError::ProvenanceTooLarge { limit: 1 }
        );
    }

    #[test]
    fn undiscoverable_asset() {
        let ledger = MemoryLedger::new();
        let tx = Transaction::new(vec![], vec![TxOut::metadata(vec![0x01, b'x'])]);
        assert!(matches!(
            validator(&ledger, ProvenanceRules::order_book()).validate(&tx, None),
            Err(CcMarketError::AssetUndiscoverable(_))
        ));
    }
}
