//! In-memory [`LedgerView`] for tests.
//!
//! Confirmed transactions and the pending pool are kept in insertion order so
//! address scans are deterministic.

use std::collections::{HashMap, HashSet};

use crate::{
    Address, AddressOutput, BlockRef, LedgerEntry, LedgerView, OutPoint, Transaction, TxId,
};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    confirmed: HashMap<TxId, (Transaction, BlockRef)>,
    confirmed_order: Vec<TxId>,
    pool: HashMap<TxId, Transaction>,
    spent_on_chain: HashSet<OutPoint>,
    spent_in_pool: HashSet<OutPoint>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm `tx` in `block`. A copy waiting in the pool is evicted.
    pub fn confirm(&mut self, tx: Transaction, block: BlockRef) -> TxId {
        let txid = tx.txid();
        if self.pool.remove(&txid).is_some() {
            for input in &tx.inputs {
                self.spent_in_pool.remove(&input.prevout);
            }
        }
        for input in &tx.inputs {
            self.spent_on_chain.insert(input.prevout);
        }
        if !self.confirmed.contains_key(&txid) {
            self.confirmed_order.push(txid);
        }
        self.confirmed.insert(txid, (tx, block));
        txid
    }

    /// Put `tx` in the pending pool.
    pub fn submit(&mut self, tx: Transaction) -> TxId {
        let txid = tx.txid();
        for input in &tx.inputs {
            self.spent_in_pool.insert(input.prevout);
        }
        self.pool.insert(txid, tx);
        txid
    }

    /// Number of confirmed transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    fn outputs_to<'a>(
        &'a self,
        address: &'a Address,
    ) -> impl Iterator<Item = (OutPoint, AddressOutput)> + 'a {
        self.confirmed_order.iter().flat_map(move |txid| {
            let (tx, block) = &self.confirmed[txid];
            tx.outputs
                .iter()
                .enumerate()
                .filter(move |(_, out)| out.script.address().as_ref() == Some(address))
                .filter_map(move |(vout, out)| {
                    let vout = u32::try_from(vout).ok()?;
                    let row = AddressOutput {
                        txid: *txid,
                        vout,
                        value: out.value,
                        height: block.height,
                    };
                    Some((row.outpoint(), row))
                })
        })
    }
}

impl LedgerView for MemoryLedger {
    fn get_transaction(&self, txid: &TxId) -> Option<LedgerEntry> {
        self.confirmed.get(txid).map(|(tx, block)| LedgerEntry {
            tx: tx.clone(),
            block: Some(*block),
        })
    }

    fn get_unconfirmed_transaction(&self, txid: &TxId) -> Option<LedgerEntry> {
        self.get_transaction(txid).or_else(|| {
            self.pool.get(txid).map(|tx| LedgerEntry {
                tx: tx.clone(),
                block: None,
            })
        })
    }

    fn find_unspent_outputs(&self, address: &Address) -> Vec<AddressOutput> {
        self.outputs_to(address)
            .filter(|(outpoint, _)| !self.spent_on_chain.contains(outpoint))
            .map(|(_, row)| row)
            .collect()
    }

    fn find_all_historical_outputs(&self, address: &Address) -> Vec<AddressOutput> {
        self.outputs_to(address).map(|(_, row)| row).collect()
    }

    fn is_spent_in_mempool(&self, outpoint: &OutPoint) -> bool {
        self.spent_in_pool.contains(outpoint)
    }
}
