//! Read-only access to the UTXO set, the address index and the pending pool.
//!
//! The ledger is an external collaborator. Validators only read through
//! [`LedgerView`]; any locking is the implementor's concern.

use serde::{Deserialize, Serialize};

use crate::{Address, OutPoint, Transaction, TxId, Units};

/// Block that confirmed a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub height: u32,
    /// Block timestamp in seconds since the UNIX epoch.
    pub time: u64,
}

/// A transaction together with where it currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub tx: Transaction,
    /// `None` while the transaction sits in the pending pool.
    pub block: Option<BlockRef>,
}

impl LedgerEntry {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }

    /// Confirmation height, 0 while pending.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.block.map_or(0, |b| b.height)
    }
}

/// One row of the address index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressOutput {
    pub txid: TxId,
    pub vout: u32,
    pub value: Units,
    /// Confirmation height, 0 while pending.
    pub height: u32,
}

impl AddressOutput {
    #[must_use]
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Queries the contract core consumes from the ledger.
pub trait LedgerView {
    /// A confirmed transaction.
    fn get_transaction(&self, txid: &TxId) -> Option<LedgerEntry>;

    /// A transaction from the chain or the pending pool. Used inside
    /// mempool-admission validation.
    fn get_unconfirmed_transaction(&self, txid: &TxId) -> Option<LedgerEntry>;

    /// Confirmed outputs to `address` not yet spent on chain.
    fn find_unspent_outputs(&self, address: &Address) -> Vec<AddressOutput>;

    /// Every confirmed output ever sent to `address`, spent or not.
    fn find_all_historical_outputs(&self, address: &Address) -> Vec<AddressOutput>;

    /// True when a pending transaction already spends `outpoint`.
    fn is_spent_in_mempool(&self, _outpoint: &OutPoint) -> bool {
        false
    }
}
