//! The UTXO transaction model.

use serde::{Deserialize, Serialize};

use crate::{Fulfillment, Script, TxId, constants};

/// Non-negative count of indivisible coin or token units.
pub type Units = u64;

/// Reference to one output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

impl OutPoint {
    #[must_use]
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// The output slot as an index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.vout as usize
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub fulfillment: Fulfillment,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Units,
    pub script: Script,
}

impl TxOut {
    #[must_use]
    pub fn new(value: Units, script: impl Into<Script>) -> Self {
        Self {
            value,
            script: script.into(),
        }
    }

    /// Zero-valued metadata output.
    #[must_use]
    pub fn metadata(payload: Vec<u8>) -> Self {
        Self {
            value: 0,
            script: Script::OpReturn(payload),
        }
    }
}

/// A ledger transaction. By convention the trailing output of a contract
/// transaction is its metadata output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    #[must_use]
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Canonical serialization hashed into the transaction id.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 * (self.inputs.len() + self.outputs.len()));
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            out.extend_from_slice(input.prevout.txid.as_bytes());
            out.extend_from_slice(&input.prevout.vout.to_le_bytes());
            input.fulfillment.encode_into(&mut out);
        }
        out.extend_from_slice(&(self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            output.script.encode_into(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// The transaction id.
    #[must_use]
    pub fn txid(&self) -> TxId {
        TxId::digest(constants::TXID_DOMAIN, &[&self.canonical_bytes()])
    }

    /// Payload of the trailing output, when it is a metadata output.
    #[must_use]
    pub fn metadata(&self) -> Option<&[u8]> {
        self.outputs.last().and_then(|out| out.script.op_return_data())
    }

    /// Outputs before the trailing metadata slot.
    #[must_use]
    pub fn payload_outputs(&self) -> &[TxOut] {
        match self.outputs.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Output referenced by `vout`, if present.
    #[must_use]
    pub fn output(&self, vout: u32) -> Option<&TxOut> {
        self.outputs.get(vout as usize)
    }
}
