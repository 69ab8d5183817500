//! Output scripts and input fulfillments.
//!
//! The script interpreter and signature checks live outside this core; the
//! model only carries what the contract rules inspect: who an output pays,
//! which modules a condition binds, and the trailing metadata bytes.

use serde::{Deserialize, Serialize};

use crate::{Address, EvalCode, PubKey};

/// A cryptographic-condition spending rule: `threshold` of `keys` must sign
/// and every module in `evals` validates the spend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub evals: Vec<EvalCode>,
    pub keys: Vec<PubKey>,
    pub threshold: u8,
}

impl Condition {
    /// Single-module, single-key condition.
    #[must_use]
    pub fn single(eval: EvalCode, key: PubKey) -> Self {
        Self {
            evals: vec![eval],
            keys: vec![key],
            threshold: 1,
        }
    }

    /// Two-module, single-key condition (e.g. tokens locked under assets).
    #[must_use]
    pub fn dual_eval(first: EvalCode, second: EvalCode, key: PubKey) -> Self {
        Self {
            evals: vec![first, second],
            keys: vec![key],
            threshold: 1,
        }
    }

    /// One-of-two condition spendable by either key.
    #[must_use]
    pub fn one_of_two(evals: Vec<EvalCode>, first: PubKey, second: PubKey) -> Self {
        Self {
            evals,
            keys: vec![first, second],
            threshold: 1,
        }
    }

    #[must_use]
    pub fn has_eval(&self, eval: EvalCode) -> bool {
        self.evals.contains(&eval)
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(0xcc);
        out.push(self.threshold);
        out.push(u8::try_from(self.evals.len()).unwrap_or(u8::MAX));
        out.extend(self.evals.iter().map(|e| e.0));
        out.push(u8::try_from(self.keys.len()).unwrap_or(u8::MAX));
        for key in &self.keys {
            out.extend_from_slice(key.as_bytes());
        }
    }
}

/// An output's locking script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    /// Normal output: `<pubkey> OP_CHECKSIG`.
    PayToPubkey(PubKey),
    /// Cryptographic-condition output.
    Condition(Condition),
    /// Provably unspendable data carrier; the contract metadata.
    OpReturn(Vec<u8>),
}

impl Script {
    /// Canonical byte encoding, used for addresses and transaction ids.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::PayToPubkey(key) => {
                out.push(0x21);
                out.extend_from_slice(key.as_bytes());
                out.push(0xac);
            }
            Self::Condition(condition) => condition.encode_into(out),
            Self::OpReturn(data) => {
                out.push(0x6a);
                out.extend_from_slice(&(data.len() as u64).to_le_bytes());
                out.extend_from_slice(data);
            }
        }
    }

    /// Address-index key of this script. Metadata outputs have none.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::OpReturn(_) => None,
            _ => Some(Address::of_script_bytes(&self.to_bytes())),
        }
    }

    #[must_use]
    pub fn is_condition(&self) -> bool {
        matches!(self, Self::Condition(_))
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    #[must_use]
    pub fn op_return_data(&self) -> Option<&[u8]> {
        match self {
            Self::OpReturn(data) => Some(data),
            _ => None,
        }
    }

    /// True when this is a normal output paying `key`.
    #[must_use]
    pub fn pays_plain(&self, key: &PubKey) -> bool {
        matches!(self, Self::PayToPubkey(k) if k == key)
    }
}

impl From<Condition> for Script {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

/// Address of a condition, without building a full output.
#[must_use]
pub fn condition_address(condition: &Condition) -> Address {
    let mut out = Vec::new();
    condition.encode_into(&mut out);
    Address::of_script_bytes(&out)
}

/// Address of a normal `<pubkey> OP_CHECKSIG` output.
#[must_use]
pub fn plain_address(key: &PubKey) -> Address {
    Address::of_script_bytes(&Script::PayToPubkey(*key).to_bytes())
}

/// What an input presents to unlock the output it spends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Plain signature for a normal output.
    Signature { signer: PubKey },
    /// Condition fulfillment; `evals` are the modules the spent condition binds.
    Condition { evals: Vec<EvalCode>, signer: PubKey },
}

impl Fulfillment {
    #[must_use]
    pub fn is_condition(&self) -> bool {
        matches!(self, Self::Condition { .. })
    }

    /// True when the input is validated by module `eval`.
    #[must_use]
    pub fn spends_eval(&self, eval: EvalCode) -> bool {
        match self {
            Self::Condition { evals, .. } => evals.contains(&eval),
            Self::Signature { .. } => false,
        }
    }

    #[must_use]
    pub fn signer(&self) -> &PubKey {
        match self {
            Self::Signature { signer } | Self::Condition { signer, .. } => signer,
        }
    }

    /// Fulfillment matching a condition output, signed by `signer`.
    #[must_use]
    pub fn for_condition(condition: &Condition, signer: PubKey) -> Self {
        Self::Condition {
            evals: condition.evals.clone(),
            signer,
        }
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Signature { signer } => {
                out.push(0x00);
                out.extend_from_slice(signer.as_bytes());
            }
            Self::Condition { evals, signer } => {
                out.push(0x01);
                out.push(u8::try_from(evals.len()).unwrap_or(u8::MAX));
                out.extend(evals.iter().map(|e| e.0));
                out.extend_from_slice(signer.as_bytes());
            }
        }
    }
}
