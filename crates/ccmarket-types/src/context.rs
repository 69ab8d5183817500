//! Per-call validation context and the verdict returned to consensus.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CcMarketError, LedgerEntry, LedgerView, Result, TxId};

/// Where ancestor lookups are served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupMode {
    /// Block validation: confirmed chain only.
    Chain,
    /// Mempool admission: chain or pending pool.
    Pool,
}

impl LookupMode {
    /// Fetch `txid` according to the mode.
    pub fn fetch<L: LedgerView + ?Sized>(self, ledger: &L, txid: &TxId) -> Option<LedgerEntry> {
        match self {
            Self::Chain => ledger.get_transaction(txid),
            Self::Pool => ledger.get_unconfirmed_transaction(txid),
        }
    }

    /// Fetch `txid`, failing with [`CcMarketError::AncestorNotFound`].
    pub fn require<L: LedgerView + ?Sized>(self, ledger: &L, txid: &TxId) -> Result<LedgerEntry> {
        self.fetch(ledger, txid)
            .ok_or(CcMarketError::AncestorNotFound(*txid))
    }
}

impl fmt::Display for LookupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain => write!(f, "CHAIN"),
            Self::Pool => write!(f, "POOL"),
        }
    }
}

/// Everything a validation call needs besides the ledger and the transaction.
///
/// `now` is the chain time the caller validates against (block time, or the
/// tip's time for mempool admission). Validators never read a wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub mode: LookupMode,
    pub now: u64,
}

impl ValidationContext {
    #[must_use]
    pub fn chain(now: u64) -> Self {
        Self {
            mode: LookupMode::Chain,
            now,
        }
    }

    #[must_use]
    pub fn pool(now: u64) -> Self {
        Self {
            mode: LookupMode::Pool,
            now,
        }
    }
}

/// Outcome handed back to the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject { reason: String },
}

impl Verdict {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Accept => None,
            Self::Reject { reason } => Some(reason),
        }
    }
}

impl From<Result<()>> for Verdict {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(err) => Self::Reject {
                reason: err.to_string(),
            },
        }
    }
}
