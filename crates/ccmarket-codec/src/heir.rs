//! Escrow (heir) plan metadata.
//!
//! Coin plans:
//! - `F` fund: owner, heir, inactivity, name
//! - `A` add, `C` claim: owner, heir, inactivity, funding id
//!
//! Token plans carry the asset id right after the tag:
//! - `G` fund: asset, owner, heir, inactivity, name
//! - `B` add, `t` claim: asset, owner, heir, inactivity, funding id

use std::fmt;

use ccmarket_types::{AssetId, CcMarketError, EvalCode, PubKey, Result, TxId};
use serde::{Deserialize, Serialize};

use crate::token::check_header;
use crate::wire::{Reader, Writer};

/// Function identifier of an escrow transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeirFunction {
    FundCoins,
    AddCoins,
    ClaimCoins,
    FundTokens,
    AddTokens,
    ClaimTokens,
}

impl HeirFunction {
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::FundCoins => b'F',
            Self::AddCoins => b'A',
            Self::ClaimCoins => b'C',
            Self::FundTokens => b'G',
            Self::AddTokens => b'B',
            Self::ClaimTokens => b't',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            b'F' => Self::FundCoins,
            b'A' => Self::AddCoins,
            b'C' => Self::ClaimCoins,
            b'G' => Self::FundTokens,
            b'B' => Self::AddTokens,
            b't' => Self::ClaimTokens,
            other => {
                return Err(CcMarketError::UnknownTag {
                    tag: char::from(other),
                });
            }
        })
    }

    #[must_use]
    pub fn tag(self) -> char {
        char::from(self.as_byte())
    }

    /// Plan creation; carries a name instead of a funding id.
    #[must_use]
    pub fn is_create(self) -> bool {
        matches!(self, Self::FundCoins | Self::FundTokens)
    }

    #[must_use]
    pub fn is_add(self) -> bool {
        matches!(self, Self::AddCoins | Self::AddTokens)
    }

    /// Spends from the custody address.
    #[must_use]
    pub fn is_claim(self) -> bool {
        matches!(self, Self::ClaimCoins | Self::ClaimTokens)
    }

    #[must_use]
    pub fn is_token(self) -> bool {
        matches!(self, Self::FundTokens | Self::AddTokens | Self::ClaimTokens)
    }
}

impl fmt::Display for HeirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Decoded escrow metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeirOpRet {
    pub function: HeirFunction,
    /// Token held by the plan; `None` for coin plans.
    pub asset_id: Option<AssetId>,
    pub owner: PubKey,
    pub heir: PubKey,
    pub inactivity_secs: u64,
    /// Plan name; empty except on fund transactions.
    pub name: String,
    /// Id of the plan's fund transaction; zero on fund transactions.
    pub funding_txid: TxId,
}

impl HeirOpRet {
    /// Metadata of a fund transaction. `asset_id` selects the token variant.
    #[must_use]
    pub fn fund(
        asset_id: Option<AssetId>,
        owner: PubKey,
        heir: PubKey,
        inactivity_secs: u64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            function: if asset_id.is_some() {
                HeirFunction::FundTokens
            } else {
                HeirFunction::FundCoins
            },
            asset_id,
            owner,
            heir,
            inactivity_secs,
            name: name.into(),
            funding_txid: TxId::ZERO,
        }
    }

    /// Metadata of an add or claim transaction continuing `funding_txid`.
    #[must_use]
    pub fn follow_up(&self, function: HeirFunction, funding_txid: TxId) -> Self {
        Self {
            function,
            asset_id: self.asset_id,
            owner: self.owner,
            heir: self.heir,
            inactivity_secs: self.inactivity_secs,
            name: String::new(),
            funding_txid,
        }
    }

    /// The referenced funding id; `None` on fund transactions or when zero.
    #[must_use]
    pub fn funding(&self) -> Option<TxId> {
        (!self.function.is_create() && !self.funding_txid.is_zero()).then_some(self.funding_txid)
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_header(EvalCode::HEIR.0, self.function.as_byte());
        if self.function.is_token() {
            w.txid(&self.asset_id.unwrap_or_default());
        }
        w.pubkey(&self.owner)
            .pubkey(&self.heir)
            .units(self.inactivity_secs);
        if self.function.is_create() {
            w.string(&self.name);
        } else {
            w.txid(&self.funding_txid);
        }
        w.finish()
    }
}

fn decode_body(function: HeirFunction, bytes: &[u8]) -> Result<HeirOpRet> {
    let mut r = Reader::new(&bytes[2..]);
    let asset_id = if function.is_token() {
        Some(r.txid()?)
    } else {
        None
    };
    let owner = r.pubkey()?;
    let heir = r.pubkey()?;
    let inactivity_secs = r.units()?;
    let (name, funding_txid) = if function.is_create() {
        (r.string()?, TxId::ZERO)
    } else {
        (String::new(), r.txid()?)
    };
    r.finish()?;
    Ok(HeirOpRet {
        function,
        asset_id,
        owner,
        heir,
        inactivity_secs,
        name,
        funding_txid,
    })
}

/// Decode escrow metadata of any function.
pub fn decode_heir(bytes: &[u8]) -> Result<HeirOpRet> {
    let function = HeirFunction::from_byte(check_header(bytes, EvalCode::HEIR)?)?;
    decode_body(function, bytes)
}

/// Decode escrow metadata, accepting only coin-plan functions.
pub fn decode_heir_coin(bytes: &[u8]) -> Result<HeirOpRet> {
    decode_filtered(bytes, false)
}

/// Decode escrow metadata, accepting only token-plan functions.
pub fn decode_heir_token(bytes: &[u8]) -> Result<HeirOpRet> {
    decode_filtered(bytes, true)
}

fn decode_filtered(bytes: &[u8], token: bool) -> Result<HeirOpRet> {
    let byte = check_header(bytes, EvalCode::HEIR)?;
    let function = HeirFunction::from_byte(byte)?;
    if function.is_token() != token {
        return Err(CcMarketError::UnknownTag {
            tag: char::from(byte),
        });
    }
    decode_body(function, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(asset: Option<AssetId>) -> HeirOpRet {
        HeirOpRet::fund(
            asset,
            PubKey::from_label("owner"),
            PubKey::from_label("heir"),
            1_000_000,
            "estate",
        )
    }

    #[test]
    fn coin_fund_layout() {
        let op = plan(None);
        assert_eq!(op.function, HeirFunction::FundCoins);
        let bytes = op.encode();
        assert_eq!(&bytes[..2], &[0xea, b'F']);
        // owner, heir, inactivity, name
        assert_eq!(bytes.len(), 2 + 34 + 34 + 8 + 1 + 6);
        assert_eq!(decode_heir(&bytes).unwrap(), op);
        assert_eq!(op.funding(), None);
    }

    #[test]
    fn token_claim_layout() {
        let asset = TxId([5; 32]);
        let funding = TxId([6; 32]);
        let op = plan(Some(asset)).follow_up(HeirFunction::ClaimTokens, funding);
        let bytes = op.encode();
        assert_eq!(&bytes[..2], &[0xea, b't']);
        assert_eq!(bytes.len(), 2 + 32 + 34 + 34 + 8 + 32);
        let decoded = decode_heir_token(&bytes).unwrap();
        assert_eq!(decoded.asset_id, Some(asset));
        assert_eq!(decoded.funding(), Some(funding));
        assert!(decoded.name.is_empty());
    }

    #[test]
    fn instrument_filters() {
        let coin = plan(None).encode();
        let token = plan(Some(TxId([1; 32]))).encode();
        assert!(decode_heir_coin(&coin).is_ok());
        assert_eq!(
            decode_heir_token(&coin).unwrap_err(),
            CcMarketError::UnknownTag { tag: 'F' }
        );
        assert!(decode_heir_token(&token).is_ok());
        assert!(decode_heir_coin(&token).is_err());
    }

    #[test]
    fn zero_funding_id_reads_as_absent() {
        let op = plan(None).follow_up(HeirFunction::AddCoins, TxId::ZERO);
        let decoded = decode_heir(&op.encode()).unwrap();
        assert_eq!(decoded.funding(), None);
    }

    #[test]
    fn truncated_payload_rejected() {
        let mut bytes = plan(None).follow_up(HeirFunction::ClaimCoins, TxId([2; 32])).encode();
        bytes.truncate(bytes.len() - 1);
        assert!(decode_heir(&bytes).unwrap_err().to_string().starts_with("CM_ERR_104"));
    }

    #[test]
    fn function_classes() {
        assert!(HeirFunction::ClaimTokens.is_claim());
        assert!(HeirFunction::ClaimTokens.is_token());
        assert!(HeirFunction::AddCoins.is_add());
        assert!(!HeirFunction::AddCoins.is_token());
        assert_eq!(HeirFunction::from_byte(b'G').unwrap(), HeirFunction::FundTokens);
    }
}
