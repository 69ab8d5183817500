//! Order-book metadata.
//!
//! An order payload is `[ASSETS, tag, ...fields]` and always travels inside a
//! token transfer envelope whose token id is the traded asset:
//!
//! | tag | fields |
//! |---|---|
//! | `o` `x` (cancel) | none |
//! | `b` `s` `B` `S` | remaining:int64, owner:pubkey |
//! | `e` `E` (swap) | asset2:id, remaining:int64, owner:pubkey |

use std::fmt;

use ccmarket_types::{AssetId, CcMarketError, EvalCode, PubKey, Result, Transaction, TxId, Units};
use serde::{Deserialize, Serialize};

use crate::token::{TokenOpRet, check_header, decode_token, encode_token_transfer};
use crate::wire::{Reader, Writer};

/// Function identifier of an order-book transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderTag {
    /// `b`: coin locked to buy tokens.
    CreateBid,
    /// `s`: tokens locked for sale.
    CreateAsk,
    /// `e`: tokens offered for another token.
    CreateSwap,
    /// `o`
    CancelBid,
    /// `x`
    CancelAsk,
    /// `B`: tokens delivered into a bid.
    FillBid,
    /// `S`: coin paid into an ask.
    FillAsk,
    /// `E`
    FillSwap,
}

impl OrderTag {
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::CreateBid => b'b',
            Self::CreateAsk => b's',
            Self::CreateSwap => b'e',
            Self::CancelBid => b'o',
            Self::CancelAsk => b'x',
            Self::FillBid => b'B',
            Self::FillAsk => b'S',
            Self::FillSwap => b'E',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            b'b' => Self::CreateBid,
            b's' => Self::CreateAsk,
            b'e' => Self::CreateSwap,
            b'o' => Self::CancelBid,
            b'x' => Self::CancelAsk,
            b'B' => Self::FillBid,
            b'S' => Self::FillAsk,
            b'E' => Self::FillSwap,
            other => {
                return Err(CcMarketError::UnknownTag {
                    tag: char::from(other),
                });
            }
        })
    }

    #[must_use]
    pub fn is_swap(self) -> bool {
        matches!(self, Self::CreateSwap | Self::FillSwap)
    }

    #[must_use]
    pub fn is_cancel(self) -> bool {
        matches!(self, Self::CancelBid | Self::CancelAsk)
    }

    /// Tags whose vout0 holds a resting bid (coin at the bid lock).
    #[must_use]
    pub fn is_bid(self) -> bool {
        matches!(self, Self::CreateBid | Self::FillBid)
    }

    /// Tags whose vout0 holds a resting ask (tokens at the ask lock).
    #[must_use]
    pub fn is_ask(self) -> bool {
        matches!(self, Self::CreateAsk | Self::FillAsk | Self::CreateSwap | Self::FillSwap)
    }
}

impl fmt::Display for OrderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.as_byte()))
    }
}

/// The order payload alone, without the token envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPayload {
    pub tag: OrderTag,
    /// Second asset of a swap; zero otherwise.
    pub asset_id2: AssetId,
    pub remaining_units: Units,
    /// Resting order owner; absent for cancels.
    pub owner: Option<PubKey>,
}

/// A fully decoded order-book metadata output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderOpReturn {
    pub tag: OrderTag,
    /// Token traded, taken from the envelope.
    pub asset_id: AssetId,
    /// Second asset of a swap; zero otherwise.
    pub asset_id2: AssetId,
    /// For a bid: tokens still wanted. For an ask: coin still asked.
    pub remaining_units: Units,
    pub owner: Option<PubKey>,
}

impl OrderOpReturn {
    /// Owner, or [`CcMarketError::MalformedPayload`] for a cancel payload.
    pub fn require_owner(&self) -> Result<PubKey> {
        self.owner
            .ok_or_else(|| CcMarketError::malformed(format!("'{}' carries no owner", self.tag)))
    }
}

#[must_use]
pub fn encode_order_payload(
    tag: OrderTag,
    asset_id2: &AssetId,
    remaining_units: Units,
    owner: &PubKey,
) -> Vec<u8> {
    let mut w = Writer::with_header(EvalCode::ASSETS.0, tag.as_byte());
    if tag.is_cancel() {
        return w.finish();
    }
    if tag.is_swap() {
        w.txid(asset_id2);
    }
    w.units(remaining_units).pubkey(owner);
    w.finish()
}

/// Order payload wrapped in a token transfer envelope for `asset_id`.
#[must_use]
pub fn encode_order(
    tag: OrderTag,
    asset_id: &AssetId,
    asset_id2: &AssetId,
    remaining_units: Units,
    owner: &PubKey,
) -> Vec<u8> {
    encode_token_transfer(
        asset_id,
        &encode_order_payload(tag, asset_id2, remaining_units, owner),
    )
}

pub fn decode_order_payload(bytes: &[u8]) -> Result<OrderPayload> {
    let tag = OrderTag::from_byte(check_header(bytes, EvalCode::ASSETS)?)?;
    let mut r = Reader::new(&bytes[2..]);
    let payload = if tag.is_cancel() {
        OrderPayload {
            tag,
            asset_id2: TxId::ZERO,
            remaining_units: 0,
            owner: None,
        }
    } else {
        let asset_id2 = if tag.is_swap() { r.txid()? } else { TxId::ZERO };
        OrderPayload {
            tag,
            asset_id2,
            remaining_units: r.units()?,
            owner: Some(r.pubkey()?),
        }
    };
    r.finish()?;
    Ok(payload)
}

/// Decode order metadata: open the token envelope, then the order payload.
pub fn decode_order(metadata: &[u8]) -> Result<OrderOpReturn> {
    let (asset_id, inner) = match decode_token(metadata)? {
        TokenOpRet::Transfer { token_id, payload } => (token_id, payload),
        TokenOpRet::Create { .. } => {
            return Err(CcMarketError::malformed("token creation carries no order"));
        }
    };
    let payload = decode_order_payload(&inner)?;
    tracing::trace!(tag = %payload.tag, asset = %asset_id.short(), "Decoded order metadata");
    Ok(OrderOpReturn {
        tag: payload.tag,
        asset_id,
        asset_id2: payload.asset_id2,
        remaining_units: payload.remaining_units,
        owner: payload.owner,
    })
}

/// Decode the order metadata of `tx`; fails when it has no metadata output.
pub fn decode_order_tx(tx: &Transaction) -> Result<OrderOpReturn> {
    decode_order(tx.metadata().ok_or(CcMarketError::MissingMetadata)?)
}

/// The asset an output slot carries under `op`.
///
/// Swap transactions route two assets: slots before the second-to-last output
/// carry the first asset and the last slot before the metadata carries the
/// second. Every other tag carries the first asset everywhere.
#[must_use]
pub fn active_asset_for_slot(op: &OrderOpReturn, slot: usize, n_outputs: usize) -> AssetId {
    if op.tag.is_swap() && n_outputs >= 2 && slot == n_outputs - 2 {
        op.asset_id2
    } else {
        op.asset_id
    }
}
