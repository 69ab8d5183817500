//! Read-only order and token queries.

use std::cmp::Reverse;

use ccmarket_codec::{OrderTag, TokenOpRet, decode_token};
use ccmarket_matchcore::UnitPrice;
use ccmarket_provenance::token_balance;
use ccmarket_types::{
    AssetId, CcMarketError, LedgerView, LookupMode, PubKey, Result, TxId, Units,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::locks::{ask_lock_address, bid_lock_address, token_holder};
use crate::validate::RestingOrder;

/// One open order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    /// Function that left the order resting: a create or a partial fill.
    pub tag: OrderTag,
    pub txid: TxId,
    pub vout: u32,
    /// Coin locked by a bid, token units locked by an ask.
    pub amount: Units,
    pub asset_id: AssetId,
    pub owner: PubKey,
    /// Token units a bid still wants, coin an ask still asks.
    pub total_required: Units,
    /// Coin per token unit.
    pub unit_price: Option<Decimal>,
    #[serde(skip)]
    price: Option<UnitPrice>,
}

impl OrderSummary {
    fn from_order(order: RestingOrder) -> Self {
        let (coin, units) = if order.op.tag.is_bid() {
            (order.locked, order.asking())
        } else {
            (order.asking(), order.locked)
        };
        let price = UnitPrice::new(coin, units);
        Self {
            tag: order.op.tag,
            txid: order.txid,
            vout: 0,
            amount: order.locked,
            asset_id: order.op.asset_id,
            owner: order.owner,
            total_required: order.asking(),
            unit_price: price.and_then(|p| p.to_decimal()),
            price,
        }
    }

    #[must_use]
    pub fn is_bid(&self) -> bool {
        self.tag.is_bid()
    }
}

/// Token genesis details and total supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub token_id: AssetId,
    pub owner: PubKey,
    pub name: String,
    pub description: String,
    pub supply: Units,
}

fn open_side(ledger: &dyn LedgerView, bid: bool, asset: Option<&AssetId>) -> Vec<OrderSummary> {
    let lock = if bid { bid_lock_address() } else { ask_lock_address() };
    ledger
        .find_unspent_outputs(&lock)
        .into_iter()
        .filter(|row| row.vout == 0 && !ledger.is_spent_in_mempool(&row.outpoint()))
        .filter_map(|row| match RestingOrder::load(ledger, LookupMode::Chain, &row.txid, bid) {
            Ok(order) => Some(order),
            Err(err) => {
                tracing::debug!(txid = %row.txid, %err, "Skipping output at order lock");
                None
            }
        })
        .filter(|order| asset.is_none_or(|a| *a == order.op.asset_id))
        .map(OrderSummary::from_order)
        .collect()
}

/// Open bids then open asks, optionally for one asset. Bids are listed
/// highest price first and asks lowest price first.
pub fn list_orders(ledger: &dyn LedgerView, asset: Option<&AssetId>) -> Vec<OrderSummary> {
    let mut bids = open_side(ledger, true, asset);
    bids.sort_by_key(|o| Reverse(o.price));
    let mut asks = open_side(ledger, false, asset);
    asks.sort_by_key(|o| o.price);
    tracing::debug!(bids = bids.len(), asks = asks.len(), "Listed open orders");
    bids.extend(asks);
    bids
}

/// Details of token `asset` from its genesis transaction.
pub fn token_info(ledger: &dyn LedgerView, asset: &AssetId) -> Result<TokenInfo> {
    let entry = ledger
        .get_transaction(asset)
        .ok_or(CcMarketError::UnknownAsset(*asset))?;
    let metadata = entry.tx.metadata().ok_or(CcMarketError::UnknownAsset(*asset))?;
    match decode_token(metadata) {
        Ok(TokenOpRet::Create {
            owner,
            name,
            description,
        }) => Ok(TokenInfo {
            token_id: *asset,
            owner,
            name,
            description,
            supply: entry.tx.outputs.first().map_or(0, |out| out.value),
        }),
        _ => Err(CcMarketError::UnknownAsset(*asset)),
    }
}

/// Units of `asset` held by `key`.
pub fn token_balance_of(ledger: &dyn LedgerView, key: PubKey, asset: &AssetId) -> Units {
    token_balance(ledger, &token_holder(key), asset)
}
