//! Classification of outputs as token-carrying contract vouts.

use ccmarket_codec::{
    OrderOpReturn, TokenOpRet, active_asset_for_slot, decode_heir, decode_order_payload,
    decode_token,
};
use ccmarket_types::{AssetId, EvalCode, Transaction, TxId, Units};

/// Units of `asset` carried by output `slot` of `tx`, or 0.
///
/// An output counts only when:
/// - it precedes the trailing metadata output
/// - it is a condition output bound to the token module
/// - the transaction's metadata ties that slot to `asset`: a token create
///   counts at slot 0 when `asset` is the transaction id, a transfer when its
///   token id (or, for swaps, the slot's active asset) is `asset`, and a token
///   escrow payload when its asset id is `asset`
///
/// `txid` is passed in so callers that already hashed `tx` do not hash again.
#[must_use]
pub fn contract_vout_value(tx: &Transaction, txid: &TxId, slot: usize, asset: &AssetId) -> Units {
    let n = tx.outputs.len();
    if asset.is_zero() || slot + 1 >= n {
        return 0;
    }
    let output = &tx.outputs[slot];
    if !output
        .script
        .condition()
        .is_some_and(|c| c.has_eval(EvalCode::TOKENS))
    {
        return 0;
    }
    let Some(metadata) = tx.metadata() else {
        return 0;
    };
    if metadata_binds_slot(metadata, txid, slot, n, asset) {
        output.value
    } else {
        0
    }
}

fn metadata_binds_slot(metadata: &[u8], txid: &TxId, slot: usize, n: usize, asset: &AssetId) -> bool {
    match metadata.first().copied() {
        Some(m) if m == EvalCode::TOKENS.0 => match decode_token(metadata) {
            Ok(TokenOpRet::Create { .. }) => slot == 0 && asset == txid,
            Ok(TokenOpRet::Transfer { token_id, payload }) => match decode_order_payload(&payload) {
                Ok(order) if order.tag.is_swap() => {
                    let op = OrderOpReturn {
                        tag: order.tag,
                        asset_id: token_id,
                        asset_id2: order.asset_id2,
                        remaining_units: order.remaining_units,
                        owner: order.owner,
                    };
                    active_asset_for_slot(&op, slot, n) == *asset
                }
                _ => token_id == *asset,
            },
            Err(err) => {
                tracing::debug!(%txid, %err, "Undecodable token metadata");
                false
            }
        },
        Some(m) if m == EvalCode::HEIR.0 => decode_heir(metadata)
            .ok()
            .and_then(|op| op.asset_id)
            .is_some_and(|id| id == *asset),
        _ => false,
    }
}

/// The asset a transaction moves, read from its own metadata.
#[must_use]
pub fn discover_asset(tx: &Transaction) -> Option<AssetId> {
    let metadata = tx.metadata()?;
    match metadata.first().copied()? {
        m if m == EvalCode::TOKENS.0 => match decode_token(metadata).ok()? {
            TokenOpRet::Create { .. } => Some(tx.txid()),
            TokenOpRet::Transfer { token_id, .. } => Some(token_id),
        },
        m if m == EvalCode::HEIR.0 => decode_heir(metadata).ok()?.asset_id,
        _ => None,
    }
}
