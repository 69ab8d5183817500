//! Token UTXO discovery for transaction builders.

use ccmarket_types::{
    AddressOutput, AssetId, CcMarketError, Condition, Fulfillment, LedgerView, PubKey, Result,
    TxBuilder, Units, condition_address,
};

use crate::classifier::contract_vout_value;

/// Unspent outputs locked by `holder` that carry `asset`, with the units each
/// carries. Outputs that are not genuine contract vouts for `asset` are left
/// out.
pub fn token_outputs<L: LedgerView + ?Sized>(
    ledger: &L,
    holder: &Condition,
    asset: &AssetId,
) -> Vec<(AddressOutput, Units)> {
    ledger
        .find_unspent_outputs(&condition_address(holder))
        .into_iter()
        .filter_map(|utxo| {
            let entry = ledger.get_transaction(&utxo.txid)?;
            let units = contract_vout_value(&entry.tx, &utxo.txid, utxo.outpoint().index(), asset);
            (units > 0).then_some((utxo, units))
        })
        .collect()
}

/// Total units of `asset` locked by `holder`.
pub fn token_balance<L: LedgerView + ?Sized>(ledger: &L, holder: &Condition, asset: &AssetId) -> Units {
    token_outputs(ledger, holder, asset)
        .iter()
        .fold(0, |acc: Units, (_, units)| acc.saturating_add(*units))
}

/// Add `holder`'s outputs of `asset` to `builder` until `total` units are
/// covered or `max_inputs` were added. Returns the units added.
///
/// Outputs spent in the pending pool or already in the builder are skipped.
pub fn add_token_inputs<L: LedgerView + ?Sized>(
    ledger: &L,
    builder: &mut TxBuilder,
    holder: &Condition,
    signer: PubKey,
    asset: &AssetId,
    total: Units,
    max_inputs: usize,
) -> Result<Units> {
    let mut added: Units = 0;
    let mut count = 0usize;
    for (utxo, units) in token_outputs(ledger, holder, asset) {
        if added >= total || count >= max_inputs {
            break;
        }
        let outpoint = utxo.outpoint();
        if builder.contains(&outpoint) || ledger.is_spent_in_mempool(&outpoint) {
            continue;
        }
        builder.add_input(outpoint, units, Fulfillment::for_condition(holder, signer))?;
        added = added
            .checked_add(units)
            .ok_or(CcMarketError::ArithmeticOverflow { context: "token inputs" })?;
        count += 1;
    }
    tracing::debug!(asset = %asset.short(), added, count, "Gathered token inputs");
    Ok(added)
}
