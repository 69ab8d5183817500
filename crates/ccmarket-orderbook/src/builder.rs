//! Order-book operations: create, cancel and fill.
//!
//! Spends of a resting order always put one normal fee input at vin0 and the
//! order's vout0 at vin1, which is what [`crate::OrderBookValidator`] reads.
//! Normal change goes back to the caller.

use ccmarket_codec::{OrderTag, TokenOpRet, decode_token, encodable_units, encode_order};
use ccmarket_matchcore::{UnitPrice, compute_ask_fill, compute_bid_fill};
use ccmarket_provenance::add_token_inputs;
use ccmarket_types::{
    AssetId, BuilderConfig, CcMarketError, Condition, EvalCode, Fulfillment, LedgerView,
    LookupMode, OutPoint, PubKey, Result, Script, Transaction, TxBuilder, TxId, TxOut, Units,
    add_normal_inputs, condition_address,
};

use crate::locks::{ask_lock, bid_lock, token_holder};
use crate::validate::RestingOrder;

/// Builds order-book transactions from ledger state.
pub struct OrderBuilder<'a> {
    ledger: &'a dyn LedgerView,
    config: BuilderConfig,
}

fn positive(value: Units, what: &str) -> Result<()> {
    if value == 0 {
        return Err(CcMarketError::invalid_argument(format!("{what} must be positive")));
    }
    Ok(())
}

impl<'a> OrderBuilder<'a> {
    pub fn new(ledger: &'a dyn LedgerView, config: BuilderConfig) -> Self {
        Self { ledger, config }
    }

    /// Exactly one normal input of `payer` worth at least the fee, so the
    /// order input lands at vin1.
    fn fee_input(&self, builder: &mut TxBuilder, payer: &PubKey) -> Result<()> {
        let needed = self.config.tx_fee;
        let added = add_normal_inputs(self.ledger, builder, payer, needed, 1)?;
        if added < needed {
            tracing::warn!(%payer, needed, added, "No single normal output covers the fee");
            return Err(CcMarketError::InsufficientFunds {
                needed,
                available: added,
            });
        }
        Ok(())
    }

    fn require_token(&self, asset: &AssetId) -> Result<()> {
        let created = self
            .ledger
            .get_transaction(asset)
            .and_then(|entry| entry.tx.metadata().map(decode_token))
            .is_some_and(|op| matches!(op, Ok(TokenOpRet::Create { .. })));
        if created {
            Ok(())
        } else {
            Err(CcMarketError::UnknownAsset(*asset))
        }
    }

    /// An order whose vout0 is still unspent on chain and in the pool.
    fn open_order(&self, txid: &TxId, bid: bool) -> Result<RestingOrder> {
        let order = RestingOrder::load(self.ledger, LookupMode::Chain, txid, bid)?;
        let lock = if bid { bid_lock() } else { ask_lock() };
        let outpoint = OutPoint::new(*txid, 0);
        let unspent = self
            .ledger
            .find_unspent_outputs(&condition_address(&lock))
            .iter()
            .any(|row| row.outpoint() == outpoint);
        if !unspent || self.ledger.is_spent_in_mempool(&outpoint) {
            tracing::warn!(order = %txid, "Order already spent");
            return Err(CcMarketError::OrderNotFound(*txid));
        }
        Ok(order)
    }

    fn spend_order(builder: &mut TxBuilder, order: &RestingOrder, lock: &Condition) -> Result<()> {
        builder.add_input(
            OutPoint::new(order.txid, 0),
            order.locked,
            Fulfillment::for_condition(lock, PubKey::module_global(EvalCode::ASSETS)),
        )
    }

    /// Lock `coin` to buy `units` of `asset`.
    pub fn create_bid(&self, owner: PubKey, asset: AssetId, coin: Units, units: Units) -> Result<Transaction> {
        positive(coin, "bid amount")?;
        positive(units, "units wanted")?;
        encodable_units(units, "units wanted")?;
        self.require_token(&asset)?;
        let fee = self.config.tx_fee;
        let needed = coin
            .checked_add(fee)
            .ok_or(CcMarketError::ArithmeticOverflow { context: "bid plus fee" })?;

        let mut builder = TxBuilder::new();
        let added = add_normal_inputs(self.ledger, &mut builder, &owner, needed, self.config.max_inputs)?;
        if added < needed {
            tracing::warn!(%owner, needed, added, "Coin too low for bid");
            return Err(CcMarketError::InsufficientFunds {
                needed,
                available: added,
            });
        }
        builder.push_output(TxOut::new(coin, bid_lock()));
        let tx = builder.finalize(owner, fee, encode_order(OrderTag::CreateBid, &asset, &TxId::ZERO, units, &owner))?;
        tracing::info!(txid = %tx.txid(), asset = %asset.short(), coin, units, "Built bid");
        Ok(tx)
    }

    /// Lock `units` of `asset` for sale at `coin` in total.
    pub fn create_ask(&self, owner: PubKey, asset: AssetId, units: Units, coin: Units) -> Result<Transaction> {
        positive(units, "units offered")?;
        positive(coin, "asking price")?;
        encodable_units(coin, "asking price")?;
        self.require_token(&asset)?;

        let mut builder = TxBuilder::new();
        self.fee_input(&mut builder, &owner)?;
        let holder = token_holder(owner);
        let added = add_token_inputs(self.ledger, &mut builder, &holder, owner, &asset, units, self.config.max_inputs)?;
        if added < units {
            tracing::warn!(%owner, units, added, "Token balance too low for ask");
            return Err(CcMarketError::InsufficientFunds {
                needed: units,
                available: added,
            });
        }
        builder.push_output(TxOut::new(units, ask_lock()));
        if added > units {
            builder.push_output(TxOut::new(added - units, holder));
        }
        let metadata = encode_order(OrderTag::CreateAsk, &asset, &TxId::ZERO, coin, &owner);
        let tx = builder.finalize(owner, self.config.tx_fee, metadata)?;
        tracing::info!(txid = %tx.txid(), asset = %asset.short(), units, coin, "Built ask");
        Ok(tx)
    }

    /// Offer `units` of `asset` for `units2` of `asset2`. Swaps are disabled.
    pub fn create_swap(
        &self,
        owner: PubKey,
        asset: AssetId,
        units: Units,
        asset2: AssetId,
        units2: Units,
    ) -> Result<Transaction> {
        tracing::warn!(%owner, asset = %asset.short(), asset2 = %asset2.short(), units, units2, "Swap creation refused");
        Err(CcMarketError::SwapsDisabled)
    }

    /// Return a bid's coin to its owner.
    pub fn cancel_bid(&self, caller: PubKey, bid_txid: &TxId) -> Result<Transaction> {
        let order = self.open_order(bid_txid, true)?;
        self.cancel(caller, &order, &bid_lock(), TxOut::new(order.locked, Script::PayToPubkey(order.owner)), OrderTag::CancelBid)
    }

    /// Return an ask's tokens to its owner.
    pub fn cancel_ask(&self, caller: PubKey, ask_txid: &TxId) -> Result<Transaction> {
        let order = self.open_order(ask_txid, false)?;
        self.cancel(caller, &order, &ask_lock(), TxOut::new(order.locked, token_holder(order.owner)), OrderTag::CancelAsk)
    }

    fn cancel(
        &self,
        caller: PubKey,
        order: &RestingOrder,
        lock: &Condition,
        refund: TxOut,
        tag: OrderTag,
    ) -> Result<Transaction> {
        if caller != order.owner {
            tracing::warn!(order = %order.txid, %caller, "Cancel by non-owner");
            return Err(CcMarketError::invalid_argument("only the order owner can cancel it"));
        }
        let mut builder = TxBuilder::new();
        self.fee_input(&mut builder, &caller)?;
        Self::spend_order(&mut builder, order, lock)?;
        builder.push_output(refund);
        let metadata = encode_order(tag, &order.op.asset_id, &TxId::ZERO, 0, &order.owner);
        let tx = builder.finalize(caller, self.config.tx_fee, metadata)?;
        tracing::info!(txid = %tx.txid(), order = %order.txid, %tag, refunded = order.locked, "Built cancel");
        Ok(tx)
    }

    /// Deliver up to `units` tokens into a bid and take the coin they buy.
    /// Delivering more than the bid still wants fills it completely.
    pub fn fill_bid(&self, filler: PubKey, bid_txid: &TxId, units: Units) -> Result<Transaction> {
        positive(units, "fill units")?;
        let order = self.open_order(bid_txid, true)?;
        let fill = compute_bid_fill(order.locked, order.asking(), units)?;
        let asset = order.op.asset_id;

        let mut builder = TxBuilder::new();
        self.fee_input(&mut builder, &filler)?;
        Self::spend_order(&mut builder, &order, &bid_lock())?;
        let holder = token_holder(filler);
        let added = add_token_inputs(
            self.ledger,
            &mut builder,
            &holder,
            filler,
            &asset,
            fill.paid_units,
            self.config.max_inputs,
        )?;
        if added < fill.paid_units {
            tracing::warn!(%filler, needed = fill.paid_units, added, "Token balance too low for fill");
            return Err(CcMarketError::InsufficientFunds {
                needed: fill.paid_units,
                available: added,
            });
        }

        builder.push_output(TxOut::new(fill.remaining_units, bid_lock()));
        builder.push_output(TxOut::new(fill.received_units, Script::PayToPubkey(filler)));
        builder.push_output(TxOut::new(fill.paid_units, token_holder(order.owner)));
        if added > fill.paid_units {
            builder.push_output(TxOut::new(added - fill.paid_units, holder));
        }
        let metadata = encode_order(OrderTag::FillBid, &asset, &TxId::ZERO, fill.remaining_required, &order.owner);
        let tx = builder.finalize(filler, self.config.tx_fee, metadata)?;
        tracing::info!(
            txid = %tx.txid(),
            order = %order.txid,
            paid = fill.paid_units,
            received = fill.received_units,
            remaining = fill.remaining_required,
            "Built bid fill"
        );
        Ok(tx)
    }

    /// Buy up to `units` tokens from an ask, paying its price rounded up.
    ///
    /// `asset2` names the payment asset; anything but coin (the zero id) is a
    /// swap and refused.
    pub fn fill_ask(&self, filler: PubKey, ask_txid: &TxId, units: Units, asset2: &AssetId) -> Result<Transaction> {
        if !asset2.is_zero() {
            tracing::warn!(order = %ask_txid, asset2 = %asset2.short(), "Swap fill refused");
            return Err(CcMarketError::SwapsDisabled);
        }
        positive(units, "fill units")?;
        let order = self.open_order(ask_txid, false)?;
        let price = UnitPrice::new(order.asking(), order.locked).ok_or_else(|| CcMarketError::DegenerateOrder {
            reason: "ask locks zero token units".into(),
        })?;
        let paid = price
            .cost_of(units.min(order.locked))
            .ok_or(CcMarketError::ArithmeticOverflow { context: "ask payment" })?;
        let fill = compute_ask_fill(order.locked, order.asking(), paid)?;
        let asset = order.op.asset_id;

        let mut builder = TxBuilder::new();
        self.fee_input(&mut builder, &filler)?;
        Self::spend_order(&mut builder, &order, &ask_lock())?;
        add_normal_inputs(self.ledger, &mut builder, &filler, fill.paid_units, self.config.max_inputs)?;

        builder.push_output(TxOut::new(fill.remaining_units, ask_lock()));
        builder.push_output(TxOut::new(fill.received_units, token_holder(filler)));
        builder.push_output(TxOut::new(fill.paid_units, Script::PayToPubkey(order.owner)));
        let metadata = encode_order(OrderTag::FillAsk, &asset, &TxId::ZERO, fill.remaining_required, &order.owner);
        let tx = builder.finalize(filler, self.config.tx_fee, metadata)?;
        tracing::info!(
            txid = %tx.txid(),
            order = %order.txid,
            paid = fill.paid_units,
            received = fill.received_units,
            remaining = fill.remaining_required,
            "Built ask fill"
        );
        Ok(tx)
    }
}
