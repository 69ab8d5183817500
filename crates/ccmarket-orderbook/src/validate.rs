//! Consensus validation of order-book transactions.
//!
//! Only transactions that spend a resting order reach this validator: a
//! cancel or a fill, whose vin1 spends vout0 of the order's latest
//! transaction. Creation spends no order-book inputs and is judged by the
//! token layer alone.

use ccmarket_codec::{OrderOpReturn, OrderTag, decode_order_tx};
use ccmarket_matchcore::{Fill, validate_ask_remainder, validate_bid_remainder};
use ccmarket_plans::{DestinationValidator, OutputSlot, ValidationPlan};
use ccmarket_provenance::{ProvenanceRules, ProvenanceValidator};
use ccmarket_types::{
    Address, CcMarketError, EvalCode, LedgerView, LookupMode, PubKey, Result, Transaction, TxId, Units,
    ValidationConfig, ValidationContext, condition_address, plain_address,
};
use serde::Serialize;

use crate::locks::{ask_lock_address, bid_lock_address, token_holder};
use crate::validators::{Receiver, ReceiverValidator};

/// A resting order as found in vout0 of its latest transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestingOrder {
    pub txid: TxId,
    pub op: OrderOpReturn,
    pub owner: PubKey,
    /// Coin for a bid, token units for an ask.
    pub locked: Units,
}

impl RestingOrder {
    /// Load and check the order at vout0 of `txid`. `bid` selects which side
    /// the caller expects.
    pub fn load(ledger: &dyn LedgerView, mode: LookupMode, txid: &TxId, bid: bool) -> Result<Self> {
        let entry = mode.fetch(ledger, txid).ok_or(CcMarketError::OrderNotFound(*txid))?;
        let op = decode_order_tx(&entry.tx)
            .map_err(|err| CcMarketError::invalid_order(format!("{txid} holds no order: {err}")))?;
        let side_ok = if bid {
            op.tag.is_bid()
        } else {
            matches!(op.tag, OrderTag::CreateAsk | OrderTag::FillAsk)
        };
        if !side_ok {
            return Err(CcMarketError::invalid_order(format!(
                "{txid} is a '{}' order, expected {}",
                op.tag,
                if bid { "a bid" } else { "an ask" }
            )));
        }
        let lock = if bid { bid_lock_address() } else { ask_lock_address() };
        let vout0 = entry
            .tx
            .output(0)
            .ok_or_else(|| CcMarketError::invalid_order(format!("{txid} has no vout0")))?;
        if vout0.script.address() != Some(lock) {
            return Err(CcMarketError::invalid_order(format!("vout0 of {txid} is not at the order lock")));
        }
        if vout0.value == 0 {
            return Err(CcMarketError::invalid_order(format!("order {txid} is exhausted")));
        }
        let owner = op.require_owner()?;
        Ok(Self {
            txid: *txid,
            owner,
            locked: vout0.value,
            op,
        })
    }

    /// Units the order still asks for: token units for a bid, coin for an
    /// ask.
    #[must_use]
    pub fn asking(&self) -> Units {
        self.op.remaining_units
    }
}

/// Validates cancels and fills against one ledger view.
pub struct OrderBookValidator<'a> {
    ledger: &'a dyn LedgerView,
    ctx: ValidationContext,
    config: ValidationConfig,
}

impl<'a> OrderBookValidator<'a> {
    pub fn new(ledger: &'a dyn LedgerView, ctx: ValidationContext, config: ValidationConfig) -> Self {
        Self { ledger, ctx, config }
    }

    pub fn validate(&self, tx: &Transaction) -> Result<()> {
        let txid = tx.txid();
        let op = decode_order_tx(tx)?;
        tracing::debug!(%txid, tag = %op.tag, asset = %op.asset_id.short(), "Validating order-book tx");

        match op.tag {
            OrderTag::CreateBid | OrderTag::CreateAsk => {
                tracing::warn!(%txid, tag = %op.tag, "Order creation reached order-book validation");
                return Err(CcMarketError::invalid_order("order creation spends no contract inputs"));
            }
            OrderTag::CreateSwap | OrderTag::FillSwap => {
                tracing::warn!(%txid, tag = %op.tag, "Swap rejected");
                return Err(CcMarketError::SwapsDisabled);
            }
            _ => {}
        }

        let order = self.spent_order(tx, &op)?;
        match op.tag {
            OrderTag::CancelBid => self.validate_cancel(tx, &order, plain_address(&order.owner))?,
            OrderTag::CancelAsk => {
                self.validate_cancel(tx, &order, condition_address(&token_holder(order.owner)))?;
            }
            OrderTag::FillBid => self.validate_fill_bid(tx, &op, &order)?,
            OrderTag::FillAsk => self.validate_fill_ask(tx, &op, &order)?,
            _ => return Err(CcMarketError::Internal(format!("unhandled order tag '{}'", op.tag))),
        }

        ProvenanceValidator::new(self.ledger, self.ctx, ProvenanceRules::order_book(), self.config.clone())
            .validate(tx, Some(op.asset_id))?;

        tracing::info!(
            %txid,
            tag = %op.tag,
            order = %order.txid,
            remaining = op.remaining_units,
            mode = %self.ctx.mode,
            "Order-book tx accepted"
        );
        Ok(())
    }

    /// The order spent by vin1, checked against this transaction's asset.
    fn spent_order(&self, tx: &Transaction, op: &OrderOpReturn) -> Result<RestingOrder> {
        let vin1 = tx
            .inputs
            .get(1)
            .ok_or_else(|| CcMarketError::invalid_order("order spend needs a fee input and the order input"))?;
        if vin1.prevout.vout != 0 {
            return Err(CcMarketError::invalid_order("vin1 must spend vout0 of the order"));
        }
        if !vin1.fulfillment.spends_eval(EvalCode::ASSETS) {
            return Err(CcMarketError::invalid_order("vin1 does not spend an order lock"));
        }
        let bid = matches!(op.tag, OrderTag::CancelBid | OrderTag::FillBid);
        let order = RestingOrder::load(self.ledger, self.ctx.mode, &vin1.prevout.txid, bid)?;
        if order.op.asset_id != op.asset_id {
            tracing::warn!(order = %order.txid, expected = %order.op.asset_id.short(), got = %op.asset_id.short(), "Order asset mismatch");
            return Err(CcMarketError::invalid_order("transaction asset differs from the order's"));
        }
        if op.tag.is_cancel() {
            for extra in &tx.inputs[2..] {
                if extra.fulfillment.spends_eval(EvalCode::ASSETS) {
                    return Err(CcMarketError::invalid_order("cancel spends more than one order"));
                }
            }
        } else if op.owner != Some(order.owner) {
            return Err(CcMarketError::invalid_order("fill changes the order owner"));
        }
        Ok(order)
    }

    fn validate_cancel(&self, tx: &Transaction, order: &RestingOrder, refund_to: Address) -> Result<()> {
        let refund = DestinationValidator::new("order owner refund", vec![refund_to]);
        let mut plan = ValidationPlan::new();
        plan.output(OutputSlot::Index(0), vec![&refund]);
        plan.validate(tx, self.ledger, self.ctx.mode)?;

        let refunded = tx.outputs[0].value;
        if refunded != order.locked {
            tracing::warn!(order = %order.txid, locked = order.locked, refunded, "Partial cancel");
            return Err(CcMarketError::invalid_order(format!(
                "cancel refunds {refunded} of {} locked",
                order.locked
            )));
        }
        Ok(())
    }

    /// `B`: tokens delivered into a bid.
    ///
    /// vout0 remaining coin at the bid lock, vout1 coin to the filler, vout2
    /// tokens to the bid owner.
    fn validate_fill_bid(&self, tx: &Transaction, op: &OrderOpReturn, order: &RestingOrder) -> Result<()> {
        let lock = DestinationValidator::new("bid lock", vec![bid_lock_address()]);
        let filler = ReceiverValidator::new(Receiver::Coin);
        let owner = DestinationValidator::new(
            "bid owner tokens",
            vec![condition_address(&token_holder(order.owner))],
        );
        let mut plan = ValidationPlan::new();
        plan.output(OutputSlot::Index(0), vec![&lock])
            .output(OutputSlot::Index(1), vec![&filler])
            .output(OutputSlot::Index(2), vec![&owner]);
        plan.validate(tx, self.ledger, self.ctx.mode)?;

        let fill = submitted_fill(tx, op, order);
        check_fill(&fill, validate_bid_remainder)
    }

    /// `S`: coin paid into an ask.
    ///
    /// vout0 remaining tokens at the ask lock, vout1 tokens to the filler,
    /// vout2 coin to the ask owner.
    fn validate_fill_ask(&self, tx: &Transaction, op: &OrderOpReturn, order: &RestingOrder) -> Result<()> {
        let lock = DestinationValidator::new("ask lock", vec![ask_lock_address()]);
        let filler = ReceiverValidator::new(Receiver::Token);
        let owner = DestinationValidator::new("ask owner coin", vec![plain_address(&order.owner)]);
        let mut plan = ValidationPlan::new();
        plan.output(OutputSlot::Index(0), vec![&lock])
            .output(OutputSlot::Index(1), vec![&filler])
            .output(OutputSlot::Index(2), vec![&owner]);
        plan.validate(tx, self.ledger, self.ctx.mode)?;

        let fill = submitted_fill(tx, op, order);
        check_fill(&fill, validate_ask_remainder)
    }
}

/// The fill a transaction claims, read from vout0..vout2 and its metadata.
/// Callers have already checked those slots exist.
fn submitted_fill(tx: &Transaction, op: &OrderOpReturn, order: &RestingOrder) -> Fill {
    Fill {
        orig_units: order.locked,
        received_units: tx.outputs[1].value,
        remaining_units: tx.outputs[0].value,
        orig_remaining: order.asking(),
        paid_units: tx.outputs[2].value,
        remaining_required: op.remaining_units,
    }
}

/// A fill that leaves nothing asked must take the whole order at its price;
/// a partial one must pass the remainder check.
fn check_fill(fill: &Fill, remainder: fn(&Fill) -> Result<()>) -> Result<()> {
    if fill.remaining_required == 0 {
        let full = Fill::full(fill.orig_units, fill.orig_remaining);
        if *fill != full {
            tracing::warn!(?fill, "Full fill does not take the whole order");
            return Err(CcMarketError::ConservationViolation {
                reason: format!(
                    "full fill must release {} for {}, got {} for {} leaving {}",
                    full.received_units,
                    full.paid_units,
                    fill.received_units,
                    fill.paid_units,
                    fill.remaining_units
                ),
            });
        }
        return Ok(());
    }
    remainder(fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::{ask_lock, bid_lock};
    use ccmarket_codec::{encode_order, encode_token_create};
    use ccmarket_types::{
        AssetId, BlockRef, Fulfillment, MemoryLedger, OutPoint, Script, TxIn, TxOut,
    };

    const BLOCK: BlockRef = BlockRef {
        height: 10,
        time: 50_000,
    };

    struct Fixture {
        ledger: MemoryLedger,
        maker: PubKey,
        taker: PubKey,
        asset: AssetId,
        bid: TxId,
    }

    /// Asset with 1,000 units held by the taker and a bid by the maker of
    /// 10,000 coin for 100 units.
    fn fixture() -> Fixture {
        let maker = PubKey::from_label("maker");
        let taker = PubKey::from_label("taker");
        let mut ledger = MemoryLedger::new();
        let asset = ledger.confirm(
            Transaction::new(
                vec![],
                vec![
                    TxOut::new(1_000, token_holder(taker)),
                    TxOut::metadata(encode_token_create(&taker, "GOLD", "")),
                ],
            ),
            BLOCK,
        );
        let bid = ledger.confirm(
            Transaction::new(
                vec![],
                vec![
                    TxOut::new(10_000, bid_lock()),
                    TxOut::metadata(encode_order(OrderTag::CreateBid, &asset, &TxId::ZERO, 100, &maker)),
                ],
            ),
            BLOCK,
        );
        Fixture {
            ledger,
            maker,
            taker,
            asset,
            bid,
        }
    }

    fn fee_input(key: PubKey) -> TxIn {
        TxIn {
            prevout: OutPoint::new(TxId([0xfe; 32]), 0),
            fulfillment: Fulfillment::Signature { signer: key },
        }
    }

    fn order_input(order: TxId, lock: &ccmarket_types::Condition) -> TxIn {
        TxIn {
            prevout: OutPoint::new(order, 0),
            fulfillment: Fulfillment::for_condition(lock, PubKey::module_global(EvalCode::ASSETS)),
        }
    }

    fn fill_bid_tx(fx: &Fixture, remaining: Units, received: Units, paid: Units, left: Units) -> Transaction {
        let holder = token_holder(fx.taker);
        Transaction::new(
            vec![
                fee_input(fx.taker),
                order_input(fx.bid, &bid_lock()),
                TxIn {
                    prevout: OutPoint::new(fx.asset, 0),
                    fulfillment: Fulfillment::for_condition(&holder, fx.taker),
                },
            ],
            vec![
                TxOut::new(remaining, bid_lock()),
                TxOut::new(received, Script::PayToPubkey(fx.taker)),
                TxOut::new(paid, token_holder(fx.maker)),
                TxOut::new(1_000 - paid, holder),
                TxOut::metadata(encode_order(OrderTag::FillBid, &fx.asset, &TxId::ZERO, left, &fx.maker)),
            ],
        )
    }

    fn validate(fx: &Fixture, tx: &Transaction) -> Result<()> {
        OrderBookValidator::new(&fx.ledger, ValidationContext::chain(60_000), ValidationConfig::default())
            .validate(tx)
    }

    #[test]
    fn partial_bid_fill_accepted() {
        let fx = fixture();
        validate(&fx, &fill_bid_tx(&fx, 6_000, 4_000, 40, 60)).unwrap();
    }

    #[test]
    fn full_bid_fill_accepted() {
        let fx = fixture();
        validate(&fx, &fill_bid_tx(&fx, 0, 10_000, 100, 0)).unwrap();
    }

    #[test]
    fn overpriced_bid_fill_rejected() {
        let fx = fixture();
        assert!(matches!(
            validate(&fx, &fill_bid_tx(&fx, 5_000, 5_000, 40, 60)),
            Err(CcMarketError::PriceRegression { .. })
        ));
    }

    #[test]
    fn short_full_fill_rejected() {
        let fx = fixture();
        assert!(matches!(
            validate(&fx, &fill_bid_tx(&fx, 1_000, 9_000, 100, 0)),
            Err(CcMarketError::ConservationViolation { .. })
        ));
    }

    #[test]
    fn fill_must_keep_owner() {
        let fx = fixture();
        let mut tx = fill_bid_tx(&fx, 6_000, 4_000, 40, 60);
        let last = tx.outputs.len() - 1;
        tx.outputs[last] = TxOut::metadata(encode_order(OrderTag::FillBid, &fx.asset, &TxId::ZERO, 60, &fx.taker));
        assert!(matches!(validate(&fx, &tx), Err(CcMarketError::InvalidOrderTx { .. })));
    }

    #[test]
    fn creation_and_swaps_rejected() {
        let fx = fixture();
        let create = Transaction::new(
            vec![],
            vec![TxOut::metadata(encode_order(OrderTag::CreateAsk, &fx.asset, &TxId::ZERO, 5, &fx.maker))],
        );
        assert!(matches!(validate(&fx, &create), Err(CcMarketError::InvalidOrderTx { .. })));

        let swap = Transaction::new(
            vec![],
            vec![TxOut::metadata(encode_order(OrderTag::FillSwap, &fx.asset, &TxId([3; 32]), 5, &fx.maker))],
        );
        assert_eq!(validate(&fx, &swap).unwrap_err(), CcMarketError::SwapsDisabled);
    }

    #[test]
    fn vin1_must_spend_vout0() {
        let fx = fixture();
        let mut tx = fill_bid_tx(&fx, 6_000, 4_000, 40, 60);
        tx.inputs[1].prevout = OutPoint::new(fx.bid, 1);
        assert!(matches!(validate(&fx, &tx), Err(CcMarketError::InvalidOrderTx { .. })));
    }

    #[test]
    fn cancel_bid_refunds_owner() {
        let fx = fixture();
        let cancel = |pay_to: PubKey, value: Units| {
            Transaction::new(
                vec![fee_input(fx.maker), order_input(fx.bid, &bid_lock())],
                vec![
                    TxOut::new(value, Script::PayToPubkey(pay_to)),
                    TxOut::metadata(encode_order(OrderTag::CancelBid, &fx.asset, &TxId::ZERO, 0, &fx.maker)),
                ],
            )
        };
        validate(&fx, &cancel(fx.maker, 10_000)).unwrap();
        assert!(matches!(
            validate(&fx, &cancel(fx.taker, 10_000)),
            Err(CcMarketError::InvalidDestination { .. })
        ));
        assert!(matches!(
            validate(&fx, &cancel(fx.maker, 9_000)),
            Err(CcMarketError::InvalidOrderTx { .. })
        ));
    }

    #[test]
    fn cancel_ask_against_bid_rejected() {
        let fx = fixture();
        let tx = Transaction::new(
            vec![fee_input(fx.maker), order_input(fx.bid, &ask_lock())],
            vec![
                TxOut::new(10_000, token_holder(fx.maker)),
                TxOut::metadata(encode_order(OrderTag::CancelAsk, &fx.asset, &TxId::ZERO, 0, &fx.maker)),
            ],
        );
        assert!(matches!(validate(&fx, &tx), Err(CcMarketError::InvalidOrderTx { .. })));
    }

    #[test]
    fn unknown_order_reported() {
        let fx = fixture();
        let mut tx = fill_bid_tx(&fx, 6_000, 4_000, 40, 60);
        tx.inputs[1].prevout = OutPoint::new(TxId([0x77; 32]), 0);
        assert_eq!(
            validate(&fx, &tx).unwrap_err(),
            CcMarketError::OrderNotFound(TxId([0x77; 32]))
        );
    }
}
