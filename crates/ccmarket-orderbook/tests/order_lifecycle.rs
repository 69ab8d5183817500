//! Orders built with the operations and judged by the validator.

use proptest::prelude::*;

use ccmarket_codec::{decode_order_tx, encode_token_create};
use ccmarket_orderbook::{OrderBookValidator, OrderBuilder, list_orders, token_balance_of, token_holder};
use ccmarket_types::{
    AssetId, BlockRef, BuilderConfig, CcMarketError, MemoryLedger, PubKey, Result, Script,
    Transaction, TxId, TxOut, Units, ValidationConfig, ValidationContext, constants,
};

const NOW: u64 = 100_000;

fn maker() -> PubKey {
    PubKey::from_label("maker")
}

fn taker() -> PubKey {
    PubKey::from_label("taker")
}

struct Market {
    ledger: MemoryLedger,
    asset: AssetId,
    height: u32,
}

impl Market {
    /// Both parties hold 20 coins in separate outputs; the taker issued
    /// `supply` units of one asset.
    fn new(supply: Units) -> Self {
        let mut market = Self {
            ledger: MemoryLedger::new(),
            asset: TxId::ZERO,
            height: 0,
        };
        let wallet = |key: PubKey, coins: u64| TxOut::new(coins * constants::COIN, Script::PayToPubkey(key));
        market.mine(Transaction::new(
            vec![],
            vec![
                wallet(maker(), 1),
                wallet(maker(), 19),
                wallet(taker(), 1),
                wallet(taker(), 19),
            ],
        ));
        market.asset = market.mine(Transaction::new(
            vec![],
            vec![
                TxOut::new(supply, token_holder(taker())),
                TxOut::metadata(encode_token_create(&taker(), "GOLD", "vault receipts")),
            ],
        ));
        market
    }

    fn mine(&mut self, tx: Transaction) -> TxId {
        self.height += 1;
        self.ledger.confirm(
            tx,
            BlockRef {
                height: self.height,
                time: NOW - 1_000 + u64::from(self.height),
            },
        )
    }

    fn builder(&self) -> OrderBuilder<'_> {
        OrderBuilder::new(&self.ledger, BuilderConfig::default())
    }

    fn validate(&self, tx: &Transaction) -> Result<()> {
        OrderBookValidator::new(&self.ledger, ValidationContext::chain(NOW), ValidationConfig::default()).validate(tx)
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn bid_partial_fill_then_price_regression() {
    let mut market = Market::new(1_000_000);
    let bid = market
        .builder()
        .create_bid(maker(), market.asset, 500_000_000, 1_000_000)
        .unwrap();
    let bid = market.mine(bid);

    let fill = market.builder().fill_bid(taker(), &bid, 400_000).unwrap();
    assert_eq!(fill.outputs[1].value, 200_000_000);
    assert_eq!(decode_order_tx(&fill).unwrap().remaining_units, 600_000);
    market.validate(&fill).unwrap();

    // balanced on both sides but 625 coin per unit against the bid's 500
    let mut greedy = fill.clone();
    greedy.outputs[0].value = 250_000_000;
    greedy.outputs[1].value = 250_000_000;
    assert!(matches!(
        market.validate(&greedy),
        Err(CcMarketError::PriceRegression { .. })
    ));

    let fill = market.mine(fill);
    let rest = market.builder().fill_bid(taker(), &fill, 600_000).unwrap();
    assert_eq!(rest.outputs[0].value, 0);
    assert_eq!(rest.outputs[1].value, 300_000_000);
    market.validate(&rest).unwrap();
    let rest = market.mine(rest);

    assert_eq!(token_balance_of(&market.ledger, maker(), &market.asset), 1_000_000);
    assert!(market.builder().fill_bid(taker(), &rest, 1).is_err());
    assert!(list_orders(&market.ledger, Some(&market.asset)).is_empty());
}

#[test]
fn ask_partial_fill() {
    let mut market = Market::new(1_000_000);
    let ask = market
        .builder()
        .create_ask(taker(), market.asset, 1_000_000, 2_000_000)
        .unwrap();
    let ask = market.mine(ask);

    let fill = market.builder().fill_ask(maker(), &ask, 250_000, &TxId::ZERO).unwrap();
    assert_eq!(fill.outputs[2].value, 500_000);
    assert_eq!(fill.outputs[1].value, 250_000);
    assert_eq!(decode_order_tx(&fill).unwrap().remaining_units, 1_500_000);
    market.validate(&fill).unwrap();
    let fill = market.mine(fill);

    let listed = list_orders(&market.ledger, None);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].txid, fill);
    assert_eq!(listed[0].amount, 750_000);
    assert_eq!(listed[0].total_required, 1_500_000);
    assert_eq!(token_balance_of(&market.ledger, maker(), &market.asset), 250_000);
}

#[test]
fn underpaid_ask_fill_rejected() {
    let mut market = Market::new(1_000);
    let ask = market.builder().create_ask(taker(), market.asset, 1_000, 100_000).unwrap();
    let ask = market.mine(ask);
    let mut fill = market.builder().fill_ask(maker(), &ask, 100, &TxId::ZERO).unwrap();
    fill.outputs[2].value -= 1;
    assert!(market.validate(&fill).is_err());
}

#[test]
fn cancel_returns_everything() {
    let mut market = Market::new(5_000);
    let ask = market.builder().create_ask(taker(), market.asset, 5_000, 9_000).unwrap();
    let ask = market.mine(ask);
    assert_eq!(token_balance_of(&market.ledger, taker(), &market.asset), 0);

    let cancel = market.builder().cancel_ask(taker(), &ask).unwrap();
    market.validate(&cancel).unwrap();
    market.mine(cancel);
    assert_eq!(token_balance_of(&market.ledger, taker(), &market.asset), 5_000);
    assert_eq!(
        market.builder().cancel_ask(taker(), &ask).unwrap_err(),
        CcMarketError::OrderNotFound(ask)
    );
}

#[test]
fn minted_units_rejected() {
    let mut market = Market::new(1_000_000);
    let bid = market
        .builder()
        .create_bid(maker(), market.asset, 500_000_000, 1_000_000)
        .unwrap();
    let bid = market.mine(bid);
    let mut fill = market.builder().fill_bid(taker(), &bid, 400_000).unwrap();
    // token change to the filler
    fill.outputs[3].value += 10;
    assert!(matches!(
        market.validate(&fill),
        Err(CcMarketError::UnitsNotConserved {
            inputs: 1_000_000,
            outputs: 1_000_010,
            ..
        })
    ));
}

#[test]
fn swaps_disabled_everywhere() {
    let market = Market::new(10);
    assert_eq!(
        market
            .builder()
            .create_swap(taker(), market.asset, 10, TxId([9; 32]), 10)
            .unwrap_err(),
        CcMarketError::SwapsDisabled
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn built_bid_fills_validate_and_conserve(
        coin in 10_000u64..1_000_000_000,
        units in 1u64..10_000,
        fill_units in 1u64..20_000,
    ) {
        let mut market = Market::new(20_000);
        let bid = market.builder().create_bid(maker(), market.asset, coin, units).unwrap();
        let bid = market.mine(bid);
        let Ok(fill) = market.builder().fill_bid(taker(), &bid, fill_units) else {
            return Ok(());
        };
        prop_assert!(market.validate(&fill).is_ok());
        let remaining = fill.outputs[0].value;
        let received = fill.outputs[1].value;
        let paid = fill.outputs[2].value;
        prop_assert_eq!(remaining + received, coin);
        prop_assert_eq!(decode_order_tx(&fill).unwrap().remaining_units + paid, units);
    }
}
