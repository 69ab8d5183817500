//! Property tests at the metadata trust boundary.
//!
//! Metadata bytes come straight from untrusted transactions: decoders must
//! return an error, never panic, on arbitrary input, and must recover every
//! field of a payload the builders produce.

use proptest::prelude::*;

use ccmarket_codec::{
    HeirFunction, HeirOpRet, OrderTag, decode_heir, decode_order, decode_order_payload,
    decode_token, encode_order,
};
use ccmarket_types::{PubKey, TxId};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_txid() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId)
}

fn arb_pubkey() -> impl Strategy<Value = PubKey> {
    "[a-z]{1,12}".prop_map(|label| PubKey::from_label(&label))
}

fn arb_order_tag() -> impl Strategy<Value = OrderTag> {
    prop_oneof![
        Just(OrderTag::CreateBid),
        Just(OrderTag::CreateAsk),
        Just(OrderTag::CreateSwap),
        Just(OrderTag::FillBid),
        Just(OrderTag::FillAsk),
        Just(OrderTag::FillSwap),
    ]
}

fn arb_follow_up() -> impl Strategy<Value = HeirFunction> {
    prop_oneof![
        Just(HeirFunction::AddCoins),
        Just(HeirFunction::ClaimCoins),
        Just(HeirFunction::AddTokens),
        Just(HeirFunction::ClaimTokens),
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_token(&bytes);
        let _ = decode_order(&bytes);
        let _ = decode_order_payload(&bytes);
        let _ = decode_heir(&bytes);
    }

    #[test]
    fn prefixed_garbage_never_panics(
        module in prop_oneof![Just(0xe3u8), Just(0xeau8), Just(0xf2u8)],
        tag in any::<u8>(),
        tail in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let mut bytes = vec![module, tag];
        bytes.extend(tail);
        let _ = decode_order(&bytes);
        let _ = decode_order_payload(&bytes);
        let _ = decode_heir(&bytes);
    }

    #[test]
    fn order_fields_survive_encoding(
        tag in arb_order_tag(),
        asset in arb_txid(),
        asset2 in arb_txid(),
        remaining in 0u64..=i64::MAX as u64,
        owner in arb_pubkey(),
    ) {
        let op = decode_order(&encode_order(tag, &asset, &asset2, remaining, &owner)).unwrap();
        prop_assert_eq!(op.tag, tag);
        prop_assert_eq!(op.asset_id, asset);
        prop_assert_eq!(op.remaining_units, remaining);
        prop_assert_eq!(op.owner, Some(owner));
        if tag.is_swap() {
            prop_assert_eq!(op.asset_id2, asset2);
        } else {
            prop_assert!(op.asset_id2.is_zero());
        }
    }

    #[test]
    fn heir_follow_up_survives_encoding(
        function in arb_follow_up(),
        asset in arb_txid(),
        funding in arb_txid(),
        inactivity in 0u64..=i64::MAX as u64,
        owner in arb_pubkey(),
        heir in arb_pubkey(),
    ) {
        let asset = function.is_token().then_some(asset);
        let op = HeirOpRet::fund(asset, owner, heir, inactivity, "plan").follow_up(function, funding);
        prop_assert_eq!(decode_heir(&op.encode()).unwrap(), op);
    }

    #[test]
    fn oversized_quantity_is_rejected(remaining in (i64::MAX as u64 + 1)..=u64::MAX) {
        let owner = PubKey::from_label("maker");
        let bytes = encode_order(OrderTag::CreateAsk, &TxId([1; 32]), &TxId::ZERO, remaining, &owner);
        prop_assert!(decode_order(&bytes).is_err());
    }
}
