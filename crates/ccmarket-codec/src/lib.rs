//! # ccmarket-codec
//!
//! **Metadata codec for ccmarket contract transactions.**
//!
//! Every contract transaction carries its function identifier and fields in
//! the trailing metadata output. This crate formats and parses those payloads
//! and rejects anything structurally malformed before semantic checks run:
//!
//! - **Token envelope**: token create / transfer wrapping ([`TokenOpRet`])
//! - **Order book**: ask, bid, swap, cancel and fill payloads ([`OrderOpReturn`])
//! - **Escrow**: coin and token plan payloads ([`HeirOpRet`])
//!
//! Integers are little-endian int64, ids are stored byte-reversed, and
//! variable-length fields carry a compact-size length prefix.

pub mod heir;
pub mod order;
pub mod token;
pub mod wire;

pub use heir::{HeirFunction, HeirOpRet, decode_heir, decode_heir_coin, decode_heir_token};
pub use order::{
    OrderOpReturn, OrderPayload, OrderTag, active_asset_for_slot, decode_order, decode_order_payload,
    decode_order_tx, encode_order, encode_order_payload,
};
pub use token::{TokenOpRet, decode_token, encode_token_create, encode_token_transfer};
pub use wire::{Reader, Writer, encodable_units};
