//! System-wide constants for the ccmarket contract core.

/// Eval code of the order-book (assets) module.
pub const EVAL_ASSETS: u8 = 0xe3;

/// Eval code of the heir escrow module.
pub const EVAL_HEIR: u8 = 0xea;

/// Eval code of the base fungible-token module.
pub const EVAL_TOKENS: u8 = 0xf2;

/// Coin units per whole coin. Used only for human-readable amounts.
pub const COIN: u64 = 100_000_000;

/// Default transaction fee in coin units.
pub const DEFAULT_TX_FEE: u64 = 10_000;

/// Default upper bound on contract inputs gathered for one transaction.
pub const DEFAULT_MAX_INPUTS: usize = 60;

/// Default upper bound on normal inputs gathered to pay a fee.
pub const DEFAULT_MAX_FEE_INPUTS: usize = 3;

/// Maximum length of an escrow plan name in bytes.
pub const MAX_PLAN_NAME_LEN: usize = 32;

/// Maximum length of a token name in bytes.
pub const MAX_TOKEN_NAME_LEN: usize = 32;

/// Maximum length of a token description in bytes.
pub const MAX_TOKEN_DESCRIPTION_LEN: usize = 4096;

/// Maximum ancestor depth the provenance walk descends before giving up.
pub const DEFAULT_MAX_PROVENANCE_DEPTH: usize = 1_000;

/// Maximum distinct ancestor transactions one provenance walk may load.
pub const DEFAULT_MAX_PROVENANCE_NODES: usize = 100_000;

/// Denominator of the ask-side minimum significant unit price (1e-15).
///
/// An ask whose `orig_coin / orig_token_units` is below
/// `1 / PRICE_EPSILON_DENOMINATOR` is rejected as degenerate.
pub const PRICE_EPSILON_DENOMINATOR: u128 = 1_000_000_000_000_000;

/// Largest quantity an int64 metadata field can carry.
pub const MAX_METADATA_UNITS: u64 = 0x7fff_ffff_ffff_ffff;

/// Length of a serialized compressed public key.
pub const PUBKEY_LEN: usize = 33;

/// Domain separator for transaction id hashing.
pub const TXID_DOMAIN: &[u8] = b"ccmarket:txid:v1:";

/// Domain separator for script address hashing.
pub const ADDRESS_DOMAIN: &[u8] = b"ccmarket:address:v1:";

/// Domain separator for module global ("unspendable") keys.
pub const GLOBAL_KEY_DOMAIN: &[u8] = b"ccmarket:global-key:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ccmarket";
