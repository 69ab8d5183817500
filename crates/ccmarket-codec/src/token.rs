//! The base token layer's metadata envelope.
//!
//! Order-book metadata rides inside a token transfer envelope; the transfer's
//! token id names the asset the order trades.

use ccmarket_types::{AssetId, CcMarketError, EvalCode, PubKey, Result};

use crate::wire::{Reader, Writer};

pub const TAG_CREATE: u8 = b'c';
pub const TAG_TRANSFER: u8 = b't';

/// Decoded token envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOpRet {
    /// Genesis of a token class; the asset id is this transaction's id.
    Create {
        owner: PubKey,
        name: String,
        description: String,
    },
    /// Transfer of `token_id`; `payload` carries a nested module payload
    /// (empty for a plain transfer).
    Transfer { token_id: AssetId, payload: Vec<u8> },
}

#[must_use]
pub fn encode_token_create(owner: &PubKey, name: &str, description: &str) -> Vec<u8> {
    let mut w = Writer::with_header(EvalCode::TOKENS.0, TAG_CREATE);
    w.pubkey(owner).string(name).string(description);
    w.finish()
}

#[must_use]
pub fn encode_token_transfer(token_id: &AssetId, payload: &[u8]) -> Vec<u8> {
    let mut w = Writer::with_header(EvalCode::TOKENS.0, TAG_TRANSFER);
    w.txid(token_id).var_bytes(payload);
    w.finish()
}

/// Check the common `[module, tag]` header and return the tag.
pub(crate) fn check_header(bytes: &[u8], module: EvalCode) -> Result<u8> {
    match bytes {
        [] => Err(CcMarketError::MissingMetadata),
        [_] => Err(CcMarketError::MetadataTooShort { len: 1 }),
        [m, tag, ..] if *m == module.0 => Ok(*tag),
        [m, ..] => Err(CcMarketError::WrongModule {
            expected: module.0,
            actual: *m,
        }),
    }
}

pub fn decode_token(bytes: &[u8]) -> Result<TokenOpRet> {
    let tag = check_header(bytes, EvalCode::TOKENS)?;
    let mut r = Reader::new(&bytes[2..]);
    let op = match tag {
        TAG_CREATE => TokenOpRet::Create {
            owner: r.pubkey()?,
            name: r.string()?,
            description: r.string()?,
        },
        TAG_TRANSFER => TokenOpRet::Transfer {
            token_id: r.txid()?,
            payload: r.var_bytes()?.to_vec(),
        },
        other => {
            return Err(CcMarketError::UnknownTag {
                tag: char::from(other),
            });
        }
    };
    r.finish()?;
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmarket_types::TxId;

    #[test]
    fn create_layout() {
        let owner = PubKey::from_label("issuer");
        let bytes = encode_token_create(&owner, "GOLD", "bars");
        assert_eq!(&bytes[..2], &[0xf2, b'c']);
        assert_eq!(bytes[2], 33);
        match decode_token(&bytes).unwrap() {
            TokenOpRet::Create {
                owner: o,
                name,
                description,
            } => {
                assert_eq!(o, owner);
                assert_eq!(name, "GOLD");
                assert_eq!(description, "bars");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn transfer_carries_nested_payload() {
        let token = TxId([3; 32]);
        let bytes = encode_token_transfer(&token, &[0xe3, b'x']);
        assert_eq!(
            decode_token(&bytes).unwrap(),
            TokenOpRet::Transfer {
                token_id: token,
                payload: vec![0xe3, b'x']
            }
        );
    }

    #[test]
    fn header_errors() {
        assert_eq!(decode_token(&[]).unwrap_err(), CcMarketError::MissingMetadata);
        assert_eq!(
            decode_token(&[0xf2]).unwrap_err(),
            CcMarketError::MetadataTooShort { len: 1 }
        );
        assert_eq!(
            decode_token(&[0xe3, b't']).unwrap_err(),
            CcMarketError::WrongModule {
                expected: 0xf2,
                actual: 0xe3
            }
        );
        assert_eq!(
            decode_token(&[0xf2, b'q']).unwrap_err(),
            CcMarketError::UnknownTag { tag: 'q' }
        );
    }
}
