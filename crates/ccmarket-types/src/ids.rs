//! Identifiers used throughout ccmarket.
//!
//! Transaction and asset ids are 32-byte digests, public keys are 33-byte
//! compressed keys, and addresses are 20-byte digests of an output script.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants;

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// Transaction identifier: double SHA-256 of the canonical serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

/// A token class is named by the id of its genesis transaction.
pub type AssetId = TxId;

impl TxId {
    /// The all-zero id ("no id").
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The id with its byte order reversed, as stored on the wire.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Self(bytes)
    }

    /// Domain-separated double SHA-256 over `parts`.
    #[must_use]
    pub fn digest(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        let first = hasher.finalize();
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        Self(out)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// PubKey
// ---------------------------------------------------------------------------

/// A 33-byte compressed public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct PubKey(pub [u8; constants::PUBKEY_LEN]);

impl PubKey {
    /// Parse from a byte slice; `None` unless exactly 33 bytes with a
    /// compressed-key prefix.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != constants::PUBKEY_LEN || !matches!(bytes[0], 0x02 | 0x03) {
            return None;
        }
        let mut key = [0u8; constants::PUBKEY_LEN];
        key.copy_from_slice(bytes);
        Some(Self(key))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; constants::PUBKEY_LEN] {
        &self.0
    }

    /// The deterministic global key of a module. Outputs locked to it can
    /// only be spent under that module's validation rules.
    #[must_use]
    pub fn module_global(eval: EvalCode) -> Self {
        Self::derive(constants::GLOBAL_KEY_DOMAIN, &[eval.0])
    }

    fn derive(domain: &[u8], seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(seed);
        let digest = hasher.finalize();
        let mut key = [0u8; constants::PUBKEY_LEN];
        key[0] = 0x02;
        key[1..].copy_from_slice(&digest);
        Self(key)
    }

    /// Deterministic key from a label, for tests.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self::derive(b"ccmarket:test-key:", label.as_bytes())
    }

    /// Random key, for tests.
    #[cfg(feature = "test-helpers")]
    #[must_use]
    pub fn random() -> Self {
        use rand::RngCore;
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::derive(b"ccmarket:random-key:", &seed)
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", hex::encode(&self.0[..6]))
    }
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes)
            .ok_or_else(|| serde::de::Error::custom("expected a 33-byte compressed public key"))
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Digest of an output script; the key of the address index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Address of a canonical script encoding.
    #[must_use]
    pub fn of_script_bytes(script: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::ADDRESS_DOMAIN);
        hasher.update(script);
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[..20]);
        Self(out)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr:{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// EvalCode
// ---------------------------------------------------------------------------

/// One-byte module identifier carried by conditions and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EvalCode(pub u8);

impl EvalCode {
    pub const ASSETS: Self = Self(constants::EVAL_ASSETS);
    pub const HEIR: Self = Self(constants::EVAL_HEIR);
    pub const TOKENS: Self = Self(constants::EVAL_TOKENS);
}

impl fmt::Display for EvalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ASSETS => write!(f, "assets"),
            Self::HEIR => write!(f, "heir"),
            Self::TOKENS => write!(f, "tokens"),
            Self(other) => write!(f, "eval:0x{other:02x}"),
        }
    }
}
