//! Byte-level reader and writer shared by every payload.
//!
//! Layout rules:
//! - integers: little-endian int64; a negative value is malformed
//! - ids: 32 bytes, stored byte-reversed
//! - pubkeys, strings, nested payloads: compact-size length prefix
//! - compact size: `< 0xfd` one byte, then `0xfd`+u16, `0xfe`+u32, `0xff`+u64,
//!   always in the shortest form

use ccmarket_types::{CcMarketError, PubKey, Result, TxId, Units, constants};

/// Append-only payload writer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a payload with its module byte and tag.
    #[must_use]
    pub fn with_header(module: u8, tag: u8) -> Self {
        let mut w = Self::new();
        w.u8(module).u8(tag);
        w
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    // Truncating casts are guarded by the match arms.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compact_size(&mut self, value: u64) -> &mut Self {
        match value {
            0..=0xfc => {
                self.buf.push(value as u8);
            }
            0xfd..=0xffff => {
                self.buf.push(0xfd);
                self.buf.extend_from_slice(&(value as u16).to_le_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(0xfe);
                self.buf.extend_from_slice(&(value as u32).to_le_bytes());
            }
            _ => {
                self.buf.push(0xff);
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        self
    }

    /// Length-prefixed byte string.
    pub fn var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.compact_size(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Unit count as int64. Builders pass values through [`encodable_units`]
    /// first; larger values read back as negative and [`Reader`] rejects them.
    pub fn units(&mut self, value: Units) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn txid(&mut self, id: &TxId) -> &mut Self {
        self.buf.extend_from_slice(id.reversed().as_bytes());
        self
    }

    pub fn pubkey(&mut self, key: &PubKey) -> &mut Self {
        self.var_bytes(key.as_bytes())
    }

    pub fn string(&mut self, text: &str) -> &mut Self {
        self.var_bytes(text.as_bytes())
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// `value` when an int64 metadata field can carry it.
pub fn encodable_units(value: Units, field: &str) -> Result<Units> {
    if value > constants::MAX_METADATA_UNITS {
        return Err(CcMarketError::invalid_argument(format!(
            "{field} {value} exceeds {}",
            constants::MAX_METADATA_UNITS
        )));
    }
    Ok(value)
}

/// Cursor over a payload. Every read fails with
/// [`CcMarketError::MalformedPayload`] on truncation or bad content.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CcMarketError::malformed(format!(
                "truncated {what}: need {n} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "byte")?[0])
    }

    pub fn compact_size(&mut self) -> Result<u64> {
        let (value, min) = match self.u8()? {
            0xfd => (u64::from(u16::from_le_bytes(self.array("compact size")?)), 0xfd),
            0xfe => (u64::from(u32::from_le_bytes(self.array("compact size")?)), 0x1_0000),
            0xff => (u64::from_le_bytes(self.array("compact size")?), 0x1_0000_0000),
            small => return Ok(u64::from(small)),
        };
        if value < min {
            return Err(CcMarketError::malformed("non-canonical compact size"));
        }
        Ok(value)
    }

    pub fn var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = usize::try_from(self.compact_size()?)
            .map_err(|_| CcMarketError::malformed("length does not fit in memory"))?;
        self.take(len, "length-prefixed field")
    }

    pub fn units(&mut self) -> Result<Units> {
        let raw = i64::from_le_bytes(self.array("int64")?);
        Units::try_from(raw).map_err(|_| CcMarketError::malformed(format!("negative quantity {raw}")))
    }

    /// A byte-reversed id, returned in natural order.
    pub fn txid(&mut self) -> Result<TxId> {
        Ok(TxId(self.array("id")?).reversed())
    }

    pub fn pubkey(&mut self) -> Result<PubKey> {
        let bytes = self.var_bytes()?;
        PubKey::from_slice(bytes).ok_or_else(|| {
            CcMarketError::malformed(format!("invalid public key of {} bytes", bytes.len()))
        })
    }

    pub fn string(&mut self) -> Result<String> {
        let bytes = self.var_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CcMarketError::malformed("string is not UTF-8"))
    }

    /// Fail unless the payload was consumed exactly.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CcMarketError::malformed(format!("{extra} trailing bytes"))),
        }
    }
}
