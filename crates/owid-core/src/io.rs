//! Little-endian wire primitives shared by the OWID binary forms.
//!
//! Strings are UTF-8 and null-terminated. Byte arrays carry a u32
//! little-endian length prefix. Signatures are written raw at their fixed
//! length. Dates are whole minutes since the 2020-01-01 UTC epoch.

use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// Unix seconds of the 2020-01-01 00:00 UTC instant that anchors all
/// OWID dates.
pub const EPOCH_UNIX_SECONDS: i64 = 1_577_836_800;

/// Exact length of an OWID signature in bytes: 32-byte r ∥ 32-byte s.
pub const SIGNATURE_LENGTH: usize = 64;

/// Convert an instant to whole minutes since the OWID epoch.
///
/// Instants before the epoch, or too far after it to fit a u32, are
/// rejected.
pub fn minutes_since_epoch(t: DateTime<Utc>) -> Result<u32, CoreError> {
    let seconds = t.timestamp() - EPOCH_UNIX_SECONDS;
    if seconds < 0 {
        return Err(CoreError::TimestampRange(t));
    }
    u32::try_from(seconds / 60).map_err(|_| CoreError::TimestampRange(t))
}

/// Convert whole minutes since the OWID epoch back to an instant.
pub fn time_of_minutes(minutes: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(EPOCH_UNIX_SECONDS + i64::from(minutes) * 60, 0)
        .expect("minute offset within datetime range")
}

pub fn write_byte(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a null-terminated string. A string already containing a null
/// would corrupt the framing, so it is rejected.
pub fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<(), CoreError> {
    if s.as_bytes().contains(&0) {
        return Err(CoreError::EmbeddedNull);
    }
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    Ok(())
}

/// Write a byte array with a u32 little-endian length prefix.
pub fn write_byte_array(buf: &mut Vec<u8>, v: &[u8]) -> Result<(), CoreError> {
    let len = u32::try_from(v.len())
        .map_err(|_| CoreError::MalformedOwid(format!("byte array length '{}' too large", v.len())))?;
    write_u32(buf, len);
    buf.extend_from_slice(v);
    Ok(())
}

/// Write a signature raw, without a length prefix. The length is fixed by
/// the protocol.
pub fn write_signature(buf: &mut Vec<u8>, v: &[u8]) -> Result<(), CoreError> {
    if v.len() != SIGNATURE_LENGTH {
        return Err(CoreError::SignatureLength(v.len()));
    }
    buf.extend_from_slice(v);
    Ok(())
}

/// Cursor over a byte slice for decoding the binary forms.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.remaining() < n {
            return Err(CoreError::MalformedOwid(format!(
                "'{}' bytes remaining, '{}' needed",
                self.remaining(),
                n
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_byte(&mut self) -> Result<u8, CoreError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice length checked");
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a UTF-8 string up to its null terminator.
    pub fn read_string(&mut self) -> Result<String, CoreError> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| CoreError::MalformedOwid("unterminated string".into()))?;
        let s = std::str::from_utf8(&rest[..end])
            .map_err(|e| CoreError::MalformedOwid(format!("invalid UTF-8 string: {e}")))?;
        self.pos += end + 1;
        Ok(s.to_string())
    }

    /// Read a byte array with a u32 little-endian length prefix.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>, CoreError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_signature(&mut self) -> Result<[u8; SIGNATURE_LENGTH], CoreError> {
        let bytes = self
            .take(SIGNATURE_LENGTH)
            .map_err(|_| CoreError::SignatureLength(self.remaining()))?;
        Ok(bytes.try_into().expect("slice length checked"))
    }
}
