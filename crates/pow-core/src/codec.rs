//! Low-level wire encoding: little-endian integers and Bitcoin varints.
//!
//! Everything is encoded as raw bytes; the hex text exchanged with a node is
//! produced only at the outer edges (`to_hex` / `from_hex` on the message
//! types).

use thiserror::Error;

use crate::sha256::RawDigest;

/// Largest script accepted from the wire.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Wire format errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("non-canonical varint: prefix {prefix:#04x} carries value {value}")]
    NonCanonicalVarInt { prefix: u8, value: u64 },

    #[error("digest must be 32 bytes, got {0}")]
    InvalidDigestLength(usize),

    #[error("script of {0} bytes exceeds the 10000 byte limit")]
    ScriptTooLarge(u64),

    #[error("push of {0} bytes exceeds the 75 byte direct push limit")]
    PushTooLong(usize),

    #[error("count {0} does not fit in memory")]
    CountTooLarge(u64),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("witness serialization is not supported")]
    WitnessUnsupported,

    #[error("transaction is not a coinbase with an extranonce slot")]
    MissingExtraNonce,
}

/// Append a variable-length integer (Bitcoin compact size).
pub fn write_varint(output: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Length-prefix `bytes` with a varint.
pub fn write_var_bytes(output: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(output, bytes.len() as u64);
    output.extend_from_slice(bytes);
}

/// Parse a 32-byte digest from a slice of exactly that length.
pub fn digest_from_slice(bytes: &[u8]) -> Result<RawDigest, CodecError> {
    bytes
        .try_into()
        .map_err(|_| CodecError::InvalidDigestLength(bytes.len()))
}

/// Forward-only cursor over a byte buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Fail unless every byte was consumed.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_digest(&mut self) -> Result<RawDigest, CodecError> {
        self.read_array()
    }

    /// Read a compact-size integer, rejecting encodings that are longer
    /// than necessary.
    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let prefix = self.read_u8()?;
        let (value, minimum) = match prefix {
            0xfd => (self.read_u16()? as u64, 0xfd),
            0xfe => (self.read_u32()? as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < minimum {
            return Err(CodecError::NonCanonicalVarInt { prefix, value });
        }
        Ok(value)
    }

    /// Read a varint element count, bounded by the bytes left to read so a
    /// hostile count cannot trigger a huge allocation.
    pub fn read_count(&mut self) -> Result<usize, CodecError> {
        let count = self.read_varint()?;
        if count > self.remaining() as u64 {
            return Err(CodecError::CountTooLarge(count));
        }
        Ok(count as usize)
    }

    /// Read varint-length-prefixed script bytes.
    pub fn read_script_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_varint()?;
        if len > MAX_SCRIPT_SIZE as u64 {
            return Err(CodecError::ScriptTooLarge(len));
        }
        self.read_bytes(len as usize)
    }
}
