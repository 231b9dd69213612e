//! Script byte sequences built from opcodes and direct data pushes.

use std::ops::Deref;

use crate::codec::CodecError;

pub const OP_0: u8 = 0x00;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Longest push expressible with a single direct-push opcode.
pub const MAX_DIRECT_PUSH: usize = 75;

/// A raw script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Wrap bytes read from the wire without interpretation.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Append a bare opcode.
    pub fn push_opcode(&mut self, opcode: u8) -> &mut Self {
        self.0.push(opcode);
        self
    }

    /// Push literal data behind a one-byte length prefix.
    pub fn push_data(&mut self, data: &[u8]) -> Result<&mut Self, CodecError> {
        if data.len() > MAX_DIRECT_PUSH {
            return Err(CodecError::PushTooLong(data.len()));
        }
        self.0.push(data.len() as u8);
        self.0.extend_from_slice(data);
        Ok(self)
    }

    /// Push an integer using its minimal script-number encoding.
    pub fn push_int(&mut self, value: i64) -> &mut Self {
        let bytes = encode_script_num(value);
        // At most 9 bytes, always a valid direct push.
        self.0.push(bytes.len() as u8);
        self.0.extend_from_slice(&bytes);
        self
    }

    /// Standard pay-to-pubkey-hash output script:
    /// `OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Vec::with_capacity(25);
        script.push(OP_DUP);
        script.push(OP_HASH160);
        script.push(0x14); // Push 20 bytes
        script.extend_from_slice(pubkey_hash);
        script.push(OP_EQUALVERIFY);
        script.push(OP_CHECKSIG);
        Script(script)
    }
}

impl Deref for Script {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode an integer as a minimal little-endian script number.
///
/// The most significant byte carries the sign bit, so a magnitude whose top
/// byte already has 0x80 set gets an extra byte. Zero encodes as no bytes.
pub fn encode_script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut bytes = Vec::with_capacity(9);
    while magnitude > 0 {
        bytes.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    let top = bytes.len() - 1;
    if bytes[top] & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        bytes[top] |= 0x80;
    }

    bytes
}
