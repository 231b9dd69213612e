//! Transactions and their wire serialization.
//!
//! The coinbase transaction is the first transaction in a block; it creates
//! the block reward and carries the BIP34 height and the extranonce.

use crate::codec::{write_var_bytes, write_varint, CodecError, Reader};
use crate::hash::double_sha256;
use crate::script::Script;
use crate::sha256::RawDigest;

/// Previous-output index marking a coinbase input.
pub const COINBASE_PREV_INDEX: i32 = -1;

/// Bytes reserved in the coinbase scriptSig for the extranonce.
pub const EXTRA_NONCE_SIZE: usize = 4;

/// A public-key hash as carried in a P2PKH script.
pub type PubKeyHash = [u8; 20];

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Id of the transaction holding the spent output.
    pub prev_txid: RawDigest,
    /// Index of the spent output; -1 for coinbase.
    pub prev_index: i32,
    pub script_sig: Script,
    pub sequence: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in the smallest currency unit.
    pub value: u64,
    pub script_pubkey: Script,
}

/// A non-witness transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl TxInput {
    fn encode(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.prev_txid);
        output.extend_from_slice(&self.prev_index.to_le_bytes());
        write_var_bytes(output, &self.script_sig);
        output.extend_from_slice(&self.sequence.to_le_bytes());
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(TxInput {
            prev_txid: reader.read_digest()?,
            prev_index: reader.read_i32()?,
            script_sig: Script::from_bytes(reader.read_script_bytes()?.to_vec()),
            sequence: reader.read_u32()?,
        })
    }
}

impl TxOutput {
    fn encode(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(output, &self.script_pubkey);
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(TxOutput {
            value: reader.read_u64()?,
            script_pubkey: Script::from_bytes(reader.read_script_bytes()?.to_vec()),
        })
    }
}

impl Transaction {
    /// Build the coinbase transaction for a block.
    ///
    /// The scriptSig pushes the block height (BIP34) followed by four zero
    /// bytes reserved for the extranonce; the single output pays `value` to
    /// `pubkey_hash`.
    pub fn coinbase(height: u32, value: u64, pubkey_hash: &PubKeyHash) -> Self {
        let mut script_sig = Script::new();
        script_sig.push_int(height as i64);
        // Direct push of the zeroed extranonce slot
        script_sig.push_opcode(EXTRA_NONCE_SIZE as u8);
        for _ in 0..EXTRA_NONCE_SIZE {
            script_sig.push_opcode(0);
        }

        Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_txid: [0u8; 32],
                prev_index: COINBASE_PREV_INDEX,
                script_sig,
                sequence: 0,
            }],
            outputs: vec![TxOutput {
                value,
                script_pubkey: Script::p2pkh(pubkey_hash),
            }],
            lock_time: 0,
        }
    }

    /// Whether this has the single null-outpoint input of a coinbase.
    pub fn is_coinbase(&self) -> bool {
        matches!(
            self.inputs.as_slice(),
            [input] if input.prev_txid == [0u8; 32] && input.prev_index == COINBASE_PREV_INDEX
        )
    }

    /// Overwrite the extranonce bytes of a coinbase built by [`Transaction::coinbase`].
    pub fn set_extra_nonce(&mut self, extra_nonce: u32) -> Result<(), CodecError> {
        if !self.is_coinbase() {
            return Err(CodecError::MissingExtraNonce);
        }
        let script = self.inputs[0].script_sig.bytes_mut();
        let len = script.len();
        if len < EXTRA_NONCE_SIZE + 1 || script[len - EXTRA_NONCE_SIZE - 1] != EXTRA_NONCE_SIZE as u8 {
            return Err(CodecError::MissingExtraNonce);
        }
        script[len - EXTRA_NONCE_SIZE..].copy_from_slice(&extra_nonce.to_le_bytes());
        Ok(())
    }

    /// Append the wire encoding to `output`.
    pub fn encode(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.version.to_le_bytes());

        write_varint(output, self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode(output);
        }

        write_varint(output, self.outputs.len() as u64);
        for tx_output in &self.outputs {
            tx_output.encode(output);
        }

        output.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    /// Read one transaction from `reader`.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_i32()?;

        let input_count = reader.read_count()?;
        if input_count == 0 && reader.peek_u8() == Some(0x01) {
            // Segwit marker followed by flag
            return Err(CodecError::WitnessUnsupported);
        }
        let inputs = (0..input_count)
            .map(|_| TxInput::decode(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let output_count = reader.read_count()?;
        let outputs = (0..output_count)
            .map(|_| TxOutput::decode(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let lock_time = reader.read_u32()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Serialize the transaction.
    pub fn serialize(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(200);
        self.encode(&mut output);
        output
    }

    /// Parse a transaction that occupies all of `bytes`.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let tx = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(tx)
    }

    /// Parse the hex text form.
    pub fn from_hex(text: &str) -> Result<Self, CodecError> {
        Self::deserialize(&hex::decode(text.trim())?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Transaction id: double SHA256 of the serialization (internal byte order).
    pub fn txid(&self) -> RawDigest {
        double_sha256(&self.serialize())
    }
}
