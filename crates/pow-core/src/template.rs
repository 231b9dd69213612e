//! Block templates as returned by a node's `getblocktemplate` call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{digest_from_slice, CodecError};
use crate::hash::reverse_bytes;
use crate::sha256::RawDigest;
use crate::transaction::Transaction;

/// Block template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid compact bits: {0:?}")]
    InvalidBits(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A candidate transaction listed in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTransaction {
    /// Serialized transaction, hex encoded.
    pub data: String,
}

/// The fields of a block template that block assembly needs. Anything else
/// the node sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub version: i32,
    pub curtime: u32,
    /// Compact difficulty target as 8 hex digits, e.g. `"1d00ffff"`.
    pub bits: String,
    /// Previous block hash in display order.
    pub previousblockhash: String,
    pub height: u32,
    pub coinbasevalue: u64,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
}

impl BlockTemplate {
    pub fn from_json(text: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse the compact difficulty bits.
    pub fn compact_bits(&self) -> Result<u32, TemplateError> {
        let invalid = || TemplateError::InvalidBits(self.bits.clone());
        let bytes: [u8; 4] = hex::decode(&self.bits)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// The previous block hash in internal byte order.
    pub fn prev_block_hash(&self) -> Result<RawDigest, TemplateError> {
        let bytes = hex::decode(&self.previousblockhash).map_err(CodecError::from)?;
        Ok(reverse_bytes(&digest_from_slice(&bytes)?))
    }

    /// Decode the candidate transactions in template order.
    pub fn decode_transactions(&self) -> Result<Vec<Transaction>, TemplateError> {
        self.transactions
            .iter()
            .map(|tx| Ok(Transaction::from_hex(&tx.data)?))
            .collect()
    }
}
