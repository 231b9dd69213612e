//! Block header construction and serialization.

use crate::codec::{write_varint, CodecError, Reader};
use crate::difficulty::bits_to_target;
use crate::hash::double_sha256;
use crate::merkle::MerkleTree;
use crate::sha256::{RawDigest, Sha256};
use crate::template::{BlockTemplate, TemplateError};
use crate::transaction::{PubKeyHash, Transaction};
use crate::Result;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Size of the header without its trailing nonce.
pub const HEADER_PREFIX_SIZE: usize = 76;

/// A block header (80 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: RawDigest,
    /// Merkle root of all transactions.
    pub merkle_root: RawDigest,
    /// Block timestamp (Unix time).
    pub time: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header with a zero nonce.
    pub fn new(
        version: i32,
        prev_block_hash: RawDigest,
        merkle_root: RawDigest,
        time: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            time,
            bits,
            nonce: 0,
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..HEADER_PREFIX_SIZE].copy_from_slice(&self.serialize_without_nonce());

        // Nonce (4 bytes, little-endian)
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Serialize the header without the nonce (76 bytes).
    /// Used for mining where only the nonce changes.
    pub fn serialize_without_nonce(&self) -> [u8; HEADER_PREFIX_SIZE] {
        let mut header = [0u8; HEADER_PREFIX_SIZE];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp (4 bytes, little-endian)
        header[68..72].copy_from_slice(&self.time.to_le_bytes());

        // Bits (4 bytes, little-endian)
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        header
    }

    pub fn decode(reader: &mut Reader<'_>) -> std::result::Result<Self, CodecError> {
        Ok(BlockHeader {
            version: reader.read_i32()?,
            prev_block_hash: reader.read_digest()?,
            merkle_root: reader.read_digest()?,
            time: reader.read_u32()?,
            bits: reader.read_u32()?,
            nonce: reader.read_u32()?,
        })
    }

    /// Parse exactly 80 header bytes.
    pub fn deserialize(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let header = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(header)
    }

    /// Hash state after absorbing every field except the nonce.
    pub fn prefix_state(&self) -> Sha256 {
        let mut state = Sha256::new();
        state.update(&self.serialize_without_nonce());
        state
    }

    /// Compute the block hash (double SHA256).
    pub fn hash(&self) -> RawDigest {
        double_sha256(&self.serialize())
    }

    /// Get the target as a 256-bit big-endian number.
    pub fn target(&self) -> [u8; 32] {
        bits_to_target(self.bits)
    }
}

/// A block under construction: header plus an ordered transaction list
/// whose ids are committed in a [`MerkleTree`].
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    transactions: Vec<Transaction>,
    merkle: MerkleTree,
}

impl Block {
    /// An empty block with the given version, timestamp and compact bits.
    pub fn new(version: i32, time: u32, bits: u32) -> Self {
        Block {
            header: BlockHeader::new(version, [0u8; 32], [0u8; 32], time, bits),
            transactions: Vec::new(),
            merkle: MerkleTree::new(),
        }
    }

    /// Assemble a block from a node template: a fresh coinbase paying
    /// `pubkey_hash`, followed by the template's transactions.
    pub fn from_template(
        template: &BlockTemplate,
        pubkey_hash: &PubKeyHash,
    ) -> std::result::Result<Self, TemplateError> {
        let mut block = Block::new(template.version, template.curtime, template.compact_bits()?);
        block.set_prev_block_hash(template.prev_block_hash()?);

        block.append_transaction(Transaction::coinbase(
            template.height,
            template.coinbasevalue,
            pubkey_hash,
        ));
        for tx in template.decode_transactions()? {
            block.append_transaction(tx);
        }

        block.update_header();
        Ok(block)
    }

    /// Set the previous block hash (internal byte order).
    pub fn set_prev_block_hash(&mut self, hash: RawDigest) {
        self.header.prev_block_hash = hash;
    }

    /// Append a transaction and commit its id to the Merkle tree.
    pub fn append_transaction(&mut self, tx: Transaction) {
        self.merkle.append(tx.txid());
        self.transactions.push(tx);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Current Merkle root of the transaction list.
    pub fn merkle_root(&mut self) -> RawDigest {
        self.merkle.root_hash()
    }

    /// Copy the current Merkle root into the header.
    pub fn update_header(&mut self) {
        self.header.merkle_root = self.merkle.root_hash();
    }

    /// Rewrite the coinbase extranonce, re-commit it and restart the nonce.
    pub fn set_extra_nonce(&mut self, extra_nonce: u32) -> Result<()> {
        let coinbase = self
            .transactions
            .first_mut()
            .ok_or(CodecError::MissingExtraNonce)?;
        coinbase.set_extra_nonce(extra_nonce)?;
        let txid = coinbase.txid();

        self.merkle.update(0, txid)?;
        self.update_header();
        self.header.nonce = 0;
        Ok(())
    }

    /// Serialize the complete block for submission: header, transaction
    /// count and every transaction.
    pub fn serialize(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 9 + 250 * self.transactions.len());
        block.extend_from_slice(&self.header.serialize());
        write_varint(&mut block, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode(&mut block);
        }
        block
    }

    /// Get the block as hex string for submission.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Parse a serialized block. The header is kept exactly as read.
    pub fn deserialize(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let header = BlockHeader::decode(&mut reader)?;
        let count = reader.read_count()?;

        let mut block = Block {
            header,
            transactions: Vec::with_capacity(count),
            merkle: MerkleTree::new(),
        };
        for _ in 0..count {
            block.append_transaction(Transaction::decode(&mut reader)?);
        }
        reader.finish()?;
        Ok(block)
    }

    pub fn from_hex(text: &str) -> std::result::Result<Self, CodecError> {
        Self::deserialize(&hex::decode(text.trim())?)
    }
}
