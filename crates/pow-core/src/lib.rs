//! Core proof-of-work mining logic for Bitcoin-style chains.
//!
//! This crate provides pure Rust implementations of:
//! - SHA256 with clonable intermediate state, and double hashing
//! - An append-only Merkle tree over transaction ids
//! - Binary wire codecs for scripts, transactions, headers and blocks
//! - Base58Check decoding of payout addresses
//! - Difficulty target conversion and comparison
//! - A registry of interchangeable miner backends and the nonce search

pub mod address;
pub mod block;
pub mod codec;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod miner;
pub mod network;
pub mod radix;
pub mod registry;
pub mod script;
pub mod sha256;
pub mod template;
pub mod transaction;

pub use address::{decode_address, AddressError, ValidatedAddress};
pub use block::{Block, BlockHeader};
pub use codec::CodecError;
pub use difficulty::{bits_to_target, hash_meets_reversed_target, reverse_target};
pub use error::{Error, Result};
pub use hash::{double_sha256, hash_to_display_hex};
pub use merkle::{compute_merkle_root, MerkleTree};
pub use miner::{CpuMiner, MineOutcome, Miner, MinerBackend, SearchControl, SearchResult};
pub use network::Network;
pub use radix::{base58_decode_check, base58_encode_check, RadixError};
pub use registry::{MinerError, MinerRegistry};
pub use script::Script;
pub use sha256::{Digest, RawDigest, Sha256};
pub use template::{BlockTemplate, TemplateError};
pub use transaction::{PubKeyHash, Transaction, TxInput, TxOutput};
