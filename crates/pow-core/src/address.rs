//! Payout address validation.
//!
//! Only P2PKH Base58Check addresses are accepted: a version byte followed by
//! the 20-byte public-key hash that the coinbase output pays to.

use thiserror::Error;

use crate::network::Network;
use crate::radix::{base58_decode_check, RadixError};
use crate::script::Script;
use crate::transaction::PubKeyHash;

/// Address validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error(transparent)]
    Encoding(#[from] RadixError),

    #[error("expected a 21-byte payload, got {0} bytes")]
    InvalidLength(usize),

    #[error("address version {version:#04x} does not belong to {network}")]
    NetworkMismatch { version: u8, network: Network },
}

/// A validated P2PKH address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAddress {
    /// The network this address belongs to.
    pub network: Network,
    /// Public-key hash with the version byte stripped.
    pub pubkey_hash: PubKeyHash,
    /// The address text as given, trimmed.
    pub display: String,
}

impl ValidatedAddress {
    /// The scriptPubKey paying to this address.
    pub fn script_pubkey(&self) -> Script {
        Script::p2pkh(&self.pubkey_hash)
    }
}

/// Decode a Base58Check P2PKH address and check it belongs to `network`.
pub fn decode_address(address: &str, network: Network) -> Result<ValidatedAddress, AddressError> {
    let trimmed = address.trim();
    let payload = base58_decode_check(trimmed)?;

    let (version, hash) = match payload.split_first() {
        Some((version, hash)) if hash.len() == 20 => (*version, hash),
        _ => return Err(AddressError::InvalidLength(payload.len())),
    };

    if version != network.p2pkh_version() {
        return Err(AddressError::NetworkMismatch { version, network });
    }

    let mut pubkey_hash = [0u8; 20];
    pubkey_hash.copy_from_slice(hash);

    Ok(ValidatedAddress {
        network,
        pubkey_hash,
        display: trimmed.to_string(),
    })
}
