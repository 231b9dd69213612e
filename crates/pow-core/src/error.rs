//! Crate-wide error type.

use thiserror::Error;

use crate::address::AddressError;
use crate::codec::CodecError;
use crate::merkle::MerkleError;
use crate::radix::RadixError;
use crate::registry::MinerError;
use crate::sha256::HashError;
use crate::template::TemplateError;

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Radix(#[from] RadixError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Miner(#[from] MinerError),
}

pub type Result<T> = std::result::Result<T, Error>;
