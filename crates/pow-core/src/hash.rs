//! Byte-array hashing helpers built on the [`Sha256`] engine.

use crate::sha256::{RawDigest, Sha256};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is used for block header hashing, transaction IDs, merkle nodes and
/// Base58Check checksums.
#[inline]
pub fn double_sha256(data: &[u8]) -> RawDigest {
    Sha256::double_hash(data).to_bytes()
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> RawDigest {
    Sha256::hash(data).to_bytes()
}

/// Reverse the byte order of a 32-byte array.
///
/// Bitcoin displays hashes in reverse byte order.
#[inline]
pub fn reverse_bytes(bytes: &RawDigest) -> RawDigest {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &RawDigest) -> String {
    hex::encode(reverse_bytes(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        // Test vector: SHA256d("hello")
        let hash = double_sha256(b"hello");
        assert_eq!(
            hex::encode(hash),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_double_sha256_is_sha256_twice() {
        assert_eq!(double_sha256(b""), sha256(&sha256(b"")));
    }

    #[test]
    fn test_reverse_bytes() {
        let mut original = [0u8; 32];
        for (i, byte) in original.iter_mut().enumerate() {
            *byte = i as u8 + 1;
        }
        let reversed = reverse_bytes(&original);

        assert_eq!(reversed[0], 0x20);
        assert_eq!(reversed[31], 0x01);
    }

    #[test]
    fn test_display_hex() {
        let mut hash = [0u8; 32];
        hash[31] = 0xab;
        assert!(hash_to_display_hex(&hash).starts_with("ab00"));
    }
}
