//! Difficulty target conversion and comparison.

use crate::hash::reverse_bytes;
use crate::sha256::RawDigest;

/// Compact bits of the historical "difficulty 1" target.
pub const GENESIS_BITS: u32 = 0x1d00ffff;

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)], where the top
/// bit of the mantissa is a sign flag and is ignored.
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target. Mantissa
/// bytes that would land above the most significant byte are dropped.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = (bits >> 24) as i64;
    let mantissa = bits & 0x007f_ffff;

    let (mantissa, exponent) = if exponent <= 3 {
        // Mantissa fits in fewer bytes than specified
        (mantissa >> (8 * (3 - exponent)), 3)
    } else {
        (mantissa, exponent)
    };

    let mut target = [0u8; 32];
    let mantissa_bytes = mantissa.to_be_bytes();
    for (i, byte) in mantissa_bytes[1..].iter().enumerate() {
        let pos = 32 - exponent + i as i64;
        if (0..32).contains(&pos) {
            target[pos as usize] = *byte;
        }
    }

    target
}

/// Reverse a big-endian target so that index 31 is its most significant
/// byte, matching the orientation of raw hash output.
#[inline]
pub fn reverse_target(target: &[u8; 32]) -> [u8; 32] {
    reverse_bytes(target)
}

/// Check a raw double-SHA256 hash against a reversed target.
///
/// Both arrays hold their most significant byte at index 31; the first
/// differing byte from the top decides. A hash equal to the target meets it.
#[inline]
pub fn hash_meets_reversed_target(hash: &RawDigest, reversed_target: &[u8; 32]) -> bool {
    for i in (0..32).rev() {
        if hash[i] < reversed_target[i] {
            return true;
        }
        if hash[i] > reversed_target[i] {
            return false;
        }
    }
    true
}

/// Calculate approximate difficulty from bits.
///
/// Difficulty = max_target / current_target
/// Where max_target is the genesis block target (bits = 0x1d00ffff)
pub fn bits_to_difficulty(bits: u32) -> f64 {
    let current = target_to_f64(&bits_to_target(bits));
    let genesis = target_to_f64(&bits_to_target(GENESIS_BITS));

    if current == 0.0 {
        return f64::INFINITY;
    }

    genesis / current
}

/// Convert a 256-bit big-endian target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    target
        .iter()
        .fold(0.0, |acc, byte| acc * 256.0 + *byte as f64)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.2}", difficulty)
    }
}
