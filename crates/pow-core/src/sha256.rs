//! Incremental SHA-256 with resumable, cloneable state.
//!
//! Mining hashes the same 76-byte header prefix for every nonce, so the
//! prefix is absorbed once and the state is cloned per trial.

use thiserror::Error;

/// Size of one message block in bytes.
const BLOCK_BYTES: usize = 64;

/// Canonical 32-byte digest, most significant byte first.
pub type RawDigest = [u8; 32];

/// Initial hash words: fractional parts of the square roots of the first 8 primes.
const H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Round constants: fractional parts of the cube roots of the first 64 primes.
const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// Hash engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// The engine only accepts whole bytes.
    #[error("non byte-aligned input: {bits} bits")]
    UnalignedInput { bits: u64 },
    /// More bits requested than the buffer holds.
    #[error("bit count {bits} exceeds buffer of {available} bits")]
    BitCountOverflow { bits: u64, available: u64 },
}

/// A SHA-256 digest as eight 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u32; 8]);

impl Digest {
    /// Serialize the words big-endian, independent of host byte order.
    pub fn to_bytes(&self) -> RawDigest {
        let mut out = [0u8; 32];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Parse a big-endian byte array back into words.
    pub fn from_bytes(bytes: &RawDigest) -> Self {
        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Digest(words)
    }
}

impl From<Digest> for RawDigest {
    fn from(digest: Digest) -> Self {
        digest.to_bytes()
    }
}

/// Running state of one SHA-256 computation.
///
/// Full blocks are compressed as soon as they are complete; only the trailing
/// partial block is buffered. `Clone` produces a fully independent copy.
#[derive(Debug, Clone)]
pub struct Sha256 {
    state: [u32; 8],
    buffer: [u8; BLOCK_BYTES],
    buffered: usize,
    message_bits: u64,
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 {
    /// A fresh state holding the initial constants.
    pub fn new() -> Self {
        Sha256 {
            state: H0,
            buffer: [0u8; BLOCK_BYTES],
            buffered: 0,
            message_bits: 0,
        }
    }

    /// Return to the initial constants with nothing buffered.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of message bits absorbed so far.
    pub fn message_bits(&self) -> u64 {
        self.message_bits
    }

    /// Absorb bytes into the running state.
    pub fn update(&mut self, mut data: &[u8]) {
        self.message_bits = self.message_bits.wrapping_add((data.len() as u64) << 3);

        if self.buffered > 0 {
            let take = (BLOCK_BYTES - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];

            if self.buffered < BLOCK_BYTES {
                return;
            }
            let block = self.buffer;
            compress(&mut self.state, &block);
            self.buffered = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_BYTES);
        for block in &mut blocks {
            let mut full = [0u8; BLOCK_BYTES];
            full.copy_from_slice(block);
            compress(&mut self.state, &full);
        }

        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffered = rest.len();
    }

    /// Absorb the first `bits` bits of `data`.
    ///
    /// Only whole bytes are supported.
    pub fn update_bits(&mut self, data: &[u8], bits: u64) -> Result<(), HashError> {
        if bits % 8 != 0 {
            return Err(HashError::UnalignedInput { bits });
        }
        let available = (data.len() as u64) * 8;
        if bits > available {
            return Err(HashError::BitCountOverflow { bits, available });
        }
        self.update(&data[..(bits / 8) as usize]);
        Ok(())
    }

    /// Finalize a copy of the state. `self` is left untouched and can keep
    /// absorbing data or be cloned.
    pub fn digest(&self) -> Digest {
        self.clone().finalize()
    }

    /// Apply padding and consume the state.
    pub fn finalize(mut self) -> Digest {
        let bit_len = self.message_bits;

        let mut pad = [0u8; BLOCK_BYTES * 2];
        pad[0] = 0x80;
        // 1 marker byte plus 8 length bytes must fit after the buffered data.
        let pad_len = if self.buffered < BLOCK_BYTES - 8 {
            BLOCK_BYTES - self.buffered
        } else {
            2 * BLOCK_BYTES - self.buffered
        };
        pad[pad_len - 8..pad_len].copy_from_slice(&bit_len.to_be_bytes());

        let length_before = self.message_bits;
        self.update(&pad[..pad_len]);
        self.message_bits = length_before;
        debug_assert_eq!(self.buffered, 0);

        Digest(self.state)
    }

    /// One-shot SHA-256.
    pub fn hash(data: &[u8]) -> Digest {
        let mut engine = Sha256::new();
        engine.update(data);
        engine.finalize()
    }

    /// SHA-256 applied twice.
    pub fn double_hash(data: &[u8]) -> Digest {
        Sha256::hash(&Sha256::hash(data).to_bytes())
    }
}

#[inline(always)]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline(always)]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline(always)]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline(always)]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

/// The compression function over a single 512-bit block.
fn compress(state: &mut [u32; 8], block: &[u8; BLOCK_BYTES]) {
    let mut w = [0u32; 64];
    for (j, chunk) in block.chunks_exact(4).enumerate() {
        w[j] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for j in 16..64 {
        w[j] = small_sigma1(w[j - 2])
            .wrapping_add(w[j - 7])
            .wrapping_add(small_sigma0(w[j - 15]))
            .wrapping_add(w[j - 16]);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for j in 0..64 {
        let ch = (e & f) ^ (!e & g);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch)
            .wrapping_add(K[j])
            .wrapping_add(w[j]);
        let t2 = big_sigma0(a).wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    for (word, add) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(add);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hex_digest(d: Digest) -> String {
        hex::encode(d.to_bytes())
    }

    #[test]
    fn test_empty_vector() {
        assert_eq!(
            hex_digest(Sha256::hash(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_abc_vector() {
        assert_eq!(
            hex_digest(Sha256::hash(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_two_block_vector() {
        // 56 bytes: padding spills into a second block
        let msg = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
        assert_eq!(
            hex_digest(Sha256::hash(msg)),
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
        );
    }

    #[test]
    fn test_double_hash_of_empty() {
        let once = Sha256::hash(b"").to_bytes();
        assert_eq!(Sha256::double_hash(b""), Sha256::hash(&once));
    }

    #[test]
    fn test_digest_leaves_state_reusable() {
        let mut engine = Sha256::new();
        engine.update(b"ab");
        let partial = engine.digest();
        assert_eq!(partial, Sha256::hash(b"ab"));

        engine.update(b"c");
        assert_eq!(engine.digest(), Sha256::hash(b"abc"));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut prefix = Sha256::new();
        prefix.update(&[0x5a; 76]);

        let mut left = prefix.clone();
        let mut right = prefix.clone();
        left.update(&0u32.to_le_bytes());
        right.update(&1u32.to_le_bytes());

        assert_ne!(left.digest(), right.digest());
        assert_eq!(prefix.message_bits(), 76 * 8);

        let mut full = [0x5a; 80];
        full[76..].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(right.finalize(), Sha256::hash(&full));
    }

    #[test]
    fn test_reset() {
        let mut engine = Sha256::new();
        engine.update(b"garbage");
        engine.reset();
        engine.update(b"abc");
        assert_eq!(engine.finalize(), Sha256::hash(b"abc"));
    }

    #[test]
    fn test_update_bits_rejects_unaligned() {
        let mut engine = Sha256::new();
        assert_eq!(
            engine.update_bits(b"abc", 20),
            Err(HashError::UnalignedInput { bits: 20 })
        );
        assert_eq!(
            engine.update_bits(b"abc", 32),
            Err(HashError::BitCountOverflow { bits: 32, available: 24 })
        );
        engine.update_bits(b"abcdef", 24).unwrap();
        assert_eq!(engine.finalize(), Sha256::hash(b"abc"));
    }

    #[test]
    fn test_digest_byte_order() {
        let digest = Digest([0x01020304, 0, 0, 0, 0, 0, 0, 0xa0b0c0d0]);
        let bytes = digest.to_bytes();
        assert_eq!(&bytes[..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[28..], &[0xa0, 0xb0, 0xc0, 0xd0]);
        assert_eq!(Digest::from_bytes(&bytes), digest);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_digest(
            data in proptest::collection::vec(any::<u8>(), 0..300),
            splits in proptest::collection::vec(0usize..300, 0..8),
        ) {
            let mut engine = Sha256::new();
            let mut cuts: Vec<usize> = splits.into_iter().map(|s| s % (data.len() + 1)).collect();
            cuts.sort_unstable();
            let mut start = 0;
            for cut in cuts {
                engine.update(&data[start..cut]);
                start = cut;
            }
            engine.update(&data[start..]);
            prop_assert_eq!(engine.finalize(), Sha256::hash(&data));
        }

        #[test]
        fn prop_matches_reference_sha2(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            use sha2::Digest as _;
            let expected = sha2::Sha256::digest(&data);
            prop_assert_eq!(&Sha256::hash(&data).to_bytes()[..], expected.as_slice());
        }

        #[test]
        fn prop_double_hash_is_hash_of_hash(data in proptest::collection::vec(any::<u8>(), 0..200)) {
            let inner = Sha256::hash(&data).to_bytes();
            prop_assert_eq!(Sha256::double_hash(&data), Sha256::hash(&inner));
        }
    }
}
