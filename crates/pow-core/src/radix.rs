//! Arbitrary radix conversion and Base58Check text encoding.
//!
//! Text is first mapped to digit values through an [`Alphabet`], then the
//! digit string is converted between radixes with schoolbook long
//! multiplication. Base58 keeps leading zero bytes as leading `'1'`
//! characters.

use std::sync::OnceLock;

use thiserror::Error;

use crate::hash::double_sha256;

/// Decode table marker for characters inside the alphabet's range that are
/// not part of it.
const INVALID_DIGIT: u8 = 0xff;

/// Bytes of double-SHA256 appended by Base58Check.
pub const CHECKSUM_LEN: usize = 4;

const BASE58_SYMBOLS: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

static BASE58: OnceLock<Alphabet> = OnceLock::new();

/// Radix conversion and checksum errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadixError {
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("digit {digit} out of range for radix {radix}")]
    InvalidDigit { digit: u8, radix: u32 },

    #[error("unsupported radix {0}, expected 2..=256")]
    UnsupportedRadix(u32),

    #[error("decoded data of {0} bytes is too short to carry a checksum")]
    TooShort(usize),

    #[error("checksum mismatch: expected {}, found {}", hex::encode(.expected), hex::encode(.found))]
    ChecksumMismatch { expected: [u8; 4], found: [u8; 4] },
}

/// An ordered set of ASCII symbols and its derived reverse lookup.
#[derive(Debug, Clone)]
pub struct Alphabet {
    symbols: &'static [u8],
    first: u8,
    decode: Vec<u8>,
}

impl Alphabet {
    /// Build an alphabet from its encode table. The decode table spans the
    /// lowest through highest symbol; gaps map to an invalid marker.
    pub fn new(symbols: &'static [u8]) -> Self {
        let first = symbols.iter().copied().min().unwrap_or(0);
        let last = symbols.iter().copied().max().unwrap_or(0);

        let mut decode = vec![INVALID_DIGIT; (last - first) as usize + 1];
        for (digit, symbol) in symbols.iter().enumerate() {
            decode[(symbol - first) as usize] = digit as u8;
        }

        Alphabet {
            symbols,
            first,
            decode,
        }
    }

    /// Number of symbols, which is the radix of the digits it encodes.
    pub fn radix(&self) -> u32 {
        self.symbols.len() as u32
    }

    fn digit(&self, character: char) -> Option<u8> {
        if !character.is_ascii() {
            return None;
        }
        let offset = (character as u8).checked_sub(self.first)?;
        self.decode
            .get(offset as usize)
            .copied()
            .filter(|digit| *digit != INVALID_DIGIT)
    }
}

/// The Bitcoin Base58 alphabet (no `0`, `O`, `I` or `l`).
pub fn base58_alphabet() -> &'static Alphabet {
    BASE58.get_or_init(|| Alphabet::new(BASE58_SYMBOLS))
}

/// Map each character of `text` to its digit value.
pub fn decode_alphabet(text: &str, alphabet: &Alphabet) -> Result<Vec<u8>, RadixError> {
    text.chars()
        .enumerate()
        .map(|(position, character)| {
            alphabet
                .digit(character)
                .ok_or(RadixError::InvalidCharacter {
                    character,
                    position,
                })
        })
        .collect()
}

/// Map digit values back to their symbols.
pub fn encode_alphabet(digits: &[u8], alphabet: &Alphabet) -> Result<String, RadixError> {
    digits
        .iter()
        .map(|digit| {
            alphabet
                .symbols
                .get(*digit as usize)
                .map(|symbol| *symbol as char)
                .ok_or(RadixError::InvalidDigit {
                    digit: *digit,
                    radix: alphabet.radix(),
                })
        })
        .collect()
}

/// Convert a big-endian digit string from `src_radix` to `dest_radix`.
///
/// Both radixes must lie in `2..=256`. The result carries no leading zero
/// digits, so an empty or all-zero input converts to an empty output.
pub fn convert(input: &[u8], src_radix: u32, dest_radix: u32) -> Result<Vec<u8>, RadixError> {
    for radix in [src_radix, dest_radix] {
        if !(2..=256).contains(&radix) {
            return Err(RadixError::UnsupportedRadix(radix));
        }
    }

    let significant = match input.iter().position(|digit| *digit != 0) {
        Some(start) => &input[start..],
        None => return Ok(Vec::new()),
    };

    // log(src) / log(dest) destination digits per source digit, rounded up
    let ratio = (src_radix as f64).ln() / (dest_radix as f64).ln();
    let estimate = (significant.len() as f64 * ratio).ceil() as usize + 1;
    let mut output = vec![0u8; estimate];

    for digit in significant {
        if *digit as u32 >= src_radix {
            return Err(RadixError::InvalidDigit {
                digit: *digit,
                radix: src_radix,
            });
        }

        let mut carry = *digit as u32;
        for slot in output.iter_mut().rev() {
            carry += *slot as u32 * src_radix;
            *slot = (carry % dest_radix) as u8;
            carry /= dest_radix;
        }
        while carry > 0 {
            output.insert(0, (carry % dest_radix) as u8);
            carry /= dest_radix;
        }
    }

    let start = output
        .iter()
        .position(|digit| *digit != 0)
        .unwrap_or(output.len());
    output.drain(..start);
    Ok(output)
}

/// Decode Base58 text to bytes.
pub fn base58_decode(text: &str) -> Result<Vec<u8>, RadixError> {
    let digits = decode_alphabet(text, base58_alphabet())?;
    let zeros = digits.iter().take_while(|digit| **digit == 0).count();

    let mut bytes = vec![0u8; zeros];
    bytes.extend(convert(&digits[zeros..], 58, 256)?);
    Ok(bytes)
}

/// Encode bytes as Base58 text.
pub fn base58_encode(bytes: &[u8]) -> String {
    let alphabet = base58_alphabet();
    let zeros = bytes.iter().take_while(|byte| **byte == 0).count();

    let mut digits = vec![0u8; zeros];
    // Conversion out of radix 256 cannot meet an out-of-range digit.
    digits.extend(convert(&bytes[zeros..], 256, 58).unwrap_or_default());

    digits
        .iter()
        .map(|digit| alphabet.symbols[*digit as usize] as char)
        .collect()
}

/// Decode Base58Check text, verifying and stripping its 4-byte checksum.
pub fn base58_decode_check(text: &str) -> Result<Vec<u8>, RadixError> {
    let mut bytes = base58_decode(text)?;
    if bytes.len() < CHECKSUM_LEN {
        return Err(RadixError::TooShort(bytes.len()));
    }

    let split = bytes.len() - CHECKSUM_LEN;
    let expected = checksum(&bytes[..split]);
    let mut found = [0u8; CHECKSUM_LEN];
    found.copy_from_slice(&bytes[split..]);
    if found != expected {
        return Err(RadixError::ChecksumMismatch { expected, found });
    }

    bytes.truncate(split);
    Ok(bytes)
}

/// Encode a payload as Base58Check text.
pub fn base58_encode_check(payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&checksum(payload));
    base58_encode(&bytes)
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = double_sha256(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}
