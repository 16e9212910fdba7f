//! Conversion between a cipher block and its base-30 or base-50 string form.
//!
//! The block is read as one unsigned big-endian 128-bit number and written out in the
//! target radix without leading zero symbols.

use once_cell::sync::Lazy;

use crate::cipher::{Block, BLOCK_SIZE};
use crate::Error;

const BASE30_SYMBOLS: &str = "0123456789bcdfghjkmnpqrstvwxyz";
const BASE50_SYMBOLS: &str = "0123456789bcdfghjkmnpqrstvwxyzBCDFGHJKMNPQRSTVWXYZ";

const INVALID: u8 = u8::MAX;

static BASE30_DIGITS: Lazy<[u8; 128]> = Lazy::new(|| digit_table(Alphabet::Base30));
static BASE50_DIGITS: Lazy<[u8; 128]> = Lazy::new(|| digit_table(Alphabet::Base50));

/// The symbol sets encoded strings are written in.
///
/// Both leave out vowels, so that strings don't spell words, and lower-case "l".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    /// Digits and 20 lower-case consonants. Case-insensitive on input.
    #[default]
    Base30,
    /// `Base30` plus the upper-case consonants. Case-sensitive.
    Base50,
}

impl Alphabet {
    pub fn radix(self) -> u32 {
        match self {
            Alphabet::Base30 => 30,
            Alphabet::Base50 => 50,
        }
    }

    pub fn symbols(self) -> &'static str {
        match self {
            Alphabet::Base30 => BASE30_SYMBOLS,
            Alphabet::Base50 => BASE50_SYMBOLS,
        }
    }

    pub fn is_case_sensitive(self) -> bool {
        self == Alphabet::Base50
    }

    fn digit(self, ch: char) -> Option<u8> {
        let table = match self {
            Alphabet::Base30 => &*BASE30_DIGITS,
            Alphabet::Base50 => &*BASE50_DIGITS,
        };
        let d = *table.get(ch as usize)?;
        (d != INVALID).then_some(d)
    }
}

fn digit_table(alphabet: Alphabet) -> [u8; 128] {
    let mut table = [INVALID; 128];
    for (i, c) in alphabet.symbols().bytes().enumerate() {
        table[c as usize] = i as u8;
        if !alphabet.is_case_sensitive() {
            table[c.to_ascii_uppercase() as usize] = i as u8;
        }
    }
    table
}

/// Writes `block` out in the given alphabet. The zero block is `"0"`.
pub fn encode(block: &Block, alphabet: Alphabet) -> String {
    let symbols = alphabet.symbols().as_bytes();
    let radix = alphabet.radix() as u128;
    let mut num = u128::from_be_bytes(*block);
    if num == 0 {
        return (symbols[0] as char).to_string();
    }

    let mut out = Vec::new();
    while num > 0 {
        out.push(symbols[(num % radix) as usize]);
        num /= radix;
    }
    out.iter().rev().map(|&c| c as char).collect()
}

/// Parses `input` in the given alphabet back into a block, left-padding with zero bytes.
///
/// Fails if a character is outside the alphabet, or if the number doesn't fit in
/// one block. Base 30 folds ASCII upper case only; [`crate::decode`] lower-cases
/// the whole string first.
pub fn decode(input: &str, alphabet: Alphabet) -> Result<Block, Error> {
    let radix = alphabet.radix();
    let mut digits = Vec::with_capacity(input.len());
    for (position, ch) in input.chars().enumerate() {
        let digit = alphabet.digit(ch).ok_or(Error::InvalidCharacter {
            ch,
            position,
            radix,
        })?;
        digits.push(digit);
    }

    let len = digits.len();

    // Little-endian base-256 accumulator. It never holds a most significant zero byte.
    let mut acc: Vec<u8> = Vec::with_capacity(BLOCK_SIZE + 1);
    for digit in digits {
        let mut carry = digit as u32;
        for byte in acc.iter_mut() {
            let v = *byte as u32 * radix + carry;
            *byte = v as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            acc.push(carry as u8);
            carry >>= 8;
        }
        if acc.len() > BLOCK_SIZE {
            return Err(Error::InputTooLong { len });
        }
    }

    let mut block = [0u8; BLOCK_SIZE];
    for (dst, src) in block.iter_mut().rev().zip(acc.iter()) {
        *dst = *src;
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn block_from_u128(n: u128) -> Block {
        n.to_be_bytes()
    }

    #[test]
    fn test_alphabets() {
        assert_eq!(BASE30_SYMBOLS.len(), 30);
        assert_eq!(BASE50_SYMBOLS.len(), 50);
        for alphabet in [Alphabet::Base30, Alphabet::Base50] {
            assert!(!alphabet.symbols().contains(&['a', 'e', 'i', 'o', 'u', 'l'][..]));
            assert!(!alphabet.symbols().contains(&['A', 'E', 'I', 'O', 'U', 'L'][..]));
        }
    }

    #[test]
    fn test_encode() {
        let test_cases = [
            (0u128, "0", "0"),
            (1, "1", "1"),
            (29, "z", "z"),
            (30, "10", "B"),
            (49, "1n", "Z"),
            (50, "1p", "10"),
            (900, "100", "m0"),
        ];
        for (num, base30, base50) in test_cases {
            assert_eq!(encode(&block_from_u128(num), Alphabet::Base30), base30);
            assert_eq!(encode(&block_from_u128(num), Alphabet::Base50), base50);
            assert_eq!(decode(base30, Alphabet::Base30).unwrap(), block_from_u128(num));
            assert_eq!(decode(base50, Alphabet::Base50).unwrap(), block_from_u128(num));
        }
    }

    #[test]
    fn test_extremes() {
        let max = [0xffu8; BLOCK_SIZE];
        let encoded = encode(&max, Alphabet::Base30);
        assert_eq!(encoded.len(), 27);
        assert_eq!(decode(&encoded, Alphabet::Base30).unwrap(), max);

        let encoded = encode(&max, Alphabet::Base50);
        assert_eq!(encoded.len(), 23);
        assert_eq!(decode(&encoded, Alphabet::Base50).unwrap(), max);

        assert_eq!(decode("", Alphabet::Base30).unwrap(), [0u8; BLOCK_SIZE]);
        assert_eq!(decode("0000", Alphabet::Base50).unwrap(), [0u8; BLOCK_SIZE]);
        assert_eq!(
            decode("0001", Alphabet::Base30).unwrap(),
            block_from_u128(1)
        );
    }

    #[test]
    fn test_input_too_long() {
        // One more than u128::MAX needs a 17th byte.
        let mut encoded = encode(&[0xffu8; BLOCK_SIZE], Alphabet::Base30);
        encoded.push('0');
        assert!(matches!(
            decode(&encoded, Alphabet::Base30),
            Err(Error::InputTooLong { len: 28 })
        ));

        assert!(matches!(
            decode(&"z".repeat(60), Alphabet::Base30),
            Err(Error::InputTooLong { len: 60 })
        ));

        // Leading zeroes don't count against the block.
        let padded = format!("{}{}", "0".repeat(100), encode(&[0xffu8; BLOCK_SIZE], Alphabet::Base50));
        assert_eq!(decode(&padded, Alphabet::Base50).unwrap(), [0xffu8; BLOCK_SIZE]);
    }

    #[test]
    fn test_huge_input_fails_fast() {
        let huge = "z".repeat(4 << 20);
        let start = std::time::Instant::now();
        assert!(matches!(
            decode(&huge, Alphabet::Base30),
            Err(Error::InputTooLong { len }) if len == huge.len()
        ));
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "took {:?}",
            start.elapsed()
        );

        // An invalid character anywhere still wins over the length.
        let mut huge = huge;
        huge.push('a');
        assert!(matches!(
            decode(&huge, Alphabet::Base30),
            Err(Error::InvalidCharacter { ch: 'a', .. })
        ));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            decode("12a4", Alphabet::Base30),
            Err(Error::InvalidCharacter {
                ch: 'a',
                position: 2,
                radix: 30
            })
        ));
        assert!(matches!(
            decode("bcLd", Alphabet::Base50),
            Err(Error::InvalidCharacter {
                ch: 'L',
                position: 2,
                radix: 50
            })
        ));
        assert!(matches!(
            decode("b-c", Alphabet::Base50),
            Err(Error::InvalidCharacter { ch: '-', .. })
        ));
        assert!(matches!(
            decode("bcé", Alphabet::Base30),
            Err(Error::InvalidCharacter { ch: 'é', .. })
        ));
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(
            decode("4GSB6BWNSVZ", Alphabet::Base30).unwrap(),
            decode("4gsb6bwnsvz", Alphabet::Base30).unwrap()
        );
        assert_ne!(
            decode("4GSB6BWNSVZ", Alphabet::Base50).unwrap(),
            decode("4gsb6bwnsvz", Alphabet::Base50).unwrap()
        );
    }

    #[test]
    fn test_random_roundtrips() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let mut block = [0u8; BLOCK_SIZE];
            rng.fill_bytes(&mut block);
            // Exercise short values too.
            let zeroes = (rng.next_u32() % 17) as usize;
            block[..zeroes].fill(0);
            for alphabet in [Alphabet::Base30, Alphabet::Base50] {
                let encoded = encode(&block, alphabet);
                assert_eq!(decode(&encoded, alphabet).unwrap(), block);
            }
        }
    }
}
