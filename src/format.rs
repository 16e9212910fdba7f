//! Layout of the plaintext block before encryption.
//!
//! Version 1 is a zigzag varint followed by random padding. Version 2 is
//!
//! ```text
//! byte  0      version byte, always 2
//! bytes 1..9   n, little-endian i64
//! bytes 9..12  random padding
//! bytes 12..16 CRC-32 (IEEE) of bytes 0..12, little-endian
//! ```
//!
//! The two layouts are not compatible with each other.

use rand::RngCore;

use crate::cipher::{Block, BLOCK_SIZE};
use crate::Error;

const VERSION_BYTE: u8 = 2;
const CHECKSUM_OFFSET: usize = 12;

// An i64 needs at most 10 varint bytes.
const MAX_VARINT_LEN: usize = 10;

/// Format version declared by a key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V1,
    V2,
}

impl Version {
    pub fn number(self) -> i32 {
        match self {
            Version::V1 => 1,
            Version::V2 => 2,
        }
    }
}

impl From<i32> for Version {
    /// Anything from 2 up is version 2. Everything else is version 1.
    fn from(n: i32) -> Self {
        if n >= 2 {
            Version::V2
        } else {
            Version::V1
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Builds the plaintext block for `n`, drawing padding from `rng`.
pub fn pack<R: RngCore + ?Sized>(n: i64, version: Version, rng: &mut R) -> Result<Block, Error> {
    let mut block = [0u8; BLOCK_SIZE];
    match version {
        Version::V1 => {
            let len = put_varint(&mut block, n);
            rng.try_fill_bytes(&mut block[len..])?;
        }
        Version::V2 => {
            block[0] = VERSION_BYTE;
            block[1..9].copy_from_slice(&n.to_le_bytes());
            rng.try_fill_bytes(&mut block[9..CHECKSUM_OFFSET])?;
            let checksum = crc32fast::hash(&block[..CHECKSUM_OFFSET]);
            block[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
        }
    }
    Ok(block)
}

/// Recovers `n` from a decrypted block, validating it against `version`'s layout.
pub fn unpack(block: &Block, version: Version) -> Result<i64, Error> {
    match version {
        Version::V1 => read_varint(block).map(|(n, _)| n),
        Version::V2 => {
            if block[0] != VERSION_BYTE {
                return Err(Error::BadVersionByte(block[0]));
            }
            let computed = crc32fast::hash(&block[..CHECKSUM_OFFSET]);
            let stored = u32::from_le_bytes(le_array(&block[CHECKSUM_OFFSET..]));
            if stored != computed {
                return Err(Error::ChecksumMismatch { stored, computed });
            }
            Ok(i64::from_le_bytes(le_array(&block[1..9])))
        }
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    arr
}

// Zigzag-maps `n` and writes it 7 bits at a time, low bits first, with the high bit
// set on every byte but the last. Returns the number of bytes written.
fn put_varint(buf: &mut [u8], n: i64) -> usize {
    let mut u = ((n << 1) ^ (n >> 63)) as u64;
    let mut i = 0;
    while u >= 0x80 {
        buf[i] = (u as u8) | 0x80;
        u >>= 7;
        i += 1;
    }
    buf[i] = u as u8;
    i + 1
}

// Inverse of `put_varint`. Returns the value and the number of bytes consumed.
fn read_varint(buf: &[u8]) -> Result<(i64, usize), Error> {
    let mut u: u64 = 0;
    for (i, &b) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            break;
        }
        if i == MAX_VARINT_LEN - 1 && b > 1 {
            return Err(Error::MalformedVarint);
        }
        u |= ((b & 0x7f) as u64) << (7 * i);
        if b < 0x80 {
            let n = ((u >> 1) as i64) ^ -((u & 1) as i64);
            return Ok((n, i + 1));
        }
    }
    Err(Error::MalformedVarint)
}
