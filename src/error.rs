use thiserror::Error;

use crate::keystore::StoreError;

/// Error returned by encode and decode.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no key of type {typ} in keystore")]
    TypeNotFound { typ: i32 },

    #[error("no key with ID {key_id} in keystore")]
    KeyNotFound { key_id: i64 },

    #[error("invalid character {ch:?} at position {position} for base{radix}")]
    InvalidCharacter {
        ch: char,
        position: usize,
        radix: u32,
    },

    /// The string encodes a number wider than one block. `len` counts characters.
    #[error("input string too long ({len} characters)")]
    InputTooLong { len: usize },

    #[error("malformed varint")]
    MalformedVarint,

    #[error("unexpected version byte {0}")]
    BadVersionByte(u8),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("key {key} has invalid length {len}")]
    InvalidKeyLength { key: KeyRef, len: usize },

    #[error("keystore lookup for key {key} failed")]
    Store {
        key: KeyRef,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A malformed or tampered input, with the key it was decoded with.
    #[error("decoding with key ID {key_id}: {source}")]
    Decode {
        key_id: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("reading random padding failed")]
    RandomSource(#[from] rand::Error),
}

/// Which key a keystore lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef {
    Type(i32),
    Id(i64),
}

impl std::fmt::Display for KeyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            KeyRef::Type(typ) => write!(f, "of type {}", typ),
            KeyRef::Id(id) => write!(f, "with ID {}", id),
        }
    }
}

/// Coarse classification of an [`Error`], for deciding how to react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store has no matching key. Provisioning a key and retrying can help.
    NotFound,
    /// The input string is corrupted or forged.
    Malformed,
    /// The input decrypted to a block whose checksum doesn't match; likely tampering.
    Checksum,
    /// The store holds key material the cipher can't use.
    KeyConfig,
    /// The store or the random source failed (I/O, cancellation, ...).
    Backend,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TypeNotFound { .. } | Error::KeyNotFound { .. } => ErrorKind::NotFound,
            Error::InvalidCharacter { .. }
            | Error::InputTooLong { .. }
            | Error::MalformedVarint
            | Error::BadVersionByte(_) => ErrorKind::Malformed,
            Error::ChecksumMismatch { .. } => ErrorKind::Checksum,
            Error::InvalidKeyLength { .. } => ErrorKind::KeyConfig,
            Error::Store { .. } | Error::RandomSource(_) => ErrorKind::Backend,
            Error::Decode { source, .. } => source.kind(),
        }
    }

    /// The underlying error, looking through the key context of [`Error::Decode`].
    pub fn detail(&self) -> &Error {
        match self {
            Error::Decode { source, .. } => source.detail(),
            other => other,
        }
    }

    /// The ID of the key involved, when the error is tied to one.
    pub fn key_id(&self) -> Option<i64> {
        match self {
            Error::KeyNotFound { key_id } | Error::Decode { key_id, .. } => Some(*key_id),
            Error::InvalidKeyLength {
                key: KeyRef::Id(key_id),
                ..
            }
            | Error::Store {
                key: KeyRef::Id(key_id),
                ..
            } => Some(*key_id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn from_store(key: KeyRef, err: StoreError) -> Error {
        match (err, key) {
            (StoreError::NotFound, KeyRef::Type(typ)) => Error::TypeNotFound { typ },
            (StoreError::NotFound, KeyRef::Id(key_id)) => Error::KeyNotFound { key_id },
            (StoreError::InvalidKeyLength(len), key) => Error::InvalidKeyLength { key, len },
            (StoreError::Backend(source), key) => Error::Store { key, source },
        }
    }
}
