use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

use crate::cipher::{BlockCipher, Decrypter, Encrypter};
use crate::format::Version;

/// Error returned by [`KeyStore`] lookups and key creation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("invalid key length {0}")]
    InvalidKeyLength(usize),

    /// Anything else the backend runs into, including the caller cancelling the lookup.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

/// A store of encryption keys.
///
/// Each key is 16, 24 or 32 bytes long, has a unique `i64` ID and an `i32` type.
/// Lookups return a capability bound to one key rather than the key bytes.
pub trait KeyStore {
    /// Picks a key of type `typ` and returns its ID and an encrypter for it.
    ///
    /// Which key is picked when several share a type is up to the implementation.
    /// Returns [`StoreError::NotFound`] if there is no key of that type.
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError>;

    /// Looks up the key with ID `key_id` and returns its type and a decrypter for it.
    ///
    /// Returns [`StoreError::NotFound`] if there is no such key.
    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError>;

    /// Returns the store's [`Versioner`] capability, if it has one.
    ///
    /// A store without one is at version 1.
    fn versioner(&self) -> Option<&dyn Versioner> {
        None
    }
}

/// Reports the format version every key in a store encodes and decodes with.
pub trait Versioner {
    fn version(&self) -> Version;
}

/// Returns the format version `store` declares.
pub fn declared_version<K: KeyStore + ?Sized>(store: &K) -> Version {
    store.versioner().map_or(Version::V1, |v| v.version())
}

impl<K: KeyStore + ?Sized> KeyStore for &K {
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError> {
        (**self).encoder_by_type(typ)
    }

    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError> {
        (**self).decoder_by_id(key_id)
    }

    fn versioner(&self) -> Option<&dyn Versioner> {
        (**self).versioner()
    }
}

impl<K: KeyStore + ?Sized> KeyStore for Box<K> {
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError> {
        (**self).encoder_by_type(typ)
    }

    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError> {
        (**self).decoder_by_id(key_id)
    }

    fn versioner(&self) -> Option<&dyn Versioner> {
        (**self).versioner()
    }
}

impl<K: KeyStore + ?Sized> KeyStore for Arc<K> {
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError> {
        (**self).encoder_by_type(typ)
    }

    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError> {
        (**self).decoder_by_id(key_id)
    }

    fn versioner(&self) -> Option<&dyn Versioner> {
        (**self).versioner()
    }
}

/// Turns stored key material into the encrypt and decrypt capabilities for that key.
pub type CipherFactory =
    Box<dyn Fn(&[u8]) -> Result<(Encrypter, Decrypter), StoreError> + Send + Sync>;

/// The default [`CipherFactory`]: AES-128, AES-192 or AES-256 by key length.
pub fn aes_cipher(key: &[u8]) -> Result<(Encrypter, Decrypter), StoreError> {
    let cipher = BlockCipher::new(key).map_err(StoreError::InvalidKeyLength)?;
    Ok((cipher.clone().into_encrypter(), cipher.into_decrypter()))
}

pub(crate) fn check_key_length(len: usize) -> Result<(), StoreError> {
    match len {
        16 | 24 | 32 => Ok(()),
        _ => Err(StoreError::InvalidKeyLength(len)),
    }
}

pub(crate) fn random_key(len: usize) -> Result<Vec<u8>, StoreError> {
    check_key_length(len)?;
    let mut key = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| StoreError::Backend(Box::new(e)))?;
    Ok(key)
}

pub(crate) fn poisoned() -> StoreError {
    StoreError::Backend("keystore lock poisoned".into())
}

struct StoredKey {
    typ: i32,
    key: Vec<u8>,
}

/// A [`KeyStore`] held in process memory.
///
/// Encoding uses the key with the highest ID of the requested type.
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<i64, StoredKey>>,
    version: Version,
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyStore {
    /// Creates an empty store at version 2.
    pub fn new() -> Self {
        Self::with_version(Version::V2)
    }

    pub fn with_version(version: Version) -> Self {
        MemoryKeyStore {
            keys: RwLock::new(BTreeMap::new()),
            version,
        }
    }

    /// Generates a random key of `key_len` bytes with type `typ` and returns its ID.
    pub fn new_key(&self, typ: i32, key_len: usize) -> Result<i64, StoreError> {
        let key = random_key(key_len)?;
        self.insert_key(typ, key)
    }

    /// Adds existing key material with type `typ` and returns its ID.
    pub fn insert_key(&self, typ: i32, key: Vec<u8>) -> Result<i64, StoreError> {
        check_key_length(key.len())?;
        let mut keys = self.keys.write().map_err(|_| poisoned())?;
        let id = keys.keys().next_back().map_or(1, |last| last + 1);
        keys.insert(id, StoredKey { typ, key });
        debug!(key_id = id, typ, "created key");
        Ok(id)
    }

    /// Number of keys in the store. Still answers after a writer panicked.
    pub fn len(&self) -> usize {
        self.keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError> {
        let keys = self.keys.read().map_err(|_| poisoned())?;
        let (id, stored) = keys
            .iter()
            .rev()
            .find(|(_, stored)| stored.typ == typ)
            .ok_or(StoreError::NotFound)?;
        let cipher = BlockCipher::new(&stored.key).map_err(StoreError::InvalidKeyLength)?;
        Ok((*id, cipher.into_encrypter()))
    }

    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError> {
        let keys = self.keys.read().map_err(|_| poisoned())?;
        let stored = keys.get(&key_id).ok_or(StoreError::NotFound)?;
        let cipher = BlockCipher::new(&stored.key).map_err(StoreError::InvalidKeyLength)?;
        Ok((stored.typ, cipher.into_decrypter()))
    }

    fn versioner(&self) -> Option<&dyn Versioner> {
        Some(self)
    }
}

impl Versioner for MemoryKeyStore {
    fn version(&self) -> Version {
        self.version
    }
}
