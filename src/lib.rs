//! `encid` encrypts integers, each tagged with a type, into short strings that are easy
//! to type, and decrypts them back.
//!
//! The intended use is handing out opaque IDs, for example in URLs, that hide both the
//! underlying number and what kind of object it refers to. Only holders of the key can
//! turn a string back into its number.
//!
//! Keys live in a [`KeyStore`]. Every key has a unique `i64` ID and an `i32` type.
//! Encoding picks a key by type and returns the key's ID along with the string; decoding
//! needs both. The number is packed into a single AES block, encrypted, and written out
//! in base 30 (digits and lower-case consonants other than "l") or base 50 (which adds
//! the upper-case consonants).
//!
//! A store declares a format [`Version`]. Version 2 stores pack the number at a fixed
//! width and add a CRC-32 checksum, so most corrupted or forged strings are rejected
//! instead of decoding to a wrong number. Version 1 is the older, unchecked layout.
//! The two are not compatible with each other.
//!
//! Note that the encryption is only as good as the secrecy of the keys. Once a key leaks,
//! anyone can decode and forge IDs of its type.
//!
//! # Usage
//!
//! ```
//! use encid::{MemoryKeyStore, DecodedId};
//!
//! let store = MemoryKeyStore::new();
//! store.new_key(1, 16).unwrap();
//!
//! let id = encid::encode(&store, 1, 12345).unwrap();
//! assert_eq!(id.key_id, 1);
//!
//! let decoded = encid::decode(&store, id.key_id, &id.encoded).unwrap();
//! assert_eq!(decoded, DecodedId { typ: 1, n: 12345 });
//! ```
//!
//! ## Keys on disk
//!
//! [`SqliteKeyStore`] keeps keys in a SQLite file.
//!
//! ```
//! use encid::{Config, SqliteKeyStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = SqliteKeyStore::open(&Config::new(dir.path().join("keys.db"))).unwrap();
//!
//! // Create a key on first use.
//! let id = match encid::encode50(&store, 4, 99) {
//!     Err(e) if e.is_not_found() => {
//!         store.create_key(4).unwrap();
//!         encid::encode50(&store, 4, 99).unwrap()
//!     }
//!     other => other.unwrap(),
//! };
//! assert_eq!(encid::decode50(&store, id.key_id, &id.encoded).unwrap().n, 99);
//! ```

pub mod basex;
mod cipher;
mod codec;
mod config;
mod error;
mod format;
mod keystore;
mod sqlite;

pub use basex::Alphabet;
pub use cipher::{Block, BlockCipher, Decrypter, Encrypter, BLOCK_SIZE};
pub use codec::{
    decode, decode50, decode_with, encode, encode50, encode_with, DecodedId, EncodedId,
};
pub use config::{default_path, Config, ConfigError, KEYSTORE_ENV};
pub use error::{Error, ErrorKind, KeyRef};
pub use format::Version;
pub use keystore::{
    aes_cipher, declared_version, CipherFactory, KeyStore, MemoryKeyStore, StoreError, Versioner,
};
pub use sqlite::SqliteKeyStore;
