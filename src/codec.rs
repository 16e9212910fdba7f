use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::basex::{self, Alphabet};
use crate::error::{Error, KeyRef};
use crate::format;
use crate::keystore::{declared_version, KeyStore};

/// The result of encoding: the ID of the key used, and the encrypted string.
///
/// Both halves are needed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedId {
    pub key_id: i64,
    pub encoded: String,
}

impl fmt::Display for EncodedId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.key_id, self.encoded)
    }
}

impl From<EncodedId> for (i64, String) {
    fn from(id: EncodedId) -> Self {
        (id.key_id, id.encoded)
    }
}

/// The result of decoding: the type of the key used, and the original number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodedId {
    #[serde(rename = "type")]
    pub typ: i32,
    pub n: i64,
}

impl From<DecodedId> for (i32, i64) {
    fn from(id: DecodedId) -> Self {
        (id.typ, id.n)
    }
}

/// Encrypts `n` with a key of type `typ` from `store` into a base-30 string.
///
/// Base 30 uses the digits and the lower-case letters `bcdfghjkmnpqrstvwxyz`: no
/// vowels, so no accidental words, and no "l".
///
/// The layout of the encrypted block follows the store's declared [`format::Version`].
/// Strings produced for a version 2 store can only be decoded by a version 2 store,
/// and the same goes for version 1.
///
/// # Examples
///
/// ```
/// use encid::MemoryKeyStore;
///
/// let store = MemoryKeyStore::new();
/// store.new_key(7, 16).unwrap();
///
/// let id = encid::encode(&store, 7, 12345).unwrap();
/// let decoded = encid::decode(&store, id.key_id, &id.encoded).unwrap();
/// assert_eq!((decoded.typ, decoded.n), (7, 12345));
/// ```
pub fn encode<K: KeyStore + ?Sized>(store: &K, typ: i32, n: i64) -> Result<EncodedId, Error> {
    encode_with(store, typ, n, Alphabet::Base30, &mut OsRng)
}

/// Like [`encode`], but writes the string in base 50, which adds the upper-case
/// consonants. The strings are shorter, and case-sensitive.
pub fn encode50<K: KeyStore + ?Sized>(store: &K, typ: i32, n: i64) -> Result<EncodedId, Error> {
    encode_with(store, typ, n, Alphabet::Base50, &mut OsRng)
}

/// Encodes with an explicit alphabet and source of padding bytes.
///
/// With a constant `rng` the output is a pure function of the inputs.
pub fn encode_with<K, R>(
    store: &K,
    typ: i32,
    n: i64,
    alphabet: Alphabet,
    rng: &mut R,
) -> Result<EncodedId, Error>
where
    K: KeyStore + ?Sized,
    R: RngCore + ?Sized,
{
    let (key_id, encrypter) = store
        .encoder_by_type(typ)
        .map_err(|e| Error::from_store(KeyRef::Type(typ), e))?;

    let mut block = format::pack(n, declared_version(store), rng)?;
    encrypter.encrypt(&mut block);

    Ok(EncodedId {
        key_id,
        encoded: basex::encode(&block, alphabet),
    })
}

/// Decodes a key ID and string produced by [`encode`].
///
/// The input is lower-cased before parsing, so upper-case input is accepted.
///
/// # Version 1 stores
///
/// Version 1 blocks carry no checksum, so a version 1 store cannot reject strings
/// it didn't produce. In particular a string from a version 2 store decodes to `1`
/// there instead of failing. Only version 2 stores detect corrupted or forged input.
pub fn decode<K: KeyStore + ?Sized>(store: &K, key_id: i64, input: &str) -> Result<DecodedId, Error> {
    decode_with(store, key_id, &input.to_lowercase(), Alphabet::Base30)
}

/// Decodes a key ID and string produced by [`encode50`]. No case folding is done.
pub fn decode50<K: KeyStore + ?Sized>(
    store: &K,
    key_id: i64,
    input: &str,
) -> Result<DecodedId, Error> {
    decode_with(store, key_id, input, Alphabet::Base50)
}

/// Decodes `input` written in `alphabet` with the key `key_id` from `store`.
///
/// Malformed input fails with [`Error::Decode`], which names the key.
pub fn decode_with<K: KeyStore + ?Sized>(
    store: &K,
    key_id: i64,
    input: &str,
    alphabet: Alphabet,
) -> Result<DecodedId, Error> {
    let (typ, decrypter) = store
        .decoder_by_id(key_id)
        .map_err(|e| Error::from_store(KeyRef::Id(key_id), e))?;

    let with_key = |e: Error| Error::Decode {
        key_id,
        source: Box::new(e),
    };

    let mut block = basex::decode(input, alphabet).map_err(with_key)?;
    decrypter.decrypt(&mut block);

    let n = format::unpack(&block, declared_version(store)).map_err(|e| {
        if let Error::ChecksumMismatch { .. } = e {
            warn!(key_id, "checksum mismatch, input may have been tampered with");
        }
        with_key(e)
    })?;

    Ok(DecodedId { typ, n })
}
