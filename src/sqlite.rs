//! A [`KeyStore`] kept in a SQLite database.

use std::sync::{Mutex, MutexGuard};

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::cipher::{Decrypter, Encrypter};
use crate::config::Config;
use crate::format::Version;
use crate::keystore::{
    aes_cipher, poisoned, random_key, CipherFactory, KeyStore, StoreError, Versioner,
};

mod schema {
    diesel::table! {
        keys (id) {
            id -> BigInt,
            typ -> Integer,
            k -> Binary,
        }
    }

    diesel::table! {
        store_meta (singleton) {
            singleton -> Integer,
            format_version -> Integer,
        }
    }
}

use schema::{keys, store_meta};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    typ INTEGER NOT NULL,
    k BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS keys_typ_id ON keys (typ, id);
CREATE TABLE IF NOT EXISTS store_meta (
    singleton INTEGER PRIMARY KEY CHECK (singleton = 0),
    format_version INTEGER NOT NULL
);
INSERT OR IGNORE INTO store_meta (singleton, format_version) VALUES (0, 1);
";

fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> StoreError {
    StoreError::Backend(Box::new(err))
}

/// SQLite-backed key store.
///
/// Encoding uses the newest key (highest ID) of the requested type.
pub struct SqliteKeyStore {
    conn: Mutex<SqliteConnection>,
    new_cipher: CipherFactory,
    key_length: usize,
    version: Version,
}

impl SqliteKeyStore {
    /// Opens the keystore file named by `config`, creating it if needed.
    ///
    /// A store holding no keys is moved to version 2. A store that already holds
    /// keys keeps the version it has, which is 1 for stores that predate versioning.
    /// Version 1 and version 2 encodings are not compatible.
    pub fn open(config: &Config) -> Result<SqliteKeyStore, StoreError> {
        Self::open_with(config, aes_cipher)
    }

    /// Like [`open`](Self::open), but builds ciphers for stored keys with `new_cipher`
    /// instead of AES.
    pub fn open_with<F>(config: &Config, new_cipher: F) -> Result<SqliteKeyStore, StoreError>
    where
        F: Fn(&[u8]) -> Result<(Encrypter, Decrypter), StoreError> + Send + Sync + 'static,
    {
        let url = config.path.to_str().ok_or_else(|| {
            StoreError::Backend(
                format!("keystore path {} is not UTF-8", config.path.display()).into(),
            )
        })?;
        let mut conn = SqliteConnection::establish(url).map_err(backend)?;
        conn.batch_execute(SCHEMA).map_err(backend)?;

        let number = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                let nkeys: i64 = keys::table.count().get_result(conn)?;
                if nkeys == 0 {
                    diesel::update(
                        store_meta::table
                            .filter(store_meta::singleton.eq(0))
                            .filter(store_meta::format_version.lt(2)),
                    )
                    .set(store_meta::format_version.eq(2))
                    .execute(conn)?;
                }
                store_meta::table
                    .filter(store_meta::singleton.eq(0))
                    .select(store_meta::format_version)
                    .first::<i32>(conn)
            })
            .map_err(backend)?;

        let version = Version::from(number);
        debug!(path = %config.path.display(), %version, "opened keystore");

        Ok(SqliteKeyStore {
            conn: Mutex::new(conn),
            new_cipher: Box::new(new_cipher),
            key_length: config.key_length,
            version,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, SqliteConnection>, StoreError> {
        self.conn.lock().map_err(|_| poisoned())
    }

    /// Generates a random key of `key_len` bytes with type `typ` and returns its ID.
    pub fn new_key(&self, typ: i32, key_len: usize) -> Result<i64, StoreError> {
        let key = random_key(key_len)?;
        let mut conn = self.conn()?;
        let id = diesel::insert_into(keys::table)
            .values((keys::typ.eq(typ), keys::k.eq(key)))
            .returning(keys::id)
            .get_result::<i64>(&mut *conn)
            .map_err(backend)?;
        debug!(key_id = id, typ, key_len, "created key");
        Ok(id)
    }

    /// Like [`new_key`](Self::new_key), with the key length from the store's [`Config`].
    pub fn create_key(&self, typ: i32) -> Result<i64, StoreError> {
        self.new_key(typ, self.key_length)
    }

    /// Changes the store's declared format version.
    ///
    /// Strings encoded before the change no longer decode afterwards.
    pub fn upgrade(&mut self, version: Version) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::update(store_meta::table.filter(store_meta::singleton.eq(0)))
            .set(store_meta::format_version.eq(version.number()))
            .execute(&mut *conn)
            .map_err(backend)?;
        drop(conn);
        debug!(from = %self.version, to = %version, "changed keystore version");
        self.version = version;
        Ok(())
    }
}

impl KeyStore for SqliteKeyStore {
    fn encoder_by_type(&self, typ: i32) -> Result<(i64, Encrypter), StoreError> {
        let mut conn = self.conn()?;
        let (id, key) = keys::table
            .filter(keys::typ.eq(typ))
            .order(keys::id.desc())
            .select((keys::id, keys::k))
            .first::<(i64, Vec<u8>)>(&mut *conn)
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        drop(conn);
        let (encrypter, _) = (self.new_cipher)(&key)?;
        Ok((id, encrypter))
    }

    fn decoder_by_id(&self, key_id: i64) -> Result<(i32, Decrypter), StoreError> {
        let mut conn = self.conn()?;
        let (typ, key) = keys::table
            .find(key_id)
            .select((keys::typ, keys::k))
            .first::<(i32, Vec<u8>)>(&mut *conn)
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        drop(conn);
        let (_, decrypter) = (self.new_cipher)(&key)?;
        Ok((typ, decrypter))
    }

    fn versioner(&self) -> Option<&dyn Versioner> {
        Some(self)
    }
}

impl Versioner for SqliteKeyStore {
    fn version(&self) -> Version {
        self.version
    }
}
