use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::keystore::check_key_length;

/// Environment variable naming the keystore file.
pub const KEYSTORE_ENV: &str = "ENCID_KEYSTORE";

/// Configuring a [`SqliteKeyStore`](crate::SqliteKeyStore).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) path: PathBuf,
    pub(crate) key_length: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid key length {0}, must be 16, 24 or 32")]
    InvalidKeyLength(usize),

    #[error("cannot determine the user config directory")]
    NoConfigDir,
}

impl Config {
    /// Creates a configuration for the keystore file at `path`, with other settings
    /// in default values.
    /// - `key_length` defaults to 16 (AES-128).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Config {
            path: path.as_ref().to_path_buf(),
            key_length: 16,
        }
    }

    /// Creates a configuration from the environment.
    ///
    /// The keystore path is `$ENCID_KEYSTORE` if set, and `encid/keystore.db` under the
    /// user config directory otherwise.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var_os(KEYSTORE_ENV).filter(|p| !p.is_empty()) {
            Some(path) => Ok(Config::new(path)),
            None => default_path().map(Config::new),
        }
    }

    /// Sets the number of bytes in newly generated keys.
    /// The value must be 16, 24 or 32.
    pub fn key_length(mut self, key_length: usize) -> Result<Self, ConfigError> {
        check_key_length(key_length).map_err(|_| ConfigError::InvalidKeyLength(key_length))?;
        self.key_length = key_length;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `encid/keystore.db` under `$XDG_CONFIG_HOME`, or under `$HOME/.config`.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    default_path_from(env::var_os("XDG_CONFIG_HOME"), env::var_os("HOME"))
}

fn default_path_from(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Result<PathBuf, ConfigError> {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| {
            home.filter(|h| !h.is_empty())
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join("encid").join("keystore.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_length() {
        let config = Config::new("/tmp/ks.db");
        assert_eq!(config.key_length, 16);
        assert_eq!(config.path(), Path::new("/tmp/ks.db"));
        assert_eq!(config.clone().key_length(32).unwrap().key_length, 32);
        assert_eq!(
            config.key_length(20).unwrap_err(),
            ConfigError::InvalidKeyLength(20)
        );
    }

    #[test]
    fn test_default_path() {
        assert_eq!(
            default_path_from(Some("/xdg".into()), Some("/home/u".into())).unwrap(),
            PathBuf::from("/xdg/encid/keystore.db")
        );
        // Relative XDG paths are ignored.
        assert_eq!(
            default_path_from(Some("xdg".into()), Some("/home/u".into())).unwrap(),
            PathBuf::from("/home/u/.config/encid/keystore.db")
        );
        assert_eq!(
            default_path_from(None, Some("/home/u".into())).unwrap(),
            PathBuf::from("/home/u/.config/encid/keystore.db")
        );
        assert_eq!(
            default_path_from(None, None).unwrap_err(),
            ConfigError::NoConfigDir
        );
    }
}
