use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

/// Size of the single cipher block every encoded ID occupies.
pub const BLOCK_SIZE: usize = 16;

/// One AES block, the unit that gets packed, encrypted and transcoded.
pub type Block = [u8; BLOCK_SIZE];

/// AES keyed with 16, 24 or 32 bytes of key material.
#[derive(Clone)]
pub enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    /// Selects AES-128, AES-192 or AES-256 from the length of `key`.
    ///
    /// Returns the rejected length for anything else.
    pub fn new(key: &[u8]) -> Result<BlockCipher, usize> {
        let invalid = |_| key.len();
        match key.len() {
            16 => Aes128::new_from_slice(key).map(BlockCipher::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(BlockCipher::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(BlockCipher::Aes256).map_err(invalid),
            n => Err(n),
        }
    }

    pub fn encrypt(&self, block: &mut Block) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(c) => c.encrypt_block(block),
            BlockCipher::Aes192(c) => c.encrypt_block(block),
            BlockCipher::Aes256(c) => c.encrypt_block(block),
        }
    }

    pub fn decrypt(&self, block: &mut Block) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(c) => c.decrypt_block(block),
            BlockCipher::Aes192(c) => c.decrypt_block(block),
            BlockCipher::Aes256(c) => c.decrypt_block(block),
        }
    }

    /// Consumes the cipher, keeping only its encrypt direction.
    pub fn into_encrypter(self) -> Encrypter {
        Encrypter::new(move |block| self.encrypt(block))
    }

    /// Consumes the cipher, keeping only its decrypt direction.
    pub fn into_decrypter(self) -> Decrypter {
        Decrypter::new(move |block| self.decrypt(block))
    }
}

/// An opaque capability that encrypts one block in place with a single key.
///
/// Key stores hand these out instead of raw key material, so the key itself
/// never has to be visible to the codec.
pub struct Encrypter(Box<dyn Fn(&mut Block) + Send + Sync>);

impl Encrypter {
    pub fn new<F>(f: F) -> Encrypter
    where
        F: Fn(&mut Block) + Send + Sync + 'static,
    {
        Encrypter(Box::new(f))
    }

    pub fn encrypt(&self, block: &mut Block) {
        (self.0)(block)
    }
}

/// The decrypting counterpart of [`Encrypter`].
pub struct Decrypter(Box<dyn Fn(&mut Block) + Send + Sync>);

impl Decrypter {
    pub fn new<F>(f: F) -> Decrypter
    where
        F: Fn(&mut Block) + Send + Sync + 'static,
    {
        Decrypter(Box::new(f))
    }

    pub fn decrypt(&self, block: &mut Block) {
        (self.0)(block)
    }
}
