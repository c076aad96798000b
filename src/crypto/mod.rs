//! Password based cryptography for PKCS#12.
//!
//! Two engines sit behind the [`PbeEngine`] trait:
//!
//! - [`ModernEngine`]: PBES2 with PBKDF2 and AES-CBC.
//! - [`LegacyEngine`]: the PKCS#12 PBE schemes (Triple-DES and RC2) keyed by the
//!   PKCS#12 key derivation function.
//!
//! Neither engine calls the other. Choosing between them is the job of
//! [`crate::codec`].

pub mod kdf;
pub mod legacy;
pub mod mac;
pub mod modern;
pub mod provider;

use std::fmt;

use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7,
};

pub use legacy::LegacyEngine;
pub use modern::ModernEngine;
pub use provider::{CryptoProvider, OsRandom};

use crate::config::EncryptionParams;
use crate::error::{PfxError, Result};
use crate::oid::PbeAlgorithm;

/// An archive password.
///
/// PBKDF2 consumes [`Password::as_bytes`]: the character codes when every
/// character fits in one byte (Latin-1), UTF-8 otherwise. The PKCS#12 KDF and
/// the MAC consume [`Password::to_bmp`].
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    text: String,
}

impl Password {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        if self.text.chars().all(|c| u32::from(c) <= 0xff) {
            self.text.chars().map(|c| u32::from(c) as u8).collect()
        } else {
            self.text.as_bytes().to_vec()
        }
    }

    /// UTF-16BE followed by a two byte NUL terminator. The empty password
    /// encodes as `00 00`.
    pub fn to_bmp(&self) -> Vec<u8> {
        let mut bmp: Vec<u8> = self.text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        bmp.extend_from_slice(&[0, 0]);
        bmp
    }
}

impl From<&str> for Password {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(..)")
    }
}

/// A password based encryption path.
pub trait PbeEngine {
    /// Decrypts `ciphertext` under `algorithm`.
    ///
    /// Returns [`PfxError::UnsupportedAlgorithm`] for algorithms this engine
    /// does not implement and [`PfxError::IntegrityOrPasswordError`] when the
    /// padding check fails.
    fn decrypt(
        &self,
        algorithm: &PbeAlgorithm,
        ciphertext: &[u8],
        password: &Password,
    ) -> Result<Vec<u8>>;

    /// Encrypts `plaintext` with a fresh salt and IV drawn from `provider`,
    /// returning the ciphertext and the algorithm identifier to store with it.
    fn encrypt(
        &self,
        plaintext: &[u8],
        password: &Password,
        params: &EncryptionParams,
        provider: &dyn CryptoProvider,
    ) -> Result<(Vec<u8>, PbeAlgorithm)>;
}

pub(crate) fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| PfxError::malformed(format!("invalid cipher key or IV: {e}")))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| PfxError::IntegrityOrPasswordError)
}

pub(crate) fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| PfxError::EncodingError(format!("invalid cipher key or IV: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_bytes_latin1() {
        assert_eq!(Password::new("test").as_bytes(), b"test".to_vec());
        assert_eq!(Password::new("caf\u{e9}").as_bytes(), vec![b'c', b'a', b'f', 0xe9]);
    }

    #[test]
    fn test_password_bytes_utf8_beyond_latin1() {
        assert_eq!(
            Password::new("\u{20ac}1").as_bytes(),
            "\u{20ac}1".as_bytes().to_vec()
        );
    }

    #[test]
    fn test_password_bmp() {
        assert_eq!(Password::new("").to_bmp(), vec![0x00, 0x00]);
        assert_eq!(Password::new("A").to_bmp(), vec![0x00, 0x41, 0x00, 0x00]);
        assert_eq!(
            Password::new("ab").to_bmp(),
            vec![0x00, 0x61, 0x00, 0x62, 0x00, 0x00]
        );
    }

    #[test]
    fn test_password_debug_is_redacted() {
        assert_eq!(format!("{:?}", Password::new("secret")), "Password(..)");
    }
}
