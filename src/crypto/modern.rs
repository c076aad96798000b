//! PBES2: PBKDF2 key derivation with AES-CBC.

use aes::{Aes128, Aes192, Aes256};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use super::{CryptoProvider, Password, PbeEngine, cbc_decrypt, cbc_encrypt};
use crate::config::{EncryptionParams, EncryptionScheme};
use crate::error::{PfxError, Result};
use crate::oid::{AesKeySize, Pbes2Params, Pbkdf2Params, PbeAlgorithm, Prf};

const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;

/// The PBES2 engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernEngine;

impl PbeEngine for ModernEngine {
    fn decrypt(
        &self,
        algorithm: &PbeAlgorithm,
        ciphertext: &[u8],
        password: &Password,
    ) -> Result<Vec<u8>> {
        let PbeAlgorithm::Pbes2(params) = algorithm else {
            return Err(PfxError::UnsupportedAlgorithm(format!(
                "{algorithm} is not a PBES2 scheme"
            )));
        };
        if let Some(expected) = params.kdf.key_length {
            if expected as usize != params.cipher.key_len() {
                return Err(PfxError::malformed(format!(
                    "PBKDF2 key length {expected} does not match AES-{}",
                    params.cipher.key_len() * 8
                )));
            }
        }

        let key = derive_key(&params.kdf, params.cipher, password)?;
        match params.cipher {
            AesKeySize::Aes128 => cbc_decrypt::<Aes128>(&key, &params.iv, ciphertext),
            AesKeySize::Aes192 => cbc_decrypt::<Aes192>(&key, &params.iv, ciphertext),
            AesKeySize::Aes256 => cbc_decrypt::<Aes256>(&key, &params.iv, ciphertext),
        }
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        password: &Password,
        params: &EncryptionParams,
        provider: &dyn CryptoProvider,
    ) -> Result<(Vec<u8>, PbeAlgorithm)> {
        let EncryptionScheme::Pbes2 { cipher, prf } = params.scheme else {
            return Err(PfxError::UnsupportedAlgorithm(format!(
                "{:?} is not a PBES2 scheme",
                params.scheme
            )));
        };

        let pbes2 = Pbes2Params {
            kdf: Pbkdf2Params {
                salt: provider.random_bytes(SALT_LEN)?,
                iterations: params.iterations,
                key_length: None,
                prf,
            },
            cipher,
            iv: provider.random_bytes(IV_LEN)?,
        };

        let key = derive_key(&pbes2.kdf, cipher, password)?;
        let ciphertext = match cipher {
            AesKeySize::Aes128 => cbc_encrypt::<Aes128>(&key, &pbes2.iv, plaintext)?,
            AesKeySize::Aes192 => cbc_encrypt::<Aes192>(&key, &pbes2.iv, plaintext)?,
            AesKeySize::Aes256 => cbc_encrypt::<Aes256>(&key, &pbes2.iv, plaintext)?,
        };
        Ok((ciphertext, PbeAlgorithm::Pbes2(pbes2)))
    }
}

fn derive_key(kdf: &Pbkdf2Params, cipher: AesKeySize, password: &Password) -> Result<Vec<u8>> {
    if kdf.iterations == 0 {
        return Err(PfxError::malformed("PBKDF2 iteration count must be positive"));
    }
    let password = password.as_bytes();
    let mut key = vec![0u8; cipher.key_len()];
    match kdf.prf {
        Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<Sha1>(&password, &kdf.salt, kdf.iterations, &mut key),
        Prf::HmacSha224 => {
            pbkdf2::pbkdf2_hmac::<Sha224>(&password, &kdf.salt, kdf.iterations, &mut key)
        }
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(&password, &kdf.salt, kdf.iterations, &mut key)
        }
        Prf::HmacSha384 => {
            pbkdf2::pbkdf2_hmac::<Sha384>(&password, &kdf.salt, kdf.iterations, &mut key)
        }
        Prf::HmacSha512 => {
            pbkdf2::pbkdf2_hmac::<Sha512>(&password, &kdf.salt, kdf.iterations, &mut key)
        }
        Prf::Unknown(oid) => {
            return Err(PfxError::UnsupportedAlgorithm(format!("PBKDF2 PRF {oid}")));
        }
    }
    Ok(key)
}
