//! The PKCS#12 PBE schemes: SHA-1 PKCS#12 key derivation with Triple-DES or RC2.
//!
//! These are what `openssl pkcs12 -legacy` and most Windows exports still
//! produce: RC2-40 for the certificates, Triple-DES for the key.

use des::{TdesEde2, TdesEde3};
use rc2::Rc2;

use super::kdf::{self, KdfPurpose};
use super::{CryptoProvider, Password, PbeEngine, cbc_decrypt, cbc_encrypt};
use crate::config::{EncryptionParams, EncryptionScheme};
use crate::error::{PfxError, Result};
use crate::oid::{HashAlgorithm, LegacyScheme, PbeAlgorithm};

const SALT_LEN: usize = 8;

/// The PKCS#12 PBE engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyEngine;

impl LegacyEngine {
    fn key_and_iv(
        scheme: LegacyScheme,
        password: &Password,
        salt: &[u8],
        iterations: u32,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let bmp = password.to_bmp();
        let key = kdf::derive(
            HashAlgorithm::Sha1,
            KdfPurpose::Key,
            &bmp,
            salt,
            iterations,
            scheme.key_len(),
        )?;
        let iv = kdf::derive(
            HashAlgorithm::Sha1,
            KdfPurpose::Iv,
            &bmp,
            salt,
            iterations,
            scheme.iv_len(),
        )?;
        Ok((key, iv))
    }
}

impl PbeEngine for LegacyEngine {
    fn decrypt(
        &self,
        algorithm: &PbeAlgorithm,
        ciphertext: &[u8],
        password: &Password,
    ) -> Result<Vec<u8>> {
        let PbeAlgorithm::Pkcs12Pbe {
            scheme,
            salt,
            iterations,
        } = algorithm
        else {
            return Err(PfxError::UnsupportedAlgorithm(format!(
                "{algorithm} is not a PKCS#12 PBE scheme"
            )));
        };

        let (key, iv) = Self::key_and_iv(*scheme, password, salt, *iterations)?;
        match scheme {
            LegacyScheme::Sha1And3KeyTripleDesCbc => cbc_decrypt::<TdesEde3>(&key, &iv, ciphertext),
            LegacyScheme::Sha1And2KeyTripleDesCbc => cbc_decrypt::<TdesEde2>(&key, &iv, ciphertext),
            LegacyScheme::Sha1And128BitRc2Cbc | LegacyScheme::Sha1And40BitRc2Cbc => {
                cbc_decrypt::<Rc2>(&key, &iv, ciphertext)
            }
        }
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        password: &Password,
        params: &EncryptionParams,
        provider: &dyn CryptoProvider,
    ) -> Result<(Vec<u8>, PbeAlgorithm)> {
        let EncryptionScheme::Pkcs12Pbe(scheme) = params.scheme else {
            return Err(PfxError::UnsupportedAlgorithm(format!(
                "{:?} is not a PKCS#12 PBE scheme",
                params.scheme
            )));
        };

        let salt = provider.random_bytes(SALT_LEN)?;
        let (key, iv) = Self::key_and_iv(scheme, password, &salt, params.iterations)?;
        let ciphertext = match scheme {
            LegacyScheme::Sha1And3KeyTripleDesCbc => cbc_encrypt::<TdesEde3>(&key, &iv, plaintext)?,
            LegacyScheme::Sha1And2KeyTripleDesCbc => cbc_encrypt::<TdesEde2>(&key, &iv, plaintext)?,
            LegacyScheme::Sha1And128BitRc2Cbc | LegacyScheme::Sha1And40BitRc2Cbc => {
                cbc_encrypt::<Rc2>(&key, &iv, plaintext)?
            }
        };

        Ok((
            ciphertext,
            PbeAlgorithm::Pkcs12Pbe {
                scheme,
                salt,
                iterations: params.iterations,
            },
        ))
    }
}
