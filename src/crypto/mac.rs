//! The PKCS#12 password integrity MAC: HMAC keyed by the PKCS#12 KDF (ID 3).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use super::Password;
use super::kdf::{self, KdfPurpose};
use crate::error::{PfxError, Result};
use crate::oid::HashAlgorithm;

/// Computes the MAC of `content` (the authenticated safe bytes).
pub fn compute_mac(
    content: &[u8],
    password: &Password,
    hash: HashAlgorithm,
    iterations: u32,
    salt: &[u8],
) -> Result<Vec<u8>> {
    let key = mac_key(password, hash, iterations, salt)?;
    match hash {
        HashAlgorithm::Sha1 => tag::<Hmac<Sha1>>(&key, content),
        HashAlgorithm::Sha256 => tag::<Hmac<Sha256>>(&key, content),
        HashAlgorithm::Sha384 => tag::<Hmac<Sha384>>(&key, content),
        HashAlgorithm::Sha512 => tag::<Hmac<Sha512>>(&key, content),
        HashAlgorithm::Unknown(oid) => Err(unsupported(oid)),
    }
}

/// Recomputes the MAC and compares it with `expected` in constant time.
pub fn verify_mac(
    content: &[u8],
    password: &Password,
    hash: HashAlgorithm,
    iterations: u32,
    salt: &[u8],
    expected: &[u8],
) -> Result<bool> {
    let key = mac_key(password, hash, iterations, salt)?;
    match hash {
        HashAlgorithm::Sha1 => check::<Hmac<Sha1>>(&key, content, expected),
        HashAlgorithm::Sha256 => check::<Hmac<Sha256>>(&key, content, expected),
        HashAlgorithm::Sha384 => check::<Hmac<Sha384>>(&key, content, expected),
        HashAlgorithm::Sha512 => check::<Hmac<Sha512>>(&key, content, expected),
        HashAlgorithm::Unknown(oid) => Err(unsupported(oid)),
    }
}

fn mac_key(password: &Password, hash: HashAlgorithm, iterations: u32, salt: &[u8]) -> Result<Vec<u8>> {
    let len = hash
        .output_len()
        .ok_or_else(|| unsupported(hash.oid()))?;
    kdf::derive(hash, KdfPurpose::Mac, &password.to_bmp(), salt, iterations, len)
}

fn keyed<M: Mac + KeyInit>(key: &[u8], content: &[u8]) -> Result<M> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| PfxError::InvalidInput(format!("HMAC key: {e}")))?;
    mac.update(content);
    Ok(mac)
}

fn tag<M: Mac + KeyInit>(key: &[u8], content: &[u8]) -> Result<Vec<u8>> {
    Ok(keyed::<M>(key, content)?.finalize().into_bytes().to_vec())
}

fn check<M: Mac + KeyInit>(key: &[u8], content: &[u8], expected: &[u8]) -> Result<bool> {
    Ok(keyed::<M>(key, content)?.verify_slice(expected).is_ok())
}

fn unsupported(oid: const_oid::ObjectIdentifier) -> PfxError {
    PfxError::UnsupportedAlgorithm(format!("MAC digest {oid}"))
}
