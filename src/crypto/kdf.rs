//! The PKCS#12 key derivation function (RFC 7292 Appendix B.2).
//!
//! Used for the legacy PBE schemes and for every PKCS#12 MAC key, whatever
//! encryption the archive uses.

use sha1::Sha1;
use sha2::digest::{Digest, FixedOutputReset};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{PfxError, Result};
use crate::oid::HashAlgorithm;

/// The diversifier `ID` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KdfPurpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// Derives `len` bytes from a BMP encoded password.
pub fn derive(
    hash: HashAlgorithm,
    purpose: KdfPurpose,
    password_bmp: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Result<Vec<u8>> {
    if iterations == 0 {
        return Err(PfxError::malformed("iteration count must be positive"));
    }
    let id = purpose as u8;
    match hash {
        HashAlgorithm::Sha1 => Ok(derive_with::<Sha1>(id, 64, password_bmp, salt, iterations, len)),
        HashAlgorithm::Sha256 => Ok(derive_with::<Sha256>(
            id, 64, password_bmp, salt, iterations, len,
        )),
        HashAlgorithm::Sha384 => Ok(derive_with::<Sha384>(
            id, 128, password_bmp, salt, iterations, len,
        )),
        HashAlgorithm::Sha512 => Ok(derive_with::<Sha512>(
            id, 128, password_bmp, salt, iterations, len,
        )),
        HashAlgorithm::Unknown(oid) => Err(PfxError::UnsupportedAlgorithm(format!(
            "PKCS#12 key derivation with digest {oid}"
        ))),
    }
}

/// `v` is the digest block size in bytes.
fn derive_with<D>(id: u8, v: usize, password: &[u8], salt: &[u8], iterations: u32, len: usize) -> Vec<u8>
where
    D: Digest + FixedOutputReset,
{
    let diversifier = vec![id; v];

    let mut input = fill_to_block_multiple(salt, v);
    input.extend(fill_to_block_multiple(password, v));

    let mut hasher = D::new();
    let mut out = Vec::with_capacity(len + <D as Digest>::output_size());
    while out.len() < len {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &input);
        let mut digest = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &digest);
            digest = hasher.finalize_reset();
        }
        out.extend_from_slice(&digest);

        if out.len() < len {
            let b: Vec<u8> = digest.iter().copied().cycle().take(v).collect();
            for block in input.chunks_mut(v) {
                add_with_carry(block, &b);
            }
        }
    }
    out.truncate(len);
    out
}

/// Repeats `data` up to the next multiple of `v` bytes. Empty input stays empty.
fn fill_to_block_multiple(data: &[u8], v: usize) -> Vec<u8> {
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(8v)`.
fn add_with_carry(block: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = u16::from(*x) + u16::from(*y) + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}
