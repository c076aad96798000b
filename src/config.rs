//! Options for building archives.
//!
//! ```
//! use pfxkit::config::{BuildOptions, EncryptionParams};
//! use pfxkit::oid::{HashAlgorithm, LegacyScheme};
//!
//! // Key and MAC parameters `openssl pkcs12 -export -legacy` uses.
//! let options = BuildOptions::builder()
//!     .key_encryption(EncryptionParams::legacy(LegacyScheme::Sha1And3KeyTripleDesCbc))
//!     .mac_hash(HashAlgorithm::Sha1)
//!     .mac_iterations(2048)
//!     .build();
//! assert!(options.key_encryption.scheme.is_legacy());
//! ```

use bon::Builder;

use crate::oid::{AesKeySize, HashAlgorithm, LegacyScheme, Prf};

/// Iteration count used for every default.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Iteration count OpenSSL uses for the legacy schemes.
pub const LEGACY_ITERATIONS: u32 = 2048;

/// Cipher family and parameters used to encrypt a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionScheme {
    /// PBES2: PBKDF2 with `prf`, then AES-CBC.
    Pbes2 { cipher: AesKeySize, prf: Prf },
    /// A PKCS#12 PBE scheme (Triple-DES or RC2).
    Pkcs12Pbe(LegacyScheme),
}

impl EncryptionScheme {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Pkcs12Pbe(_))
    }
}

impl Default for EncryptionScheme {
    /// AES-256-CBC keyed by PBKDF2-HMAC-SHA256.
    fn default() -> Self {
        Self::Pbes2 {
            cipher: AesKeySize::Aes256,
            prf: Prf::HmacSha256,
        }
    }
}

/// Encryption scheme plus key derivation iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct EncryptionParams {
    #[builder(default)]
    pub scheme: EncryptionScheme,
    #[builder(default = DEFAULT_ITERATIONS)]
    pub iterations: u32,
}

impl EncryptionParams {
    /// A PKCS#12 PBE scheme with OpenSSL's legacy iteration count.
    pub fn legacy(scheme: LegacyScheme) -> Self {
        Self {
            scheme: EncryptionScheme::Pkcs12Pbe(scheme),
            iterations: LEGACY_ITERATIONS,
        }
    }
}

impl Default for EncryptionParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters for [`crate::codec::build_with`].
///
/// # Fields
/// * `key_encryption` - Encryption of the shrouded key bag. Certificates are
///   stored unencrypted next to it.
/// * `friendly_name` - Friendly name attribute for the key bag and the leaf
///   certificate bag.
/// * `mac_hash`, `mac_iterations`, `mac_salt_length` - Integrity MAC parameters.
#[derive(Debug, Clone, Builder)]
pub struct BuildOptions {
    #[builder(default)]
    pub key_encryption: EncryptionParams,
    #[builder(into)]
    pub friendly_name: Option<String>,
    #[builder(default = HashAlgorithm::Sha256)]
    pub mac_hash: HashAlgorithm,
    #[builder(default = DEFAULT_ITERATIONS)]
    pub mac_iterations: u32,
    #[builder(default = 32)]
    pub mac_salt_length: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
