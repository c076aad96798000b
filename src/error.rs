//! use pfxkit::error::PfxError;

use thiserror::Error;

/// Represents errors that can occur while parsing or building PKCS#12 archives.
///
/// `MalformedEncoding`, `UnsupportedAlgorithm` and `IntegrityOrPasswordError` are the
/// codec's own taxonomy; the remaining variants come from the certificate and key
/// toolkit around it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PfxError {
    /// The ASN.1 structure is invalid, truncated, or not the expected PKCS#12 shape.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The archive names an algorithm the current decryption path does not implement.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Decryption produced content that fails its padding or structure check.
    ///
    /// A wrong password cannot be told apart from corrupted content.
    #[error("Integrity check failed: wrong password or corrupted content")]
    IntegrityOrPasswordError,

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error related to private key import or export.
    #[error("Key error: {0}")]
    KeyError(String),

    /// The random source failed.
    #[error("Random source failure: {0}")]
    Random(String),
}

impl PfxError {
    /// Returns `true` for [`PfxError::UnsupportedAlgorithm`].
    pub fn is_unsupported_algorithm(&self) -> bool {
        matches!(self, PfxError::UnsupportedAlgorithm(_))
    }

    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        PfxError::MalformedEncoding(what.into())
    }
}

impl From<der::Error> for PfxError {
    /// Converts a `der::Error` into a `PfxError`.
    fn from(err: der::Error) -> Self {
        PfxError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for PfxError {
    fn from(err: pkcs8::Error) -> Self {
        PfxError::KeyError(err.to_string())
    }
}

impl From<pem::PemError> for PfxError {
    fn from(err: pem::PemError) -> Self {
        PfxError::DecodingError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PfxError>;
