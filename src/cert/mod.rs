pub mod extensions;

use der::Decode;
use extensions::{AuthorityKeyIdentifier, SubjectKeyIdentifier, ToAndFromX509Extension};
use x509_cert::certificate::CertificateInner;

use crate::error::{PfxError, Result};
use crate::pem_utils;

/// Represents an X.509 certificate.
///
/// The DER bytes the certificate was decoded from are kept alongside the parsed
/// form, so writing a certificate back into an archive reproduces it exactly.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| PfxError::CertificateError(e.to_string()))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_utils::pem_to_der(pem, pem_utils::CERTIFICATE_LABEL)?;
        Self::from_der(&der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Vec<u8> {
        self.der.clone()
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> String {
        pem_utils::der_to_pem(&self.der, pem_utils::CERTIFICATE_LABEL)
    }

    /// Subject distinguished name in RFC 4514 string form.
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name in RFC 4514 string form.
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// The `keyIdentifier` field of the Authority Key Identifier extension.
    ///
    /// An AKI carrying only issuer name and serial number yields `None`.
    pub fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .extension::<AuthorityKeyIdentifier>()?
            .and_then(|aki| aki.key_identifier))
    }

    /// Finds and decodes the extension `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}
