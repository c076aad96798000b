use der::{Decode, Encode, asn1::OctetString, oid::ObjectIdentifier};

use crate::error::PfxError;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use pfxkit::cert::extensions::{SubjectKeyIdentifier, ToAndFromX509Extension};
/// let ski = SubjectKeyIdentifier(vec![1, 2, 3, 4]);
/// let encoded = ski.to_x509_extension_value().unwrap();
/// let decoded = SubjectKeyIdentifier::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(ski, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, PfxError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, PfxError>
    where
        Self: Sized;
}

/// Represents the Subject Key Identifier (SKI) extension.
///
/// Identifies the public key of the certificate. Chain reconstruction matches
/// it against the Authority Key Identifier of the certificates it issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = const_oid::db::rfc5280::ID_CE_SUBJECT_KEY_IDENTIFIER;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, PfxError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, PfxError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// This extension identifies the public key corresponding to the private key used to sign the certificate.
///
/// # Fields
/// * `key_identifier` - The key identifier.
/// * `authority_cert_serial_number` - The issuer's certificate serial number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Option<Vec<u8>>,
    pub authority_cert_serial_number: Option<Vec<u8>>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = const_oid::db::rfc5280::ID_CE_AUTHORITY_KEY_IDENTIFIER;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, PfxError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: self
                .key_identifier
                .as_deref()
                .map(OctetString::new)
                .transpose()?,
            authority_cert_issuer: None,
            authority_cert_serial_number: self
                .authority_cert_serial_number
                .as_deref()
                .map(x509_cert::serial_number::SerialNumber::new)
                .transpose()?,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, PfxError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;

        Ok(Self {
            key_identifier: aki.key_identifier.map(|id| id.as_bytes().to_vec()),
            authority_cert_serial_number: aki
                .authority_cert_serial_number
                .map(|sn| sn.as_bytes().to_vec()),
        })
    }
}
