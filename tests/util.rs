#![allow(dead_code)]

use std::str::FromStr;

use der::Encode;
use der::asn1::{BitString, OctetString, UtcTime};
use p256::ecdsa::{Signature, SigningKey, signature::Signer};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pfxkit::cert::Certificate;
use pfxkit::cert::extensions::{
    AuthorityKeyIdentifier, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use pfxkit::crypto::CryptoProvider;
use pfxkit::error::Result;
use pfxkit::key::PrivateKey;
use sha1::{Digest, Sha1};
use time::OffsetDateTime;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

pub const PASSWORD: &str = "test";

/// A certificate with the P-256 key it was issued for.
pub struct Issued {
    pub cert: Certificate,
    pub secret: p256::SecretKey,
}

impl Issued {
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::EcdsaP256(self.secret.clone())
    }
}

/// SHA-1 of the public key point, as `subjectKeyIdentifier=hash` computes it.
pub fn key_id(secret: &p256::SecretKey) -> Vec<u8> {
    let point = secret.public_key().to_encoded_point(false);
    Sha1::digest(point.as_bytes()).to_vec()
}

/// Issues a certificate for `subject_key` signed by `signing_key`.
pub fn certificate(
    subject: &str,
    issuer: &str,
    subject_key: &p256::SecretKey,
    signing_key: &p256::SecretKey,
    ski: Option<&[u8]>,
    aki: Option<&[u8]>,
) -> Certificate {
    let mut extensions = Vec::new();
    if let Some(ski) = ski {
        extensions.push(Extension {
            extn_id: SubjectKeyIdentifier::OID,
            critical: false,
            extn_value: OctetString::new(
                SubjectKeyIdentifier(ski.to_vec())
                    .to_x509_extension_value()
                    .unwrap(),
            )
            .unwrap(),
        });
    }
    if let Some(aki) = aki {
        let value = AuthorityKeyIdentifier {
            key_identifier: Some(aki.to_vec()),
            authority_cert_serial_number: None,
        };
        extensions.push(Extension {
            extn_id: AuthorityKeyIdentifier::OID,
            critical: false,
            extn_value: OctetString::new(value.to_x509_extension_value().unwrap()).unwrap(),
        });
    }

    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before + time::Duration::days(365);
    let signature_algorithm = AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    };

    // Positive and minimally encoded.
    let mut serial = vec![0x01];
    serial.extend_from_slice(&key_id(subject_key)[..8]);

    let tbs_certificate = x509_cert::TbsCertificate {
        version: x509_cert::Version::V3,
        serial_number: SerialNumber::new(&serial).unwrap(),
        signature: signature_algorithm.clone(),
        issuer: Name::from_str(issuer).unwrap(),
        validity: Validity {
            not_before: Time::UtcTime(UtcTime::from_system_time(not_before.into()).unwrap()),
            not_after: Time::UtcTime(UtcTime::from_system_time(not_after.into()).unwrap()),
        },
        subject: Name::from_str(subject).unwrap(),
        subject_public_key_info: SubjectPublicKeyInfoOwned::from_key(subject_key.public_key())
            .unwrap(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: if extensions.is_empty() {
            None
        } else {
            Some(extensions)
        },
    };

    let tbs_der = tbs_certificate.to_der().unwrap();
    let signature: Signature = SigningKey::from(signing_key).sign(&tbs_der);
    let cert = x509_cert::Certificate {
        tbs_certificate,
        signature_algorithm,
        signature: BitString::from_bytes(signature.to_der().as_bytes()).unwrap(),
    };

    Certificate::from_der(&cert.to_der().unwrap()).unwrap()
}

/// Issues a certificate for a fresh key. Without `issuer` it is self-signed.
/// With `key_ids` the certificate carries SKI and AKI extensions.
pub fn issue(subject: &str, issuer: Option<&Issued>, key_ids: bool) -> Issued {
    let secret = p256::SecretKey::random(&mut rand_core::OsRng);
    let (issuer_name, signing_key) = match issuer {
        Some(issuer) => (issuer.cert.subject(), &issuer.secret),
        None => (subject.to_string(), &secret),
    };
    let ski = key_id(&secret);
    let aki = key_id(signing_key);
    let cert = certificate(
        subject,
        &issuer_name,
        &secret,
        signing_key,
        key_ids.then_some(ski.as_slice()),
        key_ids.then_some(aki.as_slice()),
    );
    Issued { cert, secret }
}

/// Leaf, intermediate and root, in that order.
pub fn three_level_chain(key_ids: bool) -> Vec<Issued> {
    let root = issue("CN=Test Root CA,O=pfxkit tests,C=CH", None, key_ids);
    let intermediate = issue(
        "CN=Test Intermediate CA,O=pfxkit tests,C=CH",
        Some(&root),
        key_ids,
    );
    let leaf = issue(
        "CN=leaf.example.test,O=pfxkit tests,C=CH",
        Some(&intermediate),
        key_ids,
    );
    vec![leaf, intermediate, root]
}

pub fn certificates(issued: &[Issued]) -> Vec<Certificate> {
    issued.iter().map(|i| i.cert.clone()).collect()
}

/// Fills every request with the same byte.
pub struct FixedRandom(pub u8);

impl CryptoProvider for FixedRandom {
    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        buf.fill(self.0);
        Ok(())
    }
}

/// Common name of a certificate's subject.
pub fn common_name(cert: &Certificate) -> String {
    cert.subject()
        .split(',')
        .find_map(|rdn| rdn.trim().strip_prefix("CN="))
        .unwrap_or_default()
        .to_string()
}
