//! Object identifiers used by PKCS#12 and the algorithm identifiers built from them.
//!
//! Algorithm identifiers are resolved into enums once, when the container is
//! decoded. Identifiers this crate does not know are kept as `Unknown` variants
//! carrying the raw OID so errors can name them.

use std::fmt;

use const_oid::ObjectIdentifier;
use const_oid::db::{rfc5911, rfc5912, rfc6268, rfc8410};

use crate::asn1::{Asn1Node, Tag};
use crate::error::{PfxError, Result};

// PKCS#7 content types
pub const DATA: ObjectIdentifier = rfc5911::ID_DATA;
pub const ENVELOPED_DATA: ObjectIdentifier = rfc5911::ID_ENVELOPED_DATA;
pub const ENCRYPTED_DATA: ObjectIdentifier = rfc5911::ID_ENCRYPTED_DATA;

// PKCS#12 bag types
pub const KEY_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.1");
pub const PKCS8_SHROUDED_KEY_BAG: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.2");
pub const CERT_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.3");
pub const CRL_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.4");
pub const SECRET_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.5");
pub const SAFE_CONTENTS_BAG: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.6");

pub const X509_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.22.1");

// PKCS#9 attributes
pub const FRIENDLY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.20");
pub const LOCAL_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.21");

// PKCS#5
pub const PBES2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");
pub const PBKDF2: ObjectIdentifier = rfc5911::ID_PBKDF_2;

pub const HMAC_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.7");
pub const HMAC_WITH_SHA224: ObjectIdentifier = rfc6268::ID_HMAC_WITH_SHA_224;
pub const HMAC_WITH_SHA256: ObjectIdentifier = rfc6268::ID_HMAC_WITH_SHA_256;
pub const HMAC_WITH_SHA384: ObjectIdentifier = rfc6268::ID_HMAC_WITH_SHA_384;
pub const HMAC_WITH_SHA512: ObjectIdentifier = rfc6268::ID_HMAC_WITH_SHA_512;

pub const AES_128_CBC: ObjectIdentifier = rfc5911::ID_AES_128_CBC;
pub const AES_192_CBC: ObjectIdentifier = rfc5911::ID_AES_192_CBC;
pub const AES_256_CBC: ObjectIdentifier = rfc5911::ID_AES_256_CBC;

// PKCS#12 password based encryption (RFC 7292 Appendix C)
pub const PBE_SHA1_RC4_128: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.1");
pub const PBE_SHA1_RC4_40: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.2");
pub const PBE_SHA1_3DES_3KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");
pub const PBE_SHA1_3DES_2KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.4");
pub const PBE_SHA1_RC2_128: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.5");
pub const PBE_SHA1_RC2_40: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.6");

// Digests
pub const SHA1: ObjectIdentifier = rfc5912::ID_SHA_1;
pub const SHA256: ObjectIdentifier = rfc5912::ID_SHA_256;
pub const SHA384: ObjectIdentifier = rfc5912::ID_SHA_384;
pub const SHA512: ObjectIdentifier = rfc5912::ID_SHA_512;

// Private key algorithms
pub const RSA_ENCRYPTION: ObjectIdentifier = rfc5912::RSA_ENCRYPTION;
pub const EC_PUBLIC_KEY: ObjectIdentifier = rfc5912::ID_EC_PUBLIC_KEY;
pub const SECP256R1: ObjectIdentifier = rfc5912::SECP_256_R_1;
pub const SECP384R1: ObjectIdentifier = rfc5912::SECP_384_R_1;
pub const SECP521R1: ObjectIdentifier = rfc5912::SECP_521_R_1;
pub const ED25519: ObjectIdentifier = rfc8410::ID_ED_25519;

/// Digest algorithm of a PKCS#12 MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Unknown(ObjectIdentifier),
}

impl HashAlgorithm {
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        match oid {
            SHA1 => Self::Sha1,
            SHA256 => Self::Sha256,
            SHA384 => Self::Sha384,
            SHA512 => Self::Sha512,
            other => Self::Unknown(other),
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha1 => SHA1,
            Self::Sha256 => SHA256,
            Self::Sha384 => SHA384,
            Self::Sha512 => SHA512,
            Self::Unknown(oid) => *oid,
        }
    }

    /// Digest length in bytes, `None` for unknown digests.
    pub fn output_len(&self) -> Option<usize> {
        match self {
            Self::Sha1 => Some(20),
            Self::Sha256 => Some(32),
            Self::Sha384 => Some(48),
            Self::Sha512 => Some(64),
            Self::Unknown(_) => None,
        }
    }

    /// Parses a digest `AlgorithmIdentifier`.
    pub fn from_node(node: &Asn1Node) -> Result<Self> {
        let mut fields = node.fields("digest algorithm")?;
        Ok(Self::from_oid(fields.next(Tag::OID)?.as_oid()?))
    }

    pub fn to_node(&self) -> Asn1Node {
        Asn1Node::sequence(vec![Asn1Node::oid(&self.oid()), Asn1Node::null()])
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => f.write_str("SHA-1"),
            Self::Sha256 => f.write_str("SHA-256"),
            Self::Sha384 => f.write_str("SHA-384"),
            Self::Sha512 => f.write_str("SHA-512"),
            Self::Unknown(oid) => write!(f, "unknown digest {oid}"),
        }
    }
}

/// PBKDF2 pseudo random function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prf {
    #[default]
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
    Unknown(ObjectIdentifier),
}

impl Prf {
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        match oid {
            HMAC_WITH_SHA1 => Self::HmacSha1,
            HMAC_WITH_SHA224 => Self::HmacSha224,
            HMAC_WITH_SHA256 => Self::HmacSha256,
            HMAC_WITH_SHA384 => Self::HmacSha384,
            HMAC_WITH_SHA512 => Self::HmacSha512,
            other => Self::Unknown(other),
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::HmacSha1 => HMAC_WITH_SHA1,
            Self::HmacSha224 => HMAC_WITH_SHA224,
            Self::HmacSha256 => HMAC_WITH_SHA256,
            Self::HmacSha384 => HMAC_WITH_SHA384,
            Self::HmacSha512 => HMAC_WITH_SHA512,
            Self::Unknown(oid) => *oid,
        }
    }
}

/// AES key size of a PBES2 `aes*-CBC` encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AesKeySize {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl AesKeySize {
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Aes128 => AES_128_CBC,
            Self::Aes192 => AES_192_CBC,
            Self::Aes256 => AES_256_CBC,
        }
    }

    fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            AES_128_CBC => Some(Self::Aes128),
            AES_192_CBC => Some(Self::Aes192),
            AES_256_CBC => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// One of the PKCS#12 PBE schemes from RFC 7292 Appendix C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyScheme {
    Sha1And3KeyTripleDesCbc,
    Sha1And2KeyTripleDesCbc,
    Sha1And128BitRc2Cbc,
    Sha1And40BitRc2Cbc,
}

impl LegacyScheme {
    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            PBE_SHA1_3DES_3KEY => Some(Self::Sha1And3KeyTripleDesCbc),
            PBE_SHA1_3DES_2KEY => Some(Self::Sha1And2KeyTripleDesCbc),
            PBE_SHA1_RC2_128 => Some(Self::Sha1And128BitRc2Cbc),
            PBE_SHA1_RC2_40 => Some(Self::Sha1And40BitRc2Cbc),
            _ => None,
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha1And3KeyTripleDesCbc => PBE_SHA1_3DES_3KEY,
            Self::Sha1And2KeyTripleDesCbc => PBE_SHA1_3DES_2KEY,
            Self::Sha1And128BitRc2Cbc => PBE_SHA1_RC2_128,
            Self::Sha1And40BitRc2Cbc => PBE_SHA1_RC2_40,
        }
    }

    /// Derived key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Sha1And3KeyTripleDesCbc => 24,
            Self::Sha1And2KeyTripleDesCbc => 16,
            Self::Sha1And128BitRc2Cbc => 16,
            Self::Sha1And40BitRc2Cbc => 5,
        }
    }

    /// Both ciphers have 64-bit blocks.
    pub fn iv_len(&self) -> usize {
        8
    }
}

impl fmt::Display for LegacyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1And3KeyTripleDesCbc => "pbeWithSHAAnd3-KeyTripleDES-CBC",
            Self::Sha1And2KeyTripleDesCbc => "pbeWithSHAAnd2-KeyTripleDES-CBC",
            Self::Sha1And128BitRc2Cbc => "pbeWithSHAAnd128BitRC2-CBC",
            Self::Sha1And40BitRc2Cbc => "pbewithSHAAnd40BitRC2-CBC",
        })
    }
}

/// `PBKDF2-params` (RFC 8018 A.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub key_length: Option<u32>,
    pub prf: Prf,
}

/// `PBES2-params` restricted to PBKDF2 and AES-CBC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbes2Params {
    pub kdf: Pbkdf2Params,
    pub cipher: AesKeySize,
    pub iv: Vec<u8>,
}

/// A password based encryption `AlgorithmIdentifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbeAlgorithm {
    Pbes2(Pbes2Params),
    Pkcs12Pbe {
        scheme: LegacyScheme,
        salt: Vec<u8>,
        iterations: u32,
    },
    /// Anything else. For PBES2 with an unsupported key derivation function
    /// or cipher, the OID is the inner one.
    Unknown(ObjectIdentifier),
}

impl PbeAlgorithm {
    pub fn from_node(node: &Asn1Node) -> Result<Self> {
        let mut fields = node.fields("encryption algorithm")?;
        let oid = fields.next(Tag::OID)?.as_oid()?;

        if oid == PBES2 {
            return parse_pbes2(fields.next(Tag::SEQUENCE)?);
        }

        match LegacyScheme::from_oid(oid) {
            Some(scheme) => {
                let mut params = fields.next(Tag::SEQUENCE)?.fields("pkcs-12PbeParams")?;
                let salt = params.next(Tag::OCTET_STRING)?.as_octet_string()?;
                let iterations = params.next(Tag::INTEGER)?.as_u32()?;
                Ok(Self::Pkcs12Pbe {
                    scheme,
                    salt,
                    iterations,
                })
            }
            None => Ok(Self::Unknown(oid)),
        }
    }

    pub fn to_node(&self) -> Result<Asn1Node> {
        match self {
            Self::Pbes2(params) => {
                let kdf = &params.kdf;
                let mut kdf_fields = vec![
                    Asn1Node::octet_string(kdf.salt.clone()),
                    Asn1Node::integer_u32(kdf.iterations),
                ];
                if let Some(key_length) = kdf.key_length {
                    kdf_fields.push(Asn1Node::integer_u32(key_length));
                }
                match kdf.prf {
                    Prf::HmacSha1 => {}
                    Prf::Unknown(oid) => {
                        return Err(PfxError::UnsupportedAlgorithm(format!(
                            "cannot encode PBKDF2 with PRF {oid}"
                        )));
                    }
                    prf => kdf_fields.push(Asn1Node::sequence(vec![
                        Asn1Node::oid(&prf.oid()),
                        Asn1Node::null(),
                    ])),
                }

                Ok(Asn1Node::sequence(vec![
                    Asn1Node::oid(&PBES2),
                    Asn1Node::sequence(vec![
                        Asn1Node::sequence(vec![
                            Asn1Node::oid(&PBKDF2),
                            Asn1Node::sequence(kdf_fields),
                        ]),
                        Asn1Node::sequence(vec![
                            Asn1Node::oid(&params.cipher.oid()),
                            Asn1Node::octet_string(params.iv.clone()),
                        ]),
                    ]),
                ]))
            }
            Self::Pkcs12Pbe {
                scheme,
                salt,
                iterations,
            } => Ok(Asn1Node::sequence(vec![
                Asn1Node::oid(&scheme.oid()),
                Asn1Node::sequence(vec![
                    Asn1Node::octet_string(salt.clone()),
                    Asn1Node::integer_u32(*iterations),
                ]),
            ])),
            Self::Unknown(oid) => Err(PfxError::UnsupportedAlgorithm(format!(
                "cannot encode unknown algorithm {oid}"
            ))),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Pkcs12Pbe { .. })
    }
}

impl fmt::Display for PbeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbes2(params) => write!(
                f,
                "PBES2 (PBKDF2 {:?}, {} iterations, AES-{}-CBC)",
                params.kdf.prf,
                params.kdf.iterations,
                params.cipher.key_len() * 8
            ),
            Self::Pkcs12Pbe {
                scheme, iterations, ..
            } => write!(f, "{scheme} ({iterations} iterations)"),
            Self::Unknown(oid) => write!(f, "unknown algorithm {oid}"),
        }
    }
}

fn parse_pbes2(params: &Asn1Node) -> Result<PbeAlgorithm> {
    let mut fields = params.fields("PBES2-params")?;

    let mut kdf = fields.next(Tag::SEQUENCE)?.fields("keyDerivationFunc")?;
    let kdf_oid = kdf.next(Tag::OID)?.as_oid()?;
    if kdf_oid != PBKDF2 {
        return Ok(PbeAlgorithm::Unknown(kdf_oid));
    }
    let mut kdf_params = kdf.next(Tag::SEQUENCE)?.fields("PBKDF2-params")?;
    let salt_node = kdf_params.next_any()?;
    if !salt_node.is(Tag::OCTET_STRING) {
        // otherSource salts are reserved and never used in practice
        return Ok(PbeAlgorithm::Unknown(PBKDF2));
    }
    let salt = salt_node.as_octet_string()?;
    let iterations = kdf_params.next(Tag::INTEGER)?.as_u32()?;
    let key_length = kdf_params
        .optional(Tag::INTEGER)
        .map(Asn1Node::as_u32)
        .transpose()?;
    let prf = match kdf_params.optional(Tag::SEQUENCE) {
        Some(prf) => Prf::from_oid(prf.fields("prf")?.next(Tag::OID)?.as_oid()?),
        None => Prf::HmacSha1,
    };

    let mut scheme = fields.next(Tag::SEQUENCE)?.fields("encryptionScheme")?;
    let cipher_oid = scheme.next(Tag::OID)?.as_oid()?;
    let Some(cipher) = AesKeySize::from_oid(cipher_oid) else {
        return Ok(PbeAlgorithm::Unknown(cipher_oid));
    };
    let iv = scheme.next(Tag::OCTET_STRING)?.as_octet_string()?;

    Ok(PbeAlgorithm::Pbes2(Pbes2Params {
        kdf: Pbkdf2Params {
            salt,
            iterations,
            key_length,
            prf,
        },
        cipher,
        iv,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::{decode, encode};

    #[test]
    fn test_pbes2_node_round_trip() {
        let algorithm = PbeAlgorithm::Pbes2(Pbes2Params {
            kdf: Pbkdf2Params {
                salt: vec![1; 16],
                iterations: 10_000,
                key_length: None,
                prf: Prf::HmacSha256,
            },
            cipher: AesKeySize::Aes256,
            iv: vec![2; 16],
        });
        let der = encode(&algorithm.to_node().unwrap());
        let parsed = PbeAlgorithm::from_node(&decode(&der).unwrap()).unwrap();
        assert_eq!(parsed, algorithm);
    }

    #[test]
    fn test_pbes2_default_prf_is_sha1() {
        let algorithm = PbeAlgorithm::Pbes2(Pbes2Params {
            kdf: Pbkdf2Params {
                salt: vec![3; 8],
                iterations: 2048,
                key_length: Some(16),
                prf: Prf::HmacSha1,
            },
            cipher: AesKeySize::Aes128,
            iv: vec![4; 16],
        });
        let node = algorithm.to_node().unwrap();
        let der = encode(&node);
        assert!(
            !der.windows(HMAC_WITH_SHA1.as_bytes().len())
                .any(|w| w == HMAC_WITH_SHA1.as_bytes())
        );
        assert_eq!(PbeAlgorithm::from_node(&node).unwrap(), algorithm);
    }

    #[test]
    fn test_legacy_node_round_trip() {
        let algorithm = PbeAlgorithm::Pkcs12Pbe {
            scheme: LegacyScheme::Sha1And40BitRc2Cbc,
            salt: vec![9; 8],
            iterations: 2048,
        };
        let node = algorithm.to_node().unwrap();
        assert_eq!(PbeAlgorithm::from_node(&node).unwrap(), algorithm);
        assert!(algorithm.is_legacy());
    }

    #[test]
    fn test_unknown_algorithms() {
        let rc4 = Asn1Node::sequence(vec![
            Asn1Node::oid(&PBE_SHA1_RC4_128),
            Asn1Node::sequence(vec![
                Asn1Node::octet_string(vec![0; 8]),
                Asn1Node::integer_u32(1),
            ]),
        ]);
        assert_eq!(
            PbeAlgorithm::from_node(&rc4).unwrap(),
            PbeAlgorithm::Unknown(PBE_SHA1_RC4_128)
        );

        let des_cbc = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
        let pbes2_des = Asn1Node::sequence(vec![
            Asn1Node::oid(&PBES2),
            Asn1Node::sequence(vec![
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&PBKDF2),
                    Asn1Node::sequence(vec![
                        Asn1Node::octet_string(vec![0; 8]),
                        Asn1Node::integer_u32(2048),
                    ]),
                ]),
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&des_cbc),
                    Asn1Node::octet_string(vec![0; 8]),
                ]),
            ]),
        ]);
        assert_eq!(
            PbeAlgorithm::from_node(&pbes2_des).unwrap(),
            PbeAlgorithm::Unknown(des_cbc)
        );
        assert!(PbeAlgorithm::Unknown(des_cbc).to_node().is_err());
    }

    #[test]
    fn test_hash_algorithm_from_oid() {
        assert_eq!(HashAlgorithm::from_oid(SHA256), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::Sha1.output_len(), Some(20));
        let md5 = ObjectIdentifier::new_unwrap("1.2.840.113549.2.5");
        assert_eq!(HashAlgorithm::from_oid(md5), HashAlgorithm::Unknown(md5));
        assert_eq!(HashAlgorithm::Unknown(md5).output_len(), None);
    }

    #[test]
    fn test_registry_oids() {
        let expected = [
            (DATA, "1.2.840.113549.1.7.1"),
            (ENVELOPED_DATA, "1.2.840.113549.1.7.3"),
            (ENCRYPTED_DATA, "1.2.840.113549.1.7.6"),
            (PBKDF2, "1.2.840.113549.1.5.12"),
            (HMAC_WITH_SHA256, "1.2.840.113549.2.9"),
            (SHA1, "1.3.14.3.2.26"),
            (SHA384, "2.16.840.1.101.3.4.2.2"),
            (SHA512, "2.16.840.1.101.3.4.2.3"),
            (EC_PUBLIC_KEY, "1.2.840.10045.2.1"),
            (SECP256R1, "1.2.840.10045.3.1.7"),
            (SECP384R1, "1.3.132.0.34"),
            (SECP521R1, "1.3.132.0.35"),
        ];
        for (oid, dotted) in expected {
            assert_eq!(oid.to_string(), dotted);
        }
    }
}
