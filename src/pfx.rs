//! The outer PFX envelope, MacData and the AuthenticatedSafe.
//!
//! ```text
//! PFX ::= SEQUENCE {
//!     version     INTEGER {v3(3)}(v3,...),
//!     authSafe    ContentInfo,
//!     macData     MacData OPTIONAL
//! }
//!
//! MacData ::= SEQUENCE {
//!     mac         DigestInfo,
//!     macSalt     OCTET STRING,
//!     iterations  INTEGER DEFAULT 1
//! }
//!
//! AuthenticatedSafe ::= SEQUENCE OF ContentInfo
//! ```

use crate::asn1::{self, Asn1Node, Tag};
use crate::error::{PfxError, Result};
use crate::oid::{self, HashAlgorithm, PbeAlgorithm};

const PFX_VERSION: u32 = 3;
const ENCRYPTED_DATA_VERSION: u32 = 0;

/// A decoded PFX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pfx {
    /// Contents of the `data` authSafe: the DER or BER AuthenticatedSafe.
    /// The MAC is computed over exactly these bytes.
    pub auth_safe: Vec<u8>,
    pub mac_data: Option<MacData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacData {
    pub hash: HashAlgorithm,
    pub digest: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl Pfx {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let root = asn1::decode(bytes)?;
        let mut fields = root.fields("PFX")?;

        let version = fields.next(Tag::INTEGER)?.as_u32()?;
        if version != PFX_VERSION {
            return Err(PfxError::malformed(format!(
                "unsupported PFX version {version}"
            )));
        }

        let auth_safe = match ContentInfo::from_node(fields.next(Tag::SEQUENCE)?)? {
            ContentInfo::Data(content) => content,
            ContentInfo::EncryptedData { .. } => {
                return Err(PfxError::malformed(
                    "authSafe must be a data content info (public key integrity mode is not supported)",
                ));
            }
        };

        let mac_data = fields
            .optional(Tag::SEQUENCE)
            .map(MacData::from_node)
            .transpose()?;

        Ok(Self {
            auth_safe,
            mac_data,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut fields = vec![
            Asn1Node::integer_u32(PFX_VERSION),
            ContentInfo::data_node(self.auth_safe.clone()),
        ];
        if let Some(mac_data) = &self.mac_data {
            fields.push(mac_data.to_node());
        }
        asn1::encode(&Asn1Node::sequence(fields))
    }
}

impl MacData {
    fn from_node(node: &Asn1Node) -> Result<Self> {
        let mut fields = node.fields("MacData")?;
        let mut digest_info = fields.next(Tag::SEQUENCE)?.fields("DigestInfo")?;
        let hash = HashAlgorithm::from_node(digest_info.next(Tag::SEQUENCE)?)?;
        let digest = digest_info.next(Tag::OCTET_STRING)?.as_octet_string()?;
        let salt = fields.next(Tag::OCTET_STRING)?.as_octet_string()?;
        let iterations = fields
            .optional(Tag::INTEGER)
            .map(Asn1Node::as_u32)
            .transpose()?
            .unwrap_or(1);
        Ok(Self {
            hash,
            digest,
            salt,
            iterations,
        })
    }

    fn to_node(&self) -> Asn1Node {
        let mut fields = vec![
            Asn1Node::sequence(vec![
                self.hash.to_node(),
                Asn1Node::octet_string(self.digest.clone()),
            ]),
            Asn1Node::octet_string(self.salt.clone()),
        ];
        if self.iterations != 1 {
            fields.push(Asn1Node::integer_u32(self.iterations));
        }
        Asn1Node::sequence(fields)
    }
}

/// One element of the AuthenticatedSafe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentInfo {
    /// Plain `data`: DER or BER SafeContents.
    Data(Vec<u8>),
    /// `encryptedData`: SafeContents encrypted under a password.
    EncryptedData {
        algorithm: PbeAlgorithm,
        ciphertext: Vec<u8>,
    },
}

impl ContentInfo {
    fn from_node(node: &Asn1Node) -> Result<Self> {
        let mut fields = node.fields("ContentInfo")?;
        let content_type = fields.next(Tag::OID)?.as_oid()?;
        let content = fields
            .next(Tag::context(0, true))
            .map_err(|_| PfxError::malformed(format!("content info {content_type} has no content")))?
            .explicit_inner()?;

        match content_type {
            oid::DATA => Ok(Self::Data(content.as_octet_string()?)),
            oid::ENCRYPTED_DATA => {
                let mut encrypted_data = content.fields("EncryptedData")?;
                let _version = encrypted_data.next(Tag::INTEGER)?.as_u32()?;
                let mut info = encrypted_data
                    .next(Tag::SEQUENCE)?
                    .fields("EncryptedContentInfo")?;
                let _content_type = info.next(Tag::OID)?.as_oid()?;
                let algorithm = PbeAlgorithm::from_node(info.next(Tag::SEQUENCE)?)?;
                let ciphertext = info
                    .optional(Tag::context(0, false))
                    .ok_or_else(|| PfxError::malformed("encrypted data has no encrypted content"))?
                    .octets();
                Ok(Self::EncryptedData {
                    algorithm,
                    ciphertext,
                })
            }
            oid::ENVELOPED_DATA => Err(PfxError::UnsupportedAlgorithm(
                "public key encrypted (envelopedData) content".to_string(),
            )),
            other => Err(PfxError::UnsupportedAlgorithm(format!(
                "content type {other}"
            ))),
        }
    }

    fn data_node(content: Vec<u8>) -> Asn1Node {
        Asn1Node::sequence(vec![
            Asn1Node::oid(&oid::DATA),
            Asn1Node::explicit(0, Asn1Node::octet_string(content)),
        ])
    }

    fn to_node(&self) -> Result<Asn1Node> {
        match self {
            Self::Data(content) => Ok(Self::data_node(content.clone())),
            Self::EncryptedData {
                algorithm,
                ciphertext,
            } => Ok(Asn1Node::sequence(vec![
                Asn1Node::oid(&oid::ENCRYPTED_DATA),
                Asn1Node::explicit(
                    0,
                    Asn1Node::sequence(vec![
                        Asn1Node::integer_u32(ENCRYPTED_DATA_VERSION),
                        Asn1Node::sequence(vec![
                            Asn1Node::oid(&oid::DATA),
                            algorithm.to_node()?,
                            Asn1Node::implicit(0, Asn1Node::octet_string(ciphertext.clone())),
                        ]),
                    ]),
                ),
            ])),
        }
    }
}

pub fn parse_authenticated_safe(bytes: &[u8]) -> Result<Vec<ContentInfo>> {
    let node = asn1::decode(bytes)?;
    node.expect(Tag::SEQUENCE, "AuthenticatedSafe")?
        .children()?
        .iter()
        .map(ContentInfo::from_node)
        .collect()
}

pub fn encode_authenticated_safe(contents: &[ContentInfo]) -> Result<Vec<u8>> {
    let nodes = contents
        .iter()
        .map(ContentInfo::to_node)
        .collect::<Result<Vec<_>>>()?;
    Ok(asn1::encode(&Asn1Node::sequence(nodes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::LegacyScheme;

    #[test]
    fn test_pfx_round_trip() {
        let pfx = Pfx {
            auth_safe: vec![0x30, 0x00],
            mac_data: Some(MacData {
                hash: HashAlgorithm::Sha256,
                digest: vec![7; 32],
                salt: vec![1; 32],
                iterations: 10_000,
            }),
        };
        assert_eq!(Pfx::decode(&pfx.encode()).unwrap(), pfx);
    }

    #[test]
    fn test_mac_iterations_default_to_one() {
        let pfx = Pfx {
            auth_safe: vec![0x30, 0x00],
            mac_data: Some(MacData {
                hash: HashAlgorithm::Sha1,
                digest: vec![7; 20],
                salt: vec![1; 8],
                iterations: 1,
            }),
        };
        let der = pfx.encode();
        // DEFAULT 1 is omitted: mac SEQUENCE, salt OCTET STRING, nothing after.
        assert_eq!(&der[der.len() - 10..der.len() - 8], &[0x04, 0x08]);
        assert_eq!(Pfx::decode(&der).unwrap().mac_data.unwrap().iterations, 1);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let der = asn1::encode(&Asn1Node::sequence(vec![
            Asn1Node::integer_u32(2),
            ContentInfo::data_node(vec![0x30, 0x00]),
        ]));
        assert!(matches!(
            Pfx::decode(&der),
            Err(PfxError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_authenticated_safe_round_trip() {
        let contents = vec![
            ContentInfo::EncryptedData {
                algorithm: PbeAlgorithm::Pkcs12Pbe {
                    scheme: LegacyScheme::Sha1And40BitRc2Cbc,
                    salt: vec![5; 8],
                    iterations: 2048,
                },
                ciphertext: vec![0xee; 64],
            },
            ContentInfo::Data(vec![0x30, 0x00]),
        ];
        let der = encode_authenticated_safe(&contents).unwrap();
        assert_eq!(parse_authenticated_safe(&der).unwrap(), contents);
    }

    #[test]
    fn test_enveloped_data_unsupported() {
        let der = asn1::encode(&Asn1Node::sequence(vec![Asn1Node::sequence(vec![
            Asn1Node::oid(&oid::ENVELOPED_DATA),
            Asn1Node::explicit(0, Asn1Node::sequence(vec![])),
        ])]));
        assert!(
            parse_authenticated_safe(&der)
                .unwrap_err()
                .is_unsupported_algorithm()
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            Pfx::decode(b"not a pkcs12 file"),
            Err(PfxError::MalformedEncoding(_))
        ));
    }
}
