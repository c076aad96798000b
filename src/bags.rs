//! SafeBags and SafeContents (RFC 7292 section 4.2).
//!
//! ```text
//! SafeBag ::= SEQUENCE {
//!     bagId          BAG-TYPE.&id ({PKCS12BagSet}),
//!     bagValue       [0] EXPLICIT BAG-TYPE.&Type({PKCS12BagSet}{@bagId}),
//!     bagAttributes  SET OF PKCS12Attribute OPTIONAL
//! }
//! ```

use const_oid::ObjectIdentifier;
use log::debug;

use crate::asn1::{self, Asn1Node, Tag};
use crate::error::Result;
use crate::oid::{self, PbeAlgorithm};

/// The two attributes used to link a key to its certificate.
///
/// They are never used for trust decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagAttributes {
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

impl BagAttributes {
    fn from_node(node: &Asn1Node) -> Result<Self> {
        let mut attributes = Self::default();
        for attribute in node.children()? {
            let mut fields = attribute.fields("PKCS12Attribute")?;
            let attr_id = fields.next(Tag::OID)?.as_oid()?;
            let values = fields.next(Tag::SET)?.children()?;
            let Some(first) = values.first() else {
                continue;
            };
            match attr_id {
                oid::FRIENDLY_NAME => attributes.friendly_name = Some(first.as_string()?),
                oid::LOCAL_KEY_ID => attributes.local_key_id = Some(first.as_octet_string()?),
                other => debug!("skipping bag attribute {other}"),
            }
        }
        Ok(attributes)
    }

    fn to_node(&self) -> Option<Asn1Node> {
        let mut attributes = Vec::new();
        if let Some(name) = &self.friendly_name {
            attributes.push(Asn1Node::sequence(vec![
                Asn1Node::oid(&oid::FRIENDLY_NAME),
                Asn1Node::set(vec![Asn1Node::bmp_string(name)]),
            ]));
        }
        if let Some(id) = &self.local_key_id {
            attributes.push(Asn1Node::sequence(vec![
                Asn1Node::oid(&oid::LOCAL_KEY_ID),
                Asn1Node::set(vec![Asn1Node::octet_string(id.clone())]),
            ]));
        }
        if attributes.is_empty() {
            None
        } else {
            Some(Asn1Node::set(attributes))
        }
    }
}

/// Bag payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeBagKind {
    /// `pkcs8ShroudedKeyBag`: an `EncryptedPrivateKeyInfo`.
    ShroudedKey {
        algorithm: PbeAlgorithm,
        ciphertext: Vec<u8>,
    },
    /// `keyBag`: a plain PKCS#8 `PrivateKeyInfo`, DER.
    Key { pkcs8: Vec<u8> },
    /// `certBag` holding a DER X.509 certificate.
    Certificate { der: Vec<u8> },
    /// CRL bags, secret bags, and certificate bags of other certificate types.
    Other {
        bag_id: ObjectIdentifier,
        value: Asn1Node,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeBag {
    pub kind: SafeBagKind,
    pub attributes: BagAttributes,
}

impl SafeBag {
    pub fn certificate(der: Vec<u8>, attributes: BagAttributes) -> Self {
        Self {
            kind: SafeBagKind::Certificate { der },
            attributes,
        }
    }

    pub fn shrouded_key(
        algorithm: PbeAlgorithm,
        ciphertext: Vec<u8>,
        attributes: BagAttributes,
    ) -> Self {
        Self {
            kind: SafeBagKind::ShroudedKey {
                algorithm,
                ciphertext,
            },
            attributes,
        }
    }

    /// DER of the X.509 certificate in a certificate bag.
    pub fn certificate_der(&self) -> Option<&[u8]> {
        match &self.kind {
            SafeBagKind::Certificate { der } => Some(der),
            _ => None,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(
            self.kind,
            SafeBagKind::ShroudedKey { .. } | SafeBagKind::Key { .. }
        )
    }

    /// Parses one bag. Nested `safeContentsBag`s are flattened into `out`.
    fn parse_into(node: &Asn1Node, out: &mut Vec<SafeBag>) -> Result<()> {
        let mut fields = node.fields("SafeBag")?;
        let bag_id = fields.next(Tag::OID)?.as_oid()?;
        let value = fields.next(Tag::context(0, true))?.explicit_inner()?;
        let attributes = match fields.optional(Tag::SET) {
            Some(set) => BagAttributes::from_node(set)?,
            None => BagAttributes::default(),
        };

        let kind = match bag_id {
            oid::PKCS8_SHROUDED_KEY_BAG => {
                let mut info = value.fields("EncryptedPrivateKeyInfo")?;
                let algorithm = PbeAlgorithm::from_node(info.next(Tag::SEQUENCE)?)?;
                let ciphertext = info.next(Tag::OCTET_STRING)?.as_octet_string()?;
                SafeBagKind::ShroudedKey {
                    algorithm,
                    ciphertext,
                }
            }
            oid::KEY_BAG => SafeBagKind::Key {
                pkcs8: asn1::encode(value.expect(Tag::SEQUENCE, "PrivateKeyInfo")?),
            },
            oid::CERT_BAG => {
                let mut cert_bag = value.fields("CertBag")?;
                let cert_id = cert_bag.next(Tag::OID)?.as_oid()?;
                if cert_id == oid::X509_CERTIFICATE {
                    let cert_value = cert_bag.next(Tag::context(0, true))?.explicit_inner()?;
                    SafeBagKind::Certificate {
                        der: cert_value.as_octet_string()?,
                    }
                } else {
                    debug!("keeping certificate bag of type {cert_id} as opaque");
                    SafeBagKind::Other {
                        bag_id,
                        value: value.clone(),
                    }
                }
            }
            oid::SAFE_CONTENTS_BAG => {
                for nested in value.expect(Tag::SEQUENCE, "SafeContents")?.children()? {
                    Self::parse_into(nested, out)?;
                }
                return Ok(());
            }
            other => SafeBagKind::Other {
                bag_id: other,
                value: value.clone(),
            },
        };

        out.push(SafeBag { kind, attributes });
        Ok(())
    }

    pub fn to_node(&self) -> Result<Asn1Node> {
        let (bag_id, value) = match &self.kind {
            SafeBagKind::ShroudedKey {
                algorithm,
                ciphertext,
            } => (
                oid::PKCS8_SHROUDED_KEY_BAG,
                Asn1Node::sequence(vec![
                    algorithm.to_node()?,
                    Asn1Node::octet_string(ciphertext.clone()),
                ]),
            ),
            SafeBagKind::Key { pkcs8 } => (oid::KEY_BAG, asn1::decode(pkcs8)?),
            SafeBagKind::Certificate { der } => (
                oid::CERT_BAG,
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&oid::X509_CERTIFICATE),
                    Asn1Node::explicit(0, Asn1Node::octet_string(der.clone())),
                ]),
            ),
            SafeBagKind::Other { bag_id, value } => (*bag_id, value.clone()),
        };

        let mut fields = vec![Asn1Node::oid(&bag_id), Asn1Node::explicit(0, value)];
        fields.extend(self.attributes.to_node());
        Ok(Asn1Node::sequence(fields))
    }
}

/// Parses DER or BER `SafeContents` into a flat list of bags.
pub fn parse_safe_contents(bytes: &[u8]) -> Result<Vec<SafeBag>> {
    let node = asn1::decode(bytes)?;
    let mut bags = Vec::new();
    for bag in node.expect(Tag::SEQUENCE, "SafeContents")?.children()? {
        SafeBag::parse_into(bag, &mut bags)?;
    }
    Ok(bags)
}

pub fn encode_safe_contents(bags: &[SafeBag]) -> Result<Vec<u8>> {
    let nodes = bags
        .iter()
        .map(SafeBag::to_node)
        .collect::<Result<Vec<_>>>()?;
    Ok(asn1::encode(&Asn1Node::sequence(nodes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PfxError;
    use crate::oid::LegacyScheme;

    fn sample_bags() -> Vec<SafeBag> {
        vec![
            SafeBag::shrouded_key(
                PbeAlgorithm::Pkcs12Pbe {
                    scheme: LegacyScheme::Sha1And3KeyTripleDesCbc,
                    salt: vec![1; 8],
                    iterations: 2048,
                },
                vec![0xaa; 32],
                BagAttributes {
                    friendly_name: Some("server".to_string()),
                    local_key_id: Some(vec![1, 2, 3, 4]),
                },
            ),
            SafeBag::certificate(
                vec![0x30, 0x03, 0x02, 0x01, 0x01],
                BagAttributes {
                    friendly_name: None,
                    local_key_id: Some(vec![1, 2, 3, 4]),
                },
            ),
            SafeBag::certificate(vec![0x30, 0x00], BagAttributes::default()),
        ]
    }

    #[test]
    fn test_safe_contents_round_trip() {
        let bags = sample_bags();
        let der = encode_safe_contents(&bags).unwrap();
        assert_eq!(parse_safe_contents(&der).unwrap(), bags);
    }

    #[test]
    fn test_nested_safe_contents_flattened() {
        let bags = sample_bags();
        let inner: Vec<Asn1Node> = bags.iter().map(|b| b.to_node().unwrap()).collect();
        let nested = Asn1Node::sequence(vec![
            Asn1Node::oid(&oid::SAFE_CONTENTS_BAG),
            Asn1Node::explicit(0, Asn1Node::sequence(inner)),
        ]);
        let der = asn1::encode(&Asn1Node::sequence(vec![nested]));
        assert_eq!(parse_safe_contents(&der).unwrap(), bags);
    }

    #[test]
    fn test_utf8_friendly_name_and_unknown_attribute() {
        let bag = Asn1Node::sequence(vec![
            Asn1Node::oid(&oid::CERT_BAG),
            Asn1Node::explicit(
                0,
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&oid::X509_CERTIFICATE),
                    Asn1Node::explicit(0, Asn1Node::octet_string(vec![0x30, 0x00])),
                ]),
            ),
            Asn1Node::set(vec![
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&oid::FRIENDLY_NAME),
                    Asn1Node::set(vec![Asn1Node::utf8_string("utf8 name")]),
                ]),
                Asn1Node::sequence(vec![
                    Asn1Node::oid(&ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.17.1")),
                    Asn1Node::set(vec![Asn1Node::bmp_string("Microsoft CSP")]),
                ]),
            ]),
        ]);
        let der = asn1::encode(&Asn1Node::sequence(vec![bag]));
        let bags = parse_safe_contents(&der).unwrap();
        assert_eq!(bags.len(), 1);
        assert_eq!(
            bags[0].attributes.friendly_name.as_deref(),
            Some("utf8 name")
        );
        assert!(bags[0].attributes.local_key_id.is_none());
    }

    #[test]
    fn test_crl_bag_kept_as_other() {
        let bag = Asn1Node::sequence(vec![
            Asn1Node::oid(&oid::CRL_BAG),
            Asn1Node::explicit(0, Asn1Node::sequence(vec![])),
        ]);
        let der = asn1::encode(&Asn1Node::sequence(vec![bag]));
        let bags = parse_safe_contents(&der).unwrap();
        assert!(matches!(
            bags[0].kind,
            SafeBagKind::Other { bag_id, .. } if bag_id == oid::CRL_BAG
        ));
        assert!(!bags[0].is_key());
        assert!(bags[0].certificate_der().is_none());
    }

    #[test]
    fn test_missing_bag_value_is_malformed() {
        let bag = Asn1Node::sequence(vec![Asn1Node::oid(&oid::CERT_BAG)]);
        let der = asn1::encode(&Asn1Node::sequence(vec![bag]));
        assert!(matches!(
            parse_safe_contents(&der),
            Err(PfxError::MalformedEncoding(_))
        ));
    }
}
