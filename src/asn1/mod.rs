//! A small ASN.1 tree codec.
//!
//! PKCS#12 files in the wild are BER (indefinite lengths, constructed OCTET
//! STRINGs) and nest opaque encrypted payloads several layers deep, so the
//! container is decoded into a generic tree of [`Asn1Node`]s instead of fixed
//! `der` structs. [`decode`] accepts BER; [`encode`] always produces DER.
//!
//! ```
//! use pfxkit::asn1::{self, Asn1Node};
//!
//! let node = Asn1Node::sequence(vec![Asn1Node::integer_u32(3), Asn1Node::null()]);
//! let der = asn1::encode(&node);
//! assert_eq!(der, [0x30, 0x05, 0x02, 0x01, 0x03, 0x05, 0x00]);
//! assert_eq!(asn1::decode(&der).unwrap(), node);
//! ```

mod decoder;
mod encoder;

pub use decoder::decode;
pub use encoder::encode;

use const_oid::ObjectIdentifier;

use crate::error::{PfxError, Result};

/// Tag class (the two high bits of the identifier octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// An ASN.1 identifier: class, primitive/constructed flag and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const END_OF_CONTENTS: Tag = Tag::universal(0, false);
    pub const BOOLEAN: Tag = Tag::universal(1, false);
    pub const INTEGER: Tag = Tag::universal(2, false);
    pub const BIT_STRING: Tag = Tag::universal(3, false);
    pub const OCTET_STRING: Tag = Tag::universal(4, false);
    pub const NULL: Tag = Tag::universal(5, false);
    pub const OID: Tag = Tag::universal(6, false);
    pub const UTF8_STRING: Tag = Tag::universal(12, false);
    pub const SEQUENCE: Tag = Tag::universal(16, true);
    pub const SET: Tag = Tag::universal(17, true);
    pub const PRINTABLE_STRING: Tag = Tag::universal(19, false);
    pub const IA5_STRING: Tag = Tag::universal(22, false);
    pub const BMP_STRING: Tag = Tag::universal(30, false);

    pub const fn universal(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Universal,
            constructed,
            number,
        }
    }

    /// A context-specific tag `[number]`.
    pub const fn context(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            constructed,
            number,
        }
    }

    /// Same class and number. The constructed bit is ignored since BER allows
    /// either form for string types.
    pub fn matches(&self, other: Tag) -> bool {
        self.class == other.class && self.number == other.number
    }

    fn with_constructed(self, constructed: bool) -> Self {
        Self {
            constructed,
            ..self
        }
    }
}

/// Contents of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asn1Value {
    Primitive(Vec<u8>),
    Constructed(Vec<Asn1Node>),
}

/// One tag-length-value element and, for constructed encodings, its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Node {
    pub tag: Tag,
    pub value: Asn1Value,
}

impl Asn1Node {
    pub fn primitive(tag: Tag, content: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.with_constructed(false),
            value: Asn1Value::Primitive(content.into()),
        }
    }

    pub fn constructed(tag: Tag, children: Vec<Asn1Node>) -> Self {
        Self {
            tag: tag.with_constructed(true),
            value: Asn1Value::Constructed(children),
        }
    }

    pub fn sequence(children: Vec<Asn1Node>) -> Self {
        Self::constructed(Tag::SEQUENCE, children)
    }

    /// A SET. Children are sorted by their encodings when encoded.
    pub fn set(children: Vec<Asn1Node>) -> Self {
        Self::constructed(Tag::SET, children)
    }

    pub fn octet_string(content: impl Into<Vec<u8>>) -> Self {
        Self::primitive(Tag::OCTET_STRING, content)
    }

    pub fn integer_u32(value: u32) -> Self {
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(3);
        let mut content = Vec::with_capacity(5);
        if bytes[first] & 0x80 != 0 {
            content.push(0);
        }
        content.extend_from_slice(&bytes[first..]);
        Self::primitive(Tag::INTEGER, content)
    }

    pub fn oid(oid: &ObjectIdentifier) -> Self {
        Self::primitive(Tag::OID, oid.as_bytes())
    }

    pub fn null() -> Self {
        Self::primitive(Tag::NULL, Vec::new())
    }

    pub fn bit_string(unused_bits: u8, bits: &[u8]) -> Self {
        let mut content = Vec::with_capacity(bits.len() + 1);
        content.push(unused_bits);
        content.extend_from_slice(bits);
        Self::primitive(Tag::BIT_STRING, content)
    }

    /// A BMPString (UTF-16BE, no terminator).
    pub fn bmp_string(value: &str) -> Self {
        let content: Vec<u8> = value.encode_utf16().flat_map(u16::to_be_bytes).collect();
        Self::primitive(Tag::BMP_STRING, content)
    }

    pub fn utf8_string(value: &str) -> Self {
        Self::primitive(Tag::UTF8_STRING, value.as_bytes())
    }

    /// `[number] EXPLICIT inner`.
    pub fn explicit(number: u32, inner: Asn1Node) -> Self {
        Self::constructed(Tag::context(number, true), vec![inner])
    }

    /// `[number] IMPLICIT inner`: the inner tag is replaced, its contents kept.
    pub fn implicit(number: u32, inner: Asn1Node) -> Self {
        let constructed = matches!(inner.value, Asn1Value::Constructed(_));
        Self {
            tag: Tag::context(number, constructed),
            value: inner.value,
        }
    }

    pub fn is(&self, tag: Tag) -> bool {
        self.tag.matches(tag)
    }

    /// Fails unless the node carries `tag` (class and number).
    pub fn expect(&self, tag: Tag, what: &str) -> Result<&Self> {
        if self.is(tag) {
            Ok(self)
        } else {
            Err(PfxError::malformed(format!(
                "{what}: expected {:?} [{}], found {:?} [{}]",
                tag.class, tag.number, self.tag.class, self.tag.number
            )))
        }
    }

    pub fn children(&self) -> Result<&[Asn1Node]> {
        match &self.value {
            Asn1Value::Constructed(children) => Ok(children),
            Asn1Value::Primitive(_) => Err(PfxError::malformed(format!(
                "expected a constructed encoding for tag [{}]",
                self.tag.number
            ))),
        }
    }

    pub fn content(&self) -> Result<&[u8]> {
        match &self.value {
            Asn1Value::Primitive(content) => Ok(content),
            Asn1Value::Constructed(_) => Err(PfxError::malformed(format!(
                "expected a primitive encoding for tag [{}]",
                self.tag.number
            ))),
        }
    }

    /// Reads the children of a SEQUENCE in order.
    pub fn fields<'a>(&'a self, what: &'static str) -> Result<Fields<'a>> {
        self.expect(Tag::SEQUENCE, what)?;
        Ok(Fields {
            nodes: self.children()?,
            pos: 0,
            what,
        })
    }

    /// The only child of an explicitly tagged node.
    pub fn explicit_inner(&self) -> Result<&Asn1Node> {
        match self.children()? {
            [inner] => Ok(inner),
            _ => Err(PfxError::malformed(format!(
                "explicit tag [{}] must wrap exactly one element",
                self.tag.number
            ))),
        }
    }

    pub fn as_oid(&self) -> Result<ObjectIdentifier> {
        self.expect(Tag::OID, "object identifier")?;
        ObjectIdentifier::from_bytes(self.content()?)
            .map_err(|e| PfxError::malformed(format!("invalid object identifier: {e}")))
    }

    /// A non-negative INTEGER that fits in 32 bits.
    pub fn as_u32(&self) -> Result<u32> {
        self.expect(Tag::INTEGER, "integer")?;
        let content = self.content()?;
        match content.first() {
            None => return Err(PfxError::malformed("empty integer")),
            Some(b) if b & 0x80 != 0 => return Err(PfxError::malformed("negative integer")),
            Some(_) => {}
        }
        let start = content.iter().position(|b| *b != 0).unwrap_or(content.len());
        let digits = &content[start..];
        if digits.len() > 4 {
            return Err(PfxError::malformed("integer out of range"));
        }
        Ok(digits.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }

    /// An OCTET STRING, primitive or constructed from segments.
    pub fn as_octet_string(&self) -> Result<Vec<u8>> {
        self.expect(Tag::OCTET_STRING, "octet string")?;
        Ok(self.octets())
    }

    /// Concatenated primitive contents of this node and its descendants.
    ///
    /// Used for constructed OCTET STRINGs and for implicitly tagged strings,
    /// where only the tag tells what the bytes are.
    pub fn octets(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.collect_octets(&mut out);
        out
    }

    fn collect_octets(&self, out: &mut Vec<u8>) {
        match &self.value {
            Asn1Value::Primitive(content) => out.extend_from_slice(content),
            Asn1Value::Constructed(children) => {
                for child in children {
                    child.collect_octets(out);
                }
            }
        }
    }

    /// A BMPString, UTF8String, PrintableString or IA5String as text.
    pub fn as_string(&self) -> Result<String> {
        let content = self.octets();
        if self.is(Tag::BMP_STRING) {
            if content.len() % 2 != 0 {
                return Err(PfxError::malformed("odd length BMPString"));
            }
            let units: Vec<u16> = content
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| PfxError::malformed("invalid BMPString"))
        } else if self.is(Tag::UTF8_STRING)
            || self.is(Tag::PRINTABLE_STRING)
            || self.is(Tag::IA5_STRING)
        {
            String::from_utf8(content).map_err(|_| PfxError::malformed("invalid string encoding"))
        } else {
            Err(PfxError::malformed(format!(
                "tag [{}] is not a supported string type",
                self.tag.number
            )))
        }
    }
}

/// Sequential reader over the fields of a SEQUENCE.
pub struct Fields<'a> {
    nodes: &'a [Asn1Node],
    pos: usize,
    what: &'static str,
}

impl<'a> Fields<'a> {
    pub fn next_any(&mut self) -> Result<&'a Asn1Node> {
        let node = self
            .nodes
            .get(self.pos)
            .ok_or_else(|| PfxError::malformed(format!("{}: missing field", self.what)))?;
        self.pos += 1;
        Ok(node)
    }

    pub fn next(&mut self, tag: Tag) -> Result<&'a Asn1Node> {
        let what = self.what;
        self.next_any()?.expect(tag, what)
    }

    /// Consumes the next field only if it carries `tag`.
    pub fn optional(&mut self, tag: Tag) -> Option<&'a Asn1Node> {
        let node = self.nodes.get(self.pos).filter(|node| node.is(tag))?;
        self.pos += 1;
        Some(node)
    }

    pub fn remaining(&self) -> &'a [Asn1Node] {
        &self.nodes[self.pos.min(self.nodes.len())..]
    }
}
