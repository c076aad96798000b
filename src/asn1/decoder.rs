//! BER decoder.

use super::{Asn1Node, Asn1Value, Tag, TagClass};
use crate::error::{PfxError, Result};

/// Nesting limit for constructed encodings.
const MAX_DEPTH: usize = 64;

/// Decodes exactly one BER element from `bytes`.
///
/// Definite and indefinite lengths are accepted. Trailing bytes after the
/// element, truncated input and lengths longer than four bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<Asn1Node> {
    let mut reader = Reader::new(bytes);
    let node = reader.read_node(0)?;
    if !reader.is_empty() {
        return Err(PfxError::malformed(format!(
            "{} trailing bytes after top-level element",
            reader.data.len() - reader.pos
        )));
    }
    Ok(node)
}

enum Length {
    Definite(usize),
    Indefinite,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| PfxError::malformed("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let first = self.read_byte()?;
        let class = match first >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let constructed = first & 0x20 != 0;
        let mut number = u32::from(first & 0x1f);
        if number == 0x1f {
            number = 0;
            loop {
                let byte = self.read_byte()?;
                number = number
                    .checked_mul(128)
                    .ok_or_else(|| PfxError::malformed("tag number overflow"))?
                    | u32::from(byte & 0x7f);
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }
        Ok(Tag {
            class,
            constructed,
            number,
        })
    }

    fn read_length(&mut self) -> Result<Length> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(Length::Definite(usize::from(first)));
        }
        if first == 0x80 {
            return Ok(Length::Indefinite);
        }
        let count = usize::from(first & 0x7f);
        if count > 4 {
            return Err(PfxError::malformed("length field longer than 4 bytes"));
        }
        let mut length = 0usize;
        for _ in 0..count {
            length = (length << 8) | usize::from(self.read_byte()?);
        }
        Ok(Length::Definite(length))
    }

    fn at_end_of_contents(&self) -> bool {
        self.data[self.pos..].starts_with(&[0, 0])
    }

    fn read_node(&mut self, depth: usize) -> Result<Asn1Node> {
        if depth > MAX_DEPTH {
            return Err(PfxError::malformed("nesting too deep"));
        }
        let tag = self.read_tag()?;
        if tag == Tag::END_OF_CONTENTS {
            return Err(PfxError::malformed("unexpected end-of-contents marker"));
        }

        match self.read_length()? {
            Length::Definite(length) => {
                let end = self
                    .pos
                    .checked_add(length)
                    .filter(|end| *end <= self.data.len())
                    .ok_or_else(|| {
                        PfxError::malformed(format!(
                            "element length {length} exceeds available input"
                        ))
                    })?;
                let content = &self.data[self.pos..end];
                self.pos = end;

                let value = if tag.constructed {
                    let mut inner = Reader::new(content);
                    let mut children = Vec::new();
                    while !inner.is_empty() {
                        children.push(inner.read_node(depth + 1)?);
                    }
                    Asn1Value::Constructed(children)
                } else {
                    Asn1Value::Primitive(content.to_vec())
                };
                Ok(Asn1Node { tag, value })
            }
            Length::Indefinite => {
                if !tag.constructed {
                    return Err(PfxError::malformed(
                        "indefinite length on a primitive encoding",
                    ));
                }
                let mut children = Vec::new();
                loop {
                    if self.is_empty() {
                        return Err(PfxError::malformed("missing end-of-contents marker"));
                    }
                    if self.at_end_of_contents() {
                        self.pos += 2;
                        break;
                    }
                    children.push(self.read_node(depth + 1)?);
                }
                Ok(Asn1Node {
                    tag,
                    value: Asn1Value::Constructed(children),
                })
            }
        }
    }
}
