//! DER encoder.

use super::{Asn1Node, Asn1Value, Tag, TagClass};

/// Encodes a node tree as DER.
///
/// Lengths are definite and minimal, SET children are sorted by their
/// encodings, and constructed OCTET STRINGs are flattened to a single
/// primitive string.
pub fn encode(node: &Asn1Node) -> Vec<u8> {
    let mut out = Vec::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Asn1Node, out: &mut Vec<u8>) {
    match &node.value {
        Asn1Value::Primitive(content) => {
            write_tag(node.tag, false, out);
            write_length(content.len(), out);
            out.extend_from_slice(content);
        }
        Asn1Value::Constructed(_) if node.is(Tag::OCTET_STRING) => {
            let content = node.octets();
            write_tag(node.tag, false, out);
            write_length(content.len(), out);
            out.extend_from_slice(&content);
        }
        Asn1Value::Constructed(children) => {
            let mut encoded: Vec<Vec<u8>> = children.iter().map(encode).collect();
            if node.is(Tag::SET) {
                encoded.sort();
            }
            let length = encoded.iter().map(Vec::len).sum();
            write_tag(node.tag, true, out);
            write_length(length, out);
            for child in encoded {
                out.extend_from_slice(&child);
            }
        }
    }
}

fn write_tag(tag: Tag, constructed: bool, out: &mut Vec<u8>) {
    let class_bits = match tag.class {
        TagClass::Universal => 0x00,
        TagClass::Application => 0x40,
        TagClass::ContextSpecific => 0x80,
        TagClass::Private => 0xc0,
    };
    let constructed_bit = if constructed { 0x20 } else { 0x00 };

    if tag.number < 0x1f {
        out.push(class_bits | constructed_bit | tag.number as u8);
        return;
    }

    out.push(class_bits | constructed_bit | 0x1f);
    let mut groups = Vec::new();
    let mut number = tag.number;
    while number > 0 {
        groups.push((number & 0x7f) as u8);
        number >>= 7;
    }
    for (i, group) in groups.iter().enumerate().rev() {
        let more = if i > 0 { 0x80 } else { 0x00 };
        out.push(group | more);
    }
}

fn write_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    out.push(0x80 | (bytes.len() - first) as u8);
    out.extend_from_slice(&bytes[first..]);
}
