//! Reconstructs the issuer chain of a certificate from an unordered pool.
//!
//! Issuers are found through the Authority/Subject Key Identifier extensions.
//! Certificates without an Authority Key Identifier fall back to comparing
//! issuer and subject names. No signatures are checked: the result is an
//! ordering of the archive's certificates, not a validated path.

use std::collections::HashSet;

use log::{debug, warn};

use crate::cert::Certificate;
use crate::error::Result;

/// Walks from `leaf` towards the root through `pool`.
///
/// The returned chain starts with `leaf` and holds each certificate at most
/// once. The walk stops at a self-signed certificate, when no issuer is in the
/// pool, or when an issuer already in the chain comes up again.
pub fn build_chain(leaf: &Certificate, pool: &[Certificate]) -> Vec<Certificate> {
    let mut chain = vec![leaf.clone()];
    let mut visited: HashSet<&[u8]> = HashSet::from([leaf.as_der()]);
    let mut current = leaf;

    while let Some(issuer) = find_issuer(current, pool) {
        if !visited.insert(issuer.as_der()) {
            debug!("issuer {} already in chain, stopping", issuer.subject());
            break;
        }
        chain.push(issuer.clone());
        current = issuer;
    }

    chain
}

fn find_issuer<'a>(cert: &Certificate, pool: &'a [Certificate]) -> Option<&'a Certificate> {
    match key_id(cert, Certificate::authority_key_identifier) {
        Some(aki) => {
            // Self-signed when the SKI is missing or names the same key.
            match key_id(cert, Certificate::subject_key_identifier) {
                None => return None,
                Some(ski) if ski == aki => return None,
                Some(_) => {}
            }
            pool.iter().find(|candidate| {
                key_id(candidate, Certificate::subject_key_identifier).as_ref() == Some(&aki)
            })
        }
        None => {
            let issuer = cert.issuer();
            if name_equals(&cert.subject(), &issuer) {
                return None;
            }
            pool.iter()
                .find(|candidate| name_equals(&candidate.subject(), &issuer))
        }
    }
}

/// Reads a key identifier extension, treating an undecodable one as absent.
fn key_id(
    cert: &Certificate,
    read: fn(&Certificate) -> Result<Option<Vec<u8>>>,
) -> Option<Vec<u8>> {
    read(cert).unwrap_or_else(|err| {
        warn!("ignoring key identifier of {}: {err}", cert.subject());
        None
    })
}

/// Compares two distinguished names ignoring RDN order, case, and whitespace
/// around the separators.
pub fn name_equals(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

fn normalize_name(name: &str) -> String {
    let mut parts: Vec<String> = name
        .split(',')
        .map(|part| part.trim().to_lowercase())
        .collect();
    parts.sort();
    parts.join(",")
}
