//! Archives written by `openssl pkcs12 -export`, see `tests/data/generate.sh`.

mod util;

use der::Encode;
use pfxkit::error::PfxError;
use pfxkit::key::PrivateKey;
use pfxkit::oid::HashAlgorithm;
use pfxkit::{DecryptionPass, parse, parse_with_pass};
use pkcs8::EncodePublicKey;
use util::{PASSWORD, common_name};

const OPENSSL: &[u8] = include_bytes!("data/openssl.p12");
const FRIENDLY_NAME: &[u8] = include_bytes!("data/friendlyname.p12");
const LEGACY: &[u8] = include_bytes!("data/legacy.p12");
const LEGACY_FRIENDLY_NAME: &[u8] = include_bytes!("data/legacy-with-friendlyname.p12");
const SKI_AKI_CHAIN: &[u8] = include_bytes!("data/ski-aki-chain.p12");
const DN_CHAIN: &[u8] = include_bytes!("data/dn-chain.p12");
const SECP256K1: &[u8] = include_bytes!("data/secp256k1.p12");

fn chain_names(bytes: &[u8]) -> Vec<String> {
    let container = parse(bytes, PASSWORD).unwrap();
    container.entries[0].chain.iter().map(common_name).collect()
}

#[test]
fn test_modern_archive() {
    let container = parse(OPENSSL, PASSWORD).unwrap();

    assert_eq!(container.entries.len(), 1);
    let entry = &container.entries[0];
    assert_eq!(entry.name, "1");
    assert_eq!(entry.key.algorithm_name(), "ECDSA");
    assert_eq!(entry.key.curve_name(), Some("P-256"));
    assert_eq!(entry.chain.len(), 3);

    let mac = container.mac.unwrap();
    assert_eq!(mac.hash_algorithm, HashAlgorithm::Sha256);
    assert!(mac.verified);
}

#[test]
fn test_modern_archive_needs_no_legacy_pass() {
    let container = parse_with_pass(OPENSSL, PASSWORD, DecryptionPass::Modern).unwrap();
    assert_eq!(container.entries.len(), 1);
}

#[test]
fn test_key_belongs_to_leaf() {
    let container = parse(OPENSSL, PASSWORD).unwrap();
    let entry = &container.entries[0];

    let PrivateKey::EcdsaP256(secret) = &entry.key else {
        panic!("expected a P-256 key, got {:?}", entry.key);
    };
    let public_key = secret.public_key().to_public_key_der().unwrap();
    let leaf_spki = entry.chain[0]
        .inner
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .unwrap();
    assert_eq!(public_key.as_bytes(), leaf_spki.as_slice());
}

#[test]
fn test_friendly_name() {
    let container = parse(FRIENDLY_NAME, PASSWORD).unwrap();
    assert_eq!(container.entries[0].name, "test-friendlyname");
}

#[test]
fn test_legacy_archive_rejected_by_modern_pass() {
    let err = parse_with_pass(LEGACY, PASSWORD, DecryptionPass::Modern).unwrap_err();
    assert!(err.is_unsupported_algorithm(), "{err}");
}

#[test]
fn test_legacy_archive() {
    let container = parse(LEGACY, PASSWORD).unwrap();

    assert_eq!(container.entries.len(), 1);
    assert_eq!(container.entries[0].name, "1");
    assert_eq!(container.entries[0].chain.len(), 3);

    let mac = container.mac.unwrap();
    assert_eq!(mac.hash_algorithm, HashAlgorithm::Sha1);
    assert!(mac.verified);
}

#[test]
fn test_legacy_archive_with_friendly_name() {
    let container = parse(LEGACY_FRIENDLY_NAME, PASSWORD).unwrap();
    assert_eq!(container.entries[0].name, "test-friendlyname");
}

#[test]
fn test_names_stable_across_parses() {
    for archive in [OPENSSL, FRIENDLY_NAME, LEGACY, LEGACY_FRIENDLY_NAME] {
        let first: Vec<String> = parse(archive, PASSWORD)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect();
        let second: Vec<String> = parse(archive, PASSWORD)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(first, second);
    }
}

#[test]
fn test_chain_ordered_by_key_identifiers() {
    // Bags are stored leaf, root, intermediate.
    assert_eq!(
        chain_names(SKI_AKI_CHAIN),
        vec!["leaf.example.test", "Test Intermediate CA", "Test Root CA"]
    );
}

#[test]
fn test_chain_ordered_by_names() {
    let container = parse(DN_CHAIN, PASSWORD).unwrap();
    let leaf = &container.entries[0].chain[0];
    assert!(leaf.subject_key_identifier().unwrap().is_none());
    assert!(leaf.authority_key_identifier().unwrap().is_none());

    assert_eq!(
        chain_names(DN_CHAIN),
        vec![
            "plain.example.test",
            "Plain Intermediate CA",
            "Plain Root CA"
        ]
    );
}

#[test]
fn test_unsupported_curve_still_yields_entry() {
    let container = parse(SECP256K1, PASSWORD).unwrap();

    assert_eq!(container.entries.len(), 1);
    let entry = &container.entries[0];
    assert_eq!(entry.name, "1");
    assert_eq!(entry.chain.len(), 1);
    assert_eq!(common_name(&entry.chain[0]), "k1.example.test");

    let PrivateKey::Other {
        algorithm,
        parameters,
        ..
    } = &entry.key
    else {
        panic!("expected an opaque key, got {:?}", entry.key);
    };
    assert_eq!(*algorithm, pfxkit::oid::EC_PUBLIC_KEY);
    assert_eq!(parameters.map(|oid| oid.to_string()).as_deref(), Some("1.3.132.0.10"));
    assert_eq!(entry.key.algorithm_name(), "Other");
    assert!(PrivateKey::from_pkcs8_der(entry.key.to_pkcs8_der().unwrap().as_bytes()).is_ok());
}

#[test]
fn test_wrong_password() {
    for archive in [OPENSSL, LEGACY] {
        assert!(matches!(
            parse(archive, "wrong"),
            Err(PfxError::IntegrityOrPasswordError)
        ));
    }
}

#[test]
fn test_truncated_archive() {
    let err = parse(&OPENSSL[..OPENSSL.len() / 2], PASSWORD).unwrap_err();
    assert!(matches!(err, PfxError::MalformedEncoding(_)), "{err}");
}
