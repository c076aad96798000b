//! # pfxkit - PKCS#12 archives in pure Rust
//!
//! pfxkit reads and writes password protected PKCS#12 (`.p12` / `.pfx`)
//! archives, the format used to move a private key together with its
//! certificate chain between servers, browsers, Windows and Java key stores.
//! It is built on the RustCrypto crates and does not link OpenSSL (except for
//! testing).
//!
//! ## Supported Encryption
//!
//! - **PBES2**: PBKDF2 (HMAC-SHA1/224/256/384/512) with AES-128/192/256-CBC.
//!   This is what OpenSSL 3 writes by default and what pfxkit writes.
//! - **PKCS#12 PBE**: SHA-1 with 3-key or 2-key Triple-DES, or RC2 with
//!   128 or 40 bit keys. Written by `openssl pkcs12 -legacy` and many older
//!   tools. Readable, and writable through [`config::BuildOptions`].
//! - **Integrity MAC**: HMAC with SHA-1, SHA-256, SHA-384 or SHA-512.
//!
//! ## Supported Key Types
//!
//! - **RSA**
//! - **ECDSA**: P-256, P-384, and P-521 curves
//! - **Ed25519**
//!
//! Keys of any other type (secp256k1, DSA, X25519, ...) are read as
//! [`key::PrivateKey::Other`] and keep their PKCS#8 encoding.
//!
//! ## Key Features
//!
//! - **Automatic fallback**: archives using the PKCS#12 PBE schemes are detected
//!   through a typed error and decrypted on a second pass
//! - **Chain reconstruction**: certificates are ordered leaf first using the
//!   Subject/Authority Key Identifier extensions, with a distinguished name
//!   fallback
//! - **BER input**: indefinite length encodings as written by Windows and Java
//! - **Deterministic builds**: all randomness comes from a
//!   [`crypto::CryptoProvider`]
//!
//! ## Quick Start
//!
//! ### Reading an Archive
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("server.p12")?;
//! let container = pfxkit::parse(&bytes, "changeit")?;
//!
//! for entry in &container.entries {
//!     println!("{} ({})", entry.name, entry.key.algorithm_name());
//!     for cert in &entry.chain {
//!         println!("  {}", cert.subject());
//!     }
//! }
//! if let Some(mac) = &container.mac {
//!     println!("MAC {} verified: {}", mac.hash_algorithm, mac.verified);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Writing an Archive
//!
//! ```rust,no_run
//! use pfxkit::{cert::Certificate, key::PrivateKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = PrivateKey::from_pkcs8_pem(&std::fs::read_to_string("server.key")?)?;
//! let leaf = Certificate::from_pem(&std::fs::read_to_string("server.pem")?)?;
//! let intermediate = Certificate::from_pem(&std::fs::read_to_string("ca.pem")?)?;
//!
//! let bytes = pfxkit::build(&key, &[leaf, intermediate], "changeit")?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! ### Choosing Algorithms
//!
//! ```rust,no_run
//! use pfxkit::config::{BuildOptions, EncryptionParams};
//! use pfxkit::crypto::OsRandom;
//! use pfxkit::oid::{HashAlgorithm, LegacyScheme};
//! # use pfxkit::{cert::Certificate, key::PrivateKey};
//!
//! # fn main() -> Result<(), pfxkit::error::PfxError> {
//! # let key = PrivateKey::generate_ecdsa_p256();
//! # let chain: Vec<Certificate> = Vec::new();
//! // Readable by tools that predate PBES2.
//! let options = BuildOptions::builder()
//!     .key_encryption(EncryptionParams::legacy(LegacyScheme::Sha1And3KeyTripleDesCbc))
//!     .mac_hash(HashAlgorithm::Sha1)
//!     .friendly_name("server")
//!     .build();
//! let bytes = pfxkit::build_with(&key, &chain, "changeit", &options, &OsRandom)?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! A wrong password and corrupted content cannot be told apart, both give
//! [`error::PfxError::IntegrityOrPasswordError`]:
//!
//! ```rust
//! use pfxkit::error::PfxError;
//!
//! match pfxkit::parse(b"not an archive", "changeit") {
//!     Ok(container) => println!("{} entries", container.entries.len()),
//!     Err(PfxError::IntegrityOrPasswordError) => println!("wrong password"),
//!     Err(PfxError::MalformedEncoding(msg)) => println!("not a PKCS#12 file: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`codec`]: [`parse`] and [`build`]
//! - [`chain`]: Certificate chain reconstruction
//! - [`config`]: Build options and their defaults
//! - [`crypto`]: Password based encryption engines, key derivation and the MAC
//! - [`bags`], [`pfx`]: The PKCS#12 data structures
//! - [`asn1`]: BER/DER reading and DER writing
//! - [`oid`]: Object identifiers and algorithm identifiers
//! - [`cert`], [`key`]: Certificates and private keys
//! - [`store`]: PEM persistence helpers
//! - [`error`]: Error types

pub mod asn1;
pub mod bags;
pub mod cert;
pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod key;
pub mod oid;
pub mod pem_utils;
pub mod pfx;
pub mod store;

pub use codec::{
    DecryptionPass, MacInfo, Pkcs12Container, Pkcs12Entry, build, build_with, parse,
    parse_with_pass,
};
