//! PEM persistence for certificates and private keys.
//!
//! The codec never touches a store; these helpers are for callers that keep
//! the certificates and keys they extract from archives.

use std::collections::HashMap;

use crate::cert::Certificate;
use crate::error::Result;
use crate::key::PrivateKey;

/// A string key-value store.
pub trait KeyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    entries: HashMap<String, String>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

pub fn store_certificate<S: KeyStore + ?Sized>(store: &mut S, key: &str, cert: &Certificate) {
    store.set(key, cert.to_pem());
}

/// Returns `None` when nothing is stored under `key`.
pub fn load_certificate<S: KeyStore + ?Sized>(store: &S, key: &str) -> Result<Option<Certificate>> {
    store
        .get(key)
        .map(|pem| Certificate::from_pem(&pem))
        .transpose()
}

/// Stores the key as unencrypted PKCS#8 PEM.
pub fn store_private_key<S: KeyStore + ?Sized>(
    store: &mut S,
    key: &str,
    private_key: &PrivateKey,
) -> Result<()> {
    store.set(key, private_key.to_pkcs8_pem()?);
    Ok(())
}

pub fn load_private_key<S: KeyStore + ?Sized>(store: &S, key: &str) -> Result<Option<PrivateKey>> {
    store
        .get(key)
        .map(|pem| PrivateKey::from_pkcs8_pem(&pem))
        .transpose()
}
