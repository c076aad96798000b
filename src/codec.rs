//! The public entry points: [`parse`] and [`build`].
//!
//! Parsing first decrypts everything with the PBES2 engine. Archives written
//! with the PKCS#12 PBE schemes (`openssl pkcs12 -legacy`, older Windows and
//! Java exports) fail that pass when the PBES2 engine reports
//! [`PfxError::UnsupportedAlgorithm`] for a PKCS#12 PBE algorithm, and are
//! parsed once more with those schemes routed to the legacy engine. Other
//! unsupported algorithms (envelopedData, unknown PBKDF2 PRFs or ciphers)
//! fail the first pass without a retry.

use log::{debug, warn};

use crate::bags::{
    BagAttributes, SafeBag, SafeBagKind, encode_safe_contents, parse_safe_contents,
};
use crate::cert::Certificate;
use crate::chain::build_chain;
use crate::config::BuildOptions;
use crate::crypto::{
    CryptoProvider, LegacyEngine, ModernEngine, OsRandom, Password, PbeEngine, mac,
};
use crate::error::{PfxError, Result};
use crate::key::PrivateKey;
use crate::oid::{HashAlgorithm, PbeAlgorithm};
use crate::pfx::{
    ContentInfo, MacData, Pfx, encode_authenticated_safe, parse_authenticated_safe,
};

const LOCAL_KEY_ID_LEN: usize = 4;

/// A parsed archive.
#[derive(Debug)]
pub struct Pkcs12Container {
    /// One entry per key bag, in the order the key bags were found.
    pub entries: Vec<Pkcs12Entry>,
    pub mac: Option<MacInfo>,
}

/// A private key with its certificate chain.
#[derive(Debug)]
pub struct Pkcs12Entry {
    /// The key bag's friendly name, or its 1-based position among key bags.
    pub name: String,
    pub key: PrivateKey,
    /// Leaf first. Empty when no certificate bag matches the key; shorter than
    /// the full path when issuers are missing from the archive.
    pub chain: Vec<Certificate>,
}

/// Parameters of the archive's integrity MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacInfo {
    pub hash_algorithm: HashAlgorithm,
    pub iterations: u32,
    pub salt_length: usize,
    /// Whether the MAC matched. A mismatch is logged, not an error.
    pub verified: bool,
}

/// Which engine decrypts PKCS#12 PBE encrypted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionPass {
    /// Everything goes to [`ModernEngine`].
    Modern,
    /// PKCS#12 PBE schemes go to [`LegacyEngine`], PBES2 still to [`ModernEngine`].
    Legacy,
}

/// Parses an archive, falling back to the legacy decryption pass when the
/// modern pass meets an algorithm it does not implement.
///
/// # Example
/// ```no_run
/// let bytes = std::fs::read("server.p12")?;
/// let container = pfxkit::parse(&bytes, "changeit")?;
/// for entry in &container.entries {
///     println!("{}: {} certificates", entry.name, entry.chain.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse(bytes: &[u8], password: &str) -> Result<Pkcs12Container> {
    let password = Password::new(password);
    let decrypted = match decrypt(bytes, &password, DecryptionPass::Modern) {
        Err(PassError::LegacyScheme(err)) => {
            debug!("modern pass failed ({err}), retrying with legacy schemes");
            decrypt(bytes, &password, DecryptionPass::Legacy)?
        }
        result => result?,
    };
    assemble(decrypted)
}

/// Parses an archive with a single decryption pass and no fallback.
pub fn parse_with_pass(
    bytes: &[u8],
    password: &str,
    pass: DecryptionPass,
) -> Result<Pkcs12Container> {
    let password = Password::new(password);
    assemble(decrypt(bytes, &password, pass)?)
}

/// The certificate bag belonging to a key bag.
///
/// A certificate with the key's local key id wins over one with the key's
/// friendly name. Either attribute matching on its own is enough.
pub fn find_matching_cert<'a>(
    key: &BagAttributes,
    certificates: &'a [SafeBag],
) -> Option<&'a SafeBag> {
    let by_local_key_id = key.local_key_id.as_ref().and_then(|id| {
        certificates
            .iter()
            .find(|cert| cert.attributes.local_key_id.as_ref() == Some(id))
    });
    let by_friendly_name = key.friendly_name.as_ref().and_then(|name| {
        certificates
            .iter()
            .find(|cert| cert.attributes.friendly_name.as_ref() == Some(name))
    });
    by_local_key_id.or(by_friendly_name)
}

/// Builds an archive with [`BuildOptions::default`] and the OS random source.
///
/// `chain` is leaf first.
pub fn build(key: &PrivateKey, chain: &[Certificate], password: &str) -> Result<Vec<u8>> {
    build_with(key, chain, password, &BuildOptions::default(), &OsRandom)
}

/// Builds an archive.
///
/// All salts, IVs and the local key id come from `provider`, so a provider
/// with fixed output makes the result deterministic.
pub fn build_with(
    key: &PrivateKey,
    chain: &[Certificate],
    password: &str,
    options: &BuildOptions,
    provider: &dyn CryptoProvider,
) -> Result<Vec<u8>> {
    if chain.is_empty() {
        return Err(PfxError::InvalidInput(
            "certificate chain must not be empty".to_string(),
        ));
    }
    let password = Password::new(password);

    let leaf_attributes = BagAttributes {
        friendly_name: options.friendly_name.clone(),
        local_key_id: Some(provider.random_bytes(LOCAL_KEY_ID_LEN)?),
    };

    let pkcs8 = key.to_pkcs8_der()?;
    let engine: &dyn PbeEngine = if options.key_encryption.scheme.is_legacy() {
        &LegacyEngine
    } else {
        &ModernEngine
    };
    let (ciphertext, algorithm) =
        engine.encrypt(pkcs8.as_bytes(), &password, &options.key_encryption, provider)?;

    let mut bags = vec![SafeBag::shrouded_key(
        algorithm,
        ciphertext,
        leaf_attributes.clone(),
    )];
    bags.extend(chain.iter().enumerate().map(|(index, cert)| {
        let attributes = if index == 0 {
            leaf_attributes.clone()
        } else {
            BagAttributes::default()
        };
        SafeBag::certificate(cert.to_der(), attributes)
    }));

    let auth_safe =
        encode_authenticated_safe(&[ContentInfo::Data(encode_safe_contents(&bags)?)])?;

    let salt = provider.random_bytes(options.mac_salt_length)?;
    let digest = mac::compute_mac(
        &auth_safe,
        &password,
        options.mac_hash,
        options.mac_iterations,
        &salt,
    )?;

    debug!(
        "built archive with {} certificates, MAC {}",
        chain.len(),
        options.mac_hash
    );
    Ok(Pfx {
        auth_safe,
        mac_data: Some(MacData {
            hash: options.mac_hash,
            digest,
            salt,
            iterations: options.mac_iterations,
        }),
    }
    .encode())
}

/// Everything a pass recovers before keys and certificates are imported.
struct DecryptedArchive {
    mac: Option<MacInfo>,
    keys: Vec<DecryptedKey>,
    certificates: Vec<SafeBag>,
}

struct DecryptedKey {
    pkcs8: Vec<u8>,
    attributes: BagAttributes,
}

/// Why a decryption pass stopped.
#[derive(Debug)]
enum PassError {
    /// The PBES2 engine met a PKCS#12 PBE scheme. Only this triggers the
    /// legacy pass.
    LegacyScheme(PfxError),
    Other(PfxError),
}

impl From<PfxError> for PassError {
    fn from(err: PfxError) -> Self {
        PassError::Other(err)
    }
}

impl From<PassError> for PfxError {
    fn from(err: PassError) -> Self {
        match err {
            PassError::LegacyScheme(err) | PassError::Other(err) => err,
        }
    }
}

fn decrypt(
    bytes: &[u8],
    password: &Password,
    pass: DecryptionPass,
) -> std::result::Result<DecryptedArchive, PassError> {
    let pfx = Pfx::decode(bytes)?;
    let mac = pfx
        .mac_data
        .as_ref()
        .map(|mac_data| check_mac(mac_data, &pfx.auth_safe, password));

    let mut keys = Vec::new();
    let mut certificates = Vec::new();
    for content in parse_authenticated_safe(&pfx.auth_safe)? {
        let bags = match content {
            ContentInfo::Data(safe_contents) => parse_safe_contents(&safe_contents)?,
            ContentInfo::EncryptedData {
                algorithm,
                ciphertext,
            } => {
                let plaintext = decrypt_with(pass, &algorithm, &ciphertext, password)?;
                parse_safe_contents(&plaintext).map_err(integrity_if_malformed)?
            }
        };

        for bag in bags {
            match bag.kind {
                SafeBagKind::ShroudedKey {
                    algorithm,
                    ciphertext,
                } => {
                    let pkcs8 = decrypt_with(pass, &algorithm, &ciphertext, password)?;
                    if pkcs8::PrivateKeyInfo::try_from(pkcs8.as_slice()).is_err() {
                        return Err(PfxError::IntegrityOrPasswordError.into());
                    }
                    keys.push(DecryptedKey {
                        pkcs8,
                        attributes: bag.attributes,
                    });
                }
                SafeBagKind::Key { pkcs8 } => keys.push(DecryptedKey {
                    pkcs8,
                    attributes: bag.attributes,
                }),
                SafeBagKind::Certificate { .. } => certificates.push(bag),
                SafeBagKind::Other { bag_id, .. } => warn!("skipping unsupported bag {bag_id}"),
            }
        }
    }

    debug!(
        "{pass:?} pass decrypted {} keys and {} certificates",
        keys.len(),
        certificates.len()
    );
    Ok(DecryptedArchive {
        mac,
        keys,
        certificates,
    })
}

fn engine_for(pass: DecryptionPass, algorithm: &PbeAlgorithm) -> &'static dyn PbeEngine {
    match (pass, algorithm) {
        (DecryptionPass::Legacy, PbeAlgorithm::Pkcs12Pbe { .. }) => &LegacyEngine,
        _ => &ModernEngine,
    }
}

fn decrypt_with(
    pass: DecryptionPass,
    algorithm: &PbeAlgorithm,
    ciphertext: &[u8],
    password: &Password,
) -> std::result::Result<Vec<u8>, PassError> {
    engine_for(pass, algorithm)
        .decrypt(algorithm, ciphertext, password)
        .map_err(|err| match (pass, algorithm) {
            (DecryptionPass::Modern, PbeAlgorithm::Pkcs12Pbe { .. })
                if err.is_unsupported_algorithm() =>
            {
                PassError::LegacyScheme(err)
            }
            _ => PassError::Other(err),
        })
}

/// Decrypted bytes that do not parse were decrypted with the wrong key.
fn integrity_if_malformed(err: PfxError) -> PfxError {
    match err {
        PfxError::MalformedEncoding(_) => PfxError::IntegrityOrPasswordError,
        other => other,
    }
}

fn check_mac(mac_data: &MacData, auth_safe: &[u8], password: &Password) -> MacInfo {
    let verified = match mac::verify_mac(
        auth_safe,
        password,
        mac_data.hash,
        mac_data.iterations,
        &mac_data.salt,
        &mac_data.digest,
    ) {
        Ok(true) => true,
        Ok(false) => {
            warn!("MAC mismatch: wrong password or modified archive");
            false
        }
        Err(err) => {
            warn!("MAC not verified: {err}");
            false
        }
    };
    MacInfo {
        hash_algorithm: mac_data.hash,
        iterations: mac_data.iterations,
        salt_length: mac_data.salt.len(),
        verified,
    }
}

/// Certificates that do not decode are left out, like unsupported bags.
fn decode_certificate(der: &[u8]) -> Option<Certificate> {
    Certificate::from_der(der)
        .map_err(|err| warn!("skipping undecodable certificate: {err}"))
        .ok()
}

fn assemble(decrypted: DecryptedArchive) -> Result<Pkcs12Container> {
    let pool: Vec<Certificate> = decrypted
        .certificates
        .iter()
        .filter_map(SafeBag::certificate_der)
        .filter_map(decode_certificate)
        .collect();

    let entries = decrypted
        .keys
        .into_iter()
        .enumerate()
        .map(|(index, key)| {
            let chain = match find_matching_cert(&key.attributes, &decrypted.certificates)
                .and_then(SafeBag::certificate_der)
                .and_then(decode_certificate)
            {
                Some(leaf) => build_chain(&leaf, &pool),
                None => {
                    debug!("no certificate matches key {}", index + 1);
                    Vec::new()
                }
            };
            Ok(Pkcs12Entry {
                name: key
                    .attributes
                    .friendly_name
                    .unwrap_or_else(|| (index + 1).to_string()),
                key: PrivateKey::from_pkcs8_der(&key.pkcs8)?,
                chain,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Pkcs12Container {
        entries,
        mac: decrypted.mac,
    })
}
