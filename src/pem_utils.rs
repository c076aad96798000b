use crate::error::{PfxError, Result};

pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new())
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(PfxError::DecodingError(format!(
            "expected a {expected_label} PEM block, found {}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}
