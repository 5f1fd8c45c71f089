//! Attestation artifact files
//!
//! The attestation data is written as compact JSON so it can be handed to
//! the proving service byte-for-byte.

use std::path::Path;

use crate::{AttestationData, Result};

/// Write the attestation data of an orchestration run to `path`
pub fn save_attestation(path: impl AsRef<Path>, data: &AttestationData) -> Result<()> {
    let json = serde_json::to_string(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a previously saved artifact verbatim
pub fn load_attestation(path: impl AsRef<Path>) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Parse a previously saved artifact
pub fn read_attestation(path: impl AsRef<Path>) -> Result<AttestationData> {
    let raw = load_attestation(path)?;
    Ok(serde_json::from_str(&raw)?)
}
