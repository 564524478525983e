// src/cache/fingerprint.rs

use std::path::Path;

use blake3::Hasher;

use crate::watch::path_utils::to_slash;

/// Domain prefix; bump when the fingerprint inputs change shape.
const FINGERPRINT_DOMAIN: &[u8] = b"siteflow/image/v1";

/// Fingerprint of one optimisation input.
///
/// Covers the asset's relative path, a hash of its content and the
/// optimisation options, so changing any of them yields a new key.
pub fn fingerprint(relative: &Path, content: &[u8], options: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(&[0]);
    hasher.update(to_slash(relative).as_bytes());
    hasher.update(&[0]);
    hasher.update(blake3::hash(content).as_bytes());
    hasher.update(&[0]);
    hasher.update(options.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Hex checksum of a stored payload.
pub fn checksum(payload: &[u8]) -> String {
    blake3::hash(payload).to_hex().to_string()
}
