//! Artifact verification.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Result, XeError};

const DIGEST_PREFIX: &str = "sha256:";

/// `sha256:<hex>` digest of a byte slice.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{}{}", DIGEST_PREFIX, hex::encode(Sha256::digest(bytes)))
}

/// `sha256:<hex>` digest of a file's contents.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{}{}", DIGEST_PREFIX, hex::encode(hasher.finalize())))
}

/// Check a staged artifact and return its digest.
///
/// The artifact must be non-empty. When `expected` is given the digests
/// must match (case-insensitively).
pub fn verify_artifact(name: &str, path: &Path, expected: Option<&str>) -> Result<String> {
    let size = path.metadata().map_err(|e| XeError::disk(path, e))?.len();
    if size == 0 {
        return Err(XeError::Disk {
            path: path.to_path_buf(),
            message: "downloaded artifact is empty".to_string(),
        });
    }

    let actual = digest_file(path).map_err(|e| XeError::disk(path, e))?;
    if let Some(expected) = expected {
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(XeError::ChecksumMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }
    Ok(actual)
}
