use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of checking one local file against its expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Verified,
    Missing,
    Mismatch { actual: String },
}

/// Compute SHA256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let digest = hex::encode(hasher.finalize());

    tracing::debug!("{}: {} bytes, sha256 {}", path.display(), bytes, digest);
    Ok(digest)
}

/// Hash `path` and compare with `expected` without touching the file.
pub fn inspect_source(path: &Path, expected: &str) -> Result<Check> {
    if !path.is_file() {
        return Ok(Check::Missing);
    }

    let actual = sha256_file(path)?;
    if actual == expected {
        Ok(Check::Verified)
    } else {
        Ok(Check::Mismatch { actual })
    }
}

/// Like [`inspect_source`], but a mismatching file is deleted.
pub fn check_source(path: &Path, expected: &str) -> Result<Check> {
    let check = inspect_source(path, expected)?;
    if let Check::Mismatch { actual } = &check {
        tracing::debug!("expected {}, got {}", expected, actual);
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove corrupt {}", path.display()))?;
    }
    Ok(check)
}

/// Log the outcome of [`check_source`] on `path`.
pub fn log_check(path: &Path, check: &Result<Check>) {
    match check {
        Ok(Check::Verified) => tracing::info!("{} verified", path.display()),
        Ok(Check::Missing) => tracing::info!("{} does not exist", path.display()),
        Ok(Check::Mismatch { .. }) => {
            tracing::info!("{} failed checksum verification, removed", path.display())
        }
        Err(e) => tracing::error!("{:#}", e),
    }
}

/// True when `path` exists and hashes to `expected`. Corrupt files are removed.
pub fn verify_source(path: &Path, expected: &str) -> bool {
    let check = check_source(path, expected);
    log_check(path, &check);
    matches!(check, Ok(Check::Verified))
}
