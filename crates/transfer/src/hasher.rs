use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::TransferError;

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Content fingerprint of a file, used for duplicate grouping.
///
/// `Unhashable` marks a file whose bytes could not be read. It never
/// participates in grouping, so such files are never treated as duplicates
/// of anything (including each other).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// Hex-encoded SHA-256 of the file's bytes.
    Sha256(String),
    /// The file could not be read; carries the reason.
    Unhashable { reason: String },
}

impl Fingerprint {
    /// Key to group duplicates by. `None` for unhashable files.
    pub fn dedup_key(&self) -> Option<&str> {
        match self {
            Fingerprint::Sha256(hex) => Some(hex),
            Fingerprint::Unhashable { .. } => None,
        }
    }

    pub fn is_hashable(&self) -> bool {
        self.dedup_key().is_some()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Sha256(hex) => write!(f, "sha256:{hex}"),
            Fingerprint::Unhashable { reason } => write!(f, "unhashable ({reason})"),
        }
    }
}

/// Computes content fingerprints by streaming a file through SHA-256.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    buffer_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl ContentHasher {
    /// Creates a hasher reading `buffer_size` bytes at a time (0 = default).
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = if buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buffer_size
        };
        Self { buffer_size }
    }

    /// Hashes the file at `path`, returning the hex SHA-256 digest.
    pub fn hash_file(&self, path: &Path) -> Result<String, TransferError> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Fingerprints the file at `path`. Read failures yield
    /// [`Fingerprint::Unhashable`] instead of an error.
    pub fn fingerprint(&self, path: &Path) -> Fingerprint {
        match self.hash_file(path) {
            Ok(hex) => Fingerprint::Sha256(hex),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not hash file");
                Fingerprint::Unhashable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Fingerprints several files, preserving input order.
    pub fn fingerprint_all(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Fingerprint)> {
        paths
            .iter()
            .map(|p| (p.clone(), self.fingerprint(p)))
            .collect()
    }
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
