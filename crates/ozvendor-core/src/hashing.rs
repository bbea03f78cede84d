//! Content digests for vendored assets.
//!
//! Raw bytes are hashed as-is: no line-ending normalization, so a file
//! checked out with CRLF endings hashes differently from the remote copy.

use crate::error::{Result, VendorError};
use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files.
const CHUNK_SIZE: usize = 64 * 1024;

/// Digest algorithm used for asset hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

/// Computes lowercase hex digests of byte blobs and files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash an in-memory blob.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        match self.algorithm {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }

    /// Hash a file by streaming it in chunks.
    ///
    /// Read failures are returned with the path attached.
    pub fn hash_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path).map_err(|e| VendorError::io_with_path(e, path))?;
        let mut buffer = vec![0u8; CHUNK_SIZE];

        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = file
                        .read(&mut buffer)
                        .map_err(|e| VendorError::io_with_path(e, path))?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = Blake3Hasher::new();
                loop {
                    let n = file
                        .read(&mut buffer)
                        .map_err(|e| VendorError::io_with_path(e, path))?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(hasher.finalize().to_hex().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_known_vector() {
        let hasher = ContentHasher::default();
        assert_eq!(
            hasher.hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_hash_matches_bytes_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ERC20.sol");
        let content = b"pragma solidity ^0.5.0;\ncontract ERC20 {}\n".repeat(5000);
        std::fs::write(&path, &content).unwrap();

        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let hasher = ContentHasher::new(algorithm);
            assert_eq!(hasher.hash_file(&path).unwrap(), hasher.hash_bytes(&content));
        }
    }

    #[test]
    fn test_line_endings_are_not_normalized() {
        let hasher = ContentHasher::default();
        assert_ne!(hasher.hash_bytes(b"a\nb\n"), hasher.hash_bytes(b"a\r\nb\r\n"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ContentHasher::default()
            .hash_file(temp_dir.path().join("absent.sol"))
            .unwrap_err();
        assert!(matches!(err, VendorError::Io { path: Some(_), .. }));
    }
}
