//! Content fingerprints for stored artifacts

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// A SHA-256 fingerprint of an artifact's bytes.
///
/// Stored alongside every persisted artifact so a caller can tell whether
/// a re-upload or a re-download actually changed the file.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute a hash from bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash a file in fixed-size chunks; meshes can be tens of megabytes
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Get the hash as a hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the hash as a prefixed hex string (e.g., "sha256:abcdef...")
    pub fn to_prefixed_hex(&self) -> String {
        format!("sha256:{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_hash_matches_byte_hash() {
        let path = std::env::temp_dir().join(format!(
            "gemforge_hash_test_{}.bin",
            std::process::id()
        ));
        // Larger than one read chunk
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let from_file = ContentHash::from_file(&path).unwrap();
        assert_eq!(from_file, ContentHash::from_bytes(&data));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_prefixed_hex() {
        let h = ContentHash::from_bytes(b"glTF");
        let prefixed = h.to_prefixed_hex();
        assert!(prefixed.starts_with("sha256:"));
        assert_eq!(prefixed.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(ContentHash::from_bytes(b"ruby"), ContentHash::from_bytes(b"emerald"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ContentHash::from_file("/nonexistent/gemforge/mesh.glb").is_err());
    }
}
