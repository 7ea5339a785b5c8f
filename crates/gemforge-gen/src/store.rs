//! Local artifact storage
//!
//! Artifacts are plain files under a fixed root. Writes are keyed by file
//! name and the last write wins; `persist_scoped` adds a per-run directory
//! for callers that must not collide.

use gemforge_core::{ContentHash, GemforgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A file written to (or found in) the artifact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub path: String,
    pub size_bytes: u64,
    /// `sha256:<hex>` of the file contents
    pub content_hash: String,
}

/// File-based artifact store
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at the given directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Default store location: the working directory
    pub fn default_store() -> Self {
        Self::new("./")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to `<root>/<file name of name>`, replacing any prior file.
    ///
    /// Directory parts of `name` are ignored, as with an uploaded file name.
    pub fn persist(&self, name: &str, bytes: &[u8]) -> Result<StoredArtifact> {
        let file_name = file_name_of(name)?;
        self.write(self.root.join(file_name), bytes)
    }

    /// Write `bytes` to `<root>/<scope>/<file name of name>`
    pub fn persist_scoped(&self, scope: &str, name: &str, bytes: &[u8]) -> Result<StoredArtifact> {
        let scope = file_name_of(scope)?;
        let file_name = file_name_of(name)?;
        self.write(self.root.join(scope).join(file_name), bytes)
    }

    /// Whether a regular file exists at `path`. Never fails.
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Describe an existing file.
    ///
    /// A file that is missing, or vanishes while being hashed, is
    /// `ArtifactNotFound`.
    pub fn stat<P: AsRef<Path>>(&self, path: P) -> Result<StoredArtifact> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| missing_as_not_found(e, path))?;
        if !metadata.is_file() {
            return Err(GemforgeError::ArtifactNotFound(path.display().to_string()));
        }
        let hash = ContentHash::from_file(path).map_err(|e| missing_as_not_found(e, path))?;
        Ok(StoredArtifact {
            path: path.to_string_lossy().to_string(),
            size_bytes: metadata.len(),
            content_hash: hash.to_prefixed_hex(),
        })
    }

    /// Read an artifact's bytes
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(GemforgeError::ArtifactNotFound(path.display().to_string()));
        }
        std::fs::read(path).map_err(|e| missing_as_not_found(e, path))
    }

    fn write(&self, path: PathBuf, bytes: &[u8]) -> Result<StoredArtifact> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        let artifact = StoredArtifact {
            path: path.to_string_lossy().to_string(),
            size_bytes: bytes.len() as u64,
            content_hash: ContentHash::from_bytes(bytes).to_prefixed_hex(),
        };
        tracing::info!(path = %artifact.path, size_bytes = artifact.size_bytes, "artifact stored");
        Ok(artifact)
    }
}

fn missing_as_not_found(err: std::io::Error, path: &Path) -> GemforgeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        GemforgeError::ArtifactNotFound(path.display().to_string())
    } else {
        GemforgeError::IoError(err)
    }
}

fn file_name_of(name: &str) -> Result<&str> {
    Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .ok_or_else(|| GemforgeError::InvalidInput(format!("'{}' is not a usable file name", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gemforge_store_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_persist_then_exists() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);

        let artifact = store.persist("mesh.glb", b"glTF-bytes").unwrap();
        assert_eq!(PathBuf::from(&artifact.path), dir.join("mesh.glb"));
        assert_eq!(artifact.size_bytes, 10);
        assert!(artifact.content_hash.starts_with("sha256:"));
        assert!(store.exists(&artifact.path));

        std::fs::remove_file(&artifact.path).unwrap();
        assert!(!store.exists(&artifact.path));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_last_write_wins() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);

        let first = store.persist("ring.glb", b"first").unwrap();
        let second = store.persist("ring.glb", b"second version").unwrap();
        assert_eq!(first.path, second.path);
        assert_ne!(first.content_hash, second.content_hash);
        assert_eq!(store.read(&second.path).unwrap(), b"second version");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_persist_strips_directories() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);

        let artifact = store.persist("../../etc/evil.glb", b"x").unwrap();
        assert_eq!(PathBuf::from(&artifact.path), dir.join("evil.glb"));
        assert!(matches!(store.persist("..", b"x"), Err(GemforgeError::InvalidInput(_))));
        assert!(matches!(store.persist("", b"x"), Err(GemforgeError::InvalidInput(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scoped_writes_do_not_collide() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);

        let a = store.persist_scoped("run-a", "mesh.glb", b"aaa").unwrap();
        let b = store.persist_scoped("run-b", "mesh.glb", b"bbb").unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(store.read(&a.path).unwrap(), b"aaa");
        assert_eq!(store.read(&b.path).unwrap(), b"bbb");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_artifact() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);
        let missing = dir.join("nope.glb");

        assert!(!store.exists(&missing));
        assert!(matches!(store.read(&missing), Err(GemforgeError::ArtifactNotFound(_))));
        assert!(matches!(store.stat(&missing), Err(GemforgeError::ArtifactNotFound(_))));
        // A directory is not an artifact
        assert!(!store.exists(&dir));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_vanished_file_is_recoverable() {
        let path = Path::new("gone.glb");
        let err = missing_as_not_found(std::io::Error::from(std::io::ErrorKind::NotFound), path);
        assert!(matches!(err, GemforgeError::ArtifactNotFound(ref p) if p == "gone.glb"));
        assert!(err.is_recoverable());

        let err = missing_as_not_found(std::io::Error::from(std::io::ErrorKind::PermissionDenied), path);
        assert!(matches!(err, GemforgeError::IoError(_)));
    }

    #[test]
    fn test_stat_and_read_after_removal() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);
        let written = store.persist("ring.glb", b"ring").unwrap();
        std::fs::remove_file(&written.path).unwrap();

        assert!(store.stat(&written.path).unwrap_err().is_recoverable());
        assert!(store.read(&written.path).unwrap_err().is_recoverable());
        assert!(matches!(store.stat(&dir), Err(GemforgeError::ArtifactNotFound(_))));
        assert!(matches!(store.read(&dir), Err(GemforgeError::ArtifactNotFound(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stat_matches_persist() {
        let dir = temp_dir();
        let store = ArtifactStore::new(&dir);
        let written = store.persist("pendant.glb", b"pendant mesh").unwrap();
        assert_eq!(store.stat(&written.path).unwrap(), written);
        std::fs::remove_dir_all(&dir).ok();
    }
}
