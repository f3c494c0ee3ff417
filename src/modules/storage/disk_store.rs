use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};

/// Local filesystem blob store.
///
/// Locators handed out by [`DiskStore::save`] are bare file names; lookups
/// strip any directory components, so a locator can never escape the root.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open the store, creating the directory if needed.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.upload_dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create upload directory {}: {}",
                config.upload_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            root: config.upload_dir.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a collision-resistant on-disk name: the sanitized original name
    /// with a random suffix spliced in before the extension.
    pub fn storage_name(original: &str, suffix: &str) -> String {
        let (stem, ext) = match original.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
            _ => (original, None),
        };

        let stem = sanitize(stem);
        match ext {
            Some(ext) => format!("{}_{}.{}", stem, suffix, sanitize(ext)),
            None => format!("{}_{}", stem, suffix),
        }
    }

    /// Write bytes under `name` and return the locator to store in the record.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let path = self.resolve(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(name.to_string())
    }

    /// Open a stored blob for streaming reads. Returns the file handle and
    /// its size. A record pointing at a missing blob is a data-integrity
    /// fault, reported as not-found.
    pub async fn open(&self, locator: &str) -> Result<(fs::File, u64)> {
        let path = self.resolve(locator);

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound("File not found on server".to_string())
            } else {
                AppError::Internal(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;

        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();

        Ok((file, len))
    }

    /// Remove a stored blob. Returns false if it was already gone.
    pub async fn delete(&self, locator: &str) -> Result<bool> {
        let path = self.resolve(locator);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted blob {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob already missing: {}", path.display());
                Ok(false)
            }
            Err(e) => Err(AppError::Internal(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Resolve a locator to an absolute path, keeping only the final
    /// component so stored locators cannot traverse out of the root.
    fn resolve(&self, locator: &str) -> PathBuf {
        let name = Path::new(locator)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "unnamed".into());
        self.root.join(name)
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, DiskStore) {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            upload_dir: dir.path().to_path_buf(),
        };
        let store = DiskStore::new(&config).await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_storage_name_sanitizes_and_keeps_extension() {
        assert_eq!(
            DiskStore::storage_name("my report.pdf", "a1b2c3"),
            "my_report_a1b2c3.pdf"
        );
        assert_eq!(
            DiskStore::storage_name("weird/../name!.tar.gz", "xyz"),
            "weird_.._name_.tar_xyz.gz"
        );
        assert_eq!(DiskStore::storage_name("noext", "xyz"), "noext_xyz");
        assert_eq!(DiskStore::storage_name(".hidden", "xyz"), ".hidden_xyz");
    }

    #[tokio::test]
    async fn test_save_open_round_trip() {
        let (_dir, store) = test_store().await;

        let locator = store.save("doc_abc.pdf", b"hello bytes").await.unwrap();
        let (mut file, len) = store.open(&locator).await.unwrap();
        assert_eq!(len, 11);

        let mut contents = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut contents)
            .await
            .unwrap();
        assert_eq!(contents, b"hello bytes");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (_dir, store) = test_store().await;

        match store.open("nope.bin").await {
            Err(AppError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_locator_cannot_escape_root() {
        let (_dir, store) = test_store().await;

        // Only the final path component is honored.
        match store.open("../../etc/passwd").await {
            Err(AppError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = test_store().await;

        let locator = store.save("gone.txt", b"x").await.unwrap();
        assert!(store.delete(&locator).await.unwrap());
        assert!(!store.delete(&locator).await.unwrap());
    }
}
