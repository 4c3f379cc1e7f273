//! Disk-backed store holding the original bytes of every fetched image.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::ImageId;
use crate::domain::ports::{CacheError, CacheResult};

/// Extension of every stored image file.
const FILE_EXTENSION: &str = "img";

/// Maps identifiers to files under a persistent cache root.
///
/// One file per identifier, holding the bytes exactly as fetched. Entries
/// survive restarts, so an image fetched once is never fetched again.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Creates a store rooted at `root`. Directories are created lazily on write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store in the default location (`~/.cache/coverart/covers/`).
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(dirs_cache_path())
    }

    /// The cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file that holds `id`.
    ///
    /// Every identifier maps to one flat `<hash>.img` leaf directly under the
    /// root. No file ever has to double as a directory, so two distinct
    /// identifiers can always be stored side by side, whatever they contain.
    #[must_use]
    pub fn path_for(&self, id: &ImageId) -> PathBuf {
        let hashed = ImageId::from_url(id.as_str());
        self.root.join(format!("{hashed}.{FILE_EXTENSION}"))
    }

    /// Checks whether a regular file exists at `path`.
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
    }

    /// Persists `bytes` at `path`, replacing any previous content.
    ///
    /// The write goes through a temporary file in the same directory, so a
    /// reader never observes a partially written image.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be created or written.
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> CacheResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| CacheError::IoError(format!("No parent for {}", path.display())))?
            .to_path_buf();

        fs::create_dir_all(&parent)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;

        let target = path.to_path_buf();
        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> CacheResult<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&parent)
                .map_err(|e| CacheError::IoError(format!("Failed to create temp file: {e}")))?;
            temp.write_all(&data)
                .map_err(|e| CacheError::IoError(format!("Failed to write cache file: {e}")))?;
            temp.persist(&target)
                .map_err(|e| CacheError::IoError(format!("Failed to persist cache file: {}", e.error)))?;
            Ok(())
        })
        .await
        .map_err(|e| CacheError::IoError(format!("Write task panicked: {e}")))??;

        debug!(path = %path.display(), size = bytes.len(), "Stored image on disk");
        Ok(())
    }

    /// Reads the raw bytes at `path`.
    ///
    /// # Errors
    /// Returns `NotFound` if no file exists, `IoError` for other failures.
    pub async fn read(&self, path: &Path) -> CacheResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(bytes) => {
                trace!(path = %path.display(), size = bytes.len(), "Disk cache hit");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(CacheError::IoError(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Removes the file at `path`. Best effort: a file that is already gone
    /// is not an error, other failures are only logged.
    pub async fn remove(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed cache file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
        }
    }
}

/// Returns the default cache directory path.
fn dirs_cache_path() -> PathBuf {
    directories::ProjectDirs::from("com", "coverart", "coverart").map_or_else(
        || {
            std::env::temp_dir()
                .join("coverart")
                .join("cache")
                .join("covers")
        },
        |dirs| dirs.cache_dir().join("covers"),
    )
}
