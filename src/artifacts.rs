//! Artifact store: the managed directory completed jobs write into.
//!
//! Retrieval takes a bare file name. Anything that could address a path
//! outside the managed directory (separators, `..`, symlinks pointing
//! elsewhere) is refused before the file system is consulted for the file.

use crate::error::{Error, Result};
use crate::types::{PurgeFailure, PurgeReport};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Filesystem area holding completed output files
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root` (the directory is not created here)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The managed directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the managed directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    self.root.display(),
                    e
                ),
            ))
        })
    }

    /// Map a URL-encoded file name to a path under the managed directory
    pub async fn resolve_encoded(&self, raw: &str) -> Result<PathBuf> {
        let decoded = urlencoding::decode(raw)
            .map_err(|_| Error::Validation("file name is not valid UTF-8".to_string()))?;
        self.resolve(&decoded).await
    }

    /// Map an already-decoded file name to a path under the managed directory
    ///
    /// Returns [`Error::Validation`] for names that try to leave the directory
    /// and [`Error::NotFound`] when no such regular file exists.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;

        let candidate = self.root.join(filename);
        let not_found = || Error::NotFound(format!("artifact {filename}"));

        let metadata = fs::metadata(&candidate).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        // A symlink inside the directory may still point outside of it
        let root = fs::canonicalize(&self.root).await.map_err(|_| not_found())?;
        let resolved = fs::canonicalize(&candidate).await.map_err(|_| not_found())?;
        if !resolved.starts_with(&root) {
            warn!(filename, "artifact resolves outside the download directory");
            return Err(not_found());
        }

        Ok(resolved)
    }

    /// Open a resolved artifact for streaming, returning the handle and its length
    pub async fn open(&self, path: &Path) -> Result<(fs::File, u64)> {
        let file = fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("artifact {}", path.display()))
            }
            _ => Error::Io(e),
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Delete every entry in the managed directory
    ///
    /// Keeps going after a failed entry and reports it in the result instead.
    /// `cleared_jobs` is left at 0; the caller owns the registry.
    pub async fn purge_all(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = ?self.root, "download directory missing, recreating");
                self.ensure_dir().await?;
                return Ok(report);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path).await,
                Ok(_) => fs::remove_file(&path).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    debug!(?path, "removed artifact");
                    report.removed_files += 1;
                }
                Err(e) => {
                    warn!(?path, error = %e, "failed to remove artifact");
                    report.failures.push(PurgeFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            removed = report.removed_files,
            failed = report.failures.len(),
            "artifact directory purged"
        );
        Ok(report)
    }
}

/// Reject names that are empty or could address anything but a direct child
fn validate_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::Validation("file name must not be empty".to_string()));
    }
    if filename.contains(['/', '\\', '\0']) {
        return Err(Error::Validation(format!(
            "file name must not contain path separators: {filename}"
        )));
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::Validation(format!("invalid file name: {filename}"))),
    }
}
