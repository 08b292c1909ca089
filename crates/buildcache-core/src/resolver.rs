//! Cache resolution: local disk first, then the remote cache.
//!
//! A local entry always wins; there is no freshness check beyond the
//! fingerprint baked into its name. Remote bodies are streamed to
//! `<entry>.download` and only renamed into place once complete.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Reporter;
use crate::io::download::{DownloadError, stream_to_file};
use crate::io::extract::{ExtractError, extract_tar_gz};
use crate::io::fs::{CopyError, commit};
use crate::key::{ArtifactShape, CacheKey};
use crate::transport::{Fetch, Transport, TransportError};

/// Outcome of a resolve that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The entry was already on disk.
    Local(PathBuf),
    /// The entry was fetched from the remote cache and committed to disk.
    Remote(PathBuf),
    /// Neither cache has this build.
    Miss,
}

impl Resolution {
    /// Collapse to the path to use, if any.
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Local(path) | Self::Remote(path) => Some(path),
            Self::Miss => None,
        }
    }
}

/// Why the remote cache could not be used.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The request failed before a response was classified.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body could not be written to the temporary file.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The archive could not be unpacked.
    #[error("Failed to extract build: {0}")]
    Extract(#[from] ExtractError),

    /// The archive unpacked, but not into the expected entry.
    #[error("Failed to extract build: {} not found in archive", .0.display())]
    MissingAfterExtract(PathBuf),

    /// The finished entry could not be moved into place.
    #[error("Failed to commit build: {0}")]
    Commit(#[from] CopyError),

    /// Any other filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Resolve `key` to a local entry, downloading it if needed.
pub async fn resolve<T, R>(
    key: &CacheKey,
    transport: &T,
    reporter: &R,
) -> Result<Resolution, ResolveError>
where
    T: Transport + ?Sized,
    R: Reporter + ?Sized,
{
    if tokio::fs::try_exists(&key.local_path).await.unwrap_or(false) {
        reporter.local_hit(&key.local_path);
        return Ok(Resolution::Local(key.local_path.clone()));
    }

    reporter.remote_search(&key.remote_url);
    let (body, content_length) = match transport.get(&key.remote_url).await? {
        Fetch::NotFound => {
            reporter.remote_miss(&key.remote_url);
            return Ok(Resolution::Miss);
        }
        Fetch::Found {
            body,
            content_length,
        } => (body, content_length),
    };

    tokio::fs::create_dir_all(key.cache_dir()).await?;
    let download = key.download_path();
    stream_to_file(body, &download, &key.remote_url, content_length, reporter).await?;

    let installed = install(key.clone(), download.clone()).await;
    tokio::fs::remove_file(&download).await.ok();
    installed?;

    match key.shape {
        ArtifactShape::Archived => reporter.extracted(&key.local_path),
        ArtifactShape::SingleFile => reporter.stored(&key.local_path),
    }
    Ok(Resolution::Remote(key.local_path.clone()))
}

/// Move a completed download into place, extracting it first if archived.
async fn install(key: CacheKey, download: PathBuf) -> Result<(), ResolveError> {
    tokio::task::spawn_blocking(move || match key.shape {
        ArtifactShape::Archived => install_archive(&key, &download),
        ArtifactShape::SingleFile => Ok(commit(&download, &key.local_path)?),
    })
    .await
    .map_err(io::Error::other)?
}

fn install_archive(key: &CacheKey, archive: &Path) -> Result<(), ResolveError> {
    // Staging lives next to the entry so the final rename stays on one filesystem.
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", key.file_name))
        .tempdir_in(key.cache_dir())?;

    extract_tar_gz(archive, staging.path())?;

    let extracted = staging.path().join(&key.file_name);
    if !extracted.exists() {
        return Err(ResolveError::MissingAfterExtract(key.local_path.clone()));
    }

    commit(&extracted, &key.local_path)?;
    Ok(())
}
