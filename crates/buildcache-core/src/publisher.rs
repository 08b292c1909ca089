//! Publishing a finished build into the local cache.
//!
//! Only the local disk is populated; pushing entries to the remote server is
//! done out of band.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::io::fs::{CopyError, commit, copy_recursive, remove_any};
use crate::key::CacheKey;

/// Why a build could not be cached.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The build output does not exist.
    #[error("Build output not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// Copying or committing the entry failed.
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// Any other filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Copy `build_path` (file or directory) to `key.local_path`, replacing any previous entry.
pub async fn publish(key: &CacheKey, build_path: &Path) -> Result<PathBuf, PublishError> {
    if !tokio::fs::try_exists(build_path).await.unwrap_or(false) {
        return Err(PublishError::SourceMissing(build_path.to_path_buf()));
    }

    let key = key.clone();
    let build_path = build_path.to_path_buf();
    tokio::task::spawn_blocking(move || publish_blocking(&key, &build_path))
        .await
        .map_err(io::Error::other)?
}

fn publish_blocking(key: &CacheKey, build_path: &Path) -> Result<PathBuf, PublishError> {
    std::fs::create_dir_all(key.cache_dir())?;

    let staged = key.upload_path();
    remove_any(&staged)?;

    let result = copy_recursive(build_path, &staged).and_then(|()| commit(&staged, &key.local_path));
    if result.is_err() {
        remove_any(&staged).ok();
    }
    result?;

    tracing::debug!(from = %build_path.display(), to = %key.local_path.display(), "Published build");
    Ok(key.local_path.clone())
}
