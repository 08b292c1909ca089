//! Filesystem helpers for committing cache entries.
//!
//! Entries are always assembled under a sibling name and renamed into place,
//! so readers see either the old entry, no entry, or the complete new one.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Errors raised while copying a build tree.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Plain filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Recursive directory copy failed.
    #[error("Copy failed: {0}")]
    Dir(#[from] fs_extra::error::Error),
}

/// Copy a file or a whole directory tree from `src` to `dst`.
///
/// `dst` must not exist yet; for directories it is created and filled with the
/// contents of `src`.
pub fn copy_recursive(src: &Path, dst: &Path) -> Result<(), CopyError> {
    if fs::metadata(src)?.is_dir() {
        fs::create_dir_all(dst)?;
        fs_extra::dir::copy(
            src,
            dst,
            &fs_extra::dir::CopyOptions::new()
                .content_only(true)
                .overwrite(true),
        )?;
    } else {
        fs::copy(src, dst)?;
    }
    Ok(())
}

/// Remove a file or directory tree if present.
pub fn remove_any(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Move a fully written `staged` entry onto `target`, replacing any previous entry.
///
/// Renames within one directory are atomic. If the rename itself fails (e.g. the
/// staging area sits on another filesystem) the entry is copied instead.
pub fn commit(staged: &Path, target: &Path) -> Result<(), CopyError> {
    remove_any(target)?;
    if let Err(e) = fs::rename(staged, target) {
        tracing::debug!(error = %e, "Rename failed, falling back to copy");
        copy_recursive(staged, target)?;
        remove_any(staged)?;
    }
    Ok(())
}
