//! Key derivation: maps a [`BuildDescriptor`] to its local and remote cache locations.
//!
//! Naming scheme:
//!
//! | platform | local entry            | remote object              |
//! |----------|------------------------|----------------------------|
//! | ios      | `build.<hash>.app/`    | `build.<hash>.app.tgz`     |
//! | android  | `build.<hash>.apk`     | `build.<hash>.apk`         |

use std::path::{Path, PathBuf};

use crate::types::{BuildDescriptor, Platform};

/// Suffix appended to remote objects that ship as gzip-tar archives.
pub const ARCHIVE_SUFFIX: &str = ".tgz";

/// How an artifact travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactShape {
    /// A directory shipped as a gzip-tar archive and extracted on arrival.
    Archived,
    /// A single file shipped as-is.
    SingleFile,
}

impl ArtifactShape {
    /// Shape of the artifacts a platform produces.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Ios => Self::Archived,
            Platform::Android => Self::SingleFile,
        }
    }
}

/// Derived cache location for one build. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// `build.<hash>.<app|apk>`
    pub file_name: String,
    /// `<cache dir>/<file_name>`
    pub local_path: PathBuf,
    /// `https://<host>/<file_name>[.tgz]`
    pub remote_url: String,
    /// Whether the remote object must be extracted.
    pub shape: ArtifactShape,
}

impl CacheKey {
    /// Sibling path the remote body is streamed into before commit.
    pub fn download_path(&self) -> PathBuf {
        sibling(&self.local_path, ".download")
    }

    /// Sibling path a published build is copied into before commit.
    pub fn upload_path(&self) -> PathBuf {
        sibling(&self.local_path, ".upload")
    }

    /// Directory holding `local_path`.
    pub fn cache_dir(&self) -> &Path {
        self.local_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// File extension of the local entry for a platform.
pub fn extension(platform: Platform) -> &'static str {
    match platform {
        Platform::Ios => "app",
        Platform::Android => "apk",
    }
}

/// Derive the cache key for `descriptor`. Pure and deterministic.
pub fn derive_key(descriptor: &BuildDescriptor, cache_dir: &Path, cache_host: &str) -> CacheKey {
    let file_name = format!(
        "build.{}.{}",
        descriptor.fingerprint_hash,
        extension(descriptor.platform)
    );
    let shape = ArtifactShape::for_platform(descriptor.platform);
    let suffix = match shape {
        ArtifactShape::Archived => ARCHIVE_SUFFIX,
        ArtifactShape::SingleFile => "",
    };
    let remote_url = format!(
        "https://{}/{file_name}{suffix}",
        cache_host.trim_end_matches('/')
    );

    CacheKey {
        local_path: cache_dir.join(&file_name),
        file_name,
        remote_url,
        shape,
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
