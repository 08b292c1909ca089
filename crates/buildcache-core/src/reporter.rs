//! Reporter trait for dependency injection
//!
//! Cache operations report what happened (hit, miss, stored) through this
//! trait so the core is not coupled to any particular output. These are
//! diagnostics only; control flow never depends on them.

use std::path::Path;

/// Receives cache lifecycle events.
pub trait Reporter: Send + Sync {
    /// A usable entry was already on disk.
    fn local_hit(&self, path: &Path);

    /// Nothing on disk; asking the remote cache.
    fn remote_search(&self, url: &str);

    /// The remote cache does not have this build.
    fn remote_miss(&self, url: &str);

    /// Progress of a remote download.
    fn downloading(&self, url: &str, current: u64, total: Option<u64>);

    /// An archived build was extracted into place.
    fn extracted(&self, path: &Path);

    /// A single-file build was moved into place.
    fn stored(&self, path: &Path);

    /// The remote cache could not be used; the caller will build from scratch.
    fn unavailable(&self, reason: &str);

    /// A finished build was copied into the local cache.
    fn cached(&self, path: &Path);

    /// A finished build could not be copied into the local cache.
    fn cache_failed(&self, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn local_hit(&self, path: &Path) {
        (**self).local_hit(path);
    }
    fn remote_search(&self, url: &str) {
        (**self).remote_search(url);
    }
    fn remote_miss(&self, url: &str) {
        (**self).remote_miss(url);
    }
    fn downloading(&self, url: &str, current: u64, total: Option<u64>) {
        (**self).downloading(url, current, total);
    }
    fn extracted(&self, path: &Path) {
        (**self).extracted(path);
    }
    fn stored(&self, path: &Path) {
        (**self).stored(path);
    }
    fn unavailable(&self, reason: &str) {
        (**self).unavailable(reason);
    }
    fn cached(&self, path: &Path) {
        (**self).cached(path);
    }
    fn cache_failed(&self, reason: &str) {
        (**self).cache_failed(reason);
    }
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn local_hit(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Using local cache file");
    }

    fn remote_search(&self, url: &str) {
        tracing::info!(url, "Searching for remote builds...");
    }

    fn remote_miss(&self, url: &str) {
        tracing::info!(url, "Remote cache miss: build not found on server");
    }

    fn downloading(&self, url: &str, current: u64, total: Option<u64>) {
        tracing::trace!(url, current, total, "Downloading");
    }

    fn extracted(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Extracted build");
    }

    fn stored(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Moved build into cache");
    }

    fn unavailable(&self, reason: &str) {
        tracing::warn!(reason, "Unable to fetch remote build cache");
    }

    fn cached(&self, path: &Path) {
        tracing::info!(path = %path.display(), "Cached build locally");
    }

    fn cache_failed(&self, reason: &str) {
        tracing::warn!(reason, "Unable to cache build");
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn local_hit(&self, _: &Path) {}
    fn remote_search(&self, _: &str) {}
    fn remote_miss(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracted(&self, _: &Path) {}
    fn stored(&self, _: &Path) {}
    fn unavailable(&self, _: &str) {}
    fn cached(&self, _: &Path) {}
    fn cache_failed(&self, _: &str) {}
}
