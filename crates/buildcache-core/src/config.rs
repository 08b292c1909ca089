//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::pin::{PinError, PinnedCertificate};

/// Host serving the remote cache.
pub const DEFAULT_CACHE_HOST: &str = "appjs-workshops.local";

/// Connect timeout for the remote cache. Not configurable.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Configuration for the build cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Remote cache host, optionally with `:port` (e.g., `appjs-workshops.local`)
    pub cache_host: String,
    /// Directory holding local cache entries (defaults to the system temp dir)
    pub cache_dir: PathBuf,
    /// PEM file replacing the embedded server certificate
    pub ca_cert: Option<PathBuf>,
    /// Overall limit for a remote transfer; `None` leaves only the connect timeout
    pub transfer_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_host: DEFAULT_CACHE_HOST.to_string(),
            cache_dir: std::env::temp_dir(),
            ca_cert: None,
            transfer_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `BUILDCACHE_HOST`
    /// - `BUILDCACHE_DIR`
    /// - `BUILDCACHE_CA_CERT`
    /// - `BUILDCACHE_TRANSFER_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`], reading variables through `lookup`.
    /// Unset, blank and invalid values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = var("BUILDCACHE_HOST") {
            config.cache_host = host;
        }
        if let Some(dir) = var("BUILDCACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        config.ca_cert = var("BUILDCACHE_CA_CERT").map(PathBuf::from);
        config.transfer_timeout =
            var("BUILDCACHE_TRANSFER_TIMEOUT_SECS").and_then(|v| match v.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    tracing::warn!(value = %v, "Ignoring invalid BUILDCACHE_TRANSFER_TIMEOUT_SECS");
                    None
                }
                Ok(secs) => Some(Duration::from_secs(secs)),
            });

        config
    }

    /// Override the remote cache host.
    pub fn with_cache_host(mut self, host: impl Into<String>) -> Self {
        self.cache_host = host.into();
        self
    }

    /// Override the local cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// The certificate to trust and pin: the override file if set, else the embedded one.
    pub fn pinned_certificate(&self) -> Result<PinnedCertificate, PinError> {
        match &self.ca_cert {
            Some(path) => PinnedCertificate::from_file(path),
            None => PinnedCertificate::embedded(),
        }
    }
}
