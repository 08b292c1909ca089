//! The orchestrator-facing facade.
//!
//! [`BuildCache::resolve_build_cache`] and [`BuildCache::upload_build_cache`]
//! never fail: a broken cache degrades to "build from scratch", never to a
//! failed build. The typed [`BuildCache::resolve`] and [`BuildCache::publish`]
//! keep the failure detail for callers that want it.
//!
//! # Concurrency
//!
//! Calls for the same fingerprint are serialized within one `BuildCache`.
//! Nothing coordinates separate processes sharing a cache directory: callers
//! must not resolve or publish the same fingerprint from two processes at once.
//! Commits are rename-based, so a reader never sees a half-written entry, but
//! two concurrent downloads of one fingerprint would race on `<entry>.download`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::CacheConfig;
use crate::key::{CacheKey, derive_key};
use crate::publisher::{self, PublishError};
use crate::reporter::{LogReporter, Reporter};
use crate::resolver::{self, Resolution, ResolveError};
use crate::transport::{Fetch, PinnedTransport, Transport, TransportError};
use crate::types::BuildDescriptor;

/// Local + remote build cache.
pub struct BuildCache {
    config: CacheConfig,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn Reporter>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for BuildCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BuildCache {
    /// Build a cache talking to the pinned remote described by `config`.
    ///
    /// If the certificate or TLS client cannot be set up, the cache still works
    /// locally and every remote lookup reports the setup error.
    pub fn from_config(config: CacheConfig) -> Self {
        let transport: Arc<dyn Transport> = match config
            .pinned_certificate()
            .map_err(TransportError::from)
            .and_then(|pinned| PinnedTransport::new(&pinned, config.transfer_timeout))
        {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                tracing::warn!(error = %e, "Remote cache disabled");
                Arc::new(Unavailable(e.to_string()))
            }
        };
        Self::with_transport(config, transport)
    }

    /// Build a cache over an explicit transport.
    pub fn with_transport(config: CacheConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            reporter: Arc::new(LogReporter),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the default [`LogReporter`].
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache key for `descriptor` under this configuration.
    pub fn key_for(&self, descriptor: &BuildDescriptor) -> CacheKey {
        derive_key(descriptor, &self.config.cache_dir, &self.config.cache_host)
    }

    /// Resolve with full diagnostics.
    pub async fn resolve(&self, descriptor: &BuildDescriptor) -> Result<Resolution, ResolveError> {
        let key = self.key_for(descriptor);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;
        resolver::resolve(&key, &*self.transport, &*self.reporter).await
    }

    /// Publish with full diagnostics.
    pub async fn publish(
        &self,
        descriptor: &BuildDescriptor,
        build_path: &Path,
    ) -> Result<PathBuf, PublishError> {
        let key = self.key_for(descriptor);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;
        publisher::publish(&key, build_path).await
    }

    /// Path of a usable cached build, or `None` to build from scratch. Never fails.
    pub async fn resolve_build_cache(&self, descriptor: &BuildDescriptor) -> Option<PathBuf> {
        match self.resolve(descriptor).await {
            Ok(resolution) => resolution.into_path(),
            Err(e) => {
                self.reporter.unavailable(&e.to_string());
                None
            }
        }
    }

    /// Best-effort copy of a finished build into the local cache. Never fails.
    pub async fn upload_build_cache(&self, descriptor: &BuildDescriptor, build_path: &Path) {
        match self.publish(descriptor, build_path).await {
            Ok(path) => self.reporter.cached(&path),
            Err(e) => self.reporter.cache_failed(&e.to_string()),
        }
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(key.file_name.clone()).or_default().clone()
    }
}

/// Stand-in used when the pinned client could not be built.
#[derive(Debug)]
struct Unavailable(String);

#[async_trait]
impl Transport for Unavailable {
    async fn get(&self, _url: &str) -> Result<Fetch, TransportError> {
        Err(TransportError::Request(format!(
            "remote cache unavailable: {}",
            self.0
        )))
    }
}
