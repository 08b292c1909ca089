//! Upload command

use std::path::Path;

use anyhow::Result;
use buildcache_core::{BuildCache, BuildDescriptor, CacheConfig};

/// Copy a finished build into the local cache. Failures are logged, never returned.
pub async fn upload(config: CacheConfig, descriptor: &BuildDescriptor, build_path: &Path) -> Result<()> {
    let cache = BuildCache::from_config(config);
    cache.upload_build_cache(descriptor, build_path).await;
    Ok(())
}
