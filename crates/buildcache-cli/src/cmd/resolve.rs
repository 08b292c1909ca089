//! Resolve command

use anyhow::Result;
use buildcache_core::{BuildCache, BuildDescriptor, CacheConfig};

/// Print the cached build path, if any. A miss or a broken cache prints nothing
/// (`null` in JSON mode) and still succeeds.
pub async fn resolve(config: CacheConfig, descriptor: &BuildDescriptor, json: bool) -> Result<()> {
    let cache = BuildCache::from_config(config);
    let path = cache.resolve_build_cache(descriptor).await;

    if json {
        let path = path.map(|p| p.display().to_string());
        println!("{}", serde_json::json!({ "path": path }));
    } else if let Some(path) = path {
        println!("{}", path.display());
    }
    Ok(())
}
