//! Pin command

use std::path::Path;

use anyhow::{Context, Result};
use buildcache_core::PinnedCertificate;

/// Print the pin the client would enforce for `cert` (or the embedded certificate).
pub fn pin(cert: Option<&Path>) -> Result<()> {
    let pinned = match cert {
        Some(path) => PinnedCertificate::from_file(path)
            .with_context(|| format!("Failed to load certificate {}", path.display()))?,
        None => PinnedCertificate::embedded().context("Embedded certificate is invalid")?,
    };
    println!("{}", pinned.spki_sha256());
    Ok(())
}
