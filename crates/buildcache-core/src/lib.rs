//! buildcache core - resolve native build artifacts from a local disk cache or a
//! pinned remote cache server, and publish fresh builds back to disk.
//!
//! # Architecture
//!
//! - **Key Deriver** ([`key`]): `(platform, fingerprint)` → local path + remote URL.
//! - **Secure Transport** ([`transport`], [`pin`]): HTTPS GET trusting one embedded
//!   certificate and pinning its SubjectPublicKeyInfo digest.
//! - **Cache Resolver** ([`resolver`]): local disk first, then remote, with
//!   temp-file-then-rename commits.
//! - **Cache Publisher** ([`publisher`]): copies a finished build into the local cache.
//! - **Facade** ([`cache::BuildCache`]): the two entry points an orchestrator calls.
//!   Every failure degrades to "no cache available".
//!
//! # Directory Layout
//!
//! ```text
//! $TMPDIR/
//! ├── build.<hash>.apk            # android entry (single file)
//! ├── build.<hash>.app/           # ios entry (directory, shipped as .tgz)
//! ├── build.<hash>.apk.download   # in-flight download, never left behind
//! └── build.<hash>.app.upload/    # in-flight publish, never left behind
//! ```

pub mod cache;
pub mod config;
pub mod io;
pub mod key;
pub mod pin;
pub mod publisher;
pub mod reporter;
pub mod resolver;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::BuildCache;
pub use config::CacheConfig;
pub use key::{ArtifactShape, CacheKey};
pub use pin::PinnedCertificate;
pub use reporter::{LogReporter, NullReporter, Reporter};
pub use resolver::Resolution;
pub use transport::{Fetch, PinnedTransport, Transport};
pub use types::{BuildDescriptor, Platform};
