//! buildcache - resolve and publish native build artifacts
#![allow(clippy::missing_errors_doc)]
//!
//! Thin command-line surface over [`buildcache_core::BuildCache`] for build
//! orchestrators that shell out. Results go to stdout; diagnostics go to stderr.
//!
//! ```text
//! buildcache resolve --platform ios --fingerprint <hash>      # prints a path, or nothing
//! buildcache upload  --platform ios --fingerprint <hash> --build-path <dir>
//! buildcache pin     [--cert server.pem]                      # prints the SPKI pin
//! ```

pub mod cmd;

use std::path::PathBuf;

use buildcache_core::{CacheConfig, Platform};
use clap::{Parser, Subcommand};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "buildcache")]
#[command(author, version, about = "buildcache - resolve and publish native build artifacts")]
pub struct Cli {
    /// Remote cache host, optionally with a port [env: BUILDCACHE_HOST]
    #[arg(long, global = true)]
    pub cache_host: Option<String>,

    /// Directory holding local cache entries [env: BUILDCACHE_DIR]
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> CacheConfig {
        let mut config = CacheConfig::from_env();
        if let Some(host) = &self.cache_host {
            config = config.with_cache_host(host.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir.clone());
        }
        config
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Look up a cached build; prints its path on a hit
    Resolve {
        /// Target platform (ios or android)
        #[arg(long)]
        platform: Platform,
        /// Build fingerprint hash
        #[arg(long)]
        fingerprint: String,
        /// Print `{"path": ...}` instead of a bare path
        #[arg(long)]
        json: bool,
    },
    /// Copy a finished build into the local cache
    Upload {
        /// Target platform (ios or android)
        #[arg(long)]
        platform: Platform,
        /// Build fingerprint hash
        #[arg(long)]
        fingerprint: String,
        /// Build output: an .apk file or an .app directory
        #[arg(long)]
        build_path: PathBuf,
    },
    /// Print the base64 SHA-256 public key pin of a certificate
    Pin {
        /// PEM certificate (defaults to the embedded server certificate)
        #[arg(long)]
        cert: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
