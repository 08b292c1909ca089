//! buildcache - build artifact cache CLI

use anyhow::Result;
use buildcache_core::BuildDescriptor;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildcache_cli::cmd;
use buildcache_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Resolve {
            platform,
            fingerprint,
            json,
        } => {
            let descriptor = BuildDescriptor::new(platform, fingerprint);
            cmd::resolve::resolve(config, &descriptor, json).await
        }
        Commands::Upload {
            platform,
            fingerprint,
            build_path,
        } => {
            let descriptor = BuildDescriptor::new(platform, fingerprint);
            cmd::upload::upload(config, &descriptor, &build_path).await
        }
        Commands::Pin { cert } => cmd::pin::pin(cert.as_deref()),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
