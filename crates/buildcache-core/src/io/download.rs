//! Streams a remote body to a temporary file.

use std::path::Path;

use futures::StreamExt;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::transport::{BodyStream, TransportError};

/// Errors raised while writing a download to disk.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The body stream failed mid-transfer.
    #[error("Transfer failed: {0}")]
    Transport(#[from] TransportError),

    /// The temporary file could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write every chunk of `body` to `dest`, flushing and closing it before returning.
///
/// On failure the partial file is removed. Returns the number of bytes written.
pub async fn stream_to_file<R: Reporter + ?Sized>(
    body: BodyStream,
    dest: &Path,
    url: &str,
    total: Option<u64>,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let result = write_stream(body, dest, url, total, reporter).await;
    if result.is_err() {
        tokio::fs::remove_file(dest).await.ok();
    }
    result
}

async fn write_stream<R: Reporter + ?Sized>(
    mut body: BodyStream,
    dest: &Path,
    url: &str,
    total: Option<u64>,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let mut file = File::create(dest).await?;
    let mut downloaded: u64 = 0;

    reporter.downloading(url, 0, total);
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(url, downloaded, total);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tracing::debug!(dest = %dest.display(), bytes = downloaded, "Download complete");
    Ok(downloaded)
}
