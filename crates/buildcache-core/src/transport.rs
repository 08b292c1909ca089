//! Secure transport to the remote cache server.
//!
//! One HTTPS GET per call, no retries. Outcomes are three-way so the resolver
//! can tell "the server does not have it" apart from "the server could not be used":
//!
//! | server response          | result                         |
//! |--------------------------|--------------------------------|
//! | 200                      | `Ok(Fetch::Found { .. })`      |
//! | 404                      | `Ok(Fetch::NotFound)`          |
//! | other status (incl. 3xx) | `Err(TransportError::Status)`  |
//! | timeout, DNS, TLS, pin   | `Err(TransportError::Http)`    |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use crate::config::CONNECT_TIMEOUT;
use crate::pin::{PinError, PinnedCertificate};

/// Errors from a remote cache request. A 404 is not one of them.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be constructed (malformed URL).
    #[error("Invalid request: {0}")]
    Request(String),

    /// Connection, TLS (including pin mismatch), timeout or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200 or 404.
    #[error("HTTP Error: {0}")]
    Status(u16),

    /// The pinned TLS configuration could not be built.
    #[error("TLS setup failed: {0}")]
    Pin(#[from] PinError),
}

/// Response body, yielded chunk by chunk.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Outcome of a successful round trip.
pub enum Fetch {
    /// 200: the artifact body.
    Found {
        /// Body chunks, to be written incrementally.
        body: BodyStream,
        /// `Content-Length`, when the server sent one.
        content_length: Option<u64>,
    },
    /// 404: the remote cache does not have this build.
    NotFound,
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found { content_length, .. } => f
                .debug_struct("Found")
                .field("content_length", content_length)
                .finish_non_exhaustive(),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// A single GET against the remote cache.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`. Must not retry.
    async fn get(&self, url: &str) -> Result<Fetch, TransportError>;
}

/// HTTPS client trusting only the pinned certificate.
#[derive(Debug, Clone)]
pub struct PinnedTransport {
    client: Client,
}

impl PinnedTransport {
    /// Build a client that validates against `pinned` and nothing else.
    ///
    /// Plain `http://` URLs are refused and redirects are not followed.
    /// `transfer_timeout` bounds the whole request, body included; without it
    /// only the connect phase is bounded.
    pub fn new(
        pinned: &PinnedCertificate,
        transfer_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let tls = pinned.client_config()?;

        let mut builder = Client::builder()
            .use_preconfigured_tls(tls)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(Policy::none())
            .https_only(true);
        if let Some(timeout) = transfer_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an arbitrary client. Test-only: skips the pinned TLS setup.
    #[cfg(test)]
    pub(crate) fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for PinnedTransport {
    async fn get(&self, url: &str) -> Result<Fetch, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::Request(format!("{url}: {e}")))?;

        tracing::debug!(url = %parsed, "GET");
        let response = self.client.get(parsed).send().await?;

        match response.status() {
            StatusCode::OK => {
                let content_length = response.content_length();
                let body = response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(TransportError::from))
                    .boxed();
                Ok(Fetch::Found {
                    body,
                    content_length,
                })
            }
            StatusCode::NOT_FOUND => Ok(Fetch::NotFound),
            status => Err(TransportError::Status(status.as_u16())),
        }
    }
}
