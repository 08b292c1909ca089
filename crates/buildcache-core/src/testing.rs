//! Test doubles shared by the unit tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::transport::{BodyStream, Fetch, Transport, TransportError};

pub(crate) fn self_signed(host: &str) -> rcgen::CertifiedKey {
    rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap()
}

pub(crate) async fn collect_body(mut body: BodyStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

/// Path of the request line (`GET /path HTTP/1.1`).
pub(crate) fn request_path(head: &str) -> &str {
    head.split_whitespace().nth(1).unwrap_or("/")
}

/// Response written by [`serve_tls_with`].
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
    stall: bool,
}

impl Reply {
    pub(crate) fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
            stall: false,
        }
    }

    pub(crate) fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Send the head and the first half of the body, then hang.
    pub(crate) fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

/// Minimal HTTPS server answering every request with `status` and `body`.
pub(crate) async fn serve_tls(key: &rcgen::CertifiedKey, status: u16, body: Vec<u8>) -> SocketAddr {
    serve_tls_with(key, move |_| Reply::new(status, body.clone())).await
}

/// Minimal HTTPS server answering each request with `respond(request_head)`.
pub(crate) async fn serve_tls_with<F>(key: &rcgen::CertifiedKey, respond: F) -> SocketAddr
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let cert = key.cert.der().clone();
    let private = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.key_pair.serialize_der()));
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert], private)
    .unwrap();
    let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(config));
    let respond = Arc::new(respond);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let reply = (*respond)(&*String::from_utf8_lossy(&request));

                let mut head = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reply.body.len()
                );
                for (name, value) in &reply.headers {
                    head.push_str(&format!("{name}: {value}\r\n"));
                }
                head.push_str("\r\n");
                let _ = tls.write_all(head.as_bytes()).await;

                if reply.stall {
                    let _ = tls.write_all(&reply.body[..reply.body.len() / 2]).await;
                    let _ = tls.flush().await;
                    std::future::pending::<()>().await;
                }
                let _ = tls.write_all(&reply.body).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    addr
}

/// Canned transport that counts calls.
#[derive(Debug, Clone)]
pub(crate) enum Canned {
    Body(Vec<u8>),
    NotFound,
    Status(u16),
}

#[derive(Debug)]
pub(crate) struct StubTransport {
    response: Canned,
    calls: AtomicUsize,
}

impl StubTransport {
    pub(crate) fn new(response: Canned) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, _url: &str) -> Result<Fetch, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Canned::Body(bytes) => {
                // Split into two chunks to exercise incremental writes.
                let mid = bytes.len() / 2;
                let chunks = vec![
                    Ok(Bytes::copy_from_slice(&bytes[..mid])),
                    Ok(Bytes::copy_from_slice(&bytes[mid..])),
                ];
                Ok(Fetch::Found {
                    body: futures::stream::iter(chunks).boxed(),
                    content_length: Some(bytes.len() as u64),
                })
            }
            Canned::NotFound => Ok(Fetch::NotFound),
            Canned::Status(code) => Err(TransportError::Status(*code)),
        }
    }
}

/// gzip-tar holding `files` (relative path, contents).
pub(crate) fn tgz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Sorted (relative path, contents) of every file under `root`.
pub(crate) fn tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}
