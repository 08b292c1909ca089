//! Certificate pinning for the remote cache server.
//!
//! The server is trusted only if both hold:
//!
//! 1. its chain validates against a root store holding *only* the embedded
//!    certificate (the platform trust store is never consulted), and
//! 2. the SHA-256 digest of the leaf's SubjectPublicKeyInfo (DER) equals the pin.
//!
//! A [`PinnedCertificate`] is built once at startup and handed to the transport.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Certificate presented by the remote cache server (`appjs-workshops.local`).
pub const SERVER_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----
MIIDETCCAfmgAwIBAgIUOm5D9uuQKf5kWzeIRpDzfGWXGc0wDQYJKoZIhvcNAQEL
BQAwIDEeMBwGA1UEAwwVYXBwanMtd29ya3Nob3BzLmxvY2FsMB4XDTI1MDUyMjA4
MTQ1NloXDTI2MDUyMjA4MTQ1NlowIDEeMBwGA1UEAwwVYXBwanMtd29ya3Nob3Bz
LmxvY2FsMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAnYwzz3ACmNuD
KdBeAvLbdgkI9KyB7l5jRaFO1kz4c1isdj11fEacplaJlTof8+YzdzhJOpjmql2a
S2SY8vngjq7dagTLNCaBK/ImPfk2BkYdMkXmLfa3DS6s6bu03ZimylIi0PMxHaAM
MnPjGHbKeyimxP1l3S/yTKaIZroBRo5JrJA11IdCgpchETp7K535pCxBZiQlWfMq
GZJm27aAtqiflb9E25qRMYZbmVfcK046F7jiD2JriNhgG+Cw1UppJ4VHnW/nnjSP
0uL3FNNr+4EYqlerBlEQkOtmAAKntG20KLksEtpIOmqvp6wCiOWMIYCVdmLO0E/z
OXYZI/8u8QIDAQABo0MwQTAgBgNVHREEGTAXghVhcHBqcy13b3Jrc2hvcHMubG9j
YWwwHQYDVR0OBBYEFE1tOoLP5O2vY1Ke1YC5a0DgNFMjMA0GCSqGSIb3DQEBCwUA
A4IBAQAgnSDppdmqWHV5XqAx9QUNFJySCLXfuh4ZDs7fUKwlwSghE8a2FTjRMjyH
fdrW0M6uzWLHXRufJeaKAMTbUt3Ev/vEOjiPo0vv/rcgtXNbHxEWFTapstRYNhFh
R7MbQnYy7E4q3Rq5XodnchrKDBK5xJlkY0ccI20v8r+OKvIgfmJgviucFDyT4So6
TVjmczGM3eIcANRRhDN+eozI8rsbvlQIPYt6y4m0W57zLRjz2Wjg8GH/5Fqxr551
D3QsM+nG/ahwsncPSNHrCIbg/eg7IZriDIe02K0pvvniuVG7elIN0FiPybhpdnPT
ctvs3i+V7b+AibORKtyZya6WGDGh
-----END CERTIFICATE-----
";

/// Errors raised while loading a certificate or building the TLS config.
#[derive(Error, Debug)]
pub enum PinError {
    /// The PEM source could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PEM input contained no `CERTIFICATE` block.
    #[error("No certificate found in PEM input")]
    NoCertificate,

    /// The certificate DER could not be parsed or used as a trust root.
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// rustls rejected the resulting configuration.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Trusted certificate plus the base64 SHA-256 digest of its public key.
#[derive(Debug, Clone)]
pub struct PinnedCertificate {
    certs: Vec<CertificateDer<'static>>,
    spki_sha256: String,
}

impl PinnedCertificate {
    /// Pin the compiled-in [`SERVER_CERTIFICATE`].
    pub fn embedded() -> Result<Self, PinError> {
        Self::from_pem(SERVER_CERTIFICATE)
    }

    /// Parse a PEM bundle. The first certificate is the one whose key is pinned;
    /// every certificate in the bundle becomes a trust root.
    pub fn from_pem(pem: &str) -> Result<Self, PinError> {
        let certs = rustls_pemfile::certs(&mut pem.as_bytes()).collect::<Result<Vec<_>, _>>()?;
        let leaf = certs.first().ok_or(PinError::NoCertificate)?;
        let spki_sha256 = spki_sha256(leaf)?;
        Ok(Self { certs, spki_sha256 })
    }

    /// Read and pin a PEM file.
    pub fn from_file(path: &Path) -> Result<Self, PinError> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    /// Replace the pinned digest while keeping the trust roots.
    pub fn with_pin(mut self, spki_sha256: impl Into<String>) -> Self {
        self.spki_sha256 = spki_sha256.into();
        self
    }

    /// Base64 SHA-256 of the pinned SubjectPublicKeyInfo.
    pub fn spki_sha256(&self) -> &str {
        &self.spki_sha256
    }

    /// Build a rustls client config that trusts only these roots and enforces the pin.
    ///
    /// Session resumption is disabled so every connection runs the full verifier.
    pub fn client_config(&self) -> Result<ClientConfig, PinError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = PinnedVerifier::new(self, provider.clone())?;

        let mut config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| PinError::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        config.resumption = rustls::client::Resumption::disabled();
        Ok(config)
    }
}

/// Base64 SHA-256 of a DER certificate's SubjectPublicKeyInfo.
pub fn spki_sha256(cert: &[u8]) -> Result<String, PinError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert)
        .map_err(|e| PinError::InvalidCertificate(e.to_string()))?;
    let digest = Sha256::digest(parsed.public_key().raw);
    Ok(STANDARD.encode(digest))
}

/// Chain validation against the pinned roots, followed by the SPKI pin check.
#[derive(Debug)]
struct PinnedVerifier {
    inner: Arc<WebPkiServerVerifier>,
    spki_sha256: String,
}

impl PinnedVerifier {
    fn new(pinned: &PinnedCertificate, provider: Arc<CryptoProvider>) -> Result<Self, PinError> {
        let mut roots = RootCertStore::empty();
        for cert in &pinned.certs {
            roots
                .add(cert.clone())
                .map_err(|e| PinError::InvalidCertificate(e.to_string()))?;
        }

        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| PinError::Tls(e.to_string()))?;

        Ok(Self {
            inner,
            spki_sha256: pinned.spki_sha256.clone(),
        })
    }
}

impl ServerCertVerifier for PinnedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        let presented = spki_sha256(end_entity)
            .map_err(|_| rustls::Error::InvalidCertificate(CertificateError::BadEncoding))?;
        if presented != self.spki_sha256 {
            tracing::warn!(presented = %presented, "Certificate pinning failed");
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_pin_matches_published_digest() {
        let pinned = PinnedCertificate::embedded().unwrap();
        assert_eq!(
            pinned.spki_sha256(),
            "KCErsLVrhPc+Dit2N0EGDKqjjhJiDDaOp12jPwSViAg="
        );
    }

    #[test]
    fn test_pin_is_over_public_key_not_whole_certificate() {
        let pinned = PinnedCertificate::embedded().unwrap();
        let whole = STANDARD.encode(Sha256::digest(&*pinned.certs[0]));
        assert_ne!(whole, pinned.spki_sha256());
    }

    #[test]
    fn test_regenerated_certificate_with_same_key_keeps_pin() {
        let key = rcgen::KeyPair::generate().unwrap();
        let a = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let b = rcgen::CertificateParams::new(vec!["cache.internal".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();

        assert_ne!(a.der(), b.der());
        assert_eq!(spki_sha256(a.der()).unwrap(), spki_sha256(b.der()).unwrap());
    }

    #[test]
    fn test_empty_pem_is_rejected() {
        assert!(matches!(
            PinnedCertificate::from_pem("not a certificate"),
            Err(PinError::NoCertificate)
        ));
    }

    #[test]
    fn test_with_pin_overrides_digest() {
        let pinned = PinnedCertificate::embedded().unwrap().with_pin("other");
        assert_eq!(pinned.spki_sha256(), "other");
    }

    #[test]
    fn test_client_config_builds() {
        let config = PinnedCertificate::embedded().unwrap().client_config();
        assert!(config.is_ok());
    }
}
