//! Credential, trust and transport configuration.
//!
//! Builds the rustls and Quinn configs used by [`Listener`] and
//! [`Connector`]. TLS 1.3 is the only protocol version offered on
//! either side, and the client's trust decision is always an explicit
//! [`TrustPolicy`] value.
//!
//! [`Listener`]: super::Listener
//! [`Connector`]: super::Connector

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::error::ExchangeError;

/// ALPN identifier both sides must offer for the handshake to complete.
pub const EXCHANGE_ALPN: &[u8] = b"qex/1";

// ============================================================================
// Server credentials
// ============================================================================

/// Where the server certificate and private key come from.
#[derive(Clone, Debug)]
pub enum ServerCredentials {
    /// PEM certificate chain and private key files (production).
    PemFiles { cert_path: PathBuf, key_path: PathBuf },
    /// Freshly generated self-signed certificate (tests and local
    /// development only; clients must opt into trusting it).
    SelfSigned { subject_alt_names: Vec<String> },
}

impl ServerCredentials {
    /// Credentials from a PEM certificate/key file pair.
    pub fn pem_files(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self::PemFiles {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Self-signed credentials for the given subject alternative names.
    pub fn self_signed(subject_alt_names: &[&str]) -> Self {
        Self::SelfSigned {
            subject_alt_names: subject_alt_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load or generate the certificate chain and key.
    pub(crate) fn load(
        &self,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ExchangeError> {
        match self {
            Self::PemFiles { cert_path, key_path } => {
                let certs = load_certs_from_pem(cert_path)?;
                let key = load_key_from_pem(key_path)?;
                Ok((certs, key))
            }
            Self::SelfSigned { subject_alt_names } => {
                generate_self_signed(subject_alt_names.clone())
            }
        }
    }
}

// ============================================================================
// Client trust policy
// ============================================================================

/// How the client verifies the server certificate.
///
/// This is an explicit, auditable value. The safe default is
/// [`TrustPolicy::SystemRoots`]; skipping verification must be opted
/// into by naming [`TrustPolicy::DangerouslySkipVerification`] in the
/// caller's own code.
#[derive(Clone, Debug, Default)]
pub enum TrustPolicy {
    /// Verify against the platform's trusted root certificates.
    #[default]
    SystemRoots,
    /// Trust a single DER-encoded CA certificate, e.g. a test CA or a
    /// self-signed server certificate.
    CustomCa(Vec<u8>),
    /// Accept any certificate. Only for controlled test environments.
    DangerouslySkipVerification,
}

// ============================================================================
// Transport tuning
// ============================================================================

/// The subset of Quinn transport parameters this crate exposes.
///
/// Congestion control and flow-control windows stay at Quinn's
/// defaults; a request/response exchange has no policy of its own
/// there.
#[derive(Clone, Debug)]
pub struct TransportTuning {
    /// Idle timeout after which a silent session is dropped.
    pub max_idle_timeout: Duration,
    /// Keep-alive ping interval, `None` to disable.
    pub keep_alive_interval: Option<Duration>,
    /// Maximum concurrent bidirectional streams a peer may open.
    pub max_concurrent_bi_streams: u32,
}

impl Default for TransportTuning {
    fn default() -> Self {
        Self {
            max_idle_timeout: Duration::from_secs(30),
            keep_alive_interval: None,
            max_concurrent_bi_streams: 100,
        }
    }
}

impl TransportTuning {
    pub fn with_max_idle_timeout(mut self, timeout: Duration) -> Self {
        self.max_idle_timeout = timeout;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    pub fn with_max_concurrent_bi_streams(mut self, count: u32) -> Self {
        self.max_concurrent_bi_streams = count;
        self
    }

    pub(crate) fn apply_to_transport(&self, transport: &mut quinn::TransportConfig) {
        if let Ok(timeout) = self.max_idle_timeout.try_into() {
            transport.max_idle_timeout(Some(timeout));
        }
        transport.keep_alive_interval(self.keep_alive_interval);
        transport.max_concurrent_bidi_streams(quinn::VarInt::from_u32(
            self.max_concurrent_bi_streams,
        ));
    }
}

// ============================================================================
// Credential loading
// ============================================================================

fn generate_self_signed(
    subject_alt_names: Vec<String>,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ExchangeError> {
    let cert = rcgen::generate_simple_self_signed(subject_alt_names)
        .map_err(|e| ExchangeError::TlsConfig(format!("failed to generate certificate: {e}")))?;

    let cert_der = CertificateDer::from(cert.cert);
    let key_der =
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.signing_key.serialize_der()));

    Ok((vec![cert_der], key_der))
}

pub(crate) fn load_certs_from_pem(
    path: &Path,
) -> Result<Vec<CertificateDer<'static>>, ExchangeError> {
    let cert_data = fs::read(path).map_err(|source| ExchangeError::CredentialLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_data.as_slice())
        .filter_map(|r| r.ok())
        .collect();

    if certs.is_empty() {
        return Err(ExchangeError::CredentialParse {
            path: path.to_path_buf(),
        });
    }

    Ok(certs)
}

pub(crate) fn load_key_from_pem(path: &Path) -> Result<PrivateKeyDer<'static>, ExchangeError> {
    let key_data = fs::read(path).map_err(|source| ExchangeError::CredentialLoad {
        path: path.to_path_buf(),
        source,
    })?;

    // PKCS#8, then RSA, then SEC1.
    let mut reader = key_data.as_slice();
    if let Some(key) = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .filter_map(|r| r.ok())
        .next()
    {
        return Ok(PrivateKeyDer::Pkcs8(key));
    }

    reader = key_data.as_slice();
    if let Some(key) = rustls_pemfile::rsa_private_keys(&mut reader)
        .filter_map(|r| r.ok())
        .next()
    {
        return Ok(PrivateKeyDer::Pkcs1(key));
    }

    reader = key_data.as_slice();
    if let Some(key) = rustls_pemfile::ec_private_keys(&mut reader)
        .filter_map(|r| r.ok())
        .next()
    {
        return Ok(PrivateKeyDer::Sec1(key));
    }

    Err(ExchangeError::CredentialParse {
        path: path.to_path_buf(),
    })
}

fn root_store_from_der(ca_der: &[u8]) -> Result<RootCertStore, ExchangeError> {
    let mut roots = RootCertStore::empty();
    roots
        .add(CertificateDer::from(ca_der.to_vec()))
        .map_err(|e| ExchangeError::TlsConfig(format!("invalid CA certificate: {e}")))?;
    Ok(roots)
}

// ============================================================================
// Skip-verification verifier (test environments only)
// ============================================================================

/// Verifier that accepts any server certificate.
///
/// Reached only through [`TrustPolicy::DangerouslySkipVerification`].
#[derive(Debug)]
struct SkipServerVerification(Arc<rustls::crypto::CryptoProvider>);

impl SkipServerVerification {
    fn new() -> Arc<Self> {
        Arc::new(Self(Arc::new(rustls::crypto::ring::default_provider())))
    }
}

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

// ============================================================================
// Quinn config assembly
// ============================================================================

/// Build the Quinn server config from credentials and tuning.
pub(crate) fn build_server_config(
    credentials: &ServerCredentials,
    tuning: &TransportTuning,
) -> Result<quinn::ServerConfig, ExchangeError> {
    let (certs, key) = credentials.load()?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut crypto = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| ExchangeError::TlsConfig(format!("TLS protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ExchangeError::TlsConfig(format!("invalid certificate: {e}")))?;
    crypto.alpn_protocols = vec![EXCHANGE_ALPN.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicServerConfig::try_from(crypto)
        .map_err(|e| ExchangeError::TlsConfig(format!("QUIC server config: {e}")))?;

    let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_crypto));
    let mut transport = quinn::TransportConfig::default();
    tuning.apply_to_transport(&mut transport);
    server_config.transport_config(Arc::new(transport));

    Ok(server_config)
}

/// Build the Quinn client config for the given trust policy.
pub(crate) fn build_client_config(
    trust: &TrustPolicy,
    tuning: &TransportTuning,
) -> Result<quinn::ClientConfig, ExchangeError> {
    let versions: &[&'static rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

    let mut crypto = match trust {
        TrustPolicy::SystemRoots => {
            use rustls_platform_verifier::BuilderVerifierExt;

            rustls::ClientConfig::builder_with_protocol_versions(versions)
                .with_platform_verifier()
                .map_err(|e| ExchangeError::TlsConfig(format!("platform verifier: {e}")))?
                .with_no_client_auth()
        }
        TrustPolicy::CustomCa(ca_der) => {
            let roots = root_store_from_der(ca_der)?;
            rustls::ClientConfig::builder_with_protocol_versions(versions)
                .with_root_certificates(roots)
                .with_no_client_auth()
        }
        TrustPolicy::DangerouslySkipVerification => {
            rustls::ClientConfig::builder_with_protocol_versions(versions)
                .dangerous()
                .with_custom_certificate_verifier(SkipServerVerification::new())
                .with_no_client_auth()
        }
    };
    crypto.alpn_protocols = vec![EXCHANGE_ALPN.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(crypto)
        .map_err(|e| ExchangeError::TlsConfig(format!("QUIC client config: {e}")))?;

    let mut client_config = quinn::ClientConfig::new(Arc::new(quic_crypto));
    let mut transport = quinn::TransportConfig::default();
    tuning.apply_to_transport(&mut transport);
    client_config.transport_config(Arc::new(transport));

    Ok(client_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trust_policy_verifies() {
        assert!(matches!(TrustPolicy::default(), TrustPolicy::SystemRoots));
    }

    #[test]
    fn self_signed_credentials_load() {
        let creds = ServerCredentials::self_signed(&["localhost"]);
        let (certs, _key) = creds.load().expect("self-signed generation");
        assert_eq!(certs.len(), 1);
    }

    #[test]
    fn missing_cert_file_is_credential_load() {
        let creds = ServerCredentials::pem_files("/nonexistent/cert.pem", "/nonexistent/key.pem");
        match creds.load() {
            Err(ExchangeError::CredentialLoad { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/cert.pem"));
            }
            other => panic!("expected CredentialLoad, got {other:?}"),
        }
    }

    #[test]
    fn server_config_builds_from_self_signed() {
        let creds = ServerCredentials::self_signed(&["localhost"]);
        build_server_config(&creds, &TransportTuning::default()).expect("server config");
    }

    #[test]
    fn skip_verification_client_config_builds() {
        build_client_config(
            &TrustPolicy::DangerouslySkipVerification,
            &TransportTuning::default(),
        )
        .expect("client config");
    }
}
