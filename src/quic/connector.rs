//! Client-side endpoint: dial out with an explicit trust policy.

use std::net::SocketAddr;

use quinn::Endpoint;
use tracing::info;

use super::config::{self, TransportTuning, TrustPolicy};
use super::session::Session;
use crate::error::ExchangeError;

/// Dials servers and produces [`Session`]s.
///
/// All connections share one local UDP port. The trust decision is an
/// explicit [`TrustPolicy`]; the default verifies against platform
/// roots, and skipping verification requires the caller to spell out
/// [`ConnectorBuilder::danger_skip_verification`].
///
/// # Example
/// ```no_run
/// # use quic_exchange::Connector;
/// # async fn run() -> Result<(), quic_exchange::ExchangeError> {
/// let connector = Connector::builder().bind("0.0.0.0:0")?;
/// let session = connector.connect("203.0.113.7:4433", "example.com").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connector {
    endpoint: Endpoint,
    local_addr: SocketAddr,
}

impl Connector {
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }

    /// Connect to `server_addr` ("host:port" with a literal IP),
    /// verifying the certificate against `server_name`.
    pub async fn connect(
        &self,
        server_addr: &str,
        server_name: &str,
    ) -> Result<Session, ExchangeError> {
        let addr: SocketAddr =
            server_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ExchangeError::InvalidAddress {
                    addr: server_addr.to_string(),
                    reason: e.to_string(),
                })?;
        self.connect_addr(addr, server_name).await
    }

    /// Connect to a parsed socket address.
    pub async fn connect_addr(
        &self,
        server_addr: SocketAddr,
        server_name: &str,
    ) -> Result<Session, ExchangeError> {
        let connecting =
            self.endpoint
                .connect(server_addr, server_name)
                .map_err(|e| ExchangeError::Dial {
                    addr: server_addr,
                    reason: e.to_string(),
                })?;

        let connection = connecting.await.map_err(|e| ExchangeError::Dial {
            addr: server_addr,
            reason: e.to_string(),
        })?;

        info!(remote = %server_addr, "connected");
        Ok(Session::new(connection))
    }

    /// Local address of the shared UDP socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the endpoint and all of its sessions.
    pub fn close(&self, error_code: u32, reason: &[u8]) {
        self.endpoint.close(error_code.into(), reason);
    }

    /// Wait for all sessions on this endpoint to close.
    pub async fn wait_idle(&self) {
        self.endpoint.wait_idle().await;
    }
}

/// Builder for [`Connector`].
pub struct ConnectorBuilder {
    trust: TrustPolicy,
    tuning: TransportTuning,
}

impl ConnectorBuilder {
    pub fn new() -> Self {
        Self {
            trust: TrustPolicy::SystemRoots,
            tuning: TransportTuning::default(),
        }
    }

    /// Replace the trust policy wholesale.
    pub fn with_trust_policy(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    /// Trust a single DER-encoded CA certificate.
    pub fn with_custom_ca(mut self, ca_der: Vec<u8>) -> Self {
        self.trust = TrustPolicy::CustomCa(ca_der);
        self
    }

    /// Skip server certificate verification. Test environments only.
    pub fn danger_skip_verification(mut self) -> Self {
        self.trust = TrustPolicy::DangerouslySkipVerification;
        self
    }

    pub fn with_tuning(mut self, tuning: TransportTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Bind the local socket ("0.0.0.0:0" for a system-assigned port)
    /// and build the connector.
    pub fn bind(self, addr: &str) -> Result<Connector, ExchangeError> {
        let socket_addr: SocketAddr =
            addr.parse().map_err(|e: std::net::AddrParseError| {
                ExchangeError::InvalidAddress {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                }
            })?;
        self.bind_addr(socket_addr)
    }

    /// Bind a parsed local socket address and build the connector.
    pub fn bind_addr(self, addr: SocketAddr) -> Result<Connector, ExchangeError> {
        let client_config = config::build_client_config(&self.trust, &self.tuning)?;

        let mut endpoint =
            Endpoint::client(addr).map_err(|source| ExchangeError::Bind { addr, source })?;
        endpoint.set_default_client_config(client_config);

        let local_addr = endpoint
            .local_addr()
            .map_err(|source| ExchangeError::Bind { addr, source })?;

        Ok(Connector {
            endpoint,
            local_addr,
        })
    }
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
