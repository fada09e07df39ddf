//! Server-side endpoint: bind, handshake, yield sessions.

use std::net::SocketAddr;

use quinn::Endpoint;
use tracing::info;

use super::config::{self, ServerCredentials, TransportTuning};
use super::session::Session;
use crate::error::ExchangeError;

/// Accepts incoming sessions on a bound address.
///
/// A single failed handshake surfaces as one `Err` from
/// [`Listener::accept`]; the listener itself stays usable and the
/// caller's loop continues.
///
/// # Example
/// ```no_run
/// # use quic_exchange::{Listener, ServerCredentials};
/// # async fn run() -> Result<(), quic_exchange::ExchangeError> {
/// let listener = Listener::builder()
///     .with_credentials(ServerCredentials::pem_files("server.crt", "server.key"))
///     .bind("0.0.0.0:4433")?;
///
/// while let Some(session) = listener.accept().await {
///     let session = session?;
///     // hand the session to a task
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Listener {
    endpoint: Endpoint,
    local_addr: SocketAddr,
}

impl Listener {
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::new()
    }

    /// Accept the next incoming session.
    ///
    /// Returns `None` once the endpoint has been closed. A handshake
    /// failure is `Some(Err(Accept))` and does not stop the listener.
    pub async fn accept(&self) -> Option<Result<Session, ExchangeError>> {
        let incoming = self.endpoint.accept().await?;
        Some(
            incoming
                .await
                .map(Session::new)
                .map_err(ExchangeError::Accept),
        )
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Port the listener is bound to.
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop accepting and close every session with the given code and
    /// reason. Returns immediately; follow with [`Listener::wait_idle`]
    /// for a graceful stop.
    pub fn close(&self, error_code: u32, reason: &[u8]) {
        self.endpoint.close(error_code.into(), reason);
        info!(addr = %self.local_addr, "listener stopped");
    }

    /// Wait for all sessions on this endpoint to close.
    pub async fn wait_idle(&self) {
        self.endpoint.wait_idle().await;
    }
}

/// Builder for [`Listener`].
pub struct ListenerBuilder {
    credentials: ServerCredentials,
    tuning: TransportTuning,
}

impl ListenerBuilder {
    /// Defaults to a self-signed `localhost` certificate; production
    /// servers replace it via [`ListenerBuilder::with_credentials`].
    pub fn new() -> Self {
        Self {
            credentials: ServerCredentials::self_signed(&["localhost"]),
            tuning: TransportTuning::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: ServerCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_tuning(mut self, tuning: TransportTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Bind to `addr` ("ip:port") and start listening.
    pub fn bind(self, addr: &str) -> Result<Listener, ExchangeError> {
        let socket_addr: SocketAddr =
            addr.parse().map_err(|e: std::net::AddrParseError| {
                ExchangeError::InvalidAddress {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                }
            })?;
        self.bind_addr(socket_addr)
    }

    /// Bind to a parsed socket address and start listening.
    pub fn bind_addr(self, addr: SocketAddr) -> Result<Listener, ExchangeError> {
        let server_config = config::build_server_config(&self.credentials, &self.tuning)?;

        let endpoint = Endpoint::server(server_config, addr)
            .map_err(|source| ExchangeError::Bind { addr, source })?;
        let local_addr = endpoint
            .local_addr()
            .map_err(|source| ExchangeError::Bind { addr, source })?;

        info!(addr = %local_addr, "listener started");
        Ok(Listener {
            endpoint,
            local_addr,
        })
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
