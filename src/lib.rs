//! Single-stream request/response exchange over QUIC.
//!
//! Built on Quinn. A [`Listener`] yields encrypted [`Session`]s, each
//! session is served on its own task, and every accepted stream
//! carries exactly one exchange: the server reads the request to
//! end-of-stream and answers with a fixed acknowledgment. Message
//! boundaries rely on end-of-stream signalling, not framing.
//!
//! # Server
//! ```no_run
//! use quic_exchange::{Listener, ServerCredentials, server};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), quic_exchange::ExchangeError> {
//! let listener = Listener::builder()
//!     .with_credentials(ServerCredentials::pem_files("server.crt", "server.key"))
//!     .bind("0.0.0.0:4433")?;
//!
//! let shutdown = CancellationToken::new();
//! server::serve(listener, shutdown).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Client
//! ```no_run
//! use quic_exchange::{Connector, exchange};
//!
//! # async fn run() -> Result<(), quic_exchange::ExchangeError> {
//! let connector = Connector::builder().bind("0.0.0.0:0")?;
//! let session = connector.connect("203.0.113.7:4433", "example.com").await?;
//! let response = exchange::request(&session, b"Hello, QUIC server!").await?;
//! session.close(0, b"done");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod exchange;
pub mod input;
pub mod quic;
pub mod server;

pub use error::ExchangeError;
pub use exchange::{ACK_MESSAGE, request};
pub use quic::{
    Connector, ConnectorBuilder, EXCHANGE_ALPN, Listener, ListenerBuilder, ServerCredentials,
    Session, TransportTuning, TrustPolicy,
};
pub use server::serve;
