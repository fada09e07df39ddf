//! QUIC transport layer: endpoints, sessions and their configuration.

mod config;
mod connector;
mod listener;
mod session;

pub use config::{EXCHANGE_ALPN, ServerCredentials, TransportTuning, TrustPolicy};
pub use connector::{Connector, ConnectorBuilder};
pub use listener::{Listener, ListenerBuilder};
pub use session::Session;
