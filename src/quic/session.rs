//! Session wrapper around a Quinn connection.

use std::net::SocketAddr;

use quinn::{Connection, RecvStream, SendStream};

use crate::error::ExchangeError;

/// An established, encrypted, multiplexed connection to one peer.
///
/// Both sides of the exchange hold a `Session`; the server accepts
/// streams from it, the client opens streams on it. Cloning is cheap
/// and shares the underlying connection.
#[derive(Clone)]
pub struct Session {
    inner: Connection,
}

impl Session {
    pub(crate) fn new(connection: Connection) -> Self {
        Self { inner: connection }
    }

    /// Remote peer address.
    pub fn remote_address(&self) -> SocketAddr {
        self.inner.remote_address()
    }

    /// Identifier that is stable for the lifetime of this connection.
    pub fn stable_id(&self) -> usize {
        self.inner.stable_id()
    }

    /// Open a bidirectional stream for one exchange (client side).
    pub async fn open_stream(&self) -> Result<(SendStream, RecvStream), ExchangeError> {
        self.inner.open_bi().await.map_err(ExchangeError::StreamOpen)
    }

    /// Accept the next bidirectional stream from the peer (server
    /// side).
    ///
    /// Any connection-level failure means no further streams will
    /// arrive, so every such failure maps to
    /// [`ExchangeError::SessionClosed`]; callers exit their loop on it
    /// rather than retrying. After [`Session::close`] this returns
    /// promptly instead of hanging.
    pub async fn accept_stream(&self) -> Result<(SendStream, RecvStream), ExchangeError> {
        self.inner
            .accept_bi()
            .await
            .map_err(ExchangeError::SessionClosed)
    }

    /// Close the session with an application error code and reason.
    ///
    /// Idempotent: closing an already-closed session is a no-op, so
    /// this is safe on every exit path.
    pub fn close(&self, error_code: u32, reason: &[u8]) {
        self.inner.close(error_code.into(), reason);
    }

    /// Wait until the connection is fully closed, returning the cause.
    pub async fn closed(&self) -> quinn::ConnectionError {
        self.inner.closed().await
    }

    /// Borrow the underlying Quinn connection.
    pub fn inner(&self) -> &Connection {
        &self.inner
    }
}
