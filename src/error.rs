//! Error types for the exchange crate.
//!
//! One enum covers the whole lifecycle: endpoint setup, handshake,
//! stream I/O and console input. Quinn's per-cause error types are
//! preserved as sources where they carry useful detail.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by listeners, connectors, sessions and exchanges.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The endpoint could not be bound to the requested address.
    #[error("failed to bind endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The address string could not be parsed.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// A certificate or key file could not be read.
    #[error("failed to load credentials from '{path}': {source}")]
    CredentialLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A credential file was read but contained no usable material.
    #[error("no usable certificate or key in '{path}'")]
    CredentialParse { path: PathBuf },

    /// rustls or Quinn rejected the assembled TLS configuration.
    #[error("TLS configuration rejected: {0}")]
    TlsConfig(String),

    /// A peer's handshake failed while accepting. The listener keeps
    /// accepting after this.
    #[error("handshake with peer failed: {0}")]
    Accept(#[source] quinn::ConnectionError),

    /// An outgoing connection could not be established.
    #[error("failed to dial {addr}: {reason}")]
    Dial { addr: SocketAddr, reason: String },

    /// A new stream could not be opened on the session.
    #[error("failed to open stream: {0}")]
    StreamOpen(#[source] quinn::ConnectionError),

    /// Reading from a stream failed. End-of-stream is not an error
    /// and never surfaces here.
    #[error("failed to read from stream: {0}")]
    Read(#[from] quinn::ReadError),

    /// Writing to a stream failed.
    #[error("failed to write to stream: {0}")]
    Write(#[from] quinn::WriteError),

    /// The session can produce no further streams.
    #[error("session closed: {0}")]
    SessionClosed(#[source] quinn::ConnectionError),

    /// Console input was empty after trimming.
    #[error("input cannot be empty")]
    EmptyInput,

    /// Console input could not be read at all.
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

impl ExchangeError {
    /// Whether this error means the owning session is no longer
    /// usable, so a per-session loop should stop instead of accepting
    /// the next stream.
    pub fn is_fatal_to_session(&self) -> bool {
        match self {
            Self::SessionClosed(_) => true,
            Self::Read(quinn::ReadError::ConnectionLost(_)) => true,
            Self::Write(quinn::WriteError::ConnectionLost(_)) => true,
            Self::StreamOpen(_) => true,
            _ => false,
        }
    }
}

// finish() reports an already-closed stream through a dedicated type.
impl From<quinn::ClosedStream> for ExchangeError {
    fn from(_: quinn::ClosedStream) -> Self {
        Self::Write(quinn::WriteError::ClosedStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_closed_is_fatal() {
        let err = ExchangeError::SessionClosed(quinn::ConnectionError::LocallyClosed);
        assert!(err.is_fatal_to_session());
    }

    #[test]
    fn empty_input_is_not_fatal() {
        assert!(!ExchangeError::EmptyInput.is_fatal_to_session());
    }

    #[test]
    fn display_names_the_failed_operation() {
        let err = ExchangeError::Dial {
            addr: "127.0.0.1:4433".parse().unwrap(),
            reason: "refused".into(),
        };
        assert!(err.to_string().contains("failed to dial 127.0.0.1:4433"));
    }
}
