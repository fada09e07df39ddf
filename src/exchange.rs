//! The request/response exchange conducted over a single stream.
//!
//! There is no application-level framing: message boundaries are
//! end-of-stream only. The sender finishes its write half, the reader
//! accumulates until end-of-stream. One stream carries exactly one
//! exchange.

use quinn::{RecvStream, SendStream};
use tracing::debug;

use crate::error::ExchangeError;
use crate::quic::Session;

/// Fixed acknowledgment the server sends for every received message.
pub const ACK_MESSAGE: &str = "Message received successfully";

/// Chunk size for the read accumulator.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Read a stream to end-of-stream, accumulating all bytes.
///
/// A stream finished by the peer before any bytes arrive yields an
/// empty message; that is a normal completion, not an error.
pub async fn read_message(recv: &mut RecvStream) -> Result<Vec<u8>, ExchangeError> {
    let mut message = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    while let Some(n) = recv.read(&mut chunk).await? {
        message.extend_from_slice(&chunk[..n]);
    }

    Ok(message)
}

/// Write `payload` and finish the send side, signalling end-of-stream
/// to the peer.
pub async fn write_message(send: &mut SendStream, payload: &[u8]) -> Result<(), ExchangeError> {
    send.write_all(payload).await?;
    send.finish()?;
    Ok(())
}

/// Serve one exchange on an accepted stream: read the request to
/// end-of-stream, answer with [`ACK_MESSAGE`], finish the stream.
///
/// Returns the received request size.
pub async fn serve_stream(
    mut send: SendStream,
    mut recv: RecvStream,
) -> Result<usize, ExchangeError> {
    let request = read_message(&mut recv).await?;
    debug!(bytes = request.len(), "request received");

    write_message(&mut send, ACK_MESSAGE.as_bytes()).await?;
    debug!(bytes = ACK_MESSAGE.len(), "response sent");

    Ok(request.len())
}

/// Run one exchange as the client: open a stream, send `payload`,
/// return the response.
///
/// The write half is always finished before reading: the transport
/// only signals end-of-stream to the server after an explicit finish,
/// so a request that skipped it would leave the server reading
/// forever.
pub async fn request(session: &Session, payload: &[u8]) -> Result<Vec<u8>, ExchangeError> {
    let (mut send, mut recv) = session.open_stream().await?;

    write_message(&mut send, payload).await?;
    debug!(bytes = payload.len(), "request sent");

    let response = read_message(&mut recv).await?;
    debug!(bytes = response.len(), "response received");

    Ok(response)
}
