//! Accept loops: one task per session, sequential streams within it.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::exchange;
use crate::quic::{Listener, Session};

/// Application close code used when a session or listener shuts down
/// normally.
pub const CLOSE_CODE_DONE: u32 = 0;

/// Drive the listener until cancelled or closed.
///
/// Each accepted session runs on its own task; a failed handshake is
/// logged and the loop keeps accepting. Cancelling the token closes
/// the listener, which in turn ends every session task.
pub async fn serve(listener: Listener, shutdown: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => {
                listener.close(CLOSE_CODE_DONE, b"server shutdown");
                break;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            None => break,
            Some(Err(e)) => {
                warn!(error = %e, "handshake failed, still accepting");
            }
            Some(Ok(session)) => {
                tokio::spawn(run_session(session, shutdown.child_token()));
            }
        }
    }
    listener.wait_idle().await;
    debug!("accept loop finished");
}

/// Handle all exchanges on one session, one stream at a time.
///
/// Streams are deliberately handled sequentially; the protocol is one
/// logical request/response at a time, and sequential handling keeps
/// this loop free of shared state. A failed exchange terminates only
/// that stream, unless the error shows the session itself is gone.
pub async fn run_session(session: Session, shutdown: CancellationToken) {
    let remote = session.remote_address();
    debug!(%remote, id = session.stable_id(), "session accepted");

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = session.accept_stream() => accepted,
        };

        match accepted {
            Ok((send, recv)) => {
                let served = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    served = exchange::serve_stream(send, recv) => served,
                };
                if let Err(e) = served {
                    warn!(%remote, error = %e, "exchange failed");
                    if e.is_fatal_to_session() {
                        break;
                    }
                }
            }
            Err(e) => {
                // The peer is done or the connection was lost; either
                // way no more streams will arrive.
                debug!(%remote, reason = %e, "session finished");
                break;
            }
        }
    }

    session.close(CLOSE_CODE_DONE, b"session done");
    debug!(%remote, "session released");
}
