//! End-to-end exchange tests over localhost UDP.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use quic_exchange::{
    ACK_MESSAGE, Connector, ExchangeError, Listener, ServerCredentials, Session, exchange, server,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Start a server with a self-signed `localhost` certificate and run
/// the accept loop in the background.
fn start_server() -> Result<(SocketAddr, CancellationToken)> {
    let listener = Listener::builder().bind("127.0.0.1:0")?;
    let addr = listener.local_addr();

    let shutdown = CancellationToken::new();
    tokio::spawn(server::serve(listener, shutdown.clone()));

    Ok((addr, shutdown))
}

async fn connect_insecure(addr: SocketAddr) -> Result<Session> {
    let connector = Connector::builder()
        .danger_skip_verification()
        .bind("127.0.0.1:0")?;
    Ok(connector.connect_addr(addr, "localhost").await?)
}

#[tokio::test]
async fn round_trip_yields_literal_acknowledgment() -> Result<()> {
    init_tracing();
    let (addr, shutdown) = start_server()?;

    let session = connect_insecure(addr).await?;
    let response = exchange::request(&session, b"Hello, QUIC server!").await?;
    assert_eq!(response, ACK_MESSAGE.as_bytes());

    session.close(0, b"done");
    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn empty_message_is_accepted_not_an_error() -> Result<()> {
    init_tracing();
    let (addr, shutdown) = start_server()?;

    let session = connect_insecure(addr).await?;

    // Finish the write half with zero bytes; the server must treat
    // this as a normal empty message and still acknowledge it.
    let (mut send, mut recv) = session.open_stream().await?;
    send.finish()?;
    let response = exchange::read_message(&mut recv).await?;
    assert_eq!(response, ACK_MESSAGE.as_bytes());

    session.close(0, b"done");
    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn sequential_streams_produce_independent_identical_acks() -> Result<()> {
    init_tracing();
    let (addr, shutdown) = start_server()?;

    let session = connect_insecure(addr).await?;
    let first = exchange::request(&session, b"same payload").await?;
    let second = exchange::request(&session, b"same payload").await?;
    assert_eq!(first, ACK_MESSAGE.as_bytes());
    assert_eq!(first, second);

    session.close(0, b"done");
    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn accept_stream_after_close_fails_fast_with_session_closed() -> Result<()> {
    init_tracing();
    let (addr, shutdown) = start_server()?;

    let session = connect_insecure(addr).await?;
    session.close(0, b"done");

    let accepted = timeout(Duration::from_secs(5), session.accept_stream())
        .await
        .expect("accept_stream must not hang after close");
    match accepted {
        Err(ExchangeError::SessionClosed(_)) => {}
        Err(other) => panic!("expected SessionClosed, got {other}"),
        Ok(_) => panic!("expected SessionClosed, got a stream"),
    }

    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn listener_survives_a_failed_handshake() -> Result<()> {
    init_tracing();
    let (addr, shutdown) = start_server()?;

    // A client trusting an unrelated CA cannot verify the server's
    // self-signed certificate, so its handshake fails.
    let unrelated = rcgen::generate_simple_self_signed(vec!["localhost".into()])?;
    let distrusting = Connector::builder()
        .with_custom_ca(unrelated.cert.der().to_vec())
        .bind("127.0.0.1:0")?;
    assert!(distrusting.connect_addr(addr, "localhost").await.is_err());

    // A subsequent valid connection must still succeed.
    let session = connect_insecure(addr).await?;
    let response = exchange::request(&session, b"still alive?").await?;
    assert_eq!(response, ACK_MESSAGE.as_bytes());

    session.close(0, b"done");
    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn pem_credentials_round_trip_with_custom_ca_client() -> Result<()> {
    init_tracing();

    let certified = rcgen::generate_simple_self_signed(vec!["localhost".into()])?;
    let dir = tempfile::tempdir()?;
    let cert_path = dir.path().join("server.crt");
    let key_path = dir.path().join("server.key");
    std::fs::write(&cert_path, certified.cert.pem())?;
    std::fs::write(&key_path, certified.signing_key.serialize_pem())?;

    let listener = Listener::builder()
        .with_credentials(ServerCredentials::pem_files(&cert_path, &key_path))
        .bind("127.0.0.1:0")?;
    let addr = listener.local_addr();

    let shutdown = CancellationToken::new();
    tokio::spawn(server::serve(listener, shutdown.clone()));

    // This client actually verifies the certificate chain.
    let connector = Connector::builder()
        .with_custom_ca(certified.cert.der().to_vec())
        .bind("127.0.0.1:0")?;
    let session = connector.connect_addr(addr, "localhost").await?;
    let response = exchange::request(&session, b"Hello, QUIC server!").await?;
    assert_eq!(response, ACK_MESSAGE.as_bytes());

    session.close(0, b"done");
    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn missing_credential_file_aborts_listener_startup() {
    init_tracing();

    let result = Listener::builder()
        .with_credentials(ServerCredentials::pem_files(
            "/nonexistent/server.crt",
            "/nonexistent/server.key",
        ))
        .bind("127.0.0.1:0");

    match result {
        Err(ExchangeError::CredentialLoad { .. }) => {}
        other => panic!("expected CredentialLoad, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn cancellation_stops_the_accept_loop() -> Result<()> {
    init_tracing();

    let listener = Listener::builder().bind("127.0.0.1:0")?;
    let addr = listener.local_addr();

    let shutdown = CancellationToken::new();
    let serve_task = tokio::spawn(server::serve(listener, shutdown.clone()));

    // Prove the server was up, then cancel it.
    let session = connect_insecure(addr).await?;
    exchange::request(&session, b"ping").await?;
    session.close(0, b"done");

    shutdown.cancel();
    timeout(Duration::from_secs(5), serve_task)
        .await
        .expect("serve must stop after cancellation")?;
    Ok(())
}
