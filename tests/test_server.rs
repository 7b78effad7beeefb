use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use rawbench::http::connection::ConnectionLimits;
use rawbench::http::date::DateCache;
use rawbench::server::listener::{self, ACCEPT_ERROR_BACKOFF, Accept};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

const JSON_BODY: &[u8] = br#"{"message":"Hello, World!"}"#;

async fn read_until_suffix(client: &mut TcpStream, suffix: &[u8]) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];

    while !received.ends_with(suffix) {
        let n = client.read(&mut buf).await.unwrap();
        assert!(n > 0, "server closed early: {:?}", String::from_utf8_lossy(&received));
        received.extend_from_slice(&buf[..n]);
    }
    received
}

#[tokio::test]
async fn test_serves_pipelined_requests_and_shuts_down() {
    let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let dates = Arc::new(DateCache::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = tokio::spawn(listener::serve(
        socket,
        ConnectionLimits::default(),
        Duration::from_secs(1),
        dates,
        shutdown_rx,
    ));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /plaintext HTTP/1.1\r\nHost: test\r\n\r\nGET /json HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();

    let received = tokio::time::timeout(
        Duration::from_secs(5),
        read_until_suffix(&mut client, JSON_BODY),
    )
    .await
    .expect("responses never arrived");
    let text = String::from_utf8(received).unwrap();

    let plaintext_end = text.find("\r\n\r\nHello, World!").unwrap();
    let json_at = text.find("Content-Type: application/json").unwrap();
    assert!(plaintext_end < json_at);
    assert_eq!(text.matches("HTTP/1.1 200 OK\r\n").count(), 2);
    assert_eq!(text.matches("Server: Custom\r\n").count(), 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server ignored shutdown")
        .unwrap()
        .unwrap();

    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_malformed_request_over_tcp_gets_no_response() {
    let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = tokio::spawn(listener::serve(
        socket,
        ConnectionLimits::default(),
        Duration::from_secs(1),
        Arc::new(DateCache::new()),
        shutdown_rx,
    ));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"GET/plaintext HTTP/1.1\r\n\r\n").await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut received))
        .await
        .expect("connection was not closed")
        .unwrap();
    assert!(received.is_empty());

    shutdown_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}

fn loopback_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

/// Listener whose every accept fails, like a process out of descriptors.
struct ExhaustedListener {
    attempts: Arc<AtomicUsize>,
}

impl Accept for ExhaustedListener {
    type Stream = DuplexStream;

    async fn accept(&self) -> io::Result<(DuplexStream, SocketAddr)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::other("too many open files"))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(loopback_addr())
    }
}

#[tokio::test(start_paused = true)]
async fn test_accept_errors_back_off_before_retrying() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = tokio::spawn(listener::serve(
        ExhaustedListener {
            attempts: Arc::clone(&attempts),
        },
        ConnectionLimits::default(),
        Duration::from_secs(1),
        Arc::new(DateCache::new()),
        shutdown_rx,
    ));

    let window = Duration::from_secs(1);
    tokio::time::sleep(window).await;

    let seen = attempts.load(Ordering::SeqCst);
    let ceiling = (window.as_millis() / ACCEPT_ERROR_BACKOFF.as_millis()) as usize + 1;
    assert!(seen >= 2, "accept was not retried: {seen}");
    assert!(seen <= ceiling, "{seen} accept attempts in {window:?}");

    shutdown_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}

struct ExplodingStream;

impl AsyncRead for ExplodingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        panic!("stream exploded");
    }
}

impl AsyncWrite for ExplodingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Hands out one exploding stream, then waits forever.
#[derive(Default)]
struct SingleUseListener {
    handed_out: AtomicBool,
}

impl Accept for SingleUseListener {
    type Stream = ExplodingStream;

    async fn accept(&self) -> io::Result<(ExplodingStream, SocketAddr)> {
        if self.handed_out.swap(true, Ordering::SeqCst) {
            return std::future::pending().await;
        }
        Ok((ExplodingStream, loopback_addr()))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(loopback_addr())
    }
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contains(&self, needle: &str) -> bool {
        String::from_utf8_lossy(&self.0.lock().unwrap()).contains(needle)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_panicking_connection_is_reported() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(listener::serve(
        SingleUseListener::default(),
        ConnectionLimits::default(),
        Duration::from_secs(1),
        Arc::new(DateCache::new()),
        shutdown_rx,
    ));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !logs.contains("Connection task panicked") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("panic was never reported");

    shutdown_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}
