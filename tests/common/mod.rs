#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rawbench::http::connection::{Connection, ConnectionLimits, ConnectionSummary};
use rawbench::http::date::DateCache;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::watch;

pub const FIXED_DATE: &str = "Sun, 02 Oct 2016 14:44:11 GMT";
pub const JSON_BODY: &str = r#"{"message":"Hello, World!"}"#;

pub fn fixed_clock() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1475419451)
}

pub fn plaintext_response() -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nServer: Custom\r\nDate: {FIXED_DATE}\r\n\
         Content-Type: text/plain\r\nContent-Length: 13\r\n\r\nHello, World!"
    )
    .into_bytes()
}

pub fn json_response() -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nServer: Custom\r\nDate: {FIXED_DATE}\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{JSON_BODY}",
        JSON_BODY.len()
    )
    .into_bytes()
}

pub fn default_response() -> Vec<u8> {
    format!("HTTP/1.1 200 OK\r\nServer: Custom\r\nDate: {FIXED_DATE}\r\nContent-Length: 0\r\n\r\n")
        .into_bytes()
}

/// In-memory stream that hands out one scripted chunk per read and records
/// everything written to it. Reads return end-of-stream once the script is
/// exhausted.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    reads: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub shut_down: bool,
}

impl ScriptedStream {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            reads: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            written: Vec::new(),
            shut_down: false,
        }
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(mut chunk) = this.reads.pop_front() {
            let n = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..n]);
            if n < chunk.len() {
                this.reads.push_front(chunk.split_off(n));
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().shut_down = true;
        Poll::Ready(Ok(()))
    }
}

/// Runs a connection over the scripted chunks and returns what it wrote.
pub async fn serve_chunks<I, C>(chunks: I) -> (ConnectionSummary, ScriptedStream)
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dates = Arc::new(DateCache::with_clock(fixed_clock));

    let mut conn = Connection::new(
        ScriptedStream::new(chunks),
        dates,
        shutdown_rx,
        ConnectionLimits::default(),
    );
    let summary = conn.run().await.expect("scripted stream never fails");
    drop(shutdown_tx);

    (summary, conn.into_inner())
}
