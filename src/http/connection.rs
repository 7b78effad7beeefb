use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::http::context::{ConnectionState, RequestContext};
use crate::http::cursor::InputBuffer;
use crate::http::date::DateCache;
use crate::http::parser::{DEFAULT_MAX_HEADER_BYTES, IgnoreHeaders, ParseError};
use crate::http::response::{ResponseEncoder, Route};
use crate::http::writer::ResponseWriter;

pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Per-connection buffer sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Spare capacity reserved before every read.
    pub read_buffer_size: usize,
    /// Bound on the request line and, separately, on the header block.
    pub max_header_bytes: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

/// Why a connection stopped serving requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection between requests.
    EndOfStream,
    /// The server is shutting down.
    Shutdown,
    /// The peer sent bytes that are not a valid request.
    Malformed(ParseError),
    /// The peer closed the connection in the middle of a request.
    PrematureEndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub requests: u64,
    pub bytes_written: u64,
    pub close: CloseReason,
}

/// Failures that abort a connection. Protocol violations are not errors here,
/// they end up in [`CloseReason`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode response body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serves pipelined requests on one byte stream.
pub struct Connection<S> {
    stream: S,
    input: InputBuffer,
    writer: ResponseWriter,
    context: RequestContext,
    encoder: ResponseEncoder,
    dates: Arc<DateCache>,
    shutdown: watch::Receiver<bool>,
    read_buffer_size: usize,
    requests: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        dates: Arc<DateCache>,
        shutdown: watch::Receiver<bool>,
        limits: ConnectionLimits,
    ) -> Self {
        Self {
            stream,
            input: InputBuffer::with_capacity(limits.read_buffer_size),
            writer: ResponseWriter::with_capacity(limits.read_buffer_size),
            context: RequestContext::new(limits.max_header_bytes),
            encoder: ResponseEncoder::new(),
            dates,
            shutdown,
            read_buffer_size: limits.read_buffer_size,
            requests: 0,
        }
    }

    /// Serves requests until the peer goes away, sends garbage, or the server
    /// shuts down, then closes the write side.
    pub async fn run(&mut self) -> Result<ConnectionSummary, ConnectionError> {
        let close = self.serve().await?;

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "Failed to shut down connection");
        }

        Ok(ConnectionSummary {
            requests: self.requests,
            bytes_written: self.writer.bytes_written(),
            close,
        })
    }

    async fn serve(&mut self) -> Result<CloseReason, ConnectionError> {
        loop {
            if let Err(e) = self.dispatch_buffered().await? {
                return Ok(CloseReason::Malformed(e));
            }

            if *self.shutdown.borrow_and_update() {
                return Ok(CloseReason::Shutdown);
            }

            self.input.reserve(self.read_buffer_size);
            let n = tokio::select! {
                biased;

                _ = self.shutdown.changed() => return Ok(CloseReason::Shutdown),
                read = self.stream.read_buf(self.input.inner_mut()) => read?,
            };

            if n == 0 {
                return Ok(self.end_of_stream());
            }
        }
    }

    /// Answers every request that is fully buffered, in arrival order.
    ///
    /// Each response is flushed before the next request is parsed. Returns the
    /// parse error, if any, in the inner result.
    async fn dispatch_buffered(&mut self) -> Result<Result<(), ParseError>, ConnectionError> {
        loop {
            let mut view = self.input.view();
            let status = self.context.advance(&mut view, &mut IgnoreHeaders);
            let (consumed, examined) = (view.consumed(), view.examined());

            let status = match status {
                Ok(status) => status,
                Err(e) => return Ok(Err(e)),
            };

            if !status.is_complete() {
                self.input.advance_to(consumed, examined);
                return Ok(Ok(()));
            }

            let route = Route::select(self.context.method(), self.context.path());
            self.encoder
                .encode(route, &self.dates.snapshot(), self.writer.buffer_mut())?;
            self.input.advance_to(consumed, examined);

            self.writer.flush_to(&mut self.stream).await?;
            self.context.finish_request();
            self.requests += 1;
        }
    }

    fn end_of_stream(&self) -> CloseReason {
        if self.input.is_empty() && self.context.state() == ConnectionState::StartLine {
            CloseReason::EndOfStream
        } else {
            CloseReason::PrematureEndOfStream
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
