use std::io;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A connection's output buffer.
///
/// Responses are encoded into [`buffer_mut`](Self::buffer_mut) and pushed to
/// the peer with [`flush_to`](Self::flush_to). The allocation is kept for the
/// life of the connection.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: BytesMut,
    written: u64,
}

impl ResponseWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            written: 0,
        }
    }

    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Encoded bytes not yet written.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes handed to the stream so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub async fn flush_to<W>(&mut self, stream: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.buffer.has_remaining() {
            let n = stream.write_buf(&mut self.buffer).await?;

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n as u64;
        }
        self.buffer.clear();

        stream.flush().await
    }
}
