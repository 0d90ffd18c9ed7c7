use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the read-ahead buffer backing the parser's peek/next.
pub const BUFFER_SIZE: usize = 512;

/// Byte-oriented connection abstraction. Carries either a plain TCP stream
/// or a TLS session, plus a small fixed read buffer so the parser can peek
/// one byte ahead without consuming it.
///
/// Invariant: `head <= len <= BUFFER_SIZE`.
pub struct Transport<S> {
    stream: S,
    buf: [u8; BUFFER_SIZE],
    head: usize,
    len: usize,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: [0; BUFFER_SIZE],
            head: 0,
            len: 0,
        }
    }

    /// Refills the buffer from the stream when it is exhausted. Returns
    /// false at end of stream.
    async fn fill(&mut self) -> io::Result<bool> {
        if self.head < self.len {
            return Ok(true);
        }
        let n = self.stream.read(&mut self.buf).await?;
        self.head = 0;
        self.len = n;
        Ok(n > 0)
    }

    /// Returns the next byte without consuming it, or `None` at end of
    /// stream.
    pub async fn peek(&mut self) -> io::Result<Option<u8>> {
        if !self.fill().await? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.head]))
    }

    /// Consumes and returns the next byte, or `None` at end of stream.
    pub async fn next(&mut self) -> io::Result<Option<u8>> {
        if !self.fill().await? {
            return Ok(None);
        }
        let b = self.buf[self.head];
        self.head += 1;
        Ok(Some(b))
    }

    /// Writes as much of `buf` as the stream accepts, returning the count.
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    /// Shuts the write side down cleanly (for TLS this sends the
    /// close-notify alert) before the socket is dropped.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
