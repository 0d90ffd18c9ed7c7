use std::time::SystemTime;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::response::Response;
use crate::server::transport::Transport;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes the status line, headers, and (for GET) the body into one
/// buffer. `extra_headers` is the pre-joined `Key: Value\r\n` block from the
/// configuration and goes out verbatim.
pub fn serialize_response(response: &Response, extra_headers: &str) -> Vec<u8> {
    let body_len = if response.include_body {
        response.body.len()
    } else {
        0
    };
    let mut buf = Vec::with_capacity(256 + extra_headers.len() + body_len);

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        response.status.as_u16(),
        response.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    let date = httpdate::fmt_http_date(SystemTime::now());
    buf.extend_from_slice(format!("Date: {}\r\n", date).as_bytes());
    buf.extend_from_slice(format!("Content-Type: {}\r\n", response.mime).as_bytes());
    buf.extend_from_slice(format!("Content-Length: {}\r\n", response.body.len()).as_bytes());
    buf.extend_from_slice(extra_headers.as_bytes());

    buf.extend_from_slice(b"\r\n");

    if response.include_body {
        buf.extend_from_slice(&response.body);
    }

    buf
}

/// Sends a serialized response over the transport, absorbing short writes.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, extra_headers: &str) -> Self {
        Self {
            buffer: serialize_response(response, extra_headers),
            written: 0,
        }
    }

    pub async fn write_to_transport<S>(
        &mut self,
        transport: &mut Transport<S>,
    ) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = transport.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }
        transport.flush().await?;

        Ok(())
    }
}
