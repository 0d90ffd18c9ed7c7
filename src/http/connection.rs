use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::cache::ContentCache;
use crate::http::parser::{parse_request, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::transport::Transport;

/// Handles a single client connection: parse one request, resolve it
/// against the content cache, send one response, close.
///
/// # State Machine
///
/// ```text
/// Reading -> Processing -> Writing -> Closed
/// ```
///
/// `Reading` parses the request off the transport; a transport failure
/// there skips straight to `Closed` with no response. `Processing` turns
/// the parse outcome into a status and a cache entry (falling back to the
/// on-disk error pages, then to a synthesized plain-text body). `Writing`
/// frames the response onto the transport.
pub struct Connection<S> {
    transport: Transport<S>,
    cache: Arc<ContentCache>,
    extra_headers: Arc<str>,
    state: ConnectionState,
    request_start: Option<Instant>,
}

enum ConnectionState {
    Reading,
    Processing(Result<Request, ParseError>),
    Writing(Response),
    Closed,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(transport: Transport<S>, cache: Arc<ContentCache>, extra_headers: Arc<str>) -> Self {
        Self {
            transport,
            cache,
            extra_headers,
            state: ConnectionState::Reading,
            request_start: None,
        }
    }

    /// Runs the connection to completion. Returns `Ok(())` both on a
    /// normally answered request and on a silently dropped one.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.request_start = Some(Instant::now());
                    match parse_request(&mut self.transport).await {
                        Err(ParseError::Io) => {
                            tracing::debug!("transport failed mid-request, dropping connection");
                            self.state = ConnectionState::Closed;
                        }
                        outcome => {
                            self.state = ConnectionState::Processing(outcome);
                        }
                    }
                }

                ConnectionState::Processing(outcome) => {
                    let (status, request) = classify(outcome);
                    // Only GET carries the body; HEAD and the error paths
                    // of the other methods send the header block alone.
                    let include_body = request
                        .as_ref()
                        .map_or(true, |r| r.method == Method::Get);
                    let response = self.resolve(status, request.as_ref(), include_body).await;

                    if let Some(start) = self.request_start.take() {
                        tracing::info!(
                            method = request.as_ref().map(|r| r.method.as_str()).unwrap_or("-"),
                            path = request.as_ref().map(|r| r.uri.as_str()).unwrap_or("-"),
                            status = response.status.as_u16(),
                            duration_ms = start.elapsed().as_millis(),
                            "request handled"
                        );
                    }

                    self.state = ConnectionState::Writing(response);
                }

                ConnectionState::Writing(response) => {
                    let mut writer = ResponseWriter::new(&response, &self.extra_headers);
                    writer.write_to_transport(&mut self.transport).await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    // Peer may already be gone; nothing to do about it here.
                    let _ = self.transport.shutdown().await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Picks the entry to serve: the requested path on 200, the matching
    /// `/error/<code>/index.html` page otherwise. A missing page downgrades
    /// 200 to 404 and, failing that too, synthesizes a plain-text body.
    async fn resolve(
        &self,
        status: StatusCode,
        request: Option<&Request>,
        include_body: bool,
    ) -> Response {
        let mut status = status;
        if let (StatusCode::Ok, Some(request)) = (status, request) {
            if let Some(entry) = self.cache.find(&request.uri).await {
                return Response::from_entry(status, entry, include_body);
            }
            tracing::debug!(path = %request.uri, "cache miss");
            status = StatusCode::NotFound;
        }

        let page = match status.error_page() {
            Some(page) => page,
            None => return Response::fallback(status, include_body),
        };
        match self.cache.find(page).await {
            Some(entry) => Response::from_entry(status, entry, include_body),
            None => Response::fallback(status, include_body),
        }
    }
}

/// Maps the parse outcome onto the response status. Recognized methods
/// other than GET and HEAD are refused here, not in the parser, so serving
/// more verbs stays a dispatcher-only change.
fn classify(outcome: Result<Request, ParseError>) -> (StatusCode, Option<Request>) {
    match outcome {
        Ok(request) => match request.method {
            Method::Get | Method::Head => (StatusCode::Ok, Some(request)),
            _ => (StatusCode::NotImplemented, Some(request)),
        },
        Err(ParseError::Bad) => (StatusCode::BadRequest, None),
        Err(ParseError::Internal) => (StatusCode::InternalServerError, None),
        // A transport failure drops the connection with no response; the
        // Reading state never forwards it here.
        Err(ParseError::Io) => unreachable!("Io is handled in the Reading state"),
    }
}
