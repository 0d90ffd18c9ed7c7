use bytes::Bytes;

use crate::cache::Entry;

/// HTTP status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
    NotImplemented,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }

    /// Request path of the error page served for this status, if any.
    pub fn error_page(&self) -> Option<&'static str> {
        match self {
            StatusCode::Ok => None,
            StatusCode::BadRequest => Some("/error/400/index.html"),
            StatusCode::NotFound => Some("/error/404/index.html"),
            StatusCode::InternalServerError => Some("/error/500/index.html"),
            StatusCode::NotImplemented => Some("/error/501/index.html"),
        }
    }
}

/// A response ready for serialization: the status plus the body and MIME
/// type taken from a cache entry (or synthesized when none exists).
///
/// `Content-Length` always reflects the full body; `include_body` controls
/// whether the bytes follow the header block (they do only for GET).
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: Bytes,
    pub mime: &'static str,
    pub include_body: bool,
}

impl Response {
    pub fn from_entry(status: StatusCode, entry: Entry, include_body: bool) -> Self {
        Self {
            status,
            body: entry.body,
            mime: entry.mime,
            include_body,
        }
    }

    /// Minimal plain-text stand-in used when the error page for `status` is
    /// not in the cache.
    pub fn fallback(status: StatusCode, include_body: bool) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());
        Self {
            status,
            body: Bytes::from(body),
            mime: "text/plain",
            include_body,
        }
    }
}
