/// HTTP request methods the parser recognizes. Which of them the server
/// actually serves is decided by the connection handler, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Post,
    Put,
    Trace,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
        }
    }
}

/// Request flavors from the HTTP RFCs: `Simple` is the HTTP/0.9 single-line
/// GET with no version token and no headers; `Full` is HTTP/1.x with a
/// version and optional headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Simple,
    Full,
}

/// A parsed HTTP request.
///
/// `uri` is fully percent-decoded and a trailing `/` has been rewritten to
/// `/index.html`, so it can be looked up in the content cache directly.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub uri_fragment: Option<String>,
    pub query_variables: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub http_version_major: i32,
    pub http_version_minor: i32,
    pub kind: RequestKind,
}

impl Request {
    /// First value stored for `name`, compared exactly as received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}
