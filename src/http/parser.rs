use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::request::{Method, Request, RequestKind};
use crate::server::transport::Transport;

/// Longest accepted URI or fragment, after percent-decoding.
pub const URI_SIZE_MAX: usize = 1024;
/// Longest accepted query-variable or header name.
pub const VAR_NAME_MAX: usize = 128;
/// Longest accepted query-variable or header value.
pub const VAR_VALUE_MAX: usize = 1024;

const HTTP_VERSION_MAJOR_DEFAULT: i32 = 0;
const HTTP_VERSION_MINOR_DEFAULT: i32 = 9;

/// Classified parse failures. The connection handler is the sole translator
/// from these to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The socket failed or the peer closed mid-request. No response is
    /// owed; the connection is dropped.
    Io,
    /// Structural deviation from the request grammar (400).
    Bad,
    /// A parser bound was exceeded (500).
    Internal,
}

/// Reads one request from the transport, byte at a time.
///
/// Recognizes the request line (method, percent-encoded URI with optional
/// query and fragment, HTTP version) followed by headers, or the HTTP/0.9
/// single-line form. All eight method tokens are accepted here; policy on
/// which ones get served lives in the connection handler.
pub async fn parse_request<S>(transport: &mut Transport<S>) -> Result<Request, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let method = read_method(transport).await?;

    // One whitespace byte is required after the method token.
    let b = next(transport).await?;
    if !is_space(b) || b == b'\n' {
        return Err(ParseError::Bad);
    }
    if skip_horizontal_ws(transport).await? == b'\n' {
        return Err(ParseError::Bad);
    }

    let uri = read_uri(transport).await?;

    let mut query_variables = Vec::new();
    if peek(transport).await? == b'?' {
        read_query(transport, &mut query_variables).await?;
    }

    let mut uri_fragment = None;
    if peek(transport).await? == b'#' {
        let _ = next(transport).await?;
        uri_fragment = Some(read_fragment(transport).await?);
    }

    let mut request = Request {
        method,
        uri,
        uri_fragment,
        query_variables,
        headers: Vec::new(),
        http_version_major: HTTP_VERSION_MAJOR_DEFAULT,
        http_version_minor: HTTP_VERSION_MINOR_DEFAULT,
        kind: RequestKind::Full,
    };

    // A newline instead of a version token makes this an HTTP/0.9 simple
    // request: GET only, no headers.
    if skip_horizontal_ws(transport).await? == b'\n' {
        if request.method != Method::Get {
            return Err(ParseError::Bad);
        }
        request.kind = RequestKind::Simple;
        return Ok(request);
    }

    let (major, minor) = read_http_version(transport).await?;
    request.http_version_major = major;
    request.http_version_minor = minor;

    expect_crlf(transport).await?;
    read_headers(transport, &mut request.headers).await?;

    Ok(request)
}

async fn next<S>(transport: &mut Transport<S>) -> Result<u8, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match transport.next().await {
        Ok(Some(b)) => Ok(b),
        Ok(None) | Err(_) => Err(ParseError::Io),
    }
}

async fn peek<S>(transport: &mut Transport<S>) -> Result<u8, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match transport.peek().await {
        Ok(Some(b)) => Ok(b),
        Ok(None) | Err(_) => Err(ParseError::Io),
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Skips whitespace up to, but not including, a newline. Returns the byte
/// the stream is now positioned at.
async fn skip_horizontal_ws<S>(transport: &mut Transport<S>) -> Result<u8, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let b = peek(transport).await?;
        if !is_space(b) || b == b'\n' {
            return Ok(b);
        }
        let _ = next(transport).await?;
    }
}

async fn expect_token<S>(transport: &mut Transport<S>, token: &[u8]) -> Result<(), ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for &want in token {
        if next(transport).await? != want {
            return Err(ParseError::Bad);
        }
    }
    Ok(())
}

async fn read_method<S>(transport: &mut Transport<S>) -> Result<Method, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let method = match next(transport).await? {
        b'C' => {
            expect_token(transport, b"ONNECT").await?;
            Method::Connect
        }
        b'D' => {
            expect_token(transport, b"ELETE").await?;
            Method::Delete
        }
        b'G' => {
            expect_token(transport, b"ET").await?;
            Method::Get
        }
        b'H' => {
            expect_token(transport, b"EAD").await?;
            Method::Head
        }
        b'O' => {
            expect_token(transport, b"PTIONS").await?;
            Method::Options
        }
        b'P' => match next(transport).await? {
            b'O' => {
                expect_token(transport, b"ST").await?;
                Method::Post
            }
            b'U' => {
                expect_token(transport, b"T").await?;
                Method::Put
            }
            _ => return Err(ParseError::Bad),
        },
        b'T' => {
            expect_token(transport, b"RACE").await?;
            Method::Trace
        }
        _ => return Err(ParseError::Bad),
    };

    // The token must be followed by whitespace, not more letters.
    if !is_space(peek(transport).await?) {
        return Err(ParseError::Bad);
    }
    Ok(method)
}

/// Consumes a `%HH` escape (the `%` itself already consumed) and returns
/// the decoded byte.
async fn read_escape<S>(transport: &mut Transport<S>) -> Result<u8, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hi = hex_nibble(next(transport).await?).ok_or(ParseError::Bad)?;
    let lo = hex_nibble(next(transport).await?).ok_or(ParseError::Bad)?;
    Ok((hi << 4) | lo)
}

async fn read_uri<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut uri = Vec::new();
    loop {
        let b = peek(transport).await?;
        if is_space(b) || b == b'?' || b == b'#' {
            break;
        }
        let _ = next(transport).await?;
        let decoded = if b == b'%' {
            read_escape(transport).await?
        } else {
            b
        };
        if uri.len() >= URI_SIZE_MAX {
            return Err(ParseError::Internal);
        }
        uri.push(decoded);
    }

    if uri.last() == Some(&b'/') {
        uri.extend_from_slice(b"index.html");
    }
    if uri.first() != Some(&b'/') {
        return Err(ParseError::Bad);
    }
    String::from_utf8(uri).map_err(|_| ParseError::Bad)
}

async fn read_fragment<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut fragment = Vec::new();
    loop {
        let b = peek(transport).await?;
        if is_space(b) {
            break;
        }
        let _ = next(transport).await?;
        let decoded = if b == b'%' {
            read_escape(transport).await?
        } else {
            b
        };
        if fragment.len() >= URI_SIZE_MAX {
            return Err(ParseError::Internal);
        }
        fragment.push(decoded);
    }
    String::from_utf8(fragment).map_err(|_| ParseError::Bad)
}

/// Parses `var=val` pairs after a `?`, appending each to `variables`.
async fn read_query<S>(
    transport: &mut Transport<S>,
    variables: &mut Vec<(String, String)>,
) -> Result<(), ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = next(transport).await?; // the '?'
    loop {
        let b = peek(transport).await?;
        if is_space(b) || b == b'#' {
            return Ok(());
        }
        let name = read_query_name(transport).await?;
        if next(transport).await? != b'=' {
            return Err(ParseError::Bad);
        }
        let value = read_query_value(transport).await?;
        variables.push((name, value));
        if peek(transport).await? == b'&' {
            let _ = next(transport).await?;
        }
    }
}

async fn read_query_name<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut name = Vec::new();
    loop {
        let b = peek(transport).await?;
        if b == b'=' {
            break;
        }
        if is_space(b) {
            return Err(ParseError::Bad);
        }
        if name.len() >= VAR_NAME_MAX {
            return Err(ParseError::Bad);
        }
        let _ = next(transport).await?;
        name.push(b);
    }
    String::from_utf8(name).map_err(|_| ParseError::Bad)
}

async fn read_query_value<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut value = Vec::new();
    loop {
        let b = peek(transport).await?;
        if b == b'&' || is_space(b) {
            break;
        }
        if value.len() >= VAR_VALUE_MAX {
            return Err(ParseError::Bad);
        }
        let _ = next(transport).await?;
        value.push(b);
    }
    String::from_utf8(value).map_err(|_| ParseError::Bad)
}

async fn read_http_version<S>(transport: &mut Transport<S>) -> Result<(i32, i32), ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    expect_token(transport, b"HTTP/").await?;
    let major = read_version_number(transport).await?;
    if next(transport).await? != b'.' {
        return Err(ParseError::Bad);
    }
    let minor = read_version_number(transport).await?;
    Ok((major, minor))
}

async fn read_version_number<S>(transport: &mut Transport<S>) -> Result<i32, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut digits = String::new();
    loop {
        let b = peek(transport).await?;
        if !b.is_ascii_digit() {
            break;
        }
        let _ = next(transport).await?;
        digits.push(b as char);
    }
    // Rejects both a digit-free version and one that overflows i32.
    digits.parse().map_err(|_| ParseError::Bad)
}

async fn expect_crlf<S>(transport: &mut Transport<S>) -> Result<(), ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if next(transport).await? != b'\r' {
        return Err(ParseError::Bad);
    }
    if next(transport).await? != b'\n' {
        return Err(ParseError::Bad);
    }
    Ok(())
}

/// Parses `Name: value` lines until the bare CRLF that ends the header
/// block. Names and values are stored verbatim.
async fn read_headers<S>(
    transport: &mut Transport<S>,
    headers: &mut Vec<(String, String)>,
) -> Result<(), ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        if peek(transport).await? == b'\r' {
            return expect_crlf(transport).await;
        }
        let name = read_header_name(transport).await?;
        let _ = next(transport).await?; // the ':'
        if next(transport).await? != b' ' {
            return Err(ParseError::Bad);
        }
        let value = read_header_value(transport).await?;
        expect_crlf(transport).await?;
        headers.push((name, value));
    }
}

async fn read_header_name<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut name = Vec::new();
    loop {
        let b = peek(transport).await?;
        if b == b':' {
            break;
        }
        if b == b'\r' || b == b'\n' {
            return Err(ParseError::Bad);
        }
        if name.len() >= VAR_NAME_MAX {
            return Err(ParseError::Bad);
        }
        let _ = next(transport).await?;
        name.push(b);
    }
    String::from_utf8(name).map_err(|_| ParseError::Bad)
}

async fn read_header_value<S>(transport: &mut Transport<S>) -> Result<String, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut value = Vec::new();
    loop {
        let b = peek(transport).await?;
        if b == b'\r' {
            break;
        }
        if value.len() >= VAR_VALUE_MAX {
            return Err(ParseError::Bad);
        }
        let _ = next(transport).await?;
        value.push(b);
    }
    String::from_utf8(value).map_err(|_| ParseError::Bad)
}
