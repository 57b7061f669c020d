use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};

use crate::http::body::{BodyRead, BytesBody, EmptyBody};
use crate::http::cookie::parse_cookie_header;
use crate::http::error::HttpError;
use crate::http::headers::HeaderMap;

const READ_BLOCK: usize = 8192;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// TRACE - Message loop-back test
    TRACE,
    /// CONNECT - Tunnel to the target
    CONNECT,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Method names are case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "TRACE" => Some(Method::TRACE),
            "CONNECT" => Some(Method::CONNECT),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `HTTP/major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_09: Version = Version { major: 0, minor: 9 };
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    /// Parses `HTTP/<digits>.<digits>`.
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.strip_prefix("HTTP/")?.split_once('.')?;
        let number = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u8>().ok()
        };
        Some(Version {
            major: number(major)?,
            minor: number(minor)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// A parsed HTTP request.
///
/// The body is attached as a stream and is not read by the parser. `'c` is
/// the lifetime of the connection reader the body pulls from.
pub struct Request<'c> {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request target exactly as received, path and query included
    pub target: String,
    /// Path part of the target
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    /// Declared body length, `None` when the length is unknown (streamed)
    pub content_length: Option<u64>,
    /// Body ends when the peer closes the connection
    pub close_delimited: bool,
    pub remote_addr: Option<SocketAddr>,
    pub scheme: String,
    pub port: u16,
    body: Box<dyn BodyRead + 'c>,
    path_params: HashMap<String, String>,
}

impl<'c> Request<'c> {
    pub(crate) fn from_parts(
        method: Method,
        target: String,
        path: String,
        query: Option<String>,
        version: Version,
        headers: HeaderMap,
    ) -> Self {
        Self {
            method,
            target,
            path,
            query,
            version,
            headers,
            content_length: Some(0),
            close_delimited: false,
            remote_addr: None,
            scheme: "http".to_string(),
            port: 80,
            body: Box::new(EmptyBody),
            path_params: HashMap::new(),
        }
    }

    pub(crate) fn set_body(&mut self, body: Box<dyn BodyRead + 'c>, length: Option<u64>) {
        self.body = body;
        self.content_length = length;
    }

    /// Retrieves the first value of a header, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn header_values(&self, key: &str) -> &[String] {
        self.headers.get_all(key)
    }

    /// Determines whether the client asked for a persistent connection.
    ///
    /// HTTP/1.1 and later persist unless `Connection: close` is sent; HTTP/1.0
    /// persists only with an explicit `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        if self.headers.has_token("connection", "close") {
            return false;
        }
        if self.version >= Version::HTTP_11 {
            return true;
        }
        self.version == Version::HTTP_10 && self.headers.has_token("connection", "keep-alive")
    }

    /// Decoded query parameters in order of appearance.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// First decoded value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    pub fn cookies(&self) -> Vec<(String, String)> {
        parse_cookie_header(self.headers.get_all("cookie").iter().map(String::as_str))
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Reads the next piece of the body. Trailer fields of a chunked body are
    /// merged into [`Request::headers`] once the body is exhausted.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        let n = self.body.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(trailers) = self.body.take_trailers() {
                self.headers.merge(trailers);
            }
        }
        Ok(n)
    }

    /// Reads the whole body, failing with `BodyTooLarge` past `limit` bytes.
    pub fn read_body(&mut self, limit: usize) -> Result<Bytes, HttpError> {
        if let Some(length) = self.content_length {
            if length > limit as u64 {
                return Err(HttpError::BodyTooLarge { limit });
            }
        }

        let mut body = BytesMut::new();
        let mut block = [0u8; READ_BLOCK];
        loop {
            let n = self.read(&mut block)?;
            if n == 0 {
                return Ok(body.freeze());
            }
            if body.len() + n > limit {
                return Err(HttpError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&block[..n]);
        }
    }

    pub fn read_body_string(&mut self, limit: usize) -> Result<String, HttpError> {
        let body = self.read_body(limit)?;
        String::from_utf8(body.to_vec()).map_err(|_| HttpError::InvalidBodyEncoding)
    }

    /// Reads and drops whatever is left of the body.
    pub fn discard_body(&mut self) -> Result<u64, HttpError> {
        let mut block = [0u8; READ_BLOCK];
        let mut total = 0u64;
        loop {
            let n = self.read(&mut block)?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;
        }
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing requests outside a connection.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Request target, query string included.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.target = Some(path.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request<'static>, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let target = self.target.ok_or("path missing")?;
        let (path, query) = split_target(&target);

        let mut request = Request::from_parts(
            method,
            target,
            path,
            query,
            self.version,
            self.headers,
        );
        let length = self.body.len() as u64;
        request.set_body(Box::new(BytesBody::new(self.body)), Some(length));
        Ok(request)
    }
}

/// Splits an origin-form target into path and query. A fragment is dropped.
pub fn split_target(target: &str) -> (String, Option<String>) {
    let target = target.split_once('#').map_or(target, |(before, _)| before);
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    }
}

/// Decodes `%XX` escapes in a URL component. Invalid escapes are kept as-is;
/// `+` is not treated as a space.
pub fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
