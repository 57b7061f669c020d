use std::fmt;

use bytes::Bytes;

use crate::http::body::BodySink;
use crate::http::cookie::Cookie;
use crate::http::error::HttpError;
use crate::http::headers::HeaderMap;
use crate::http::mime::MimeType;

/// HTTP status codes produced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 100 Continue
    Continue,
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 202 Accepted
    Accepted,
    /// 204 No Content
    NoContent,
    /// 206 Partial Content
    PartialContent,
    /// 301 Moved Permanently
    MovedPermanently,
    /// 302 Found
    Found,
    /// 304 Not Modified
    NotModified,
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 406 Not Acceptable
    NotAcceptable,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 415 Unsupported Media Type
    UnsupportedMediaType,
    /// 416 Range Not Satisfiable
    RangeNotSatisfiable,
    /// 431 Request Header Fields Too Large
    RequestHeaderFieldsTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 503 Service Unavailable
    ServiceUnavailable,
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Continue => 100,
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::Accepted => 202,
            StatusCode::NoContent => 204,
            StatusCode::PartialContent => 206,
            StatusCode::MovedPermanently => 301,
            StatusCode::Found => 302,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::NotAcceptable => 406,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::UnsupportedMediaType => 415,
            StatusCode::RangeNotSatisfiable => 416,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Continue => "Continue",
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::PartialContent => "Partial Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::RangeNotSatisfiable => "Range Not Satisfiable",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// 1xx, 204 and 304 responses never carry a body.
    pub fn allows_body(&self) -> bool {
        let code = self.as_u16();
        !(100..200).contains(&code) && code != 204 && code != 304
    }
}

/// Streams a response body into the writer's sink.
pub type BodyWriter = Box<dyn FnOnce(&mut dyn BodySink) -> Result<(), HttpError> + Send>;

/// Body of a response: nothing, bytes of known length, or a callback whose
/// length is unknown until it runs.
pub enum ResponseBody {
    Empty,
    Bytes(Bytes),
    Stream(BodyWriter),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Represents an HTTP response on its way to the client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Header fields set by the handler
    pub headers: HeaderMap,
    /// Cookies serialized into `Set-Cookie` by the preparer
    pub cookies: Vec<Cookie>,
    pub content_type: Option<MimeType>,
    pub(crate) body: ResponseBody,
    pub(crate) etag: bool,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Cache-Control", "no-cache")
///     .content_type(MimeType::json())
///     .body("{}")
///     .build();
/// ```
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response {
                status,
                headers: HeaderMap::new(),
                cookies: Vec::new(),
                content_type: None,
                body: ResponseBody::Empty,
                etag: false,
            },
        }
    }

    /// Sets a header, replacing earlier values.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.response.headers.set(key, value);
        self
    }

    /// Adds a header value after any existing ones.
    pub fn append_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.response.headers.append(key, value);
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.response.cookies.push(cookie);
        self
    }

    pub fn content_type(mut self, mime: MimeType) -> Self {
        self.response.content_type = Some(mime);
        self
    }

    /// Sets an in-memory body of known length.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = ResponseBody::Bytes(body.into());
        self
    }

    /// Sets a streamed body of unknown length.
    pub fn stream<F>(mut self, writer: F) -> Self
    where
        F: FnOnce(&mut dyn BodySink) -> Result<(), HttpError> + Send + 'static,
    {
        self.response.body = ResponseBody::Stream(Box::new(writer));
        self
    }

    /// Computes an `ETag` from the in-memory body when the response is
    /// prepared.
    pub fn etag(mut self) -> Self {
        self.response.etag = true;
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

impl Response {
    pub fn new(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    /// Creates a `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(status)
            .content_type(MimeType::text().with_param("charset", "utf-8"))
            .body(body)
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::text(StatusCode::NotFound, "404 Not Found")
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        Self::text(StatusCode::InternalServerError, "500 Internal Server Error")
    }

    /// Plain-text response for a status, body `"<code> <reason>"`.
    pub fn for_status(status: StatusCode) -> Self {
        Self::text(
            status,
            format!("{} {}", status.as_u16(), status.reason_phrase()),
        )
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Body length in bytes, `None` when the body is streamed.
    pub fn content_length(&self) -> Option<u64> {
        match &self.body {
            ResponseBody::Empty => Some(0),
            ResponseBody::Bytes(bytes) => Some(bytes.len() as u64),
            ResponseBody::Stream(_) => None,
        }
    }

    /// In-memory body, if the body is not streamed.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub(crate) fn take_body(&mut self) -> ResponseBody {
        std::mem::replace(&mut self.body, ResponseBody::Empty)
    }

    /// Writes the body through `sink`. Does not call `finish`.
    pub fn write(&mut self, sink: &mut dyn BodySink) -> Result<(), HttpError> {
        match self.take_body() {
            ResponseBody::Empty => Ok(()),
            ResponseBody::Bytes(bytes) => sink.write_all(&bytes),
            ResponseBody::Stream(writer) => writer(sink),
        }
    }
}
