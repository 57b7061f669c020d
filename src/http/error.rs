//! Protocol engine errors.
//!
//! Every failure raised while reading, routing or writing an HTTP message is an
//! [`HttpError`]. The connection loop uses [`HttpError::is_silent`] and
//! [`HttpError::closes_connection`] to decide whether a response can still be
//! sent and whether the connection survives.

use std::io;

use thiserror::Error;

use crate::http::response::StatusCode;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request line: {0:?}")]
    BadRequestLine(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("obsolete line folding is not supported")]
    ObsoleteFolding,

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("more than {limit} header fields")]
    TooManyHeaders { limit: usize },

    #[error("both Content-Length and Transfer-Encoding are present")]
    AmbiguousFraming,

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),

    #[error("chunk data not followed by CRLF")]
    MalformedChunk,

    #[error("message body truncated")]
    TruncatedBody,

    #[error("connection closed before the message head was complete")]
    Incomplete,

    #[error("chunked must be the final transfer coding: {0:?}")]
    ChunkedNotLast(String),

    #[error("coding not implemented: {0}")]
    UnsupportedEncoding(String),

    #[error("corrupt compressed body: {0}")]
    Decompression(io::Error),

    #[error("request body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body is not valid UTF-8")]
    InvalidBodyEncoding,

    #[error("no route for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("bad route path {path:?}: {reason}")]
    BadRoutePath { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Status code reported to the client when a response is still possible.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::UnsupportedVersion(_) => StatusCode::HttpVersionNotSupported,
            HttpError::LineTooLong { .. } | HttpError::TooManyHeaders { .. } => {
                StatusCode::RequestHeaderFieldsTooLarge
            }
            HttpError::UnsupportedEncoding(_) => StatusCode::NotImplemented,
            HttpError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
            HttpError::NotFound { .. } => StatusCode::NotFound,
            HttpError::BadRoutePath { .. } => StatusCode::InternalServerError,
            _ => StatusCode::BadRequest,
        }
    }

    /// The peer's byte stream can no longer delimit a response: close without
    /// writing anything.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            HttpError::AmbiguousFraming
                | HttpError::InvalidChunkSize(_)
                | HttpError::MalformedChunk
                | HttpError::TruncatedBody
                | HttpError::Incomplete
                | HttpError::Io(_)
        )
    }

    /// Whether the connection must close after the error response.
    pub fn closes_connection(&self) -> bool {
        !matches!(
            self,
            HttpError::NotFound { .. } | HttpError::InvalidBodyEncoding
        )
    }
}
