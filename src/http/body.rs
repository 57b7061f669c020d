//! Body stream contracts and the plain (unencoded) streams.
//!
//! Request bodies are pulled through [`BodyRead`] layers stacked on top of the
//! connection's [`LineReader`]; response bodies are pushed through
//! [`BodySink`] layers stacked on top of the connection's output.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::http::error::HttpError;
use crate::http::headers::HeaderMap;
use crate::http::reader::LineReader;

/// Pull side of a message body.
///
/// `read` may return fewer bytes than requested without the stream being
/// finished; `Ok(0)` means the body is exhausted.
pub trait BodyRead {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError>;

    /// Trailer fields received after the body, available once `read` has
    /// returned 0.
    fn take_trailers(&mut self) -> Option<HeaderMap> {
        None
    }
}

/// Push side of a message body.
pub trait BodySink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), HttpError>;

    /// Terminates the body (final chunk, compressor trailer) and flushes.
    fn finish(&mut self) -> Result<(), HttpError>;
}

pub struct EmptyBody;

impl BodyRead for EmptyBody {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, HttpError> {
        Ok(0)
    }
}

/// In-memory body, used for requests built outside a connection.
pub struct BytesBody {
    data: Bytes,
}

impl BytesBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl BodyRead for BytesBody {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data.split_to(n));
        Ok(n)
    }
}

/// Body bounded by a `Content-Length`.
pub struct SizedBody<'c, R> {
    reader: &'c mut LineReader<R>,
    remaining: u64,
}

impl<'c, R: Read> SizedBody<'c, R> {
    pub fn new(reader: &'c mut LineReader<R>, length: u64) -> Self {
        Self {
            reader,
            remaining: length,
        }
    }
}

impl<R: Read> BodyRead for SizedBody<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.reader.read(&mut buf[..want])?;
        if n == 0 {
            return Err(HttpError::TruncatedBody);
        }

        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Body delimited by the peer closing the connection.
pub struct UntilEofBody<'c, R> {
    reader: &'c mut LineReader<R>,
}

impl<'c, R: Read> UntilEofBody<'c, R> {
    pub fn new(reader: &'c mut LineReader<R>) -> Self {
        Self { reader }
    }
}

impl<R: Read> BodyRead for UntilEofBody<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        self.reader.read(buf)
    }
}

/// Unframed bytes written straight to the connection.
pub struct WireSink<'w, W: Write> {
    out: &'w mut W,
}

impl<'w, W: Write> WireSink<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out }
    }
}

impl<W: Write> BodySink for WireSink<'_, W> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.out.write_all(data)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), HttpError> {
        self.out.flush()?;
        Ok(())
    }
}
