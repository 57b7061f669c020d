//! Chunked transfer coding (RFC 7230 section 4.1).

use std::io::Read;

use crate::http::body::{BodyRead, BodySink};
use crate::http::error::HttpError;
use crate::http::headers::{HeaderMap, HeaderParser};
use crate::http::reader::LineReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data(u64),
    Crlf,
    Trailers,
    Done,
}

/// Decodes a chunked body straight off the connection.
///
/// Chunk extensions are parsed and discarded. Trailer fields are collected
/// and handed over through [`BodyRead::take_trailers`].
pub struct ChunkedDecoder<'c, R> {
    reader: &'c mut LineReader<R>,
    headers: HeaderParser,
    state: ChunkState,
    trailers: Option<HeaderMap>,
}

impl<'c, R: Read> ChunkedDecoder<'c, R> {
    pub fn new(reader: &'c mut LineReader<R>, headers: HeaderParser) -> Self {
        Self {
            reader,
            headers,
            state: ChunkState::Size,
            trailers: None,
        }
    }

    /// Any failure on the size line, an over-long one included, leaves the
    /// stream unframed.
    fn read_size(&mut self) -> Result<u64, HttpError> {
        let line = self.reader.read_line().map_err(|e| match e {
            HttpError::Io(e) => HttpError::Io(e),
            HttpError::LineTooLong { limit } => {
                HttpError::InvalidChunkSize(format!("size line longer than {} bytes", limit))
            }
            _ => HttpError::TruncatedBody,
        })?;
        if line.is_empty() && self.reader.is_eof() {
            return Err(HttpError::TruncatedBody);
        }
        parse_chunk_size(&line)
    }

    fn read_crlf(&mut self) -> Result<(), HttpError> {
        match (self.reader.read_byte()?, self.reader.read_byte()?) {
            (Some(b'\r'), Some(b'\n')) => Ok(()),
            (None, _) | (_, None) => Err(HttpError::TruncatedBody),
            _ => Err(HttpError::MalformedChunk),
        }
    }
}

impl<R: Read> BodyRead for ChunkedDecoder<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            match self.state {
                ChunkState::Size => {
                    let size = self.read_size()?;
                    self.state = if size == 0 {
                        ChunkState::Trailers
                    } else {
                        ChunkState::Data(size)
                    };
                }
                ChunkState::Data(remaining) => {
                    let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                    let n = self.reader.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(HttpError::TruncatedBody);
                    }

                    let left = remaining - n as u64;
                    self.state = if left == 0 {
                        ChunkState::Crlf
                    } else {
                        ChunkState::Data(left)
                    };
                    return Ok(n);
                }
                ChunkState::Crlf => {
                    self.read_crlf()?;
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailers => {
                    let trailers = self.headers.parse(self.reader).map_err(|e| match e {
                        HttpError::Incomplete => HttpError::TruncatedBody,
                        HttpError::Io(e) => HttpError::Io(e),
                        _ => HttpError::MalformedChunk,
                    })?;
                    if !trailers.is_empty() {
                        tracing::debug!(count = trailers.len(), "Received chunked trailers");
                        self.trailers = Some(trailers);
                    }
                    self.state = ChunkState::Done;
                }
                ChunkState::Done => return Ok(0),
            }
        }
    }

    fn take_trailers(&mut self) -> Option<HeaderMap> {
        self.trailers.take()
    }
}

/// Parses `hex-size [; ext-name [= ext-value]]*`.
pub fn parse_chunk_size(line: &str) -> Result<u64, HttpError> {
    let digits = line
        .split_once(';')
        .map_or(line, |(size, _extensions)| size)
        .trim_end_matches([' ', '\t']);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HttpError::InvalidChunkSize(line.to_string()));
    }

    u64::from_str_radix(digits, 16).map_err(|_| HttpError::InvalidChunkSize(line.to_string()))
}

/// Frames every write as one chunk; `finish` emits the terminal chunk.
pub struct ChunkedSink<'w> {
    inner: Box<dyn BodySink + 'w>,
}

impl<'w> ChunkedSink<'w> {
    pub fn new(inner: Box<dyn BodySink + 'w>) -> Self {
        Self { inner }
    }
}

impl BodySink for ChunkedSink<'_> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), HttpError> {
        // An empty chunk would read as the terminator.
        if data.is_empty() {
            return Ok(());
        }

        self.inner.write_all(format!("{:x}\r\n", data.len()).as_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(b"\r\n")
    }

    fn finish(&mut self) -> Result<(), HttpError> {
        self.inner.write_all(b"0\r\n\r\n")?;
        self.inner.finish()
    }
}
