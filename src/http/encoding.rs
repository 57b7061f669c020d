//! Transfer- and content-coding registry.
//!
//! Maps coding tokens to decoder and encoder layers. Decoders wrap a
//! [`BodyRead`], encoders wrap a [`BodySink`]; layers compose in either
//! direction.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};

use crate::http::body::{BodyRead, BodySink};
use crate::http::chunked::{ChunkedDecoder, ChunkedSink};
use crate::http::error::HttpError;
use crate::http::headers::{HeaderMap, HeaderParser};
use crate::http::reader::LineReader;

const CODING_CHUNKED: &str = "chunked";
const CODING_GZIP: &str = "gzip";
const CODING_DEFLATE: &str = "deflate";
const CODING_ANY: &str = "*";
const CODING_IDENTITY: &str = "identity";

const INFLATE_BLOCK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    Chunked,
    Gzip,
    Deflate,
}

impl Coding {
    /// Resolves a `Transfer-Encoding` token. `*` stands for gzip.
    pub fn from_token(token: &str) -> Result<Self, HttpError> {
        let token = token.trim();
        if token.eq_ignore_ascii_case(CODING_CHUNKED) {
            Ok(Coding::Chunked)
        } else if token.eq_ignore_ascii_case(CODING_GZIP) || token == CODING_ANY {
            Ok(Coding::Gzip)
        } else if token.eq_ignore_ascii_case(CODING_DEFLATE) {
            Ok(Coding::Deflate)
        } else {
            Err(HttpError::UnsupportedEncoding(token.to_string()))
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Coding::Chunked => CODING_CHUNKED,
            Coding::Gzip => CODING_GZIP,
            Coding::Deflate => CODING_DEFLATE,
        }
    }

    /// Wraps `source` in this coding's decoder.
    ///
    /// `chunked` frames bytes on the wire and can only sit directly on the
    /// connection, so it is built by [`decoder_stack`] instead. The parser
    /// rejects any `chunked` that is not the final transfer coding.
    fn decoder<'c>(self, source: Box<dyn BodyRead + 'c>) -> Box<dyn BodyRead + 'c> {
        match self {
            Coding::Chunked => source,
            Coding::Gzip => Box::new(InflateBody::new(source, Inflater::gzip())),
            Coding::Deflate => Box::new(InflateBody::new(source, Inflater::zlib())),
        }
    }

    /// Wraps `sink` in this coding's encoder.
    pub fn encoder<'w>(self, sink: Box<dyn BodySink + 'w>) -> Box<dyn BodySink + 'w> {
        match self {
            Coding::Chunked => Box::new(ChunkedSink::new(sink)),
            Coding::Gzip => Box::new(DeflateSink::new(sink, Deflater::gzip())),
            Coding::Deflate => Box::new(DeflateSink::new(sink, Deflater::zlib())),
        }
    }
}

/// Parses a coding list in declaration order.
pub fn parse_codings(tokens: &[&str]) -> Result<Vec<Coding>, HttpError> {
    tokens.iter().map(|t| Coding::from_token(t)).collect()
}

/// Content codings for `Content-Encoding`; `identity` is a no-op and
/// `chunked` is not a content coding.
pub fn parse_content_codings(tokens: &[&str]) -> Result<Vec<Coding>, HttpError> {
    tokens
        .iter()
        .filter(|t| !t.eq_ignore_ascii_case(CODING_IDENTITY))
        .map(|t| match Coding::from_token(t)? {
            Coding::Chunked => Err(HttpError::UnsupportedEncoding(t.to_string())),
            coding => Ok(coding),
        })
        .collect()
}

/// Builds the decoder chain for a transfer-coded body.
///
/// The last coding listed was applied last by the sender, so decoding walks
/// the list backwards: `gzip, chunked` first removes the chunk framing and then
/// gunzips the result. When the list does not end in `chunked`, the body runs
/// until the connection closes.
pub fn decoder_stack<'c, R: Read>(
    reader: &'c mut LineReader<R>,
    headers: HeaderParser,
    codings: &[Coding],
) -> Box<dyn BodyRead + 'c> {
    let mut rest = codings;
    let mut body: Box<dyn BodyRead + 'c> = match codings.last() {
        Some(Coding::Chunked) => {
            rest = &codings[..codings.len() - 1];
            Box::new(ChunkedDecoder::new(reader, headers))
        }
        _ => Box::new(crate::http::body::UntilEofBody::new(reader)),
    };

    for coding in rest.iter().rev() {
        body = coding.decoder(body);
    }
    body
}

/// Wraps `body` in content-coding decoders, last listed first.
pub fn content_decoders<'c>(
    mut body: Box<dyn BodyRead + 'c>,
    codings: &[Coding],
) -> Box<dyn BodyRead + 'c> {
    for coding in codings.iter().rev() {
        body = coding.decoder(body);
    }
    body
}

enum Inflater {
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
}

impl Inflater {
    fn gzip() -> Self {
        Inflater::Gzip(GzDecoder::new(Vec::new()))
    }

    fn zlib() -> Self {
        Inflater::Zlib(ZlibDecoder::new(Vec::new()))
    }

    fn feed(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Inflater::Gzip(d) => d.write_all(data),
            Inflater::Zlib(d) => d.write_all(data),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        match self {
            Inflater::Gzip(d) => d.try_finish(),
            Inflater::Zlib(d) => d.try_finish(),
        }
    }

    fn output(&mut self) -> &mut Vec<u8> {
        match self {
            Inflater::Gzip(d) => d.get_mut(),
            Inflater::Zlib(d) => d.get_mut(),
        }
    }
}

/// Decompresses an inner body stream.
struct InflateBody<'c> {
    inner: Box<dyn BodyRead + 'c>,
    inflater: Inflater,
    pos: usize,
    finished: bool,
}

impl<'c> InflateBody<'c> {
    fn new(inner: Box<dyn BodyRead + 'c>, inflater: Inflater) -> Self {
        Self {
            inner,
            inflater,
            pos: 0,
            finished: false,
        }
    }
}

impl BodyRead for InflateBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut block = [0u8; INFLATE_BLOCK];
        while self.pos >= self.inflater.output().len() && !self.finished {
            self.inflater.output().clear();
            self.pos = 0;

            let n = self.inner.read(&mut block)?;
            if n == 0 {
                self.inflater.finish().map_err(HttpError::Decompression)?;
                self.finished = true;
            } else {
                self.inflater
                    .feed(&block[..n])
                    .map_err(HttpError::Decompression)?;
            }
        }

        let pos = self.pos;
        let output = self.inflater.output();
        let n = buf.len().min(output.len() - pos);
        buf[..n].copy_from_slice(&output[pos..pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn take_trailers(&mut self) -> Option<HeaderMap> {
        self.inner.take_trailers()
    }
}

enum Deflater {
    Gzip(GzEncoder<Vec<u8>>),
    Zlib(ZlibEncoder<Vec<u8>>),
}

impl Deflater {
    fn gzip() -> Self {
        Deflater::Gzip(GzEncoder::new(Vec::new(), Compression::default()))
    }

    fn zlib() -> Self {
        Deflater::Zlib(ZlibEncoder::new(Vec::new(), Compression::default()))
    }

    fn feed(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Deflater::Gzip(e) => e.write_all(data),
            Deflater::Zlib(e) => e.write_all(data),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        match self {
            Deflater::Gzip(e) => e.try_finish(),
            Deflater::Zlib(e) => e.try_finish(),
        }
    }

    fn output(&mut self) -> &mut Vec<u8> {
        match self {
            Deflater::Gzip(e) => e.get_mut(),
            Deflater::Zlib(e) => e.get_mut(),
        }
    }
}

/// Compresses writes and forwards the compressed bytes to an inner sink.
struct DeflateSink<'w> {
    inner: Box<dyn BodySink + 'w>,
    deflater: Deflater,
}

impl<'w> DeflateSink<'w> {
    fn new(inner: Box<dyn BodySink + 'w>, deflater: Deflater) -> Self {
        Self { inner, deflater }
    }

    fn forward(&mut self) -> Result<(), HttpError> {
        let output = self.deflater.output();
        if output.is_empty() {
            return Ok(());
        }
        let compressed = std::mem::take(output);
        self.inner.write_all(&compressed)
    }
}

impl BodySink for DeflateSink<'_> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.deflater.feed(data)?;
        self.forward()
    }

    fn finish(&mut self) -> Result<(), HttpError> {
        self.deflater.finish()?;
        self.forward()?;
        self.inner.finish()
    }
}
