use std::io::Read;

use bytes::{Buf, BytesMut};

use crate::http::error::HttpError;

/// Size of the block pulled from the socket on each refill.
pub const BLOCK_SIZE: usize = 4096;

/// Default cap on a single CRLF-terminated line.
pub const DEFAULT_LINE_LIMIT: usize = 8192;

/// Buffered reader over a connection's input bytes.
///
/// Lines are CRLF-terminated and decoded as Latin-1, so every byte maps to
/// exactly one `char`. A CR that is not followed by LF is kept as a literal
/// character. One reader per connection, used sequentially.
pub struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
    block_size: usize,
    line_limit: usize,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_block_size(inner, BLOCK_SIZE)
    }

    pub fn with_block_size(inner: R, block_size: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(block_size),
            block_size: block_size.max(1),
            line_limit: DEFAULT_LINE_LIMIT,
            eof: false,
        }
    }

    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line_limit = limit;
        self
    }

    pub fn line_limit(&self) -> usize {
        self.line_limit
    }

    /// True once a refill returned zero bytes.
    pub fn is_eof(&self) -> bool {
        self.eof && self.buffer.is_empty()
    }

    /// Waits until at least one byte is buffered. Returns `false` when the
    /// source is exhausted.
    pub fn has_data(&mut self) -> Result<bool, HttpError> {
        if self.buffer.is_empty() {
            self.refill()?;
        }
        Ok(!self.buffer.is_empty())
    }

    fn refill(&mut self) -> Result<(), HttpError> {
        if self.eof {
            return Ok(());
        }

        self.buffer.clear();
        self.buffer.resize(self.block_size, 0);
        let n = loop {
            match self.inner.read(&mut self.buffer[..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.clear();
                    return Err(e.into());
                }
            }
        };
        self.buffer.truncate(n);

        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Reads one byte, `None` at end of stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>, HttpError> {
        if self.buffer.is_empty() {
            self.refill()?;
            if self.buffer.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(self.buffer.get_u8()))
    }

    /// Reads up to the next CRLF and returns the line without the terminator.
    ///
    /// At end of stream the bytes accumulated so far are returned; callers
    /// that must tell a blank line from a truncated one check [`is_eof`].
    ///
    /// [`is_eof`]: LineReader::is_eof
    pub fn read_line(&mut self) -> Result<String, HttpError> {
        let mut line = String::new();
        let mut pending_cr = false;
        let mut length = 0usize;

        while let Some(byte) = self.read_byte()? {
            if pending_cr {
                if byte == b'\n' {
                    return Ok(line);
                }
                line.push('\r');
                pending_cr = false;
            }

            if byte == b'\r' {
                pending_cr = true;
            } else {
                line.push(byte as char);
            }

            length += 1;
            if length > self.line_limit {
                return Err(HttpError::LineTooLong {
                    limit: self.line_limit,
                });
            }
        }

        if pending_cr {
            line.push('\r');
        }
        Ok(line)
    }

    /// Copies buffered bytes into `buf`, refilling once if the buffer is
    /// empty. Returns 0 only at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.buffer.is_empty() {
            self.refill()?;
        }

        let n = buf.len().min(self.buffer.len());
        self.buffer.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}
