use std::io::Write;

use crate::http::body::{BodySink, WireSink};
use crate::http::encoding::Coding;
use crate::http::error::HttpError;
use crate::http::headers::canonical_name;
use crate::http::request::{Method, Request, Version};
use crate::http::response::Response;

/// Decides whether the connection outlives this exchange.
///
/// No request (the head could not be parsed) always closes. Otherwise an
/// explicit `Connection: close` on either side closes, and the request's
/// version defaults apply: HTTP/1.1 persists, HTTP/1.0 needs `keep-alive`.
pub fn should_keep_alive(request: Option<&Request<'_>>, response: &Response) -> bool {
    let Some(request) = request else {
        return false;
    };
    if request.close_delimited || response.headers.has_token("connection", "close") {
        return false;
    }
    request.keep_alive()
}

/// True when the client's `Accept-Encoding` admits gzip.
fn accepts_gzip(request: &Request<'_>) -> bool {
    request.headers.tokens("accept-encoding").iter().any(|entry| {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or("").trim();
        let refused = parts.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        !refused && (coding.eq_ignore_ascii_case("gzip") || coding == "*")
    })
}

/// Body framing chosen for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    None,
    Length(u64),
    Chunked,
    UntilClose,
}

/// Serializes prepared responses onto the connection.
#[derive(Debug, Clone, Copy)]
pub struct ResponseWriter {
    compression: bool,
}

impl ResponseWriter {
    pub fn new(compression: bool) -> Self {
        Self { compression }
    }

    /// Writes status line, headers and body. Returns whether the connection
    /// stays open.
    pub fn write<W: Write>(
        &self,
        out: &mut W,
        request: Option<&Request<'_>>,
        mut response: Response,
    ) -> Result<bool, HttpError> {
        let version = match request.map(|r| r.version) {
            Some(Version::HTTP_10) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };
        let mut keep_alive = should_keep_alive(request, &response);

        let head_only = request.is_some_and(|r| r.method == Method::HEAD);
        let has_body = response.status.allows_body() && response.content_length() != Some(0);
        let compress = self.compression
            && has_body
            && !head_only
            && request.is_some_and(accepts_gzip)
            && !response.headers.contains("content-encoding");

        let headers = &mut response.headers;
        headers.remove("content-length");
        headers.remove("transfer-encoding");

        let framing = if !response.status.allows_body() {
            Framing::None
        } else if compress {
            headers.set("content-encoding", Coding::Gzip.token());
            headers.append("vary", "Accept-Encoding");
            if version >= Version::HTTP_11 {
                Framing::Chunked
            } else {
                Framing::UntilClose
            }
        } else {
            match response.content_length() {
                Some(length) => Framing::Length(length),
                None if version >= Version::HTTP_11 => Framing::Chunked,
                None => Framing::UntilClose,
            }
        };

        let headers = &mut response.headers;
        match framing {
            Framing::Length(length) => headers.set("content-length", length.to_string()),
            Framing::Chunked => headers.set("transfer-encoding", Coding::Chunked.token()),
            Framing::UntilClose if !head_only => keep_alive = false,
            _ => {}
        }

        headers.remove("connection");
        if !keep_alive {
            headers.set("connection", "close");
        } else if version == Version::HTTP_10 {
            headers.set("connection", "keep-alive");
        }

        out.write_all(&serialize_head(version, &response))?;

        if head_only || framing == Framing::None {
            out.flush()?;
            return Ok(keep_alive);
        }

        let mut sink: Box<dyn BodySink + '_> = Box::new(WireSink::new(out));
        if framing == Framing::Chunked {
            sink = Coding::Chunked.encoder(sink);
        }
        if compress {
            sink = Coding::Gzip.encoder(sink);
        }

        response.write(sink.as_mut())?;
        sink.finish()?;

        tracing::debug!(
            status = response.status.as_u16(),
            ?framing,
            keep_alive,
            "Response written"
        );
        Ok(keep_alive)
    }
}

fn serialize_head(version: Version, response: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        version,
        response.status.as_u16(),
        response.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (name, value) in response.headers.iter() {
        buf.extend_from_slice(canonical_name(name).as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}
