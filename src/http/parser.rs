use std::io::Read;

use crate::http::body::SizedBody;
use crate::http::encoding::{
    Coding, content_decoders, decoder_stack, parse_codings, parse_content_codings,
};
use crate::http::error::HttpError;
use crate::http::headers::{DEFAULT_MAX_HEADERS, HeaderParser};
use crate::http::reader::LineReader;
use crate::http::request::{Method, Request, Version, split_target};

/// Stray empty lines tolerated before a request line.
const MAX_LEADING_EMPTY_LINES: usize = 8;

/// Turns the bytes of one request head into a [`Request`].
///
/// The body is attached as a decoding stream over the same reader and is left
/// unread.
#[derive(Debug, Clone, Copy)]
pub struct RequestParser {
    headers: HeaderParser,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADERS)
    }
}

impl RequestParser {
    pub fn new(max_headers: usize) -> Self {
        Self {
            headers: HeaderParser::new(max_headers),
        }
    }

    pub fn parse<'c, R: Read>(&self, reader: &'c mut LineReader<R>) -> Result<Request<'c>, HttpError> {
        let line = read_request_line(reader)?;
        let (method, target, version) = parse_request_line(&line)?;
        let headers = self.headers.parse(reader)?;

        let (target, path, query) = normalize_target(target)?;
        let mut request = Request::from_parts(method, target, path, query, version, headers);

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            version = %request.version,
            "Parsed request head"
        );

        self.attach_body(reader, &mut request)?;
        Ok(request)
    }

    fn attach_body<'c, R: Read>(
        &self,
        reader: &'c mut LineReader<R>,
        request: &mut Request<'c>,
    ) -> Result<(), HttpError> {
        let transfer = request.headers.tokens("transfer-encoding");
        let lengths = request.headers.get_all("content-length");

        if !transfer.is_empty() && !lengths.is_empty() {
            return Err(HttpError::AmbiguousFraming);
        }

        let content = parse_content_codings(&request.headers.tokens("content-encoding"))?;

        if !transfer.is_empty() {
            let codings = parse_codings(&transfer)?;
            if codings[..codings.len() - 1].contains(&Coding::Chunked) {
                return Err(HttpError::ChunkedNotLast(transfer.join(", ")));
            }
            request.close_delimited = codings.last() != Some(&Coding::Chunked);

            let body = decoder_stack(reader, self.headers, &codings);
            let body = content_decoders(body, &content);
            request.set_body(body, None);
            return Ok(());
        }

        if lengths.is_empty() {
            return Ok(());
        }

        let length = parse_content_length(lengths)?;
        if length == 0 {
            return Ok(());
        }

        let body = Box::new(SizedBody::new(reader, length));
        if content.is_empty() {
            request.set_body(body, Some(length));
        } else {
            request.set_body(content_decoders(body, &content), None);
        }
        Ok(())
    }
}

fn read_request_line<R: Read>(reader: &mut LineReader<R>) -> Result<String, HttpError> {
    for _ in 0..=MAX_LEADING_EMPTY_LINES {
        let line = reader.read_line()?;
        if !line.is_empty() {
            if reader.is_eof() {
                return Err(HttpError::Incomplete);
            }
            return Ok(line);
        }
        if reader.is_eof() {
            return Err(HttpError::Incomplete);
        }
    }
    Err(HttpError::BadRequestLine(String::new()))
}

/// Splits `METHOD SP target SP HTTP/major.minor`.
pub fn parse_request_line(line: &str) -> Result<(Method, String, Version), HttpError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(HttpError::BadRequestLine(line.to_string()));
    };

    if target.is_empty() {
        return Err(HttpError::BadRequestLine(line.to_string()));
    }

    let method = Method::from_str(method).ok_or_else(|| HttpError::UnknownMethod(method.to_string()))?;

    let version = Version::parse(version).ok_or_else(|| HttpError::BadRequestLine(line.to_string()))?;
    if version.major > 1 {
        return Err(HttpError::UnsupportedVersion(version.to_string()));
    }

    Ok((method, target.to_string(), version))
}

/// Reduces a target to origin form and splits it into path and query.
/// Absolute-form targets lose their scheme and authority.
fn normalize_target(target: String) -> Result<(String, String, Option<String>), HttpError> {
    if target.starts_with('/') || target == "*" {
        let (path, query) = split_target(&target);
        return Ok((target, path, query));
    }

    let url = url::Url::parse(&target).map_err(|_| HttpError::BadRequestLine(target.clone()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HttpError::BadRequestLine(target));
    }

    let path = url.path().to_string();
    let query = url.query().map(str::to_string);
    let origin = match &query {
        Some(q) => format!("{}?{}", path, q),
        None => path.clone(),
    };
    Ok((origin, path, query))
}

/// Every `Content-Length` value must be the same non-negative decimal.
fn parse_content_length(values: &[String]) -> Result<u64, HttpError> {
    let mut length = None;
    for value in values.iter().flat_map(|v| v.split(',')) {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HttpError::InvalidContentLength(value.to_string()));
        }
        let parsed = value
            .parse::<u64>()
            .map_err(|_| HttpError::InvalidContentLength(value.to_string()))?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(HttpError::InvalidContentLength(value.to_string()));
            }
            _ => length = Some(parsed),
        }
    }
    length.ok_or_else(|| HttpError::InvalidContentLength(String::new()))
}
