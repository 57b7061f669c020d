use std::fmt;
use std::io::Read;

use crate::http::error::HttpError;
use crate::http::reader::LineReader;

/// Default cap on the number of header fields in one block.
pub const DEFAULT_MAX_HEADERS: usize = 100;

/// Case-insensitive, multi-valued header map.
///
/// Names are stored lowercased. Names keep the order in which they were first
/// inserted and values keep their insertion order under each name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Adds a value after any existing values for `name`.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self
                .entries
                .push((name.to_ascii_lowercase(), vec![value.into()])),
        }
    }

    /// Replaces every value for `name` with `value`.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self
                .entries
                .push((name.to_ascii_lowercase(), vec![value.into()])),
        }
    }

    pub fn remove(&mut self, name: &str) -> Vec<String> {
        match self.position(name) {
            Some(i) => self.entries.remove(i).1,
            None => Vec::new(),
        }
    }

    /// Moves every value of `other` into this map.
    pub fn merge(&mut self, other: HeaderMap) {
        for (name, values) in other.entries {
            for value in values {
                self.append(&name, value);
            }
        }
    }

    /// Comma-separated list elements across every value of `name`, trimmed,
    /// empty elements dropped.
    pub fn tokens(&self, name: &str) -> Vec<&str> {
        self.get_all(name)
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// True when `name` lists `token`, compared case-insensitively.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.tokens(name)
            .iter()
            .any(|t| t.eq_ignore_ascii_case(token))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs, one per stored value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }
}

impl fmt::Display for HeaderMap {
    /// Wire form: one `Name: value` line per value, each ending in CRLF.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", canonical_name(name), value)?;
        }
        Ok(())
    }
}

/// Mixed-case wire spelling of a lowercased header name.
pub fn canonical_name(name: &str) -> String {
    match name {
        "etag" => return "ETag".to_string(),
        "www-authenticate" => return "WWW-Authenticate".to_string(),
        "te" => return "TE".to_string(),
        "dnt" => return "DNT".to_string(),
        _ => {}
    }

    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// RFC 7230 `tchar`.
pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Reads a header block up to and including its terminating empty line.
#[derive(Debug, Clone, Copy)]
pub struct HeaderParser {
    max_headers: usize,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADERS)
    }
}

impl HeaderParser {
    pub fn new(max_headers: usize) -> Self {
        Self { max_headers }
    }

    pub fn parse<R: Read>(&self, reader: &mut LineReader<R>) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        let mut count = 0;

        loop {
            let line = reader.read_line()?;

            if line.is_empty() {
                if reader.is_eof() {
                    return Err(HttpError::Incomplete);
                }
                return Ok(headers);
            }

            // Continuation lines are rejected rather than joined.
            if line.starts_with(' ') || line.starts_with('\t') {
                return Err(HttpError::ObsoleteFolding);
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| HttpError::MalformedHeader(line.clone()))?;

            if name.is_empty() || !name.chars().all(is_token_char) {
                return Err(HttpError::MalformedHeader(line.clone()));
            }

            count += 1;
            if count > self.max_headers {
                return Err(HttpError::TooManyHeaders {
                    limit: self.max_headers,
                });
            }

            headers.append(name, value.trim_matches([' ', '\t']));
        }
    }
}
