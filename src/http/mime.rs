//! Media types and `Accept` header handling.

use std::fmt;

use crate::http::headers::is_token_char;

const WILDCARD: &str = "*";

/// A media type such as `text/plain; charset=utf-8`.
///
/// Values are immutable; the named constructors return fresh instances.
/// Equality is exact. Use [`MimeType::matches`] for the wildcard-aware
/// relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType {
    main: String,
    sub: String,
    params: Vec<(String, String)>,
}

impl MimeType {
    pub fn new(main: &str, sub: &str) -> Self {
        Self {
            main: main.to_ascii_lowercase(),
            sub: sub.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Returns a copy with `name=value` added or replaced.
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.params.retain(|(n, _)| *n != name);
        self.params.push((name, value.to_string()));
        self
    }

    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn text() -> Self {
        Self::new("text", "plain")
    }

    pub fn html() -> Self {
        Self::new("text", "html")
    }

    pub fn json() -> Self {
        Self::new("application", "json")
    }

    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Parses `type/subtype *(; name=value)`. Quoted parameter values are
    /// unquoted.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim();
        let (main, sub) = essence.split_once('/')?;

        let valid = |s: &str| !s.is_empty() && s.chars().all(is_token_char);
        if !valid(main) || !valid(sub) {
            return None;
        }

        let mut mime = Self::new(main, sub);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param.split_once('=')?;
            let name = name.trim();
            if !valid(name) {
                return None;
            }
            mime = mime.with_param(name, value.trim().trim_matches('"'));
        }
        Some(mime)
    }

    pub fn main_type(&self) -> &str {
        &self.main
    }

    pub fn sub_type(&self) -> &str {
        &self.sub
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main, self.sub)
    }

    pub fn is_wildcard(&self) -> bool {
        self.main == WILDCARD || self.sub == WILDCARD
    }

    /// Wildcard-aware, symmetric match on type and subtype. Parameters are
    /// ignored.
    pub fn matches(&self, other: &MimeType) -> bool {
        if self.main == WILDCARD || other.main == WILDCARD {
            return true;
        }
        if self.main != other.main {
            return false;
        }
        self.sub == WILDCARD || other.sub == WILDCARD || self.sub == other.sub
    }

    /// The `q` parameter, 1.0 when absent or unparsable.
    pub fn quality(&self) -> f32 {
        self.param("q")
            .and_then(|q| q.trim().parse::<f32>().ok())
            .filter(|q| (0.0..=1.0).contains(q))
            .unwrap_or(1.0)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)?;
        for (name, value) in &self.params {
            write!(f, "; {}={}", name, value)?;
        }
        Ok(())
    }
}

/// Acceptable types from an `Accept` header, in header order.
///
/// Unparsable entries and entries with `q=0` are dropped. A missing or empty
/// header accepts anything.
pub fn parse_accept(header: Option<&str>) -> Vec<MimeType> {
    let accepted: Vec<MimeType> = header
        .unwrap_or("")
        .split(',')
        .filter_map(|entry| MimeType::parse(entry.trim()))
        .filter(|mime| mime.quality() > 0.0)
        .collect();

    if accepted.is_empty() && header.is_none_or(|h| h.trim().is_empty()) {
        return vec![MimeType::any()];
    }
    accepted
}
