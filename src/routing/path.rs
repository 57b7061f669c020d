//! Route path templates.
//!
//! `/api/items/{group}/{item}` compiles to an anchored regex with one named
//! group per parameter. Every compiled pattern also accepts an optional
//! trailing slash, an optional `?query` and an optional `#fragment`.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::http::error::HttpError;

/// One or more characters up to the next `/`, `?` or `#`.
const DEFAULT_REQUIREMENT: &str = "[^/?#]+";

/// Group holding the query string. Parameters are captured as `p0`, `p1`, ...
/// so the name never collides with one.
const QUERY_GROUP: &str = "query";

lazy_static! {
    static ref PARAM_NAME: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

#[derive(Debug, Clone)]
pub struct CompiledPath {
    template: String,
    pattern: Regex,
    params: Vec<String>,
}

/// Captures of a successful match, values still URL-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub params: Vec<(String, String)>,
    pub query: Option<String>,
}

impl CompiledPath {
    /// Compiles `template`. `requirements` overrides the regex fragment used
    /// for individual parameters, e.g. `id => \d+`.
    pub fn compile(template: &str, requirements: &HashMap<String, String>) -> Result<Self, HttpError> {
        let bad = |reason: String| HttpError::BadRoutePath {
            path: template.to_string(),
            reason,
        };

        let trimmed = match template.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => template,
        };

        let mut pattern = String::from("^");
        let mut params = Vec::new();
        let mut rest = trimmed;

        while let Some(open) = rest.find('{') {
            pattern.push_str(&regex::escape(&rest[..open]));

            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| bad("unterminated '{'".to_string()))?;
            let name = &after[..close];

            if !PARAM_NAME.is_match(name) {
                return Err(bad(format!("invalid parameter name {:?}", name)));
            }
            if params.iter().any(|p| p == name) {
                return Err(bad(format!("duplicate parameter {:?}", name)));
            }

            let requirement = requirements
                .get(name)
                .map_or(DEFAULT_REQUIREMENT, String::as_str);
            pattern.push_str(&format!("(?P<p{}>{})", params.len(), requirement));
            params.push(name.to_string());

            rest = &after[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));

        if trimmed != "/" {
            pattern.push_str("/?");
        }
        pattern.push_str(&format!(r"(?:\?(?P<{}>[^#]*))?(?:#.*)?$", QUERY_GROUP));

        let pattern = Regex::new(&pattern).map_err(|e| bad(e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            pattern,
            params,
        })
    }

    /// Compiles with the default requirement for every parameter.
    pub fn new(template: &str) -> Result<Self, HttpError> {
        Self::compile(template, &HashMap::new())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Tests a raw request target.
    pub fn matches(&self, target: &str) -> Option<PathMatch> {
        let captures = self.pattern.captures(target)?;
        let params = self
            .params
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .name(&format!("p{}", i))
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        let query = captures.name(QUERY_GROUP).map(|m| m.as_str().to_string());
        Some(PathMatch { params, query })
    }
}

impl PartialEq for CompiledPath {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template && self.pattern.as_str() == other.pattern.as_str()
    }
}

impl Eq for CompiledPath {}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
