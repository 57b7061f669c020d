use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::http::headers::DEFAULT_MAX_HEADERS;
use crate::http::reader::DEFAULT_LINE_LIMIT;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_SERVER_NAME: &str = concat!("tessera/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// `Server` header value; `None` leaves the header out
    pub server_name: Option<String>,
    /// Gzip response bodies for clients that accept it
    pub compression: bool,
    pub max_line_length: usize,
    pub max_headers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            server_name: Some(DEFAULT_SERVER_NAME.to_string()),
            compression: true,
            max_line_length: DEFAULT_LINE_LIMIT,
            max_headers: DEFAULT_MAX_HEADERS,
        }
    }
}

impl Config {
    /// Reads the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from a key lookup. Recognized keys: `LISTEN`,
    /// `SERVER_NAME`, `SERVER_HEADER` (`off` suppresses the header),
    /// `COMPRESSION`, `MAX_LINE_LENGTH`, `MAX_HEADERS`. Unparsable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let server_name = match lookup("SERVER_HEADER") {
            Some(flag) if is_off(&flag) => None,
            _ => lookup("SERVER_NAME").or(defaults.server_name),
        };

        Self {
            listen_addr: lookup("LISTEN").unwrap_or(defaults.listen_addr),
            server_name,
            compression: lookup("COMPRESSION")
                .map(|v| !is_off(&v))
                .unwrap_or(defaults.compression),
            max_line_length: lookup("MAX_LINE_LENGTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_line_length),
            max_headers: lookup("MAX_HEADERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_headers),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Invalid server configuration")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
    }
}

fn is_off(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "off" | "false" | "0" | "no"
    )
}
