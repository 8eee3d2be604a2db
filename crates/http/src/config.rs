//! Connection-level limits and defaults.
//!
//! A [`Config`] is built once by the embedding application and shared
//! read-only (usually behind an `Arc`) by every connection it serves.

use std::time::Duration;

pub const DEFAULT_REQUEST_LINE_SIZE: usize = 2 * 1024;
pub const MAX_REQUEST_LINE_SIZE: usize = 16 * 1024;

pub const DEFAULT_HEADERS_NUMBER: usize = 10;
pub const MAX_HEADERS_NUMBER: usize = 50;
pub const DEFAULT_HEADERS_SPACE: usize = 1024;
pub const MAX_HEADERS_SPACE: usize = 16 * 1024;
pub const MAX_ENCODING_TOKENS: usize = 4;

pub const MAX_BODY_SIZE: u64 = 512 * 1024 * 1024;

pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 1024;
pub const MAX_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// A pair of initial and upper-bound sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub default: usize,
    pub maximal: usize,
}

impl Bounds {
    pub const fn new(default: usize, maximal: usize) -> Self {
        Self { default, maximal }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersConfig {
    /// How many headers a request may carry.
    pub number: Bounds,
    /// Bytes available for header keys and values combined.
    pub space: Bounds,
    /// Tokens accepted in a single Transfer-Encoding or Content-Encoding value.
    pub max_encoding_tokens: usize,
    /// Headers added to every response unless the response sets the same key.
    pub default: Vec<(String, String)>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            number: Bounds::new(DEFAULT_HEADERS_NUMBER, MAX_HEADERS_NUMBER),
            space: Bounds::new(DEFAULT_HEADERS_SPACE, MAX_HEADERS_SPACE),
            max_encoding_tokens: MAX_ENCODING_TOKENS,
            default: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyConfig {
    pub max_size: u64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self { max_size: MAX_BODY_SIZE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetConfig {
    pub read_buffer_size: usize,
    /// Idle deadline applied to every single read.
    pub read_timeout: Duration,
    pub write_buffer: Bounds,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_buffer: Bounds::new(DEFAULT_WRITE_BUFFER_SIZE, MAX_WRITE_BUFFER_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub request_line: Bounds,
    pub headers: HeadersConfig,
    pub body: BodyConfig,
    pub net: NetConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_line: Bounds::new(DEFAULT_REQUEST_LINE_SIZE, MAX_REQUEST_LINE_SIZE),
            headers: HeadersConfig::default(),
            body: BodyConfig::default(),
            net: NetConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_request_line(mut self, default: usize, maximal: usize) -> Self {
        self.request_line = Bounds::new(default, maximal);
        self
    }

    #[must_use]
    pub fn with_max_headers(mut self, maximal: usize) -> Self {
        self.headers.number.maximal = maximal;
        self
    }

    #[must_use]
    pub fn with_headers_space(mut self, default: usize, maximal: usize) -> Self {
        self.headers.space = Bounds::new(default, maximal);
        self
    }

    #[must_use]
    pub fn with_max_encoding_tokens(mut self, max: usize) -> Self {
        self.headers.max_encoding_tokens = max;
        self
    }

    /// Appends a default response header. Order of insertion is the order of rendering.
    #[must_use]
    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.default.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_size: u64) -> Self {
        self.body.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.net.read_buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.net.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_buffer(mut self, default: usize, maximal: usize) -> Self {
        self.net.write_buffer = Bounds::new(default, maximal.max(default));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_line, Bounds::new(2048, 16384));
        assert_eq!(config.headers.number, Bounds::new(10, 50));
        assert_eq!(config.headers.max_encoding_tokens, 4);
        assert_eq!(config.body.max_size, 512 * 1024 * 1024);
        assert_eq!(config.net.read_timeout, Duration::from_secs(90));
        assert_eq!(config.net.write_buffer, Bounds::new(1024, 64 * 1024));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_default_header("Server", "weft")
            .with_default_header("Lorem", "ipsum")
            .with_write_buffer(7, 3)
            .with_max_body_size(10);

        assert_eq!(config.headers.default[0], ("Server".to_string(), "weft".to_string()));
        assert_eq!(config.headers.default.len(), 2);
        assert_eq!(config.net.write_buffer, Bounds::new(7, 7));
        assert_eq!(config.body.max_size, 10);
    }
}
