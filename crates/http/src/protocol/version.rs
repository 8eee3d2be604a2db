use http::Version;
use std::fmt;

/// HTTP protocol version of a request, or the target of an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    Http10,
    #[default]
    Http11,
    Unknown,
}

impl Protocol {
    /// Parses the `HTTP/<digit>.<digit>` token at the end of a request line.
    ///
    /// Syntactically valid but unsupported versions yield `None`, same as garbage.
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token {
            b"HTTP/1.1" => Some(Self::Http11),
            b"HTTP/1.0" => Some(Self::Http10),
            _ => None,
        }
    }

    /// Picks the first token of an `Upgrade` header value this engine can switch to.
    pub fn choose_upgrade(value: &str) -> Option<Self> {
        value.split(',').map(str::trim).find_map(|token| {
            if token.eq_ignore_ascii_case("HTTP/1.1") {
                Some(Self::Http11)
            } else if token.eq_ignore_ascii_case("HTTP/1.0") {
                Some(Self::Http10)
            } else {
                None
            }
        })
    }

    /// Token rendered at the start of a status line. Unknown falls back to 1.1.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 | Self::Unknown => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Protocol> for Version {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Http10 => Version::HTTP_10,
            Protocol::Http11 | Protocol::Unknown => Version::HTTP_11,
        }
    }
}
