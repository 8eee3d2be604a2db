use std::fmt;

/// Request methods understood by the parser. Anything else is answered with 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Mkcol,
    Move,
    Copy,
    Lock,
    Unlock,
    Propfind,
    Proppatch,
}

impl Method {
    /// Length of the longest method token, `PROPPATCH`.
    pub const MAX_LEN: usize = 9;

    pub fn parse(token: &[u8]) -> Option<Self> {
        let method = match token {
            b"GET" => Self::Get,
            b"HEAD" => Self::Head,
            b"POST" => Self::Post,
            b"PUT" => Self::Put,
            b"DELETE" => Self::Delete,
            b"CONNECT" => Self::Connect,
            b"OPTIONS" => Self::Options,
            b"TRACE" => Self::Trace,
            b"PATCH" => Self::Patch,
            b"MKCOL" => Self::Mkcol,
            b"MOVE" => Self::Move,
            b"COPY" => Self::Copy,
            b"LOCK" => Self::Lock,
            b"UNLOCK" => Self::Unlock,
            b"PROPFIND" => Self::Propfind,
            b"PROPPATCH" => Self::Proppatch,
            _ => return None,
        };

        Some(method)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Mkcol => "MKCOL",
            Self::Move => "MOVE",
            Self::Copy => "COPY",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
            Self::Propfind => "PROPFIND",
            Self::Proppatch => "PROPPATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for token in ["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH", "PROPPATCH"] {
            let method = Method::parse(token.as_bytes()).unwrap();
            assert_eq!(method.as_str(), token);
        }
    }

    #[test]
    fn test_unknown() {
        assert_eq!(Method::parse(b"GE"), None);
        assert_eq!(Method::parse(b"GOT"), None);
        assert_eq!(Method::parse(b"get"), None);
        assert_eq!(Method::parse(b""), None);
    }

    #[test]
    fn test_max_len() {
        assert_eq!(Method::Proppatch.as_str().len(), Method::MAX_LEN);
    }
}
