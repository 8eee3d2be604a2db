//! Small helpers shared by the parser, body reader and serializer.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// ```ignore
/// ensure!(self.headers.len() < limit, ParseError::TooManyHeaders { max_num: limit });
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error.into());
        }
    };
}

pub(crate) use ensure;

/// ASCII case-insensitive comparison of two header tokens.
#[inline]
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().eq_ignore_ascii_case(b.as_bytes())
}

/// Whether `s` holds a CR or LF, which would end a header line early.
#[inline]
pub(crate) fn has_line_break(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}

/// Decodes a single hex digit, `None` for anything outside `[0-9a-fA-F]`.
#[inline]
pub(crate) fn unhex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Number of hex digits needed to print `n`.
#[inline]
pub(crate) fn hex_len(n: usize) -> usize {
    if n == 0 { 1 } else { (usize::BITS - n.leading_zeros()).div_ceil(4) as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_len() {
        assert_eq!(hex_len(0), 1);
        assert_eq!(hex_len(0xf), 1);
        assert_eq!(hex_len(0x10), 2);
        assert_eq!(hex_len(0x3f7), 3);
        assert_eq!(hex_len(usize::MAX), usize::BITS as usize / 4);
    }

    #[test]
    fn test_unhex() {
        assert_eq!(unhex(b'7'), Some(7));
        assert_eq!(unhex(b'c'), Some(12));
        assert_eq!(unhex(b'F'), Some(15));
        assert_eq!(unhex(b'g'), None);
    }

    #[test]
    fn test_eq_ignore_case() {
        assert!(eq_ignore_case("Content-Length", "content-length"));
        assert!(!eq_ignore_case("Content-Length", "content-type"));
    }

    #[test]
    fn test_has_line_break() {
        assert!(has_line_break("a\r\nSet-Cookie: x=1"));
        assert!(has_line_break("\n"));
        assert!(!has_line_break("text/html; charset=utf-8"));
    }
}
