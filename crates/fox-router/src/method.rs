//! The canonical HTTP method set.
//!
//! Route stacks are indexed by a method's position in [`METHODS`]. The same
//! order is used when listing allowed methods in an `Allow` header.

use http::Method;

/// Number of methods the router keeps a stack for.
pub const METHOD_COUNT: usize = 9;

/// Canonical method order.
pub static METHODS: [Method; METHOD_COUNT] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

/// Returns the stack index for `method`, or `None` for extension methods.
#[must_use]
pub fn method_index(method: &Method) -> Option<usize> {
    match *method {
        Method::GET => Some(0),
        Method::HEAD => Some(1),
        Method::POST => Some(2),
        Method::PUT => Some(3),
        Method::DELETE => Some(4),
        Method::CONNECT => Some(5),
        Method::OPTIONS => Some(6),
        Method::TRACE => Some(7),
        Method::PATCH => Some(8),
        _ => None,
    }
}

/// Parses a method name as used at registration time.
///
/// Names are matched ASCII-case-insensitively, so `"get"` and `"GET"` are the
/// same verb. Anything outside [`METHODS`] yields `None`.
#[must_use]
pub fn parse_method(name: &str) -> Option<Method> {
    METHODS
        .iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(name))
        .cloned()
}

/// Formats methods as an `Allow` header value (`"GET, HEAD, POST"`).
#[must_use]
pub fn allow_header_value(methods: &[Method]) -> String {
    let mut value = String::with_capacity(methods.len() * 8);
    for (i, method) in methods.iter().enumerate() {
        if i > 0 {
            value.push_str(", ");
        }
        value.push_str(method.as_str());
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_index_matches_table() {
        for (i, method) in METHODS.iter().enumerate() {
            assert_eq!(method_index(method), Some(i));
        }
    }

    #[test]
    fn test_method_index_extension() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(method_index(&purge), None);
    }

    #[test]
    fn test_parse_method_case_insensitive() {
        assert_eq!(parse_method("get"), Some(Method::GET));
        assert_eq!(parse_method("Patch"), Some(Method::PATCH));
        assert_eq!(parse_method("PURGE"), None);
        assert_eq!(parse_method(""), None);
    }

    #[test]
    fn test_allow_header_value() {
        let value = allow_header_value(&[Method::GET, Method::HEAD, Method::POST]);
        assert_eq!(value, "GET, HEAD, POST");
        assert_eq!(allow_header_value(&[]), "");
    }
}
