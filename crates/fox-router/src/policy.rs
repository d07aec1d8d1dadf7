//! Routing policy and request path segmentation.
//!
//! Case sensitivity and strict trailing-slash handling are chosen once, when
//! the route table is created, and apply to every pattern and every request.

/// A byte range into a request path.
///
/// Segments and captures are stored as spans so that matching never copies
/// path text. Resolve a span with [`Span::as_str`] against the same path it
/// was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// The empty span, used for skipped optional parameters.
    pub const EMPTY: Span = Span { start: 0, end: 0 };

    /// Creates a span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Resolves the span against `path`.
    ///
    /// Returns `""` if the span does not fall on valid boundaries of `path`.
    #[must_use]
    pub fn as_str<'p>(&self, path: &'p str) -> &'p str {
        path.get(self.start..self.end).unwrap_or("")
    }
}

/// Policy applied uniformly to every pattern and request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingPolicy {
    /// When false, literal segments compare ASCII-case-insensitively.
    pub case_sensitive: bool,

    /// When true, `/foo` and `/foo/` are different paths and consecutive
    /// slashes produce empty segments.
    pub strict_routing: bool,
}

impl RoutingPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(case_sensitive: bool, strict_routing: bool) -> Self {
        Self {
            case_sensitive,
            strict_routing,
        }
    }

    /// Splits `path` into segment spans, reusing `out`.
    ///
    /// The leading slash is not part of any segment and the root path yields
    /// no segments. Outside strict mode empty segments are dropped, which
    /// collapses `//` into one boundary and ignores a trailing slash.
    pub fn split_path(&self, path: &str, out: &mut Vec<Span>) {
        out.clear();

        let start = usize::from(path.starts_with('/'));
        if start >= path.len() {
            return;
        }

        let mut segment_start = start;
        for (i, byte) in path.bytes().enumerate().skip(start) {
            if byte == b'/' {
                self.push_segment(out, segment_start, i);
                segment_start = i + 1;
            }
        }
        self.push_segment(out, segment_start, path.len());
    }

    fn push_segment(&self, out: &mut Vec<Span>, start: usize, end: usize) {
        if start == end && !self.strict_routing {
            return;
        }
        out.push(Span::new(start, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(policy: RoutingPolicy, path: &str) -> Vec<String> {
        let mut spans = Vec::new();
        policy.split_path(path, &mut spans);
        spans.iter().map(|s| s.as_str(path).to_string()).collect()
    }

    #[test]
    fn test_split_root() {
        let lax = RoutingPolicy::default();
        let strict = RoutingPolicy::new(false, true);
        assert!(segments(lax, "/").is_empty());
        assert!(segments(strict, "/").is_empty());
        assert!(segments(lax, "").is_empty());
    }

    #[test]
    fn test_split_simple() {
        let policy = RoutingPolicy::default();
        assert_eq!(segments(policy, "/users/123"), vec!["users", "123"]);
    }

    #[test]
    fn test_split_trailing_slash() {
        assert_eq!(segments(RoutingPolicy::default(), "/a/"), vec!["a"]);
        assert_eq!(segments(RoutingPolicy::new(false, true), "/a/"), vec!["a", ""]);
    }

    #[test]
    fn test_split_double_slash() {
        assert_eq!(segments(RoutingPolicy::default(), "/a//b"), vec!["a", "b"]);
        assert_eq!(
            segments(RoutingPolicy::new(false, true), "/a//b"),
            vec!["a", "", "b"]
        );
    }

    #[test]
    fn test_split_without_leading_slash() {
        assert_eq!(segments(RoutingPolicy::default(), "a/b"), vec!["a", "b"]);
    }

    #[test]
    fn test_split_reuses_buffer() {
        let policy = RoutingPolicy::default();
        let mut spans = Vec::with_capacity(8);
        policy.split_path("/a/b/c", &mut spans);
        assert_eq!(spans.len(), 3);
        policy.split_path("/x", &mut spans);
        assert_eq!(spans.len(), 1);
        assert!(spans.capacity() >= 8);
    }

    #[test]
    fn test_span_out_of_range() {
        assert_eq!(Span::new(4, 9).as_str("/ab"), "");
        assert!(Span::EMPTY.is_empty());
    }
}
