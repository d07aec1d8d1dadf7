//! Route pattern compilation.
//!
//! A pattern is compiled once, at registration, into a sequence of
//! [`Segment`]s plus the ordered list of parameter names. Capture slots
//! produced by the matcher are positionally aligned with those names.
//!
//! | Syntax | Segment | Matches |
//! |--------|---------|---------|
//! | `users` | [`Segment::Literal`] | exactly `users` (case per policy) |
//! | `:id` | [`Segment::Param`] | one non-empty segment |
//! | `:id?` | [`Segment::Optional`] | zero or one segment |
//! | `*` | [`Segment::Wildcard`] | the rest of the path, must be last |

use smallvec::SmallVec;

use crate::error::RouteError;
use crate::policy::RoutingPolicy;

/// Name under which a wildcard capture is exposed.
pub const WILDCARD_NAME: &str = "*";

/// One compiled pattern segment.
///
/// Capturing variants carry the index of their capture slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text.
    Literal(Box<str>),
    /// Required parameter.
    Param(usize),
    /// Optional parameter.
    Optional(usize),
    /// Trailing wildcard.
    Wildcard(usize),
}

impl Segment {
    const fn is_capture(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }
}

/// A compiled route pattern.
///
/// # Example
///
/// ```rust
/// use fox_router::{Pattern, RoutingPolicy};
///
/// let pattern = Pattern::compile("/users/:id/:tab?", RoutingPolicy::default()).unwrap();
/// assert_eq!(pattern.param_names(), &["id", "tab"]);
/// assert!(!pattern.is_root());
/// assert!(!pattern.has_wildcard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    normalized: String,
    segments: SmallVec<[Segment; 4]>,
    param_names: SmallVec<[String; 4]>,
    case_sensitive: bool,
    min_segments: usize,
    max_segments: Option<usize>,
}

impl Pattern {
    /// Compiles `raw` under `policy`.
    ///
    /// An empty pattern is the root. A missing leading slash is added.
    ///
    /// # Errors
    ///
    /// - [`RouteError::WildcardNotLast`] if `*` is followed by more segments
    /// - [`RouteError::DuplicateParam`] if two parameters share a name
    /// - [`RouteError::InvalidPattern`] for an empty parameter name
    pub fn compile(raw: &str, policy: RoutingPolicy) -> Result<Self, RouteError> {
        let raw = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };

        let mut spans = Vec::new();
        policy.split_path(&raw, &mut spans);

        let mut segments: SmallVec<[Segment; 4]> = SmallVec::with_capacity(spans.len());
        let mut param_names: SmallVec<[String; 4]> = SmallVec::new();
        let mut normalized = String::with_capacity(raw.len());

        for (i, span) in spans.iter().enumerate() {
            let text = span.as_str(&raw);
            normalized.push('/');

            if text == WILDCARD_NAME {
                if i + 1 != spans.len() {
                    return Err(RouteError::WildcardNotLast { pattern: raw });
                }
                segments.push(Segment::Wildcard(param_names.len()));
                param_names.push(WILDCARD_NAME.to_string());
                normalized.push('*');
                continue;
            }

            if let Some(name) = text.strip_prefix(':') {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (name, false),
                };
                if name.is_empty() {
                    return Err(RouteError::invalid_pattern(raw, "empty parameter name"));
                }
                if param_names.iter().any(|n| n == name) {
                    return Err(RouteError::DuplicateParam {
                        name: name.to_string(),
                        pattern: raw,
                    });
                }

                let slot = param_names.len();
                segments.push(if optional {
                    Segment::Optional(slot)
                } else {
                    Segment::Param(slot)
                });
                param_names.push(name.to_string());
                // Capture names do not affect what a pattern matches.
                normalized.push_str(if optional { ":?" } else { ":" });
                continue;
            }

            if policy.case_sensitive {
                normalized.push_str(text);
            } else {
                normalized.push_str(&text.to_ascii_lowercase());
            }
            segments.push(Segment::Literal(text.into()));
        }

        if normalized.is_empty() {
            normalized.push('/');
        }

        let min_segments = segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_) | Segment::Param(_)))
            .count();
        let max_segments = if segments.iter().any(|s| matches!(s, Segment::Wildcard(_))) {
            None
        } else {
            Some(segments.len())
        };

        Ok(Self {
            raw,
            normalized,
            segments,
            param_names,
            case_sensitive: policy.case_sensitive,
            min_segments,
            max_segments,
        })
    }

    /// The pattern as registered, with a leading slash.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The key used for duplicate detection.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Compiled segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names, aligned with capture slots.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Position of `name` among the capture slots.
    #[must_use]
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }

    /// True if the pattern is exactly `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if the pattern ends in `*`.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.max_segments.is_none()
    }

    /// Fewest request segments a full match needs.
    #[must_use]
    pub fn min_segments(&self) -> usize {
        self.min_segments
    }

    /// Most request segments a full match accepts, `None` when unbounded.
    #[must_use]
    pub fn max_segments(&self) -> Option<usize> {
        self.max_segments
    }

    pub(crate) fn literal_eq(&self, literal: &str, segment: &str) -> bool {
        if self.case_sensitive {
            literal == segment
        } else {
            literal.eq_ignore_ascii_case(segment)
        }
    }

    pub(crate) fn capture_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_capture()).count()
    }
}

/// Joins a group prefix and a route path with exactly one `/` between them.
///
/// ```rust
/// use fox_router::join_paths;
///
/// assert_eq!(join_paths("/api", "/users"), "/api/users");
/// assert_eq!(join_paths("/api/", "users"), "/api/users");
/// assert_eq!(join_paths("/api", "/"), "/api");
/// assert_eq!(join_paths("", "/users"), "/users");
/// ```
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    let mut joined = String::with_capacity(prefix.len() + path.len() + 2);
    if !prefix.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(prefix);
    if !path.is_empty() {
        if !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
    }
    joined
}
