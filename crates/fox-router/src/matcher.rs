//! Matching compiled patterns against request paths.
//!
//! The matcher walks compiled segments and request segments in lockstep.
//! Optional parameters first try to consume a segment and fall back to
//! consuming nothing if the rest of the pattern cannot align, so the
//! earliest optional parameter is the greediest.

use crate::pattern::{Pattern, Segment};
use crate::policy::Span;

/// How much of the request path a pattern must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every request segment must be consumed.
    Full,
    /// The pattern must align with a prefix of the request; middleware
    /// entries match this way.
    Prefix,
}

impl Pattern {
    /// Matches `path`, already split into `segments`, writing one capture per
    /// parameter into `captures`.
    ///
    /// On success `captures.len()` equals the number of parameter names; on
    /// failure `captures` is left empty. The buffer's capacity is reused.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fox_router::{MatchMode, Pattern, RoutingPolicy};
    ///
    /// let policy = RoutingPolicy::default();
    /// let pattern = Pattern::compile("/foo/:a?", policy).unwrap();
    ///
    /// let mut segments = Vec::new();
    /// let mut captures = Vec::new();
    ///
    /// policy.split_path("/foo/bar", &mut segments);
    /// assert!(pattern.matches("/foo/bar", &segments, MatchMode::Full, &mut captures));
    /// assert_eq!(captures[0].as_str("/foo/bar"), "bar");
    ///
    /// policy.split_path("/foo", &mut segments);
    /// assert!(pattern.matches("/foo", &segments, MatchMode::Full, &mut captures));
    /// assert_eq!(captures[0].as_str("/foo"), "");
    /// ```
    pub fn matches(
        &self,
        path: &str,
        segments: &[Span],
        mode: MatchMode,
        captures: &mut Vec<Span>,
    ) -> bool {
        captures.clear();

        if !self.may_match(segments.len(), mode) {
            return false;
        }

        if self.is_root() {
            return mode == MatchMode::Prefix || segments.is_empty();
        }

        debug_assert_eq!(self.capture_count(), self.param_names().len());
        captures.resize(self.param_names().len(), Span::EMPTY);

        let matched = self.match_from(0, 0, path, segments, mode, captures);
        if !matched {
            captures.clear();
        }
        matched
    }

    /// Cheap length pre-filter run before any segment comparison.
    #[must_use]
    pub fn may_match(&self, segment_count: usize, mode: MatchMode) -> bool {
        if segment_count < self.min_segments() {
            return false;
        }
        match (mode, self.max_segments()) {
            (MatchMode::Full, Some(max)) => segment_count <= max,
            _ => true,
        }
    }

    fn match_from(
        &self,
        pattern_index: usize,
        segment_index: usize,
        path: &str,
        segments: &[Span],
        mode: MatchMode,
        captures: &mut [Span],
    ) -> bool {
        let Some(segment) = self.segments().get(pattern_index) else {
            return mode == MatchMode::Prefix || segment_index == segments.len();
        };
        let current = segments.get(segment_index);

        match segment {
            Segment::Literal(literal) => match current {
                Some(span) if self.literal_eq(literal, span.as_str(path)) => self.match_from(
                    pattern_index + 1,
                    segment_index + 1,
                    path,
                    segments,
                    mode,
                    captures,
                ),
                _ => false,
            },
            Segment::Param(slot) => match current {
                Some(span) if !span.is_empty() => {
                    captures[*slot] = *span;
                    self.match_from(
                        pattern_index + 1,
                        segment_index + 1,
                        path,
                        segments,
                        mode,
                        captures,
                    )
                }
                _ => false,
            },
            Segment::Optional(slot) => {
                if let Some(span) = current {
                    captures[*slot] = *span;
                    if self.match_from(
                        pattern_index + 1,
                        segment_index + 1,
                        path,
                        segments,
                        mode,
                        captures,
                    ) {
                        return true;
                    }
                }
                captures[*slot] = Span::EMPTY;
                self.match_from(
                    pattern_index + 1,
                    segment_index,
                    path,
                    segments,
                    mode,
                    captures,
                )
            }
            Segment::Wildcard(slot) => {
                captures[*slot] = match (current, segments.last()) {
                    (Some(first), Some(last)) => Span::new(first.start, last.end),
                    _ => Span::EMPTY,
                };
                true
            }
        }
    }
}
