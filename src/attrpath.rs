//! Attribute paths: splitting dotted path strings into segments.
//!
//! A segment is either a bare identifier (`services`, `<name>`, `foo'-bar`)
//! or a double-quoted string that keeps its quotes (`"com.package/config"`).
//! Splitting is driven by pattern matches, not by dots: anything that is
//! neither a string nor an identifier is skipped.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// One attribute: a quoted string with backslash escapes, or an identifier
/// optionally wrapped in angle brackets.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?:"(?:[^"\\]|\\.)*")|(?:<?[a-zA-Z_][a-zA-Z0-9_'-]*>?)"#)
        .expect("valid attribute regex");
});

/// A non-empty sequence of segments naming a position in the configuration tree.
///
/// Only constructed through [`AttrPath::parse`] or [`AttrPath::from_segments`],
/// both of which refuse an empty segment list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrPath {
    /// The segments, in order. Never empty.
    segments: Vec<String>,
}

impl AttrPath {
    /// Build a path from already-split segments.
    ///
    /// Returns `None` for an empty list or if any segment is the empty string.
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return None;
        }
        return Some(Self { segments });
    }

    /// Whether this path lives under `scope`.
    ///
    /// Non-recursive membership additionally requires exactly one segment
    /// past the scope (a direct child).
    pub fn is_within_scope(&self, scope: &[String], recursive: bool) -> bool {
        return segments_within_scope(&self.segments, scope, recursive);
    }

    /// The final segment, used as the short display name.
    pub fn name(&self) -> &str {
        return self.segments.last().map_or("", String::as_str);
    }

    /// Split `raw` and wrap the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyPath` if `raw` contains no segment.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        return Self::from_segments(split(raw)).ok_or_else(|| {
            return Error::EmptyPath {
                raw: raw.to_string(),
            };
        });
    }

    /// The segments in order.
    pub fn segments(&self) -> &[String] {
        return &self.segments;
    }
}

impl fmt::Display for AttrPath {
    /// Join segments with `.`. Quoted segments are written back verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.segments.join("."));
    }
}

impl FromStr for AttrPath {
    type Err = Error;

    /// Same as [`AttrPath::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return Self::parse(s);
    }
}

/// Whether `loc` starts with `scope` (and, non-recursively, is one level below it).
pub fn segments_within_scope(loc: &[String], scope: &[String], recursive: bool) -> bool {
    if !recursive && loc.len() != scope.len().saturating_add(1) {
        return false;
    }
    return loc.starts_with(scope);
}

/// Split a dotted attribute path into its segments.
///
/// Never fails: malformed input yields whatever segments could be matched,
/// and empty input yields an empty list.
pub fn split(path: &str) -> Vec<String> {
    return ATTRIBUTE
        .find_iter(path)
        .map(|m| return m.as_str().to_string())
        .collect();
}

/// Split every context entry and concatenate the segments.
pub fn split_all<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    return entries
        .iter()
        .flat_map(|entry| return split(entry.as_ref()))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        return items.iter().map(|s| return (*s).to_string()).collect();
    }

    #[test]
    fn splits_quoted_segment_with_dots() {
        assert_eq!(
            split(r#"services.javaThingy.settings."com.package/config""#),
            strings(&["services", "javaThingy", "settings", r#""com.package/config""#]),
        );
    }

    #[test]
    fn splits_escaped_quotes_and_empty_string() {
        assert_eq!(
            split(r#"a.b."hello".b."bla\"bla"."".enable"#),
            strings(&["a", "b", r#""hello""#, "b", r#""bla\"bla""#, r#""""#, "enable"]),
        );
    }

    #[test]
    fn angle_bracket_placeholder_is_one_segment() {
        assert_eq!(
            split("services.nginx.virtualHosts.<name>.root"),
            strings(&["services", "nginx", "virtualHosts", "<name>", "root"]),
        );
    }

    #[test]
    fn identifiers_may_contain_primes_and_dashes() {
        assert_eq!(split("lib.foldl'.x-y"), strings(&["lib", "foldl'", "x-y"]));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split("").is_empty(), "empty string must have no segments");
        assert!(split("...").is_empty(), "dots alone are not segments");
    }

    #[test]
    fn malformed_input_degrades() {
        // Unterminated string: the quote is skipped, the identifier survives.
        assert_eq!(split(r#"a."unterminated"#), strings(&["a", "unterminated"]));
        assert_eq!(split("a..b  c"), strings(&["a", "b", "c"]));
        assert_eq!(split("9lives.ok"), strings(&["lives", "ok"]));
    }

    #[test]
    fn round_trip_preserves_quotes() {
        let segments = strings(&["networking", "hosts", r#""127.0.0.1""#, r#""a\"b""#]);
        let joined = segments.join(".");
        assert_eq!(split(&joined), segments);

        let path = AttrPath::parse(&joined).unwrap();
        assert_eq!(path.to_string(), joined);
        assert_eq!(path.name(), r#""a\"b""#);
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(matches!(AttrPath::parse(" . "), Err(Error::EmptyPath { .. })));
        assert!(AttrPath::from_segments(Vec::new()).is_none(), "no segments");
        assert!(AttrPath::from_segments(strings(&["a", ""])).is_none(), "empty segment");
    }

    #[test]
    fn scope_membership() {
        let path: AttrPath = "pkgs.python3Packages.requests".parse().unwrap();
        let scope = strings(&["pkgs", "python3Packages"]);
        assert!(path.is_within_scope(&scope, false), "direct child");
        assert!(path.is_within_scope(&strings(&["pkgs"]), true), "recursive");
        assert!(!path.is_within_scope(&strings(&["pkgs"]), false), "grandchild");
        assert!(!path.is_within_scope(&strings(&["lib"]), true), "other scope");
        assert!(path.is_within_scope(&[], true), "root scope holds everything");
    }

    #[test]
    fn split_all_concatenates_context() {
        assert_eq!(
            split_all(&["services.nginx", r#"virtualHosts."example.org""#]),
            strings(&["services", "nginx", "virtualHosts", r#""example.org""#]),
        );
    }
}
