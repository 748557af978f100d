//! Path pattern parsing and template matching.
//!
//! Patterns are slash-separated. A segment is either literal text, a named
//! parameter (`{id}` or `:id`) that captures exactly one path segment, or a
//! trailing wildcard (`*rest`, or a bare `*`) that captures one or more
//! remaining segments. Empty segments are ignored, so `/a//b/` and `/a/b`
//! are the same pattern.
//!
//! Values substituted into a pattern are percent-encoded per segment, and
//! captured values are decoded, so a value survives a trip through
//! [`PathPattern::expand`] and a route lookup unchanged.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::RouteError;

/// Bytes escaped inside one generated path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One parsed segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text that must match exactly.
    Static(String),
    /// Named parameter capturing a single segment.
    Param(String),
    /// Catch-all capturing every remaining segment. The name is `*` when unnamed.
    Wildcard(String),
}

impl Segment {
    /// Returns the capture name for parameter and wildcard segments.
    #[must_use]
    pub fn capture_name(&self) -> Option<&str> {
        match self {
            Self::Static(_) => None,
            Self::Param(name) | Self::Wildcard(name) => Some(name),
        }
    }
}

/// A parsed route path pattern.
///
/// # Example
///
/// ```rust
/// use lodestar_router::PathPattern;
///
/// let pattern = PathPattern::parse("/users/{id}/posts").unwrap();
/// assert!(pattern.matches("/users/7/posts"));
/// assert!(!pattern.matches("/users/7"));
/// assert!(pattern.is_prefix_of("/users/7/posts/12"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] when the pattern does not start
    /// with `/`, names a parameter with an empty or repeated name, contains a
    /// stray brace, or places a wildcard anywhere but last.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::invalid(raw, "pattern must start with '/'"));
        }

        let parts: Vec<&str> = split_path(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let segment = parse_segment(raw, part)?;
            if matches!(segment, Segment::Wildcard(_)) && index + 1 != parts.len() {
                return Err(RouteError::invalid(raw, "wildcard must be the last segment"));
            }
            if let Some(name) = segment.capture_name() {
                if segments
                    .iter()
                    .any(|s: &Segment| s.capture_name() == Some(name))
                {
                    return Err(RouteError::invalid(raw, "parameter names must be unique"));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the pattern as it was registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments in the pattern.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root pattern `/`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true when the pattern contains no parameters or wildcards.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Static(_)))
    }

    /// Names of the captured parameters, in path order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::capture_name)
    }

    /// Returns true when the pattern matches the whole of `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.walk(path, false)
    }

    /// Returns true when the pattern matches the leading segments of `path`.
    ///
    /// A pattern always prefixes itself, so `matches` implies `is_prefix_of`.
    #[must_use]
    pub fn is_prefix_of(&self, path: &str) -> bool {
        self.walk(path, true)
    }

    fn walk(&self, path: &str, allow_rest: bool) -> bool {
        let mut parts = split_path(path);
        for segment in &self.segments {
            match segment {
                Segment::Static(text) => {
                    if parts.next() != Some(text.as_str()) {
                        return false;
                    }
                }
                Segment::Param(_) => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Wildcard(_) => return parts.next().is_some(),
            }
        }
        allow_rest || parts.next().is_none()
    }

    /// Builds a concrete path by substituting captured segments.
    ///
    /// `lookup` is asked for each parameter name; the first name it has no
    /// value for is returned as the error. A parameter value is encoded as a
    /// single segment; a wildcard value keeps its `/` separators and encodes
    /// each part.
    pub fn expand<'a, F>(&'a self, mut lookup: F) -> Result<String, &'a str>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(text) => out.push_str(text),
                Segment::Param(name) => {
                    let value = lookup(name).ok_or(name.as_str())?;
                    out.extend(utf8_percent_encode(&value, SEGMENT));
                }
                Segment::Wildcard(name) => {
                    let value = lookup(name).ok_or(name.as_str())?;
                    for (i, part) in split_path(&value).enumerate() {
                        if i > 0 {
                            out.push('/');
                        }
                        out.extend(utf8_percent_encode(part, SEGMENT));
                    }
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Decodes a captured value.
pub(crate) fn decode_capture(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Splits a request path or pattern into its non-empty segments.
pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment, RouteError> {
    if let Some(inner) = part.strip_prefix('{') {
        let name = inner
            .strip_suffix('}')
            .ok_or_else(|| RouteError::invalid(raw, "unterminated '{' in segment"))?;
        return param(raw, name);
    }
    if let Some(name) = part.strip_prefix(':') {
        return param(raw, name);
    }
    if let Some(name) = part.strip_prefix('*') {
        let name = if name.is_empty() { "*" } else { name };
        return Ok(Segment::Wildcard(name.to_string()));
    }
    if part.contains(&['{', '}'][..]) {
        return Err(RouteError::invalid(raw, "braces must wrap a whole segment"));
    }
    Ok(Segment::Static(part.to_string()))
}

fn param(raw: &str, name: &str) -> Result<Segment, RouteError> {
    if name.is_empty() || name.contains(&['{', '}', '*', ':'][..]) {
        return Err(RouteError::invalid(raw, "parameter name is empty or malformed"));
    }
    Ok(Segment::Param(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static() {
        let pattern = PathPattern::parse("/users/list").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Static("users".into()),
                Segment::Static("list".into())
            ]
        );
        assert!(pattern.is_literal());
    }

    #[test]
    fn test_parse_param_styles() {
        let braces = PathPattern::parse("/users/{id}").unwrap();
        let colon = PathPattern::parse("/users/:id").unwrap();
        assert_eq!(braces.segments(), colon.segments());
        assert_eq!(braces.capture_names().collect::<Vec<_>>(), vec!["id"]);
        assert!(!braces.is_literal());
    }

    #[test]
    fn test_parse_wildcard() {
        let named = PathPattern::parse("/files/*path").unwrap();
        assert_eq!(named.segments()[1], Segment::Wildcard("path".into()));

        let bare = PathPattern::parse("/*").unwrap();
        assert_eq!(bare.segments()[0], Segment::Wildcard("*".into()));
    }

    #[test]
    fn test_parse_root_and_redundant_slashes() {
        assert!(PathPattern::parse("/").unwrap().is_empty());
        let pattern = PathPattern::parse("/a//b/").unwrap();
        assert_eq!(pattern.len(), 2);
        assert!(pattern.matches("/a/b"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["users", "/files/*path/more", "/x/{}", "/x/{id", "/x/a{b}", "/x/{id}/{id}"] {
            assert!(
                matches!(PathPattern::parse(bad), Err(RouteError::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_template() {
        let pattern = PathPattern::parse("/orgs/{org}/users/{id}").unwrap();
        assert!(pattern.matches("/orgs/acme/users/9"));
        assert!(!pattern.matches("/orgs/acme/users"));
        assert!(!pattern.matches("/orgs/acme/users/9/edit"));
        assert!(!pattern.matches("/orgs/acme/teams/9"));
    }

    #[test]
    fn test_wildcard_needs_a_segment() {
        let pattern = PathPattern::parse("/admin/*").unwrap();
        assert!(pattern.matches("/admin/users"));
        assert!(pattern.matches("/admin/users/1"));
        assert!(!pattern.matches("/admin"));
    }

    #[test]
    fn test_prefix_matching_is_segment_aware() {
        let pattern = PathPattern::parse("/admin").unwrap();
        assert!(pattern.is_prefix_of("/admin"));
        assert!(pattern.is_prefix_of("/admin/users"));
        assert!(!pattern.is_prefix_of("/administrator"));
        assert!(PathPattern::parse("/").unwrap().is_prefix_of("/anything"));
    }

    #[test]
    fn test_expand() {
        let pattern = PathPattern::parse("/users/{id}/files/*path").unwrap();
        let url = pattern
            .expand(|name| match name {
                "id" => Some("42".to_string()),
                "path" => Some("docs/a.txt".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(url, "/users/42/files/docs/a.txt");

        let missing = pattern.expand(|name| (name == "id").then(|| "1".to_string()));
        assert_eq!(missing, Err("path"));

        assert_eq!(PathPattern::parse("/").unwrap().expand(|_| None), Ok("/".to_string()));
    }

    #[test]
    fn test_expand_escapes_reserved_characters() {
        let pattern = PathPattern::parse("/tags/{tag}/files/*path").unwrap();
        let url = pattern
            .expand(|name| match name {
                "tag" => Some("c/c++ #1?".to_string()),
                "path" => Some("my docs/100%.txt".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(url, "/tags/c%2Fc++%20%231%3F/files/my%20docs/100%25.txt");
        assert_eq!(decode_capture("c%2Fc++%20%231%3F"), "c/c++ #1?");
    }
}
