//! # Pattern Compiler
//!
//! Turns a registration path such as `/api/users/:userId(int)/files/*rest` into a
//! [`RoutePattern`]: a literal prefix used to reject requests cheaply, followed by a
//! list of typed segments decided once at registration time.
//!
//! ## Syntax
//!
//! | Segment       | Meaning                                                        |
//! |---------------|----------------------------------------------------------------|
//! | `users`       | literal, must equal the request segment                        |
//! | `:id`         | parameter, binds one non-empty request segment                 |
//! | `:id(\d+)`    | parameter with a constraint tag                                |
//! | `*`           | anonymous wildcard, absorbs the remaining segments             |
//! | `*rest`       | named wildcard, binds the remainder (without leading slash)    |
//!
//! Markers must start a segment and a wildcard may only be the last segment.
//! Constraint tags are carried as advisory metadata unless the pattern is compiled
//! with [`CompileOptions::enforce_constraints`], in which case the tag is compiled as
//! an anchored regular expression and checked against the request segment.
//!
//! ## Matching
//!
//! - Pure wildcard patterns (`*`, `/*`, `/*name`) match every path.
//! - Static patterns (no markers) match by string equality.
//! - Everything else must start with the literal prefix; the remainder is walked
//!   segment by segment. A trailing wildcard also accepts the prefix without its
//!   final slash, so `/files/*` matches `/files`, `/files/` and `/files/a/b`.

use crate::error::RouterError;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Marks the start of a named parameter segment
pub const PARAMETER_START: char = ':';
/// Opens a parameter's constraint tag
pub const CONSTRAINT_START: char = '(';
/// Closes a parameter's constraint tag
pub const CONSTRAINT_END: char = ')';
/// The match-everything marker
pub const MATCH_EVERYTHING: char = '*';

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter bindings for one request.
///
/// Names are `Arc<str>` shared with the compiled pattern; values are copied out of
/// the request path.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Options applied while compiling a registration path
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Compile constraint tags as regular expressions and enforce them while matching
    pub enforce_constraints: bool,
}

/// Constraint tag attached to a parameter, e.g. `int` in `:id(int)`
#[derive(Debug, Clone)]
pub struct Constraint {
    tag: String,
    regex: Option<Regex>,
}

impl Constraint {
    fn new(tag: &str, path: &str, options: &CompileOptions) -> Result<Self, RouterError> {
        let regex = if options.enforce_constraints {
            let anchored = format!("^(?:{})$", tag);
            Some(Regex::new(&anchored).map_err(|e| {
                RouterError::invalid_pattern(
                    path,
                    format!("constraint '{}' is not a valid regular expression: {}", tag, e),
                )
            })?)
        } else {
            None
        };
        Ok(Self {
            tag: tag.to_string(),
            regex,
        })
    }

    /// The raw tag text between the parentheses
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether this constraint restricts matching
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.regex.is_some()
    }

    fn accepts(&self, value: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(value))
    }
}

/// One typed segment following a pattern's literal prefix
#[derive(Debug, Clone)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(String),
    /// Binds one non-empty request segment to `name`
    Parameter {
        name: Arc<str>,
        constraint: Option<Constraint>,
    },
    /// Absorbs the rest of the request path; binds it when named
    Wildcard { name: Option<Arc<str>> },
}

/// How a pattern is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// No markers at all: the whole path is the literal prefix
    Static,
    /// Literal prefix followed by typed segments
    Dynamic,
    /// Bare wildcard: matches every request path
    MatchAll,
}

/// A compiled registration path
#[derive(Debug, Clone)]
pub struct RoutePattern {
    full_path: String,
    literal_prefix: String,
    segments: Vec<Segment>,
    has_wildcard: bool,
    kind: PatternKind,
}

/// Compile a registration path with default options (advisory constraints).
pub fn compile(path: &str) -> Result<RoutePattern, RouterError> {
    compile_with(path, &CompileOptions::default())
}

/// Compile a registration path.
///
/// An empty path is normalised to `/`, and a missing leading slash is added unless
/// the path starts with the match-everything marker.
pub fn compile_with(path: &str, options: &CompileOptions) -> Result<RoutePattern, RouterError> {
    let full_path = normalize(path);

    let Some(first_marker) = full_path.find([PARAMETER_START, MATCH_EVERYTHING]) else {
        return Ok(RoutePattern {
            literal_prefix: full_path.clone(),
            full_path,
            segments: Vec::new(),
            has_wildcard: false,
            kind: PatternKind::Static,
        });
    };

    if first_marker > 0 && !full_path[..first_marker].ends_with('/') {
        return Err(RouterError::invalid_pattern(
            &full_path,
            "parameter and wildcard markers must start a path segment",
        ));
    }

    let literal_prefix = full_path[..first_marker].to_string();
    let mut segments = Vec::with_capacity(full_path[first_marker..].matches('/').count() + 1);
    for raw in full_path[first_marker..].split('/') {
        segments.push(parse_segment(raw, &full_path, options)?);
    }

    if let Some(pos) = segments
        .iter()
        .position(|s| matches!(s, Segment::Wildcard { .. }))
    {
        if pos + 1 != segments.len() {
            return Err(RouterError::invalid_pattern(
                &full_path,
                "a wildcard may only appear as the last segment",
            ));
        }
    }

    {
        let mut seen: SmallVec<[&str; MAX_INLINE_PARAMS]> = SmallVec::new();
        for name in segments.iter().filter_map(segment_name) {
            if seen.contains(&name) {
                return Err(RouterError::invalid_pattern(
                    &full_path,
                    format!("parameter '{}' is declared more than once", name),
                ));
            }
            seen.push(name);
        }
    }

    let has_wildcard = matches!(segments.last(), Some(Segment::Wildcard { .. }));
    let kind = if has_wildcard && segments.len() == 1 && first_marker <= 1 {
        PatternKind::MatchAll
    } else {
        PatternKind::Dynamic
    };

    Ok(RoutePattern {
        full_path,
        literal_prefix,
        segments,
        has_wildcard,
        kind,
    })
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') || path.starts_with(MATCH_EVERYTHING) {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn segment_name(segment: &Segment) -> Option<&str> {
    match segment {
        Segment::Parameter { name, .. } => Some(name.as_ref()),
        Segment::Wildcard { name: Some(name) } => Some(name.as_ref()),
        _ => None,
    }
}

fn parse_segment(raw: &str, path: &str, options: &CompileOptions) -> Result<Segment, RouterError> {
    if let Some(rest) = raw.strip_prefix(PARAMETER_START) {
        let (name, constraint) = match rest.find(CONSTRAINT_START) {
            Some(open) => {
                let tag = rest[open + 1..].strip_suffix(CONSTRAINT_END).ok_or_else(|| {
                    RouterError::invalid_pattern(
                        path,
                        format!("unclosed constraint in segment '{}'", raw),
                    )
                })?;
                if tag.is_empty() {
                    return Err(RouterError::invalid_pattern(
                        path,
                        format!("empty constraint in segment '{}'", raw),
                    ));
                }
                (&rest[..open], Some(Constraint::new(tag, path, options)?))
            }
            None => (rest, None),
        };
        validate_name(name, raw, path)?;
        return Ok(Segment::Parameter {
            name: Arc::from(name),
            constraint,
        });
    }

    if let Some(rest) = raw.strip_prefix(MATCH_EVERYTHING) {
        if rest.is_empty() {
            return Ok(Segment::Wildcard { name: None });
        }
        validate_name(rest, raw, path)?;
        return Ok(Segment::Wildcard {
            name: Some(Arc::from(rest)),
        });
    }

    if raw.contains([PARAMETER_START, MATCH_EVERYTHING]) {
        return Err(RouterError::invalid_pattern(
            path,
            format!("marker inside literal segment '{}'", raw),
        ));
    }
    Ok(Segment::Literal(raw.to_string()))
}

fn validate_name(name: &str, raw: &str, path: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::invalid_pattern(
            path,
            format!("missing parameter name in segment '{}'", raw),
        ));
    }
    if name.contains([
        PARAMETER_START,
        MATCH_EVERYTHING,
        CONSTRAINT_START,
        CONSTRAINT_END,
    ]) {
        return Err(RouterError::invalid_pattern(
            path,
            format!("illegal character in parameter name '{}'", name),
        ));
    }
    Ok(())
}

impl RoutePattern {
    /// The normalised registration string
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Longest leading run containing no markers
    #[must_use]
    pub fn literal_prefix(&self) -> &str {
        &self.literal_prefix
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == PatternKind::Static
    }

    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.kind == PatternKind::MatchAll
    }

    /// Names bound by this pattern, in segment order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(segment_name)
    }

    /// Test whether a request path matches, without binding anything
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.walk(path, |_, _| {})
    }

    /// Match a request path and collect its parameter bindings
    #[must_use]
    pub fn extract(&self, path: &str) -> Option<ParamVec> {
        let mut params = ParamVec::new();
        self.extract_into(path, &mut params).then_some(params)
    }

    /// Match a request path, appending bindings to `params`
    ///
    /// On a failed match `params` is restored to its previous length.
    pub fn extract_into(&self, path: &str, params: &mut ParamVec) -> bool {
        let mark = params.len();
        let matched = self.walk(path, |name, value| {
            params.push((Arc::clone(name), value.to_string()));
        });
        if !matched {
            params.truncate(mark);
        }
        matched
    }

    /// Substitute bindings back into the pattern
    ///
    /// Returns `None` when a declared name has no binding or the pattern ends in an
    /// anonymous wildcard (its remainder was never captured). An empty wildcard
    /// binding renders without its separator, so `/files` and `/files/` both
    /// render as `/files`.
    #[must_use]
    pub fn render(&self, params: &ParamVec) -> Option<String> {
        let lookup = |name: &str| {
            params
                .iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v.as_str())
        };

        match self.kind {
            PatternKind::Static => Some(self.full_path.clone()),
            PatternKind::MatchAll => match self.segments.first() {
                Some(Segment::Wildcard { name: Some(name) }) => {
                    lookup(&**name).map(|value| format!("/{}", value))
                }
                _ => None,
            },
            PatternKind::Dynamic => {
                let mut out = self.literal_prefix.clone();
                for (idx, segment) in self.segments.iter().enumerate() {
                    if idx > 0 {
                        out.push('/');
                    }
                    match segment {
                        Segment::Literal(text) => out.push_str(text),
                        Segment::Parameter { name, .. } => out.push_str(lookup(&**name)?),
                        Segment::Wildcard { name } => {
                            let value = lookup(name.as_deref()?)?;
                            if value.is_empty() {
                                // `/files/*path` with nothing bound renders as `/files`
                                if out.len() > 1 && out.ends_with('/') {
                                    out.pop();
                                }
                            } else {
                                out.push_str(value);
                            }
                        }
                    }
                }
                Some(out)
            }
        }
    }

    fn walk<'p, F>(&self, path: &'p str, mut bind: F) -> bool
    where
        F: FnMut(&Arc<str>, &'p str),
    {
        match self.kind {
            PatternKind::MatchAll => {
                if let Some(Segment::Wildcard { name: Some(name) }) = self.segments.first() {
                    bind(name, path.strip_prefix('/').unwrap_or(path));
                }
                true
            }
            PatternKind::Static => path == self.literal_prefix,
            PatternKind::Dynamic => {
                let rest = match path.strip_prefix(self.literal_prefix.as_str()) {
                    Some(rest) => Some(rest),
                    // `/files/*` also accepts `/files`
                    None if self.accepts_bare_prefix(path) => None,
                    None => return false,
                };
                self.walk_segments(rest, bind)
            }
        }
    }

    fn accepts_bare_prefix(&self, path: &str) -> bool {
        self.has_wildcard
            && self.segments.len() == 1
            && self.literal_prefix.strip_suffix('/') == Some(path)
    }

    fn walk_segments<'p, F>(&self, rest: Option<&'p str>, mut bind: F) -> bool
    where
        F: FnMut(&Arc<str>, &'p str),
    {
        let mut remaining = rest;
        for segment in &self.segments {
            match segment {
                Segment::Wildcard { name } => {
                    if let Some(name) = name {
                        bind(name, remaining.unwrap_or(""));
                    }
                    return true;
                }
                Segment::Literal(text) => match next_part(&mut remaining) {
                    Some(part) if part == text => {}
                    _ => return false,
                },
                Segment::Parameter { name, constraint } => match next_part(&mut remaining) {
                    Some(part) if !part.is_empty() => {
                        if let Some(constraint) = constraint {
                            if !constraint.accepts(part) {
                                return false;
                            }
                        }
                        bind(name, part);
                    }
                    _ => return false,
                },
            }
        }
        remaining.is_none()
    }
}

/// Pop the next `/`-delimited part off `remaining`
fn next_part<'p>(remaining: &mut Option<&'p str>) -> Option<&'p str> {
    let current = remaining.take()?;
    match current.split_once('/') {
        Some((head, tail)) => {
            *remaining = Some(tail);
            Some(head)
        }
        None => Some(current),
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
        params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_static_pattern_is_whole_prefix() {
        let p = compile("/api/users").unwrap();
        assert_eq!(p.kind(), PatternKind::Static);
        assert_eq!(p.literal_prefix(), "/api/users");
        assert!(p.segments().is_empty());
        assert!(p.matches("/api/users"));
        assert!(!p.matches("/api/users/"));
        assert!(!p.matches("/api"));
    }

    #[test]
    fn test_empty_path_normalised_to_root() {
        let p = compile("").unwrap();
        assert_eq!(p.full_path(), "/");
        assert!(p.matches("/"));
    }

    #[test]
    fn test_missing_leading_slash_added() {
        let p = compile("api/:id").unwrap();
        assert_eq!(p.full_path(), "/api/:id");
        assert_eq!(p.literal_prefix(), "/api/");
    }

    #[test]
    fn test_parameter_prefix_and_segments() {
        let p = compile("/api/users/:userId").unwrap();
        assert_eq!(p.kind(), PatternKind::Dynamic);
        assert_eq!(p.literal_prefix(), "/api/users/");
        assert!(p.full_path().starts_with(p.literal_prefix()));
        assert_eq!(p.segments().len(), 1);
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["userId"]);

        let params = p.extract("/api/users/42").unwrap();
        assert_eq!(param(&params, "userId"), Some("42"));
        assert!(p.extract("/api/users/42/extra").is_none());
        assert!(p.extract("/api/users/").is_none());
        assert!(p.extract("/api/people/42").is_none());
    }

    #[test]
    fn test_literal_between_parameters() {
        let p = compile("/users/:id/posts/:postId").unwrap();
        let params = p.extract("/users/7/posts/abc").unwrap();
        assert_eq!(param(&params, "id"), Some("7"));
        assert_eq!(param(&params, "postId"), Some("abc"));
        assert!(!p.matches("/users/7/comments/abc"));
    }

    #[test]
    fn test_constraint_is_advisory_by_default() {
        let p = compile(r"/api/users/:userId(\d+)").unwrap();
        match &p.segments()[0] {
            Segment::Parameter { name, constraint } => {
                assert_eq!(name.as_ref(), "userId");
                let c = constraint.as_ref().unwrap();
                assert_eq!(c.tag(), r"\d+");
                assert!(!c.is_enforced());
            }
            other => panic!("unexpected segment {other:?}"),
        }
        assert!(p.matches("/api/users/not-a-number"));
    }

    #[test]
    fn test_constraint_enforced_when_requested() {
        let options = CompileOptions {
            enforce_constraints: true,
        };
        let p = compile_with(r"/api/users/:userId(\d+)", &options).unwrap();
        assert!(p.matches("/api/users/42"));
        assert!(!p.matches("/api/users/abc"));
        assert!(!p.matches("/api/users/42abc"));
    }

    #[test]
    fn test_invalid_constraint_regex_rejected_when_enforced() {
        let options = CompileOptions {
            enforce_constraints: true,
        };
        let err = compile_with("/a/:id([)", &options).unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
        // advisory mode never compiles the tag
        assert!(compile("/a/:id([)").is_ok());
    }

    #[test]
    fn test_similar_parameter_names_do_not_collide() {
        let p = compile("/a/:id(int)/b/:identifier").unwrap();
        let params = p.extract("/a/1/b/two").unwrap();
        assert_eq!(param(&params, "id"), Some("1"));
        assert_eq!(param(&params, "identifier"), Some("two"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_bare_wildcard_matches_everything() {
        for raw in ["*", "/*"] {
            let p = compile(raw).unwrap();
            assert!(p.is_match_all(), "{raw}");
            assert!(p.has_wildcard());
            assert!(p.literal_prefix().is_empty() || p.literal_prefix() == "/");
            assert!(p.matches("/"));
            assert!(p.matches("/anything/at/all"));
        }
    }

    #[test]
    fn test_named_bare_wildcard_binds_remainder() {
        let p = compile("/*path").unwrap();
        let params = p.extract("/a/b/c").unwrap();
        assert_eq!(param(&params, "path"), Some("a/b/c"));
        assert_eq!(p.render(&params).as_deref(), Some("/a/b/c"));
    }

    #[test]
    fn test_wildcard_with_prefix_boundaries() {
        let p = compile("/files/*").unwrap();
        assert_eq!(p.kind(), PatternKind::Dynamic);
        assert_eq!(p.literal_prefix(), "/files/");
        assert!(p.matches("/files/a/b/c"));
        assert!(p.matches("/files/"));
        assert!(p.matches("/files"));
        assert!(!p.matches("/filesystem"));
        assert!(!p.matches("/other/a"));
    }

    #[test]
    fn test_wildcard_after_parameter() {
        let p = compile("/repo/:owner/*path").unwrap();
        let params = p.extract("/repo/me/src/lib.rs").unwrap();
        assert_eq!(param(&params, "owner"), Some("me"));
        assert_eq!(param(&params, "path"), Some("src/lib.rs"));

        let params = p.extract("/repo/me").unwrap();
        assert_eq!(param(&params, "path"), Some(""));
    }

    #[test]
    fn test_rejects_malformed_patterns() {
        let cases = [
            "/files/*/more",
            "/a/:",
            "/a/:id/:id",
            "/a/:id(int",
            "/a/:id()",
            "/a/b:id",
            "/a/x*",
            "/a/:bad*name",
        ];
        for raw in cases {
            let err = compile(raw).unwrap_err();
            assert!(
                matches!(err, RouterError::InvalidPattern { .. }),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_render_round_trip() {
        let p = compile("/org/:org/team/:team(int)/members/:member").unwrap();
        let concrete = "/org/acme/team/12/members/bob";
        let params = p.extract(concrete).unwrap();
        assert_eq!(p.render(&params).as_deref(), Some(concrete));
    }

    #[test]
    fn test_render_round_trip_at_wildcard_boundary() {
        let p = compile("/files/*path").unwrap();
        let params = p.extract("/files").unwrap();
        assert_eq!(param(&params, "path"), Some(""));
        assert_eq!(p.render(&params).as_deref(), Some("/files"));

        let trailing = p.extract("/files/").unwrap();
        assert_eq!(p.render(&trailing).as_deref(), Some("/files"));

        let p = compile("/repo/:owner/*path").unwrap();
        let params = p.extract("/repo/me").unwrap();
        assert_eq!(p.render(&params).as_deref(), Some("/repo/me"));
        let params = p.extract("/repo/me/src").unwrap();
        assert_eq!(p.render(&params).as_deref(), Some("/repo/me/src"));
    }

    #[test]
    fn test_duplicate_check_leaves_pattern_intact() {
        let p = compile("/a/:x/b/:y/*rest").unwrap();
        assert_eq!(p.literal_prefix(), "/a/");
        assert_eq!(p.segments().len(), 4);
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["x", "y", "rest"]);
    }

    #[test]
    fn test_render_requires_bindings() {
        let p = compile("/users/:id").unwrap();
        assert!(p.render(&ParamVec::new()).is_none());
        let anon = compile("/files/*").unwrap();
        assert!(anon.render(&ParamVec::new()).is_none());
    }

    #[test]
    fn test_extract_into_restores_on_failure() {
        let p = compile("/a/:x/b").unwrap();
        let mut params = ParamVec::new();
        params.push((Arc::from("keep"), "me".to_string()));
        assert!(!p.extract_into("/a/1/c", &mut params));
        assert_eq!(params.len(), 1);
    }
}
