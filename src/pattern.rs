//! Route path templates.
//!
//! A template is a literal path with two kinds of holes:
//!
//! - `:name` captures one path segment (anything but `/`) under `name`,
//! - `*` matches any run of characters, slashes included.
//!
//! Templates compile to a case-insensitive regular expression. Every kind of
//! route is anchored at both ends except [`RouteMethod::Static`], which only
//! needs to recognise its mount prefix: the rest of the path belongs to the
//! file server.
//!
//! ```rust
//! use easyfied::{PathPattern, RouteMethod};
//!
//! let pattern = PathPattern::compile("/hello/:name", RouteMethod::Get).unwrap();
//! let captures = pattern.captures("/Hello/Mister").unwrap();
//! assert_eq!(captures["name"], "Mister");
//! assert!(!pattern.is_match("/hello/mister/more"));
//! ```

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::Error;
use crate::method::RouteMethod;

/// A compiled route template.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compiles `path` for a route of kind `method`.
    ///
    /// Fails when a capture name is not a valid identifier or appears twice.
    pub fn compile(path: &str, method: RouteMethod) -> Result<Self, Error> {
        let mut expr = String::from("(?i)^");
        let mut literal = String::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str("(.*)");
                }
                ':' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !(next.is_ascii_alphanumeric() || next == '_') {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        literal.push(':');
                        continue;
                    }
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(&format!("(?P<{name}>[^/]*)"));
                }
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));

        if method != RouteMethod::Static {
            expr.push('$');
        }

        let regex = Regex::new(&expr).map_err(|e| Error::invalid_route(path, e))?;
        Ok(Self { source: path.to_owned(), regex })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Named captures of `path`, or `None` when it does not match.
    ///
    /// Values keep the case of `path`; only the literal parts of the
    /// template are compared case-insensitively.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = self.regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
            .collect();
        Some(params)
    }

    /// Length of the matched prefix of `path`. For static mounts this is
    /// where the file sub-path starts.
    pub fn match_end(&self, path: &str) -> Option<usize> {
        self.regex.find(path).map(|m| m.end())
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> PathPattern {
        PathPattern::compile(path, RouteMethod::Get).unwrap()
    }

    #[test]
    fn literal_paths_match_exactly() {
        let pattern = get("/hello");
        assert!(pattern.is_match("/hello"));
        assert!(pattern.is_match("/HELLO"));
        assert!(!pattern.is_match("/hello/world"));
        assert!(!pattern.is_match("/say/hello"));
    }

    #[test]
    fn named_segments_capture_one_segment() {
        let pattern = get("/users/:id/posts/:post_id");
        let captures = pattern.captures("/users/42/posts/AbC").unwrap();
        assert_eq!(captures["id"], "42");
        assert_eq!(captures["post_id"], "AbC");
        assert!(pattern.captures("/users/42/posts/a/b").is_none());
    }

    #[test]
    fn capture_name_stops_at_non_identifier() {
        let pattern = get("/files/:name.json");
        assert_eq!(pattern.captures("/files/report.json").unwrap()["name"], "report");
        assert!(!pattern.is_match("/files/reportxjson"));
    }

    #[test]
    fn wildcard_spans_segments() {
        let pattern = get("/assets/*");
        assert!(pattern.is_match("/assets/css/site.css"));
        assert!(pattern.is_match("/assets/"));
        assert!(!pattern.is_match("/other/site.css"));
    }

    #[test]
    fn static_mounts_match_prefix_only() {
        let pattern = PathPattern::compile("/file", RouteMethod::Static).unwrap();
        assert!(pattern.is_match("/file/test.png"));
        assert_eq!(pattern.match_end("/FILE/test.png"), Some(5));
        assert!(!pattern.is_match("/other/file"));
    }

    #[test]
    fn literal_regex_characters_are_escaped() {
        let pattern = get("/v1.0/(status)");
        assert!(pattern.is_match("/v1.0/(status)"));
        assert!(!pattern.is_match("/v1x0/(status)"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = PathPattern::compile("/:id/:id", RouteMethod::Get).unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { .. }));
    }

    #[test]
    fn lone_colon_is_literal() {
        let pattern = get("/time/12:/x");
        assert!(pattern.is_match("/time/12:/x"));
    }
}
