//! Route method as a typed enum.
//!
//! The six HTTP verbs a route can answer, plus four registration kinds that
//! are not verbs at all: `Use` answers any verb, `Middleware` runs on every
//! request, `Static` mounts a folder, `Redirect` forwards the whole server.

use std::fmt;
use std::str::FromStr;

/// What a registered route answers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RouteMethod {
    Delete,
    Get,
    Head,
    Patch,
    Post,
    Put,
    /// Any request method, as long as the path matches.
    Use,
    /// Every request, regardless of path or method. Never terminal.
    Middleware,
    /// A folder mounted under a path prefix.
    Static,
    /// Whole-server redirection; terminates every request it sees.
    Redirect,
}

impl RouteMethod {
    /// Returns the uppercase name (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete     => "DELETE",
            Self::Get        => "GET",
            Self::Head       => "HEAD",
            Self::Middleware => "MIDDLEWARE",
            Self::Patch      => "PATCH",
            Self::Post       => "POST",
            Self::Put        => "PUT",
            Self::Redirect   => "REDIRECT",
            Self::Static     => "STATIC",
            Self::Use        => "USE",
        }
    }

    /// Whether a path-matching route of this kind may answer `method`.
    ///
    /// Only the verb kinds and `Use` answer requests this way; middleware,
    /// static and redirect routes are selected by their own rules.
    pub fn accepts(self, method: &http::Method) -> bool {
        match self {
            Self::Use => true,
            Self::Delete => method == http::Method::DELETE,
            Self::Get    => method == http::Method::GET,
            Self::Head   => method == http::Method::HEAD,
            Self::Patch  => method == http::Method::PATCH,
            Self::Post   => method == http::Method::POST,
            Self::Put    => method == http::Method::PUT,
            Self::Middleware | Self::Static | Self::Redirect => false,
        }
    }
}

/// Parses an uppercase name (e.g. `"GET"`).
impl FromStr for RouteMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE"     => Ok(Self::Delete),
            "GET"        => Ok(Self::Get),
            "HEAD"       => Ok(Self::Head),
            "MIDDLEWARE" => Ok(Self::Middleware),
            "PATCH"      => Ok(Self::Patch),
            "POST"       => Ok(Self::Post),
            "PUT"        => Ok(Self::Put),
            "REDIRECT"   => Ok(Self::Redirect),
            "STATIC"     => Ok(Self::Static),
            "USE"        => Ok(Self::Use),
            _            => Err(()),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
