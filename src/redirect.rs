//! Whole-server redirection.

use url::Url;

use crate::error::Error;
use crate::response::Response;

/// Forwards every request it sees with a `301`.
#[derive(Debug)]
pub(crate) struct Redirect {
    raw: String,
    destination: Url,
    relative: bool,
}

impl Redirect {
    /// `destination` must be an absolute URL. With `relative` set, the
    /// request path is appended to the destination path.
    pub(crate) fn new(destination: &str, relative: bool) -> Result<Self, Error> {
        let parsed = Url::parse(destination).map_err(|source| Error::InvalidRedirect {
            destination: destination.to_owned(),
            source,
        })?;
        Ok(Self { raw: destination.to_owned(), destination: parsed, relative })
    }

    /// The `Location` for a request on `path` with query string `query`.
    ///
    /// Absolute mode sends the destination verbatim. Relative mode appends
    /// the request path to the destination path, and the request's query,
    /// when it has one, replaces the destination's.
    pub(crate) fn location(&self, path: &str, query: Option<&str>) -> String {
        if !self.relative {
            return self.raw.clone();
        }
        let mut url = self.destination.clone();
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        if let Some(query) = query {
            url.set_query(Some(query));
        }
        url.into()
    }

    pub(crate) fn respond(&self, path: &str, query: Option<&str>) -> Response {
        Response::builder()
            .status(301)
            .header("location", &self.location(path, query))
            .no_body()
    }
}
