//! A registered route.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxedHandler, Endpoint};
use crate::method::RouteMethod;
use crate::params::Params;
use crate::pattern::PathPattern;
use crate::redirect::Redirect;
use crate::static_files::{FileServer, StaticOptions};

pub(crate) enum Action {
    Handler(BoxedHandler),
    Static(FileServer),
    Redirect(Redirect),
}

/// One entry of a server's ordered route list. Immutable once registered.
pub struct Route {
    method: RouteMethod,
    pattern: PathPattern,
    pub(crate) action: Action,
    params: Arc<Params>,
}

impl Route {
    /// A verb or `Use` route.
    pub(crate) fn handler(method: RouteMethod, path: &str, endpoint: Endpoint) -> Result<Self, Error> {
        let (handler, params) = endpoint.into_parts();
        Ok(Self {
            method,
            pattern: PathPattern::compile(path, method)?,
            action: Action::Handler(handler),
            params: Arc::new(params),
        })
    }

    pub(crate) fn middleware(endpoint: Endpoint) -> Result<Self, Error> {
        Self::handler(RouteMethod::Middleware, "*", endpoint)
    }

    pub(crate) fn mount(base_url: &str, folder: &Path, options: StaticOptions) -> Result<Self, Error> {
        Ok(Self {
            method: RouteMethod::Static,
            pattern: PathPattern::compile(base_url, RouteMethod::Static)?,
            action: Action::Static(FileServer::new(folder, options)?),
            params: Arc::default(),
        })
    }

    pub(crate) fn redirect(destination: &str, relative: bool) -> Result<Self, Error> {
        Ok(Self {
            method: RouteMethod::Redirect,
            pattern: PathPattern::compile("*", RouteMethod::Redirect)?,
            action: Action::Redirect(Redirect::new(destination, relative)?),
            params: Arc::default(),
        })
    }

    pub fn method(&self) -> RouteMethod { self.method }
    pub fn path(&self) -> &str { self.pattern.as_str() }
    pub fn pattern(&self) -> &PathPattern { &self.pattern }
    pub fn params(&self) -> &Arc<Params> { &self.params }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("params", &self.params.len())
            .finish()
    }
}
