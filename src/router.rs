//! Ordered route list and the per-request dispatch loop.
//!
//! Routes are tried strictly in registration order. No tree, no sorting:
//! the first terminal route that recognises the request decides the
//! response.
//!
//! ```text
//! parse target ─► parse body ─► for each route (one snapshot):
//!                                  REDIRECT   → answer 301, done
//!                                  MIDDLEWARE → run, keep its error, go on
//!                                  verb / USE → if method + path match: run, stop
//!                                  STATIC     → if prefix matches: serve, stop
//!                               ─► reduce
//! ```
//!
//! A redirect answers at once and skips the reduction. Past that, no
//! terminal route means `404 not found`. Otherwise the terminal route's
//! error wins, then a retained middleware error, then the
//! terminal route's response. Untyped errors are replaced by the server's
//! default error when one is configured.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use http::HeaderMap;
use tracing::{debug, warn};

use crate::error::{HttpError, NOT_FOUND};
use crate::handler::BoxedHandler;
use crate::method::RouteMethod;
use crate::params::{Inputs, Params};
use crate::request::{Incoming, Request, UrlInfo, parse_body};
use crate::response::{Reply, Response};
use crate::route::{Action, Route};
use crate::server::Server;

/// A server's routes plus its error policy.
///
/// Appends never block dispatches: every dispatch works on the snapshot it
/// loaded when it started, so a route added meanwhile (even by one of its
/// own handlers) is only seen by later requests.
pub(crate) struct Router {
    routes: ArcSwap<Vec<Arc<Route>>>,
    default_error: Option<HttpError>,
}

impl Router {
    pub(crate) fn new(default_error: Option<HttpError>) -> Self {
        Self { routes: ArcSwap::from_pointee(Vec::new()), default_error }
    }

    pub(crate) fn push(&self, route: Route) {
        let route = Arc::new(route);
        self.routes.rcu(|routes| {
            let mut next = Vec::clone(routes);
            next.push(Arc::clone(&route));
            next
        });
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<Route>>> {
        self.routes.load_full()
    }

    /// Routes one fully-read request and produces its response. Never fails:
    /// every error becomes a response.
    pub(crate) async fn dispatch(
        &self,
        server: Option<Arc<Server>>,
        method: http::Method,
        uri: &http::Uri,
        headers: HeaderMap,
        body: &[u8],
    ) -> Response {
        let url = UrlInfo::parse(uri);
        let content_type = headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let body = match parse_body(content_type, body) {
            Ok(body) => body,
            Err(e) => {
                debug!(%method, path = %url.raw_route, "rejected body: {e}");
                return e.into_response();
            }
        };

        let incoming = Arc::new(Incoming::new(method, url, headers, body, server));
        let response = self.run(&incoming).await;

        debug!(
            method = %incoming.method,
            path = %incoming.url.raw_route,
            status = response.status_code(),
            "dispatched"
        );
        response
    }

    async fn run(&self, incoming: &Arc<Incoming>) -> Response {
        let routes = self.snapshot();
        let path = incoming.url.raw_route.as_str();

        let mut retained: Option<HttpError> = None;
        let mut outcome: Option<Result<Response, HttpError>> = None;

        for route in routes.iter() {
            match &route.action {
                // Ends the request outright, whatever middleware retained.
                Action::Redirect(redirect) => {
                    return redirect.respond(path, incoming.url.raw_query.as_deref());
                }
                Action::Handler(handler) if route.method() == RouteMethod::Middleware => {
                    if let Err(e) = self.invoke(handler, route.params(), incoming, HashMap::new()).await {
                        retained = Some(self.apply_default(e));
                    }
                    continue;
                }
                Action::Handler(handler) => {
                    if !route.method().accepts(&incoming.method) {
                        continue;
                    }
                    let Some(captures) = route.pattern().captures(path) else { continue };
                    outcome = Some(self.invoke(handler, route.params(), incoming, captures).await);
                }
                Action::Static(files) => {
                    let Some(end) = route.pattern().match_end(path) else { continue };
                    outcome = Some(files.serve(path, &path[end..]).await);
                }
            }
            break;
        }

        let Some(outcome) = outcome else {
            return HttpError::not_found(NOT_FOUND).into_response();
        };
        match (outcome.map_err(|e| self.apply_default(e)), retained) {
            (Err(e), _) | (Ok(_), Some(e)) => e.into_response(),
            (Ok(response), None) => response,
        }
    }

    /// Resolves the declared parameters, runs the handler, and reduces its
    /// reply. A panicking handler counts as an untyped error.
    async fn invoke(
        &self,
        handler: &BoxedHandler,
        params: &Arc<Params>,
        incoming: &Arc<Incoming>,
        captures: HashMap<String, String>,
    ) -> Result<Response, HttpError> {
        let args = params.resolve(&Inputs {
            method: &incoming.method,
            headers: &incoming.headers,
            query: &incoming.url.query,
            body: &incoming.body,
            captures: &captures,
        })?;

        let request = Request::new(Arc::clone(incoming), captures, Arc::clone(params), args);
        let call = AssertUnwindSafe(async move { handler.call(request).await });
        let reply = match call.catch_unwind().await {
            Ok(reply) => reply,
            Err(panic) => Reply::Failed(HttpError::untyped(panic_message(&*panic))),
        };

        reply.into_response(incoming.response_code())
    }

    fn apply_default(&self, e: HttpError) -> HttpError {
        if e.is_typed() {
            debug!(code = e.code(), "handler failed: {e}");
            return e;
        }
        warn!(code = e.code(), "handler failed with an untyped error: {e}");
        self.default_error.clone().unwrap_or(e)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    payload.downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "handler panicked".to_owned())
}
