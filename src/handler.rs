//! Handler trait, type erasure, and [`Endpoint`].
//!
//! # How async handlers are stored
//!
//! A server holds handlers of *different* types in one ordered route list,
//! so every handler is hidden behind a trait object (`dyn ErasedHandler`)
//! and stored uniformly.
//!
//! ```text
//! async fn hello(req: Request) -> String { … }     ← user writes this
//!        ↓ server.add_route(Get, "/", hello)
//! Endpoint::from(hello)                            ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_reply() })  ← BoxFuture
//! ```
//!
//! The only runtime cost per call is **one Arc clone** + **one virtual call**.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::params::{Param, Params};
use crate::request::Request;
use crate::response::{IntoReply, Reply};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Reply`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Reply> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoReply
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_reply() })
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A handler together with the parameters it declares.
///
/// Every registration function accepts `impl Into<Endpoint>`, so a bare
/// handler works wherever no parameters are needed:
///
/// ```rust
/// use easyfied::{Endpoint, Request};
///
/// async fn greet(req: Request) -> String {
///     let name: String = req.arg_as("name").unwrap_or_default();
///     format!("hello {name}")
/// }
///
/// let endpoint = Endpoint::new(greet).param("name").with_default("title", "Mr");
/// assert_eq!(endpoint.params().len(), 2);
/// ```
pub struct Endpoint {
    handler: BoxedHandler,
    params: Params,
}

impl Endpoint {
    pub fn new(handler: impl Handler) -> Self {
        Self { handler: handler.into_boxed_handler(), params: Params::new() }
    }

    /// Declares a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params = self.params.required(name);
        self
    }

    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.params = self.params.optional(name);
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params = self.params.with_default(name, default);
        self
    }

    /// Declares a fully specified parameter (custom source, default, …).
    pub fn with(mut self, param: Param) -> Self {
        self.params = self.params.with(param);
        self
    }

    /// Replaces every declared parameter, e.g. with
    /// [`Params::from_signature`].
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Declares parameters from a signature such as `"name, title = 'Mr'"`.
    pub fn signature(self, signature: &str) -> Self {
        self.with_params(Params::from_signature(signature))
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (BoxedHandler, Params) {
        (self.handler, self.params)
    }
}

impl<H: Handler> From<H> for Endpoint {
    fn from(handler: H) -> Self {
        Self::new(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Incoming, UrlInfo};

    async fn answer(_: Request) -> u32 {
        42
    }

    fn request() -> Request {
        let incoming = Incoming::new(
            http::Method::GET,
            UrlInfo::from_target("/"),
            http::HeaderMap::new(),
            Value::Null,
            None,
        );
        Request::new(Arc::new(incoming), Default::default(), Default::default(), Vec::new())
    }

    #[tokio::test]
    async fn bare_functions_become_endpoints() {
        let endpoint: Endpoint = answer.into();
        assert!(endpoint.params().is_empty());

        let (handler, _) = endpoint.into_parts();
        match handler.call(request()).await {
            Reply::Value(v) => assert_eq!(v, Value::from(42)),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let endpoint = Endpoint::new(|req: Request| async move { req.path().to_owned() })
            .signature("a, b = 2");
        assert_eq!(endpoint.params().len(), 2);
        assert!(!endpoint.params().get("b").unwrap().is_required());
    }
}
