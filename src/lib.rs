//! # easyfied
//!
//! A minimal HTTP application toolkit: ordered routes, declared parameters,
//! middleware, static mounts, redirects and a small validation DSL.
//!
//! ## The model
//!
//! Every port has one [`Server`], created on first use and kept in a
//! process-wide [registry](registry). A server owns an ordered list of
//! routes, tried in registration order for every request:
//!
//! - **middleware** runs on every request. Its error is remembered and
//!   becomes the response unless the terminal route fails too.
//! - **verb routes** (and `Use`, any verb) are terminal: the first one whose
//!   method and path match runs, and the loop stops.
//! - **static mounts** serve a folder under a path prefix; terminal.
//! - **redirects** answer every request they see with a `301`.
//!
//! Nothing terminal matched: `404 not found`.
//!
//! Handlers declare the parameters they need ([`Params`]); missing required
//! ones answer `400` before the handler runs. Handlers return anything
//! [`IntoReply`]: strings and scalars become `text/html`, objects and arrays
//! `application/json`, `()` a `204`, and errors their own status.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use easyfied::{Endpoint, HttpError, Request, RouteMethod, Validator};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), easyfied::Error> {
//!     easyfied::set_main_port(3000);
//!
//!     easyfied::add_middleware(authenticate, 0)?;
//!     easyfied::add_route(RouteMethod::Get, "/users/:id", Endpoint::new(get_user).param("id"), 0)?;
//!     easyfied::add_route(RouteMethod::Post, "/users", Endpoint::new(create_user).param("age"), 0)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     easyfied::close(0).await;
//!     Ok(())
//! }
//!
//! async fn authenticate(req: Request) -> Result<(), HttpError> {
//!     match req.header("authorization") {
//!         Some(_) => Ok(()),
//!         None => Err(HttpError::not_authenticated("who are you?")),
//!     }
//! }
//!
//! async fn get_user(req: Request) -> Result<serde_json::Value, HttpError> {
//!     let id: String = req.arg_as("id")?;
//!     Ok(json!({ "id": id }))
//! }
//!
//! async fn create_user(req: Request) -> Result<String, HttpError> {
//!     let age = req.arg("age").cloned().unwrap_or_default();
//!     Validator::new("age").is_number().between(0.0, 150.0).validate(&age)?;
//!     req.set_response_code(201);
//!     Ok("created".to_owned())
//! }
//! ```

mod config;
mod error;
mod handler;
mod method;
mod params;
mod pattern;
mod redirect;
mod request;
mod response;
mod route;
mod router;
mod server;
mod static_files;
mod tls;

pub mod registry;
pub mod validation;

pub use config::{DefaultError, HttpsOptions, ServerOptions};
pub use error::{Error, HttpError, MISSING_PARAMETER, NOT_FOUND, UNABLE_TO_PARSE_JSON, UNABLE_TO_READ_BODY};
pub use handler::{Endpoint, Handler};
pub use method::RouteMethod;
pub use params::{Param, Params, Source};
pub use pattern::PathPattern;
pub use registry::{
    Target, add_middleware, add_redirect, add_route, add_static, close, initialize, lookup, main_port,
    server, set_main_port,
};
pub use request::{Request, UrlInfo, parse_body};
pub use response::{IntoReply, Json, Reply, Response, ResponseBuilder};
pub use route::Route;
pub use server::Server;
pub use static_files::StaticOptions;
pub use validation::{Property, Rule, Validator, validate};
