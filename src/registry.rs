//! Process-wide port → [`Server`] registry and the free-function
//! registration API.
//!
//! ```rust,no_run
//! use easyfied::{RouteMethod, Request, registry};
//!
//! # #[tokio::main] async fn main() -> Result<(), easyfied::Error> {
//! registry::set_main_port(8080);
//!
//! // Port 0 is the main port; the server is created on first use.
//! registry::add_route(RouteMethod::Get, "/hello", |_: Request| async { "Hello world" }, 0)?;
//! registry::add_route(RouteMethod::Get, "/admin", |_: Request| async { "admin" }, 9000)?;
//!
//! registry::close(9000).await;
//! # Ok(()) }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::config::ServerOptions;
use crate::error::Error;
use crate::handler::Endpoint;
use crate::method::RouteMethod;
use crate::server::Server;
use crate::static_files::StaticOptions;

static SERVERS: LazyLock<DashMap<u16, Arc<Server>>> = LazyLock::new(DashMap::new);
static MAIN_PORT: AtomicU16 = AtomicU16::new(80);

/// Sets the port that `0` stands for. Defaults to 80.
pub fn set_main_port(port: u16) {
    MAIN_PORT.store(port, Ordering::Relaxed);
}

pub fn main_port() -> u16 {
    MAIN_PORT.load(Ordering::Relaxed)
}

fn resolve(port: u16) -> u16 {
    if port == 0 { main_port() } else { port }
}

/// Returns the server of `port`, creating it with `options` if there is none.
/// `options` are ignored for an existing server.
pub fn server(port: u16, options: &ServerOptions) -> Result<Arc<Server>, Error> {
    let port = resolve(port);
    match SERVERS.entry(port) {
        Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
        Entry::Vacant(entry) => {
            let server = Server::bind(port, options)?;
            entry.insert(Arc::clone(&server));
            Ok(server)
        }
    }
}

/// Creates the server of `port`, failing if one is already registered.
pub fn initialize(port: u16, options: &ServerOptions) -> Result<Arc<Server>, Error> {
    let port = resolve(port);
    match SERVERS.entry(port) {
        Entry::Occupied(_) => Err(Error::AlreadyInitialized(port)),
        Entry::Vacant(entry) => {
            let server = Server::bind(port, options)?;
            entry.insert(Arc::clone(&server));
            Ok(server)
        }
    }
}

pub fn lookup(port: u16) -> Option<Arc<Server>> {
    SERVERS.get(&resolve(port)).map(|entry| Arc::clone(entry.value()))
}

/// Closes and unregisters the server of `port`. Returns whether there was
/// one. Once this returns the port can be registered again, starting from
/// an empty route list.
pub async fn close(port: u16) -> bool {
    let Some((_, server)) = SERVERS.remove(&resolve(port)) else {
        return false;
    };
    server.close().await;
    true
}

// ── Targets ───────────────────────────────────────────────────────────────────

/// Where a registration goes: a port (`0` being the main port), created on
/// demand with default options, or a server already at hand.
#[derive(Clone, Debug)]
pub enum Target {
    Port(u16),
    Server(Arc<Server>),
}

impl Target {
    fn server(self) -> Result<Arc<Server>, Error> {
        match self {
            Target::Port(port) => server(port, &ServerOptions::default()),
            Target::Server(server) => Ok(server),
        }
    }
}

impl From<u16> for Target {
    fn from(port: u16) -> Self { Target::Port(port) }
}

impl From<Arc<Server>> for Target {
    fn from(server: Arc<Server>) -> Self { Target::Server(server) }
}

impl From<&Arc<Server>> for Target {
    fn from(server: &Arc<Server>) -> Self { Target::Server(Arc::clone(server)) }
}

pub fn add_route(
    method: RouteMethod,
    path: &str,
    endpoint: impl Into<Endpoint>,
    target: impl Into<Target>,
) -> Result<(), Error> {
    target.into().server()?.add_route(method, path, endpoint)
}

pub fn add_middleware(endpoint: impl Into<Endpoint>, target: impl Into<Target>) -> Result<(), Error> {
    target.into().server()?.add_middleware(endpoint)
}

pub fn add_static(
    base_url: &str,
    folder: impl AsRef<Path>,
    options: StaticOptions,
    target: impl Into<Target>,
) -> Result<(), Error> {
    target.into().server()?.add_static(base_url, folder, options)
}

pub fn add_redirect(destination: &str, target: impl Into<Target>, relative: bool) -> Result<(), Error> {
    target.into().server()?.add_redirect(destination, relative)
}
