//! One listening port: listener, accept loop, and its route list.
//!
//! # Lifecycle
//!
//! [`Server::bind`] binds synchronously and spawns the accept loop on the
//! current tokio runtime, so a server answers as soon as it exists and routes
//! can be appended at any time afterwards.
//!
//! [`Server::close`]:
//! 1. Stops `listener.accept()` and drops the listener, releasing the port.
//! 2. Aborts every open connection.
//! 3. Returns once the accept loop is gone, so the port can be bound again
//!    immediately.
//!
//! Servers are usually obtained through the [registry](crate::registry),
//! which keys them by port.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

use crate::config::{DefaultError, ServerOptions};
use crate::error::{Error, HttpError, UNABLE_TO_READ_BODY};
use crate::handler::Endpoint;
use crate::method::RouteMethod;
use crate::route::Route;
use crate::router::Router;
use crate::static_files::StaticOptions;
use crate::tls;

/// A listening HTTP(S) server and its ordered routes.
pub struct Server {
    local_addr: SocketAddr,
    tls: bool,
    router: Router,
    shutdown: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Binds `options.host:port` and starts serving, outside the registry.
    ///
    /// Port `0` asks the OS for a free port; read it back with
    /// [`Server::port`]. Fails with [`Error::NoRuntime`] outside a tokio
    /// runtime.
    ///
    /// ```rust,no_run
    /// use easyfied::{Server, ServerOptions};
    ///
    /// # #[tokio::main] async fn main() -> Result<(), easyfied::Error> {
    /// let server = Server::bind(0, &ServerOptions::default())?;
    /// println!("listening on {}", server.local_addr());
    /// server.close().await;
    /// # Ok(()) }
    /// ```
    pub fn bind(port: u16, options: &ServerOptions) -> Result<Arc<Self>, Error> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let acceptor = options.https.as_ref().map(tls::load_acceptor).transpose()?;

        let listener = std::net::TcpListener::bind(SocketAddr::new(options.host, port))
            .map_err(|source| Error::Bind { port, source })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let listener = TcpListener::from_std(listener)?;

        let server = Arc::new(Self {
            local_addr,
            tls: acceptor.is_some(),
            router: Router::new(options.default_error.as_ref().map(DefaultError::to_error)),
            shutdown: Arc::new(Notify::new()),
            task: Mutex::new(None),
        });

        info!(port = local_addr.port(), addr = %local_addr, tls = server.tls, "easyfied listening");

        let task = runtime.spawn(accept_loop(
            listener,
            acceptor,
            Arc::downgrade(&server),
            Arc::clone(&server.shutdown),
        ));
        *server.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        Ok(server)
    }

    pub fn port(&self) -> u16 { self.local_addr.port() }
    pub fn local_addr(&self) -> SocketAddr { self.local_addr }
    pub fn is_tls(&self) -> bool { self.tls }

    /// The current route list, in registration order.
    pub fn routes(&self) -> Arc<Vec<Arc<Route>>> {
        self.router.snapshot()
    }

    /// Appends a route answering `method` on `path`.
    ///
    /// [`RouteMethod::Middleware`] ignores `path` and registers middleware.
    /// Static mounts and redirects have their own registration methods.
    pub fn add_route(&self, method: RouteMethod, path: &str, endpoint: impl Into<Endpoint>) -> Result<(), Error> {
        let route = match method {
            RouteMethod::Middleware => Route::middleware(endpoint.into())?,
            RouteMethod::Static | RouteMethod::Redirect => {
                return Err(Error::invalid_route(path, format!("{method} routes need a folder or a destination")));
            }
            _ => Route::handler(method, path, endpoint.into())?,
        };
        self.router.push(route);
        Ok(())
    }

    /// Appends middleware: it runs on every request that reaches it, and its
    /// error, if any, is the response unless the terminal route fails too.
    pub fn add_middleware(&self, endpoint: impl Into<Endpoint>) -> Result<(), Error> {
        self.router.push(Route::middleware(endpoint.into())?);
        Ok(())
    }

    /// Mounts `folder` under `base_url`.
    pub fn add_static(&self, base_url: &str, folder: impl AsRef<Path>, options: StaticOptions) -> Result<(), Error> {
        self.router.push(Route::mount(base_url, folder.as_ref(), options)?);
        Ok(())
    }

    /// Redirects every request reaching this route to `destination`
    /// (`301`). With `relative`, the request path and query are carried
    /// over.
    pub fn add_redirect(&self, destination: &str, relative: bool) -> Result<(), Error> {
        self.router.push(Route::redirect(destination, relative)?);
        Ok(())
    }

    /// Stops the listener, aborts open connections and waits until the port
    /// is released. Idempotent.
    pub async fn close(&self) {
        self.shutdown.notify_one();
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(task) = task else { return };

        if let Err(e) = task.await {
            error!(port = self.port(), "accept loop ended abnormally: {e}");
        }
        info!(port = self.port(), "easyfied stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("tls", &self.tls)
            .field("routes", &self.router.snapshot().len())
            .finish()
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Holds only a weak reference to its server: dropping the last `Arc`
/// stops the loop through `Drop`.
async fn accept_loop(
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    server: Weak<Server>,
    shutdown: Arc<Notify>,
) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            // Checked first so a close wins over queued connections.
            biased;

            () = shutdown.notified() => {
                debug!(in_flight = tasks.len(), "accept loop closing");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let server = Weak::clone(&server);
                let acceptor = acceptor.clone();
                tasks.spawn(async move {
                    match acceptor {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => serve_connection(stream, server, peer).await,
                            Err(e) => error!(%peer, "tls handshake failed: {e}"),
                        },
                        None => serve_connection(stream, server, peer).await,
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet stays small.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    tasks.shutdown().await;
}

async fn serve_connection<S>(stream: S, server: Weak<Server>, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let svc = service_fn(move |req| {
        let server = server.upgrade();
        async move { Ok::<_, Infallible>(handle(server, req).await) }
    });

    // HTTP/1.1 and HTTP/2, whatever the client negotiates.
    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        error!(%peer, "connection error: {e}");
    }
}

/// Reads the whole body, then hands the request to the router.
async fn handle(
    server: Option<Arc<Server>>,
    req: hyper::Request<hyper::body::Incoming>,
) -> http::Response<Full<Bytes>> {
    let Some(server) = server else {
        return HttpError::new(503, "server closed").into_response().into_inner();
    };

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(path = parts.uri.path(), "unable to read body: {e}");
            return HttpError::bad_request(UNABLE_TO_READ_BODY).into_response().into_inner();
        }
    };

    server.router
        .dispatch(Some(Arc::clone(&server)), parts.method, &parts.uri, parts.headers, &body)
        .await
        .into_inner()
}
