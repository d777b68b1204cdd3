//! Error types.
//!
//! Two families live here and they never mix:
//!
//! - [`HttpError`] is what a handler (or the dispatcher itself) fails with.
//!   It carries the status code and message that end up on the wire.
//! - [`Error`] surfaces infrastructure failures of the registration and
//!   serving API: binding a port, loading TLS material, compiling a route.

use std::fmt;
use std::io;

use serde_json::Value;
use thiserror::Error as ThisError;

use crate::response::Response;

// ── Wire messages ─────────────────────────────────────────────────────────────

/// Prefix of the 400 body produced when a declared parameter is absent.
pub const MISSING_PARAMETER: &str = "A parameter is missing : ";

/// Body of the 400 produced when a JSON request body does not parse.
pub const UNABLE_TO_PARSE_JSON: &str = "unable to parse json body";

/// Body of the 400 produced when the request body cannot be read.
pub const UNABLE_TO_READ_BODY: &str = "Unable to read body";

/// Body of the 404 produced when no terminal route accepted the request.
pub const NOT_FOUND: &str = "not found";

// ── HttpError ─────────────────────────────────────────────────────────────────

/// A failure that becomes an HTTP response.
///
/// Errors built through the named factories ([`HttpError::bad_request`],
/// [`HttpError::forbidden`], …) or [`HttpError::new`] are *typed*: their code
/// and message are sent as-is.
///
/// Everything else ([`HttpError::untyped`], or any conversion from a foreign
/// error type) is *untyped*. Untyped errors answer `500` with their message,
/// unless the server was configured with a default error, which then replaces
/// them entirely.
///
/// ```rust
/// use easyfied::HttpError;
///
/// let err = HttpError::forbidden("not logged");
/// assert_eq!(err.code(), 403);
/// assert!(err.is_typed());
///
/// let err: HttpError = "Crashed".into();
/// assert_eq!(err.code(), 500);
/// assert!(!err.is_typed());
/// ```
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{message}")]
pub struct HttpError {
    code: u16,
    message: String,
    data: Option<Value>,
    typed: bool,
}

impl HttpError {
    /// A typed error with an explicit status code.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None, typed: true }
    }

    /// `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// `401 Unauthorized`.
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// `403 Forbidden`.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    /// `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// `500 Internal Server Error`, typed: a configured default error does
    /// not replace it.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// An untyped failure: `500`, replaceable by the server's default error.
    pub fn untyped(message: impl Into<String>) -> Self {
        Self { code: 500, message: message.into(), data: None, typed: false }
    }

    /// Attaches a structured payload for callers that inspect the error.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn code(&self) -> u16 { self.code }
    pub fn message(&self) -> &str { &self.message }
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }
    pub fn is_typed(&self) -> bool { self.typed }

    /// Renders the error the way every failure is written back: the status
    /// is the error code, the body is the message.
    pub fn into_response(self) -> Response {
        Response::builder().status(self.code).html(self.message)
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        Self::untyped(e.to_string())
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(e: serde_json::Error) -> Self {
        Self::untyped(e.to_string())
    }
}

impl From<String> for HttpError {
    fn from(message: String) -> Self {
        Self::untyped(message)
    }
}

impl From<&str> for HttpError {
    fn from(message: &str) -> Self {
        Self::untyped(message)
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// The error type returned by easyfied's fallible setup operations.
///
/// Application-level failures are [`HttpError`]s and become responses. This
/// type covers what can go wrong *around* the requests: binding a port,
/// reading TLS files, or registering a malformed route.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("unable to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("server already initialized on port {0}")]
    AlreadyInitialized(u16),

    #[error("no tokio runtime available to run the server")]
    NoRuntime,

    #[error("invalid route `{path}`: {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("invalid redirect destination `{destination}`: {source}")]
    InvalidRedirect {
        destination: String,
        #[source]
        source: url::ParseError,
    },

    #[error("tls: {0}")]
    Tls(String),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_route(path: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidRoute { path: path.to_owned(), reason: reason.to_string() }
    }
}
