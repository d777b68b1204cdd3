//! Per-server configuration.
//!
//! Options can be built in code or deserialized from any serde format:
//!
//! ```rust
//! use easyfied::ServerOptions;
//!
//! let options: ServerOptions = serde_json::from_str(r#"{
//!     "host": "127.0.0.1",
//!     "default_error": { "code": 503, "message": "Service unavailable" }
//! }"#).unwrap();
//! assert_eq!(options.default_error.unwrap().code, 503);
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::HttpError;

/// Options applied when a server is created. Ignored when the port already
/// has a server.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerOptions {
    /// Interface to listen on. Defaults to every IPv4 interface.
    pub host: IpAddr,
    /// Serve HTTPS with this key/certificate pair instead of plain HTTP.
    pub https: Option<HttpsOptions>,
    /// Replaces every untyped handler error.
    pub default_error: Option<DefaultError>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { host: IpAddr::V4(Ipv4Addr::UNSPECIFIED), https: None, default_error: None }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// PEM files for the private key and the certificate chain.
    pub fn https(mut self, key: impl Into<PathBuf>, cert: impl Into<PathBuf>) -> Self {
        self.https = Some(HttpsOptions { key: key.into(), cert: cert.into() });
        self
    }

    pub fn default_error(mut self, code: u16, message: impl Into<String>) -> Self {
        self.default_error = Some(DefaultError { code, message: message.into() });
        self
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HttpsOptions {
    pub key: PathBuf,
    pub cert: PathBuf,
}

/// The `{code, message}` sent in place of an untyped error.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DefaultError {
    pub code: u16,
    pub message: String,
}

impl DefaultError {
    pub(crate) fn to_error(&self) -> HttpError {
        HttpError::new(self.code, self.message.clone())
    }
}
