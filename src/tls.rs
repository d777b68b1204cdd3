//! PEM key/certificate loading for HTTPS servers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::config::HttpsOptions;
use crate::error::Error;

/// Builds an acceptor from the PEM files named in `options`. ALPN offers
/// HTTP/2 and HTTP/1.1, matching what the connection builder serves.
pub(crate) fn load_acceptor(options: &HttpsOptions) -> Result<TlsAcceptor, Error> {
    let certs = load_certs(&options.cert)?;
    let key = load_key(&options.key)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(format!("invalid certificate or key: {e}")))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path).map_err(|e| Error::Tls(format!("unable to open {}: {e}", path.display())))?;
    Ok(BufReader::new(file))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("unable to parse {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(Error::Tls(format!("no certificate found in {}", path.display())));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|e| Error::Tls(format!("unable to parse {}: {e}", path.display())))?
        .ok_or_else(|| Error::Tls(format!("no private key found in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_reported() {
        let options = HttpsOptions { key: "/nonexistent/key.pem".into(), cert: "/nonexistent/cert.pem".into() };
        let Err(err) = load_acceptor(&options) else { panic!("expected a tls error") };
        assert!(matches!(err, Error::Tls(ref msg) if msg.contains("cert.pem")));
    }

    #[test]
    fn files_without_pem_blocks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let Err(err) = load_acceptor(&HttpsOptions { key, cert }) else { panic!("expected a tls error") };
        assert!(matches!(err, Error::Tls(ref msg) if msg.contains("no certificate")));
    }
}
