use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, error, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

use super::CheckError;
use crate::monitoring::target::is_https_url;

const DEFAULT_HTTPS_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SECONDS_PER_DAY: i64 = 86_400;

/// Expiry of the leaf certificate presented by a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateExpiry {
    pub not_after: DateTime<Utc>,
    /// Whole days left, rounded down. Negative once expired.
    pub days_left: i64,
}

impl CertificateExpiry {
    pub fn new(not_after: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            not_after,
            days_left: days_until(not_after, now),
        }
    }
}

/// Anything that can report the certificate expiry behind an `https://` URL.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// `None` when no expiry could be determined.
    async fn certificate_expiry(&self, url: &str) -> Option<CertificateExpiry>;
}

/// Opens TLS connections with the platform trust store and reads the peer
/// certificate's expiry.
pub struct CertInspector {
    connector: TlsConnector,
    timeout: Duration,
}

impl CertInspector {
    /// Builds an inspector that trusts the operating system's root certificates.
    pub fn new() -> Result<Self, CheckError> {
        let loaded = rustls_native_certs::load_native_certs();
        for e in &loaded.errors {
            warn!(error = %e, "Failed to load a native root certificate.");
        }

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
        debug!(added, ignored, "Native root certificates loaded.");
        if added == 0 {
            warn!("No native root certificates available; certificate checks will fail.");
        }
        Self::with_roots(roots)
    }

    pub fn with_roots(roots: RootCertStore) -> Result<Self, CheckError> {
        let config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| CheckError::Protocol(e.to_string()))?
                .with_root_certificates(roots)
                .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout: CONNECT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the certificate expiry for an `https://` URL.
    ///
    /// `None` means "no result", never a failed check: the URL is not HTTPS,
    /// the server sent no certificate, or the connection could not be made.
    pub async fn inspect(&self, url: &str) -> Option<CertificateExpiry> {
        if !is_https_url(url) {
            debug!(url, "Skipping certificate check for non-HTTPS URL.");
            return None;
        }
        let Some((host, port)) = host_port(url) else {
            warn!(url, "Cannot extract a host from URL for certificate check.");
            return None;
        };

        match self.fetch_not_after(&host, port).await {
            Ok(Some(not_after)) => Some(CertificateExpiry::new(not_after, Utc::now())),
            Ok(None) => {
                error!(url, "No certificate presented by server.");
                None
            }
            Err(e) => {
                error!(url, error = %e, "Certificate check failed.");
                None
            }
        }
    }

    async fn fetch_not_after(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<DateTime<Utc>>, CheckError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| CheckError::InvalidTarget(format!("{host}: {e}")))?;

        let tcp = timeout(self.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| CheckError::Timeout(self.timeout))?
            .map_err(|e| CheckError::Connectivity(e.to_string()))?;

        let mut stream = timeout(self.timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| CheckError::Timeout(self.timeout))?
            .map_err(|e| CheckError::Protocol(e.to_string()))?;

        let not_after = {
            let (_, connection) = stream.get_ref();
            connection
                .peer_certificates()
                .and_then(|chain| chain.first())
                .map(|leaf| parse_not_after(leaf.as_ref()))
        };

        // Close before returning, whatever the parse produced.
        if let Err(e) = timeout(self.timeout, stream.shutdown()).await.unwrap_or(Ok(())) {
            debug!(host, error = %e, "TLS shutdown was not clean.");
        }
        drop(stream);

        not_after.transpose()
    }
}

#[async_trait]
impl CertificateSource for CertInspector {
    async fn certificate_expiry(&self, url: &str) -> Option<CertificateExpiry> {
        self.inspect(url).await
    }
}

/// Reads `notAfter` from a DER-encoded certificate.
pub fn parse_not_after(der: &[u8]) -> Result<DateTime<Utc>, CheckError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| CheckError::Protocol(format!("Failed to parse certificate: {e}")))?;
    let timestamp = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| CheckError::Protocol(format!("Certificate expiry out of range: {timestamp}")))
}

/// Whole days from `now` until `not_after`, rounded toward negative infinity.
pub fn days_until(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Extracts `(host, port)` from the authority of a URL.
///
/// The port defaults to 443; an unparsable port also falls back to 443.
pub fn host_port(url: &str) -> Option<(String, u16)> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    let (host, port) = match authority.strip_prefix('[') {
        Some(bracketed) => {
            let (host, after) = bracketed.split_once(']')?;
            (host, after.strip_prefix(':'))
        }
        None => match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        },
    };
    if host.is_empty() {
        return None;
    }

    let port = match port {
        Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
            debug!(url, port = raw, "Unparsable port, using the HTTPS default.");
            DEFAULT_HTTPS_PORT
        }),
        None => DEFAULT_HTTPS_PORT,
    };
    Some((host.to_string(), port))
}
