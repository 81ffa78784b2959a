//! Single-shot probes. Every checker catches its own failures, logs them with
//! the target name, and hands back a plain `bool` or `Option`.
use reqwest::Url;
use thiserror::Error;

pub mod http;
pub mod ping;
pub mod tls;

pub use http::HttpChecker;
pub use ping::{check_ping, probe_reachability};
pub use tls::{CertInspector, CertificateExpiry, CertificateSource};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Connection failed: {0}")]
    Connectivity(String),
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Failed to run probe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

/// Availability result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub available: bool,
    /// Final URL when an HTTP probe succeeded somewhere other than the
    /// configured address.
    pub redirected_to: Option<Url>,
}

impl ProbeOutcome {
    pub fn reachable(available: bool) -> Self {
        Self {
            available,
            redirected_to: None,
        }
    }

    pub fn down() -> Self {
        Self::reachable(false)
    }
}
