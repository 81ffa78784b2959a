use reqwest::Method;
use std::fmt;
use std::time::Duration;

/// Which checker a target is probed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckMethod {
    Http,
    Ping,
    /// Loaded from configuration but not backed by any checker. Every cycle
    /// reports it as down.
    Unsupported(String),
}

impl CheckMethod {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HTTP" => CheckMethod::Http,
            "PING" => CheckMethod::Ping,
            other => CheckMethod::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for CheckMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckMethod::Http => write!(f, "HTTP"),
            CheckMethod::Ping => write!(f, "PING"),
            CheckMethod::Unsupported(raw) => write!(f, "{raw}"),
        }
    }
}

/// One monitored endpoint, as read from the targets file.
///
/// The descriptor itself never changes after load. Tracked state (certificate
/// warnings, last status) lives next to it in the per-target monitor.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub method: CheckMethod,
    /// A URL for HTTP targets, a hostname or IP for PING targets.
    pub address: String,
    /// Only meaningful for HTTP targets.
    pub http_method: Method,
    pub timeout: Duration,
    pub allow_redirects: bool,
    pub max_redirects: usize,
    pub check_body: bool,
    pub verify_ssl: bool,
}

impl Target {
    /// A target with the same defaults the targets file applies.
    pub fn new(name: impl Into<String>, method: CheckMethod, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            address: address.into(),
            http_method: Method::GET,
            timeout: Duration::from_secs(10),
            allow_redirects: true,
            max_redirects: 5,
            check_body: true,
            verify_ssl: false,
        }
    }

    pub fn is_https(&self) -> bool {
        self.method == CheckMethod::Http && is_https_url(&self.address)
    }
}

pub(crate) fn is_https_url(url: &str) -> bool {
    url.get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}
