use reqwest::{Client, Url, redirect::Policy};
use tracing::{debug, error, info, warn};

use super::{CheckError, ProbeOutcome};
use crate::monitoring::target::Target;
use crate::version::USER_AGENT;

/// Probes one HTTP target. The client is built once per target so the
/// timeout, redirect policy and certificate handling stay fixed for the run.
pub struct HttpChecker {
    client: Client,
}

impl HttpChecker {
    pub fn new(target: &Target) -> Result<Self, CheckError> {
        let redirect = if target.allow_redirects {
            Policy::limited(target.max_redirects)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .timeout(target.timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(!target.verify_ssl)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CheckError::Protocol(e.to_string()))?;

        Ok(Self { client })
    }

    /// Runs the request. Any failure is logged and reported as unavailable.
    pub async fn check(&self, target: &Target) -> ProbeOutcome {
        match self.request(target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(monitor = %target.name, error = %e, "HTTP check failed.");
                ProbeOutcome::down()
            }
        }
    }

    async fn request(&self, target: &Target) -> Result<ProbeOutcome, CheckError> {
        let response = self
            .client
            .request(target.http_method.clone(), &target.address)
            .send()
            .await
            .map_err(|e| classify(e, target))?;

        debug!(
            monitor = %target.name,
            status = %response.status(),
            url = %response.url(),
            "HTTP response received."
        );

        let status = response.status();
        if !(200..400).contains(&status.as_u16()) {
            warn!(monitor = %target.name, status = %status, "HTTP check returned failing status.");
            return Ok(ProbeOutcome::down());
        }

        // Redirects are reported only for a passing final response.
        let final_url = response.url().clone();
        let redirected_to = if same_url(&target.address, &final_url) {
            None
        } else {
            info!(monitor = %target.name, from = %target.address, to = %final_url, "Redirect detected.");
            Some(final_url)
        };

        let available = if target.check_body {
            let body = response.text().await.map_err(|e| classify(e, target))?;
            let has_body = !body.trim().is_empty();
            if !has_body {
                warn!(monitor = %target.name, status = %status, "HTTP check returned an empty body.");
            }
            has_body
        } else {
            true
        };

        Ok(ProbeOutcome {
            available,
            redirected_to,
        })
    }
}

fn classify(e: reqwest::Error, target: &Target) -> CheckError {
    if e.is_timeout() {
        CheckError::Timeout(target.timeout)
    } else if e.is_connect() || e.is_request() || e.is_body() {
        CheckError::Connectivity(e.to_string())
    } else {
        CheckError::Protocol(e.to_string())
    }
}

/// Compares URLs after normalisation so `https://host` and `https://host/` match.
fn same_url(configured: &str, final_url: &Url) -> bool {
    match Url::parse(configured) {
        Ok(parsed) => &parsed == final_url,
        Err(_) => configured == final_url.as_str(),
    }
}
