//! Per-target processing and the polling loop that drives it.
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::cert_warnings::{CertWarningTracker, warning_message};
use super::checkers::{
    CertificateExpiry, CertificateSource, HttpChecker, ProbeOutcome, check_ping,
};
use super::status::StatusTracker;
use super::target::{CheckMethod, Target, is_https_url};
use crate::notifications::NotificationService;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// One target plus the state tracked for it across cycles.
///
/// Only this monitor's own cycle touches its state, and cycles for the same
/// target never overlap.
pub struct TargetMonitor {
    target: Target,
    http: Option<HttpChecker>,
    cert_warnings: CertWarningTracker,
    status: StatusTracker,
}

impl TargetMonitor {
    pub fn new(target: Target) -> Result<Self, super::checkers::CheckError> {
        let http = match target.method {
            CheckMethod::Http => Some(HttpChecker::new(&target)?),
            _ => None,
        };
        Ok(Self {
            target,
            http,
            cert_warnings: CertWarningTracker::new(),
            status: StatusTracker::new(),
        })
    }

    pub fn last_status(&self) -> Option<bool> {
        self.status.last()
    }

    pub fn cert_warnings(&self) -> &BTreeSet<i64> {
        self.cert_warnings.warned()
    }

    /// Runs one full cycle for this target and returns its availability.
    pub async fn check_and_notify(
        &mut self,
        certs: &dyn CertificateSource,
        notifier: &NotificationService,
    ) -> bool {
        let outcome = self.probe().await;
        self.complete_cycle(outcome, certs, notifier).await
    }

    async fn probe(&self) -> ProbeOutcome {
        match &self.target.method {
            CheckMethod::Http => match &self.http {
                Some(checker) => checker.check(&self.target).await,
                None => {
                    error!(monitor = %self.target.name, "HTTP target has no client.");
                    ProbeOutcome::down()
                }
            },
            CheckMethod::Ping => ProbeOutcome::reachable(check_ping(&self.target).await),
            CheckMethod::Unsupported(method) => {
                error!(monitor = %self.target.name, method = %method, "Unknown check method.");
                ProbeOutcome::down()
            }
        }
    }

    /// Handles a probe result: the redirect certificate check, the periodic
    /// certificate check, then the status update. Both certificate checks go
    /// through the same warning tracker.
    pub async fn complete_cycle(
        &mut self,
        outcome: ProbeOutcome,
        certs: &dyn CertificateSource,
        notifier: &NotificationService,
    ) -> bool {
        if let Some(final_url) = outcome.redirected_to.filter(|url| is_https_url(url.as_str())) {
            if let Some(expiry) = certs.certificate_expiry(final_url.as_str()).await {
                self.handle_certificate(final_url.as_str(), expiry, notifier)
                    .await;
            }
        }

        if self.target.is_https() {
            let url = self.target.address.clone();
            if let Some(expiry) = certs.certificate_expiry(&url).await {
                self.handle_certificate(&url, expiry, notifier).await;
            }
        }

        self.record_status(outcome.available, notifier).await;
        outcome.available
    }

    /// Feeds a certificate result through the warning tracker, sending at most one warning.
    pub async fn handle_certificate(
        &mut self,
        url: &str,
        expiry: CertificateExpiry,
        notifier: &NotificationService,
    ) {
        debug!(monitor = %self.target.name, url, days_left = expiry.days_left, "Certificate checked.");
        if let Some(threshold) = self.cert_warnings.evaluate(expiry.days_left) {
            warn!(
                monitor = %self.target.name,
                url,
                days_left = expiry.days_left,
                threshold,
                "Certificate expiry threshold crossed."
            );
            notifier
                .deliver(&warning_message(&self.target.name, url, &expiry))
                .await;
        }
    }

    /// Records this cycle's availability, sending a startup or change notification if due.
    pub async fn record_status(&mut self, available: bool, notifier: &NotificationService) {
        let event = self.status.evaluate(available);
        self.status.commit(available);

        if let Some(event) = event {
            info!(monitor = %self.target.name, ?event, available, "Status transition.");
            notifier.deliver(&event.message(&self.target)).await;
        }
    }
}

/// Counts from one completed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub up: usize,
    pub down: usize,
}

/// Polls every target, then sleeps, until told to stop.
pub struct MonitorService {
    monitors: Vec<TargetMonitor>,
    certs: Arc<dyn CertificateSource>,
    notifier: Arc<NotificationService>,
    interval: Duration,
}

impl MonitorService {
    /// Targets whose checker cannot be built are logged and left out.
    pub fn new(
        targets: Vec<Target>,
        certs: Arc<dyn CertificateSource>,
        notifier: Arc<NotificationService>,
        interval: Duration,
    ) -> Self {
        let monitors = targets
            .into_iter()
            .filter_map(|target| {
                let name = target.name.clone();
                TargetMonitor::new(target)
                    .inspect_err(|e| {
                        error!(monitor = %name, error = %e, "Failed to set up target; it will not be monitored.")
                    })
                    .ok()
            })
            .collect();

        Self {
            monitors,
            certs,
            notifier,
            interval,
        }
    }

    pub fn monitors(&self) -> &[TargetMonitor] {
        &self.monitors
    }

    /// Checks every target once. Targets run concurrently; each target's own
    /// work stays sequential.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let certs = self.certs.as_ref();
        let notifier = self.notifier.as_ref();
        let results = join_all(
            self.monitors
                .iter_mut()
                .map(|monitor| monitor.check_and_notify(certs, notifier)),
        )
        .await;

        let up = results.iter().filter(|available| **available).count();
        CycleSummary {
            up,
            down: results.len() - up,
        }
    }

    /// Runs cycles until `shutdown_rx` fires, then closes the notification channel.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<()>) {
        info!(
            targets = self.monitors.len(),
            interval_seconds = self.interval.as_secs(),
            "Monitor loop started."
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received, abandoning current cycle.");
                    break;
                }

                summary = self.run_cycle() => {
                    debug!(up = summary.up, down = summary.down, "Cycle complete.");
                }
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received.");
                    break;
                }

                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.notifier.shutdown().await;
        info!("Monitor loop gracefully shut down.");
    }

    pub async fn shutdown(&self) {
        self.notifier.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::checkers::probe_reachability;
    use crate::notifications::{NotificationSender, SenderError};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use reqwest::Url;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        fn channel_type(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, message: &str) -> Result<(), SenderError> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    /// Answers every lookup with the same expiry and remembers the URLs asked for.
    #[derive(Default)]
    struct FixedExpiry {
        days_left: Option<i64>,
        lookups: Mutex<Vec<String>>,
    }

    impl FixedExpiry {
        fn days(days_left: i64) -> Self {
            Self {
                days_left: Some(days_left),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CertificateSource for FixedExpiry {
        async fn certificate_expiry(&self, url: &str) -> Option<CertificateExpiry> {
            self.lookups.lock().unwrap().push(url.to_string());
            self.days_left.map(expiring_in)
        }
    }

    fn notifier() -> (NotificationService, Arc<Mutex<Vec<String>>>) {
        let sender = RecordingSender::default();
        let sent = sender.sent.clone();
        (NotificationService::new(Box::new(sender)), sent)
    }

    fn expiring_in(days: i64) -> CertificateExpiry {
        let now = Utc::now();
        CertificateExpiry::new(now + ChronoDuration::days(days) + ChronoDuration::hours(1), now)
    }

    #[tokio::test]
    async fn test_down_then_up_then_down() {
        let (notifier, sent) = notifier();
        let mut monitor =
            TargetMonitor::new(Target::new("host", CheckMethod::Ping, "10.0.0.1")).unwrap();

        monitor.record_status(false, &notifier).await;
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(monitor.last_status(), Some(false));

        monitor.record_status(true, &notifier).await;
        monitor.record_status(true, &notifier).await;
        monitor.record_status(false, &notifier).await;

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("🟢 available"));
        assert!(sent[1].contains("🛑 unavailable"));
        assert!(sent[1].contains("Type: PING"));
    }

    #[tokio::test]
    async fn test_certificate_warning_sent_once() {
        let (notifier, sent) = notifier();
        let mut monitor = TargetMonitor::new(Target::new(
            "shop",
            CheckMethod::Http,
            "https://shop.example.com",
        ))
        .unwrap();

        let url = "https://shop.example.com";
        monitor.handle_certificate(url, expiring_in(8), &notifier).await;
        monitor.handle_certificate(url, expiring_in(8), &notifier).await;

        assert_eq!(
            monitor.cert_warnings().iter().copied().collect::<Vec<_>>(),
            vec![10, 15, 20, 25, 30]
        );
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Days left: 8"));
    }

    #[tokio::test]
    async fn test_unsupported_method_counts_as_down() {
        let (notifier, sent) = notifier();
        let certs = Arc::new(FixedExpiry::default());
        let target = Target::new("db", CheckMethod::Unsupported("TCP".into()), "db:5432");
        let mut service =
            MonitorService::new(vec![target], certs.clone(), Arc::new(notifier), DEFAULT_INTERVAL);

        let summary = service.run_cycle().await;
        assert_eq!(summary, CycleSummary { up: 0, down: 1 });
        assert_eq!(service.monitors()[0].last_status(), Some(false));
        assert!(sent.lock().unwrap().is_empty());
        assert!(certs.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let (notifier, _sent) = notifier();
        let mut service = MonitorService::new(
            Vec::new(),
            Arc::new(FixedExpiry::default()),
            Arc::new(notifier),
            Duration::from_secs(3600),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = tokio::spawn(async move { service.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("monitor loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_redirect_and_periodic_certificate_checks_share_one_gate() {
        let (notifier, sent) = notifier();
        let certs = FixedExpiry::days(8);
        let mut monitor = TargetMonitor::new(Target::new(
            "shop",
            CheckMethod::Http,
            "https://shop.example.com",
        ))
        .unwrap();

        let outcome = ProbeOutcome {
            available: true,
            redirected_to: Some(Url::parse("https://www.shop.example.com/").unwrap()),
        };
        assert!(monitor.complete_cycle(outcome, &certs, &notifier).await);

        assert_eq!(
            *certs.lookups.lock().unwrap(),
            ["https://www.shop.example.com/", "https://shop.example.com"]
        );
        assert_eq!(
            monitor.cert_warnings().iter().copied().collect::<Vec<_>>(),
            vec![10, 15, 20, 25, 30]
        );
        let sent = sent.lock().unwrap();
        let warnings: Vec<_> = sent
            .iter()
            .filter(|m| m.starts_with("⚠️ SSL Certificate Warning: shop"))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("URL: https://www.shop.example.com/"));
        assert!(sent.iter().any(|m| m.starts_with("✅ Service shop initialized")));
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_plain_http_redirect_skips_certificate_lookup() {
        let (notifier, sent) = notifier();
        let certs = FixedExpiry::days(3);
        let mut monitor =
            TargetMonitor::new(Target::new("blog", CheckMethod::Http, "http://blog.example.com"))
                .unwrap();

        let outcome = ProbeOutcome {
            available: true,
            redirected_to: Some(Url::parse("http://blog.example.com/home").unwrap()),
        };
        monitor.complete_cycle(outcome, &certs, &notifier).await;

        assert!(certs.lookups.lock().unwrap().is_empty());
        assert!(monitor.cert_warnings().is_empty());
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_up_then_timeout_notifies_once() {
        let (notifier, sent) = notifier();
        let certs = FixedExpiry::default();
        let mut target = Target::new("gateway", CheckMethod::Ping, "10.0.0.1");
        target.timeout = Duration::from_millis(100);
        let mut monitor = TargetMonitor::new(target.clone()).unwrap();

        let shell = |script: &str| {
            let mut command = tokio::process::Command::new("sh");
            command.args(["-c", script]);
            command
        };

        let up = probe_reachability(&target, shell("exit 0")).await;
        assert!(monitor.complete_cycle(ProbeOutcome::reachable(up), &certs, &notifier).await);

        let timed_out = probe_reachability(&target, shell("sleep 5")).await;
        assert!(!monitor.complete_cycle(ProbeOutcome::reachable(timed_out), &certs, &notifier).await);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "✅ Service gateway initialized\nURL: 10.0.0.1");
        assert_eq!(
            sent[1],
            "🔄 Status changed: gateway\nNew status: 🛑 unavailable\nType: PING\nTarget: 10.0.0.1"
        );
        assert!(certs.lookups.lock().unwrap().is_empty());
    }
}
