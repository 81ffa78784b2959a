use std::collections::BTreeSet;

use super::checkers::CertificateExpiry;

/// Day counts that gate certificate expiry warnings, tightest first.
pub const THRESHOLDS_DAYS: [i64; 6] = [5, 10, 15, 20, 25, 30];

/// Remembers which expiry thresholds a target has already been warned about.
///
/// The set only grows. A warning fires once per newly breached tightest
/// threshold, and every looser threshold is marked at the same time so a big
/// jump in `days_left` yields exactly one warning.
#[derive(Debug, Default, Clone)]
pub struct CertWarningTracker {
    warned: BTreeSet<i64>,
}

impl CertWarningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the threshold to warn about, if any, and records it.
    pub fn evaluate(&mut self, days_left: i64) -> Option<i64> {
        let threshold = THRESHOLDS_DAYS
            .iter()
            .copied()
            .filter(|t| days_left < *t)
            .min()?;

        if self.warned.contains(&threshold) {
            return None;
        }
        self.warned
            .extend(THRESHOLDS_DAYS.iter().copied().filter(|t| *t >= threshold));
        Some(threshold)
    }

    pub fn warned(&self) -> &BTreeSet<i64> {
        &self.warned
    }
}

pub fn warning_message(target_name: &str, url: &str, expiry: &CertificateExpiry) -> String {
    format!(
        "⚠️ SSL Certificate Warning: {target_name}\n\
         URL: {url}\n\
         Days left: {}\n\
         Expiry date: {}",
        expiry.days_left,
        expiry.not_after.format("%Y-%m-%d"),
    )
}
