//! Monitoring engine: target descriptors, checkers, alert state and the
//! polling loop.
pub mod cert_warnings;
pub mod checkers;
pub mod service;
pub mod status;
pub mod target;
pub mod targets_file;

pub use service::{CycleSummary, MonitorService, TargetMonitor};
pub use target::{CheckMethod, Target};
