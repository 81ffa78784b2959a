pub mod config;
pub mod logging;
pub mod monitoring;
pub mod notifications;
pub mod version;
