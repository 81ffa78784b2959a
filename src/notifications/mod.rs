pub mod models;
pub mod senders;
pub mod service;

pub use models::ChannelConfig;
pub use senders::{NotificationSender, SenderError};
pub use service::NotificationService;
