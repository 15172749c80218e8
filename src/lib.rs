//! SkillSync Notify Library
//!
//! Client-side notification core for the SkillSync marketplace: a polling
//! notification fetcher with subscriber fan-out, and an independent toast
//! queue with auto-expiry.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod model;
pub mod poller;
pub mod toast;

// Re-export commonly used types for convenience
pub use api::{HttpNotificationApi, NotificationApi};
pub use config::{Config, ConfigManager};
pub use errors::{SyncError, SyncResult};
pub use model::{
    NotificationId, NotificationItem, NotificationSummary, ToastEntry, ToastId, ToastKind,
    ToastRequest,
};
pub use poller::{NotificationPoller, SubscriberId};
pub use toast::ToastQueue;
