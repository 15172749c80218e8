//! Data model for the notification core
//!
//! Server-owned shapes (`NotificationItem`, unread counts) are parsed at the
//! network boundary and fail closed: missing or malformed optional fields
//! collapse to defaults instead of propagating through the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of recent notifications fetched per poll tick.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default toast lifetime before auto-dismiss.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

/// Server-assigned notification identifier.
///
/// The backend currently hands out integer ids, but the contract treats them
/// as opaque, so string ids are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Int(n) => write!(f, "{n}"),
            NotificationId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(value: i64) -> Self {
        NotificationId::Int(value)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        NotificationId::Text(value.to_string())
    }
}

/// One notification as the server reports it. Read-only on the client;
/// the `read` flag only changes through an explicit mark-read round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: NotificationId,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub related_gig_id: Option<i64>,
    #[serde(default)]
    pub related_application_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The combined result of one poll tick, broadcast to every subscriber.
///
/// Created fresh on every tick and discarded after broadcast; nothing is
/// cached between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub unread_count: u64,
    pub recent: Vec<NotificationItem>,
}

impl NotificationSummary {
    /// The degraded summary substituted when a fetch cycle fails.
    pub fn empty() -> Self {
        NotificationSummary {
            unread_count: 0,
            recent: Vec::new(),
        }
    }
}

/// Toast identifier, unique within the process lifetime.
pub type ToastId = u64;

/// Severity/visual category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
    Warning,
}

impl ToastKind {
    /// Parse a kind from its wire/display name, falling back to `Info`
    /// for anything unrecognized.
    pub fn parse(value: &str) -> Self {
        match value {
            "success" => ToastKind::Success,
            "error" => ToastKind::Error,
            "warning" => ToastKind::Warning,
            _ => ToastKind::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
            ToastKind::Warning => "warning",
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ephemeral user-facing message currently in the toast queue.
///
/// Queue membership is the sole source of truth for visibility: an entry is
/// Visible exactly while it sits in the queue and Dismissed once removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToastEntry {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub duration: Duration,
}

/// Parameters for enqueuing a toast. Kind defaults to `Info` and duration
/// to the queue default when unset.
#[derive(Debug, Clone)]
pub struct ToastRequest {
    pub kind: ToastKind,
    pub message: String,
    pub duration: Option<Duration>,
}

impl ToastRequest {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        ToastRequest {
            kind,
            message: message.into(),
            duration: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
