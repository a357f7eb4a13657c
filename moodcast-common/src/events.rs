//! Notification snapshot and event types
//!
//! Snapshots are what the rendering surface reads; events describe slot
//! transitions and are streamed to the rendering surface over SSE.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Toast severity. Selects visual treatment only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral informational message
    #[default]
    Info,
    /// Operation completed successfully
    Success,
    /// Operation failed
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "success" => Ok(Severity::Success),
            "error" => Ok(Severity::Error),
            other => Err(Error::InvalidInput(format!(
                "unknown severity '{}' (expected info, success or error)",
                other
            ))),
        }
    }
}

/// Read-only view of the active toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastSnapshot {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
}

/// Read-only view of the pending confirmation request
///
/// The action itself never leaves the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSnapshot {
    pub id: Uuid,
    pub heading: String,
    pub message: String,
    pub confirm_label: String,
    pub confirm_style: String,
}

/// Both slots at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSnapshot {
    pub toast: Option<ToastSnapshot>,
    pub confirmation: Option<ConfirmationSnapshot>,
}

impl NotificationSnapshot {
    /// True when neither slot is occupied
    pub fn is_empty(&self) -> bool {
        self.toast.is_none() && self.confirmation.is_none()
    }
}

/// Why a toast left its slot without being replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// Display duration elapsed
    Expired,
    /// Rendering surface dismissed it
    Dismissed,
}

/// Slot transition events
///
/// Replacement is expressed by a newer `ToastShown` or
/// `ConfirmationRequested`; a replaced confirmation produces no event of
/// its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// A toast became the active toast
    ToastShown {
        toast: ToastSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active toast expired or was dismissed
    ToastCleared {
        id: Uuid,
        reason: ClearReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A confirmation request became the pending request
    ConfirmationRequested {
        confirmation: ConfirmationSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The pending confirmation was confirmed or cancelled
    ConfirmationResolved {
        id: Uuid,
        accepted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Initial state sent on SSE connection
    InitialState {
        snapshot: NotificationSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl NotificationEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::ToastShown { .. } => "ToastShown",
            NotificationEvent::ToastCleared { .. } => "ToastCleared",
            NotificationEvent::ConfirmationRequested { .. } => "ConfirmationRequested",
            NotificationEvent::ConfirmationResolved { .. } => "ConfirmationResolved",
            NotificationEvent::InitialState { .. } => "InitialState",
        }
    }
}
