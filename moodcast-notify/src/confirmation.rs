//! Confirmation requests and their resolution

use std::fmt;

use moodcast_common::config::NotificationSettings;
use moodcast_common::events::ConfirmationSnapshot;
use uuid::Uuid;

/// Caller-owned action gated by a confirmation
///
/// `FnOnce` guarantees the action runs at most once.
pub type ConfirmAction = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// A yes/no prompt gating `on_confirm`
///
/// Label, style and heading fall back to the broadcaster's configured
/// defaults when left unset.
pub struct ConfirmationRequest {
    message: String,
    action: ConfirmAction,
    confirm_label: Option<String>,
    confirm_style: Option<String>,
    heading: Option<String>,
}

impl ConfirmationRequest {
    pub fn new<F>(message: impl Into<String>, on_confirm: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            message: message.into(),
            action: Box::new(on_confirm),
            confirm_label: None,
            confirm_style: None,
            heading: None,
        }
    }

    /// Text of the confirm button
    #[must_use]
    pub fn confirm_label(mut self, label: impl Into<String>) -> Self {
        self.confirm_label = Some(label.into());
        self
    }

    /// Style tag of the confirm button (e.g. "danger-btn")
    #[must_use]
    pub fn confirm_style(mut self, style: impl Into<String>) -> Self {
        self.confirm_style = Some(style.into());
        self
    }

    /// Modal heading shown above the message
    #[must_use]
    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    /// Fill unset fields from `settings` and assign an identity
    pub(crate) fn into_pending(self, settings: &NotificationSettings) -> PendingConfirmation {
        PendingConfirmation {
            snapshot: ConfirmationSnapshot {
                id: Uuid::new_v4(),
                heading: self
                    .heading
                    .unwrap_or_else(|| settings.confirm_heading.clone()),
                message: self.message,
                confirm_label: self
                    .confirm_label
                    .unwrap_or_else(|| settings.confirm_label.clone()),
                confirm_style: self
                    .confirm_style
                    .unwrap_or_else(|| settings.confirm_style.clone()),
            },
            action: self.action,
        }
    }
}

impl fmt::Debug for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationRequest")
            .field("message", &self.message)
            .field("confirm_label", &self.confirm_label)
            .field("confirm_style", &self.confirm_style)
            .field("heading", &self.heading)
            .finish_non_exhaustive()
    }
}

/// Occupant of the confirmation slot
pub(crate) struct PendingConfirmation {
    pub(crate) snapshot: ConfirmationSnapshot,
    pub(crate) action: ConfirmAction,
}

/// Outcome of `resolve_confirm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Request accepted and its action ran successfully
    Confirmed,
    /// Request dismissed without running its action
    Cancelled,
    /// Nothing was pending; no state changed
    NoPending,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Confirmed => "confirmed",
            Resolution::Cancelled => "cancelled",
            Resolution::NoPending => "no_pending",
        }
    }
}
