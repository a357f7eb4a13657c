//! # Moodcast notification broadcaster
//!
//! Process-wide toast and confirmation slots shared by every producer and a
//! single rendering surface.
//!
//! - [`NotificationBroadcaster::notify`] replaces the active toast; it
//!   expires after the configured duration (4000 ms by default)
//! - [`NotificationBroadcaster::confirm`] replaces the pending confirmation;
//!   it stays until [`NotificationBroadcaster::resolve_confirm`]
//!
//! The broadcaster is constructed once and its handle is cloned into every
//! producer and the consumer.
//!
//! ```rust,ignore
//! let notices = NotificationBroadcaster::new(NotificationSettings::default())?;
//!
//! notices.success("Login successful!");
//! notices.confirm_request(
//!     ConfirmationRequest::new("Do you want to sign out?", do_logout)
//!         .confirm_label("Logout")
//!         .confirm_style("danger-btn"),
//! );
//!
//! // Rendering surface, on click:
//! notices.resolve_confirm(true)?;
//! ```

pub mod broadcaster;
pub mod confirmation;

pub use broadcaster::NotificationBroadcaster;
pub use confirmation::{ConfirmAction, ConfirmationRequest, Resolution};
pub use moodcast_common::config::NotificationSettings;
pub use moodcast_common::events::{
    ClearReason, ConfirmationSnapshot, NotificationEvent, NotificationSnapshot, Severity,
    ToastSnapshot,
};
