//! # Moodcast Common Library
//!
//! Shared code for the Moodcast notification crates including:
//! - Error types
//! - Configuration loading (TOML with graceful degradation)
//! - Notification snapshot and event types shared by the broadcaster and
//!   the rendering-surface service

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{
    ClearReason, ConfirmationSnapshot, NotificationEvent, NotificationSnapshot, Severity,
    ToastSnapshot,
};
