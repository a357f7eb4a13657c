//! HTTP API handlers for moodcast-ui

pub mod buildinfo;
pub mod health;
pub mod notifications;
pub mod sse;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use notifications::{confirm, dismiss_toast, get_snapshot, notify, resolve_confirm};
pub use sse::event_stream;
