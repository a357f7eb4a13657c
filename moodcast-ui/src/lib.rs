//! moodcast-ui library - rendering-surface service
//!
//! Hosts the notification broadcaster for the browser client: pages read
//! the current toast/confirmation, stream slot transitions over SSE, report
//! the user's confirm/cancel click and post their own notices.

use axum::Router;
use moodcast_notify::NotificationBroadcaster;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one broadcaster for this process
    pub notices: NotificationBroadcaster,
}

impl AppState {
    pub fn new(notices: NotificationBroadcaster) -> Self {
        Self { notices }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        // Consumer contract
        .route("/api/notifications", get(api::get_snapshot))
        .route("/api/confirm/resolve", post(api::resolve_confirm))
        .route("/api/toast/dismiss", post(api::dismiss_toast))
        .route("/events", get(api::event_stream))
        // Producer entry points for browser pages
        .route("/api/notify", post(api::notify))
        .route("/api/confirm", post(api::confirm))
        // Build information
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
