//! Notification handlers
//!
//! Read and resolve endpoints serve the rendering surface. `notify` and
//! `confirm` let browser pages act as producers.

use axum::{extract::State, http::StatusCode, Json};
use moodcast_notify::{ConfirmationRequest, NotificationSnapshot, Severity};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    message: String,
    /// "info" (default), "success" or "error"
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    status: String,
    toast_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    message: String,
    #[serde(default)]
    confirm_label: Option<String>,
    #[serde(default)]
    confirm_style: Option<String>,
    #[serde(default)]
    heading: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    status: String,
    confirmation_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    accepted: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/notifications
///
/// Current toast and confirmation, either of which may be null.
pub async fn get_snapshot(State(state): State<AppState>) -> Json<NotificationSnapshot> {
    Json(state.notices.snapshot())
}

/// POST /api/notify
pub async fn notify(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, ApiError> {
    let severity = match req.severity.as_deref() {
        None => Severity::default(),
        Some(s) => s.parse::<Severity>().map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(StatusResponse::new(e.to_string())),
            )
        })?,
    };

    let toast_id = state.notices.notify(req.message, severity);
    Ok(Json(NotifyResponse {
        status: "shown".to_string(),
        toast_id,
    }))
}

/// POST /api/confirm
///
/// The page that asks learns the answer from the `ConfirmationResolved`
/// event carrying the returned id, so the stored action does nothing.
pub async fn confirm(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Json<ConfirmResponse> {
    let mut request = ConfirmationRequest::new(req.message, || Ok(()));
    if let Some(label) = req.confirm_label {
        request = request.confirm_label(label);
    }
    if let Some(style) = req.confirm_style {
        request = request.confirm_style(style);
    }
    if let Some(heading) = req.heading {
        request = request.heading(heading);
    }

    let confirmation_id = state.notices.confirm_request(request);
    Json(ConfirmResponse {
        status: "pending".to_string(),
        confirmation_id,
    })
}

/// POST /api/confirm/resolve
///
/// Reports the user's click. Resolving with nothing pending answers
/// "no_pending" rather than an error.
pub async fn resolve_confirm(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    match state.notices.resolve_confirm(req.accepted) {
        Ok(resolution) => {
            info!("Confirmation resolved: {}", resolution.as_str());
            Ok(Json(StatusResponse::new(resolution.as_str())))
        }
        Err(e) => {
            error!("Confirmation action failed: {:#}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::new(format!("action failed: {}", e))),
            ))
        }
    }
}

/// POST /api/toast/dismiss
pub async fn dismiss_toast(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = if state.notices.dismiss_toast() {
        "dismissed"
    } else {
        "empty"
    };
    Json(StatusResponse::new(status))
}
