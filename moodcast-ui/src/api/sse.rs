//! Server-Sent Events (SSE) stream of notification events
//!
//! Each connection opens with `InitialState`, then receives every slot
//! transition as a named event with a JSON body.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use moodcast_notify::{NotificationBroadcaster, NotificationEvent};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "New SSE client connected, total clients: {}",
        state.notices.subscriber_count() + 1
    );

    // Subscribe before taking the snapshot so no transition falls between
    let mut rx = state.notices.subscribe();
    let notices = state.notices.clone();

    let stream = async_stream::stream! {
        if let Some(event) = to_sse_event(&initial_state(&notices)) {
            yield Ok(event);
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(event) = to_sse_event(&event) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Resynchronize the client with the current slots
                    warn!("SSE client lagged, skipped {} events", skipped);
                    if let Some(event) = to_sse_event(&initial_state(&notices)) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Closed) => {
                    debug!("Event channel closed, ending SSE stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn initial_state(notices: &NotificationBroadcaster) -> NotificationEvent {
    NotificationEvent::InitialState {
        snapshot: notices.snapshot(),
        timestamp: chrono::Utc::now(),
    }
}

fn to_sse_event(event: &NotificationEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => {
            debug!("Sending SSE event: {}", event.event_type());
            Some(Event::default().event(event.event_type()).data(json))
        }
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
