use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use transit_core::{Capability, Principal};
use transit_shared::Notification;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/mark-read", post(mark_read))
        .route("/notifications/stream", get(stream))
}

async fn list(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
) -> Result<Json<Vec<Notification>>, AppError> {
    rider.authorize(Capability::ReadNotifications)?;
    Ok(Json(state.notifications.list_for_rider(&rider.subject).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    rider.authorize(Capability::ReadNotifications)?;
    let updated = state.notifications.mark_all_read(&rider.subject).await?;
    Ok(Json(json!({ "message": "All notifications marked as read", "updated": updated })))
}

/// Live feed of the caller's own notifications. Missed messages are not
/// replayed; the notification list is the durable record.
async fn stream(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    rider.authorize(Capability::ReadNotifications)?;

    let me = rider.subject;
    let stream = BroadcastStream::new(state.push.subscribe()).filter_map(move |msg| {
        let me = me.clone();
        async move {
            match msg {
                Ok(note) if note.recipient_id == me => Event::default()
                    .event("notification")
                    .json_data(&note)
                    .ok()
                    .map(Ok),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!("Notification stream for {} lagged: {}", me, e);
                    None
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
