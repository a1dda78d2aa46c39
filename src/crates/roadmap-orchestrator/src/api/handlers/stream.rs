//! Per-task WebSocket event stream
//!
//! One channel per task id. With `include_history=true` past events are
//! replayed from execution logs before live ones; the live subscription
//! is taken before the replay so nothing falls into the gap.

use crate::api::routes::AppState;
use crate::bus::TaskEvent;
use crate::db::repositories::log_repo;
use crate::replay;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::broadcast;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub include_history: bool,
}

/// GET /api/v1/tasks/:task_id/stream
pub async fn task_stream(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, state, task_id, query.include_history))
}

async fn send_event(socket: &mut WebSocket, event: &TaskEvent) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(payload)).await
}

async fn stream_events(
    mut socket: WebSocket,
    state: AppState,
    task_id: String,
    include_history: bool,
) {
    let mut live = state.bus.subscribe(&task_id);

    if include_history {
        match log_repo::list_chronological(state.db.pool(), &task_id).await {
            Ok(rows) => {
                for event in replay::events_from_logs(&rows) {
                    if send_event(&mut socket, &event).await.is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%task_id, %err, "history replay failed");
            }
        }
    }

    loop {
        tokio::select! {
            event = live.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(%task_id, missed, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                }
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
        }
    }
}
