use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::{
    error::Result,
    middleware::AuthUser,
    state::AppState,
};

use super::{
    message_dto::{PostMessageRequest, ReadReceipt},
    message_models::Message,
};

/// Post a message to a conversation
#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    tag = "messages",
    params(("id" = i64, Path, description = "Conversation ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = Message),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found"),
        (status = 422, description = "Empty or overlong body")
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<impl IntoResponse> {
    let event = state
        .message_service
        .post_message(id, user_id, &payload.body)
        .await?;

    let message = event.message.clone();
    // No subscribers is fine.
    let _ = state.message_tx.send(event);

    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark a conversation as read for the caller
#[utoipa::path(
    post,
    path = "/api/conversations/{id}/read",
    tag = "messages",
    params(("id" = i64, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Marked as read", body = ReadReceipt),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ReadReceipt>> {
    let last_read_at = state.message_service.mark_read(id, user_id).await?;

    Ok(Json(ReadReceipt {
        status: "ok".into(),
        last_read_at,
    }))
}

/// Delete one of the caller's own messages
#[utoipa::path(
    delete,
    path = "/api/conversations/{id}/messages/{message_id}",
    tag = "messages",
    params(
        ("id" = i64, Path, description = "Conversation ID"),
        ("message_id" = i64, Path, description = "Message ID")
    ),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the sender"),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, message_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    state
        .message_service
        .delete_message(id, message_id, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Real-time stream of messages posted to the caller's conversations (SSE)
#[utoipa::path(
    get,
    path = "/api/conversations/stream",
    tag = "messages",
    responses(
        (status = 200, description = "Message stream established"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn message_stream(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.message_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.is_for(user_id) => {
            let json = serde_json::to_string(&event.message).ok()?;
            Some(Ok(Event::default().event("message").data(json)))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Message stream for {} lagged: {}", user_id, e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
