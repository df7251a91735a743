use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    dto::{InboxPage, Page},
    error::Result,
    middleware::AuthUser,
    state::AppState,
};

use super::{
    conversation_dto::{
        CreateConversationRequest, PageParams, DEFAULT_INBOX_PER_PAGE, DEFAULT_THREAD_PER_PAGE,
    },
    conversation_models::{ConversationDetail, ConversationThread},
};

/// List the caller's conversations, most recently active first
#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "conversations",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated inbox", body = InboxPage),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let page = Page::new(params.page, params.per_page, DEFAULT_INBOX_PER_PAGE);
    let inbox = state.conversation_service.inbox(user_id, page).await?;

    Ok((StatusCode::OK, Json(inbox)))
}

/// Start a conversation, or get the existing one for the same pair and ad
#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationDetail),
        (status = 200, description = "Existing conversation", body = ConversationDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipient or ad not found"),
        (status = 422, description = "Invalid input or recipient does not match ad owner")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let opened = state
        .conversation_service
        .get_or_create(user_id, payload)
        .await?;

    if let Some(event) = opened.event {
        // No subscribers is fine.
        let _ = state.message_tx.send(event);
    }

    let status = if opened.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(opened.detail)))
}

/// Get a conversation with a page of its messages
#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "conversations",
    params(
        ("id" = i64, Path, description = "Conversation ID"),
        PageParams
    ),
    responses(
        (status = 200, description = "Conversation and messages", body = ConversationThread),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<ConversationThread>> {
    let page = Page::new(params.page, params.per_page, DEFAULT_THREAD_PER_PAGE);
    let thread = state.conversation_service.show(id, user_id, page).await?;

    Ok(Json(thread))
}
