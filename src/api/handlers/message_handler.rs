//! Seller and support conversation handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{
    Conversation, ConversationStatus, ConversationSummary, ConversationThread, Message,
};
use crate::errors::AppResult;
use crate::services::Actor;
use crate::types::{Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartConversationRequest {
    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    #[schema(example = "Payout delayed")]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "Message is required"))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message is required"))]
    pub body: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ConversationQuery {
    /// Admins only
    pub store_id: Option<Uuid>,
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub marked: u64,
}

/// Conversation routes (sellers need the `messages` permission)
pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations).post(start_conversation))
        .route("/:id", get(get_conversation))
        .route("/:id/messages", post(post_message))
        .route("/:id/read", post(mark_read))
        .route("/:id/close", post(close_conversation))
        .route("/:id/reopen", post(reopen_conversation))
}

/// List conversations with the caller's unread counts
#[utoipa::path(
    get,
    path = "/conversations",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(ConversationQuery, PaginationParams),
    responses(
        (status = 200, description = "Page of conversations", body = Vec<ConversationSummary>)
    )
)]
pub async fn list_conversations(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<Paginated<ConversationSummary>>> {
    let (items, total) = state
        .services
        .messages()
        .list(&actor, query.store_id, query.status, pagination.clone())
        .await?;
    Ok(Json(Paginated::from_params(items, &pagination, total)))
}

/// Open a conversation with platform support
#[utoipa::path(
    post,
    path = "/conversations",
    tag = "Messages",
    security(("bearer_auth" = [])),
    request_body = StartConversationRequest,
    responses(
        (status = 201, description = "Conversation started", body = ConversationThread),
        (status = 403, description = "Sellers only")
    )
)]
pub async fn start_conversation(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<StartConversationRequest>,
) -> AppResult<(StatusCode, Json<ConversationThread>)> {
    let thread = state
        .services
        .messages()
        .start(&actor, payload.subject, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// Get a conversation with its messages
#[utoipa::path(
    get,
    path = "/conversations/{id}",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation thread", body = ConversationThread),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn get_conversation(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ConversationThread>> {
    Ok(Json(state.services.messages().get(&actor, id).await?))
}

/// Post a message
#[utoipa::path(
    post,
    path = "/conversations/{id}/messages",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = Message),
        (status = 404, description = "Conversation not found"),
        (status = 409, description = "Conversation is closed")
    )
)]
pub async fn post_message(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state
        .services
        .messages()
        .post(&actor, id, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark the other side's messages as read
#[utoipa::path(
    post,
    path = "/conversations/{id}/read",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Messages marked read", body = MarkReadResponse),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn mark_read(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    let marked = state.services.messages().mark_read(&actor, id).await?;
    Ok(Json(MarkReadResponse { marked }))
}

/// Close a conversation
#[utoipa::path(
    post,
    path = "/conversations/{id}/close",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation closed", body = Conversation),
        (status = 409, description = "Already closed")
    )
)]
pub async fn close_conversation(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Conversation>> {
    Ok(Json(state.services.messages().close(&actor, id).await?))
}

/// Reopen a closed conversation
#[utoipa::path(
    post,
    path = "/conversations/{id}/reopen",
    tag = "Messages",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation reopened", body = Conversation),
        (status = 409, description = "Already open")
    )
)]
pub async fn reopen_conversation(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Conversation>> {
    Ok(Json(state.services.messages().reopen(&actor, id).await?))
}
