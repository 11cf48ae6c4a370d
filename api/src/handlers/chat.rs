use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        chat::{Chat, ChatWithMessages, CreateChat, DEFAULT_CHAT_TITLE},
        ApiResponse,
    },
    store::{Store, StoreError},
    AppState,
};

/// Load a chat and make sure `user` owns it.
pub(crate) async fn owned_chat(
    store: &Store,
    user: &CurrentUser,
    chat_id: i64,
) -> Result<Chat, AppError> {
    let chat = store.get_chat_by_id(chat_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound("Chat not found"),
        other => other.into(),
    })?;
    if chat.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(chat)
}

pub async fn create_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateChat>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Chat>>), AppError> {
    let Json(payload) = payload.map_err(|_| AppError::BadRequest("Invalid request body"))?;

    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CHAT_TITLE);

    let chat = state.store.create_chat(user.user_id, title).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(chat))))
}

pub async fn list_chats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Chat>>>, AppError> {
    let chats = state.store.list_chats_by_user(user.user_id).await?;
    Ok(Json(ApiResponse::ok(chats)))
}

pub async fn get_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    chat_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<ChatWithMessages>>, AppError> {
    let Path(chat_id) = chat_id.map_err(|_| AppError::BadRequest("Invalid chat ID"))?;

    let chat = owned_chat(&state.store, &user, chat_id).await?;
    let messages = state.store.list_messages_by_chat(chat.id).await?;

    Ok(Json(ApiResponse::ok(ChatWithMessages { chat, messages })))
}
