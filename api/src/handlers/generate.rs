use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{info, warn};

use super::chat::owned_chat;
use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        chat::{GeneratePayload, GenerateResponse, Role, DEFAULT_CHAT_TITLE},
        ApiResponse,
    },
    validate::validate_generate,
    AppState,
};

const TITLE_MAX_CHARS: usize = 50;

/// Title for a fresh chat: the prompt, cut to 50 characters.
pub fn title_from_prompt(prompt: &str) -> String {
    let prompt = prompt.trim();
    match prompt.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

/// Persist the prompt, ask the generator for code, persist the reply.
///
/// Nothing is rolled back on failure: a chat created here and the stored
/// prompt stay in place if generation or the final insert fails.
pub async fn generate_code(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Json<ApiResponse<GenerateResponse>>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::BadRequest("Invalid request body"))?;
    validate_generate(&payload)?;

    let (chat_id, is_new_chat) = match payload.chat_id {
        Some(id) => (owned_chat(&state.store, &user, id).await?.id, false),
        None => {
            let chat = state
                .store
                .create_chat(user.user_id, DEFAULT_CHAT_TITLE)
                .await?;
            (chat.id, true)
        }
    };

    state
        .store
        .create_message(chat_id, Role::User, &payload.prompt, Some(&payload.language))
        .await?;

    if is_new_chat {
        let title = title_from_prompt(&payload.prompt);
        if let Err(e) = state.store.update_chat_title(chat_id, &title).await {
            warn!(chat_id, error = %e, "could not retitle new chat");
        }
    }

    let code = state
        .generator
        .generate(&payload.language, &payload.prompt)
        .await?;

    state
        .store
        .create_message(chat_id, Role::Assistant, &code, Some(&payload.language))
        .await?;

    info!(chat_id, user_id = user.user_id, language = %payload.language, "code generated");
    Ok(Json(ApiResponse::ok(GenerateResponse { chat_id, code })))
}
