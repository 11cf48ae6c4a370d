use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    auth::password::{hash_password, verify_password},
    error::AppError,
    models::{
        user::{AuthResponse, CreateUser, LoginPayload},
        ApiResponse,
    },
    store::StoreError,
    validate::{validate_login, validate_signup},
    AppState,
};

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let Json(payload) = payload.map_err(|_| AppError::BadRequest("Invalid request body"))?;
    validate_signup(&payload)?;

    // Signup says so when the email is taken; login never does.
    if state.store.email_exists(&payload.email).await? {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(payload.name.trim(), &payload.email, &password_hash)
        .await?;

    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "account created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Account created successfully",
            AuthResponse {
                user: user.into(),
                token,
            },
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::BadRequest("Invalid request body"))?;
    validate_login(&payload)?;

    let user = state
        .store
        .get_user_by_email(&payload.email)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::LoginFail,
            other => other.into(),
        })?;

    verify_password(&user.password_hash, &payload.password).map_err(|e| {
        tracing::debug!(user_id = user.id, error = %e, "password verification failed");
        AppError::LoginFail
    })?;

    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "login succeeded");

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        AuthResponse {
            user: user.into(),
            token,
        },
    )))
}
