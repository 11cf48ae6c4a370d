use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    auth::{password::PasswordError, token::TokenError},
    generate::GenerateError,
    store::StoreError,
    validate::ValidationError,
};

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    BadRequest(&'static str),
    EmailTaken,
    LoginFail,
    Unauthenticated,
    Forbidden,
    NotFound(&'static str),
    Store(StoreError),
    PasswordHash(PasswordError),
    Token(TokenError),
    Generate(GenerateError),
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        AppError::Validation(inner)
    }
}

impl From<StoreError> for AppError {
    fn from(inner: StoreError) -> Self {
        match inner {
            StoreError::NotFound => AppError::NotFound("Resource not found"),
            StoreError::DuplicateEmail => AppError::EmailTaken,
            other => AppError::Store(other),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(inner: PasswordError) -> Self {
        AppError::PasswordHash(inner)
    }
}

impl From<TokenError> for AppError {
    fn from(inner: TokenError) -> Self {
        AppError::Token(inner)
    }
}

impl From<GenerateError> for AppError {
    fn from(inner: GenerateError) -> Self {
        AppError::Generate(inner)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::EmailTaken => {
                StatusCode::BAD_REQUEST
            }
            AppError::LoginFail | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_)
            | AppError::PasswordHash(_)
            | AppError::Token(_)
            | AppError::Generate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.to_string(),
            AppError::EmailTaken => "Email already registered".to_string(),
            AppError::LoginFail => "Invalid email or password".to_string(),
            AppError::Unauthenticated => "Invalid or expired token".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::Store(e) => {
                tracing::error!(error = %e, transient = e.is_transient(), "store failure");
                "Internal server error".to_string()
            }
            AppError::PasswordHash(e) => {
                tracing::error!(error = %e, "password hashing failure");
                "Failed to process password".to_string()
            }
            AppError::Token(e) => {
                tracing::error!(error = %e, "token failure");
                "Failed to generate authentication token".to_string()
            }
            AppError::Generate(GenerateError::NotConfigured) => {
                tracing::error!("generation requested but no API key is configured");
                "Code generation service is not configured".to_string()
            }
            AppError::Generate(e) => {
                tracing::error!(error = %e, "code generation failure");
                "Code generation failed".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}
