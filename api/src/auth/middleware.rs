use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::token::{TokenError, TokenService};
use crate::{error::AppError, AppState};

const SCHEME: &str = "Bearer";

/// Identity of the caller, bound to the request by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
}

/// Why the gate turned a request away. Only logged; callers see one 401.
#[derive(Debug)]
pub enum GateRejection {
    NoToken,
    Malformed,
    Rejected(TokenError),
}

/// Pull the token out of `Bearer <token>`: exactly two whitespace-separated
/// parts, the first being the scheme.
pub fn bearer_token(header: Option<&str>) -> Result<&str, GateRejection> {
    let header = header.ok_or(GateRejection::NoToken)?;
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(token), None) => Ok(token),
        (None, _, _) => Err(GateRejection::NoToken),
        _ => Err(GateRejection::Malformed),
    }
}

pub fn authenticate(
    tokens: &TokenService,
    header: Option<&str>,
) -> Result<CurrentUser, GateRejection> {
    let token = bearer_token(header)?;
    let identity = tokens.validate(token).map_err(GateRejection::Rejected)?;
    Ok(CurrentUser {
        user_id: identity.user_id,
        email: identity.email,
    })
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            debug!("auth header is not valid ascii");
            AppError::Unauthenticated
        })?),
        None => None,
    };

    let user = authenticate(&state.tokens, header).map_err(|reason| {
        debug!(?reason, "rejecting unauthenticated request");
        AppError::Unauthenticated
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
