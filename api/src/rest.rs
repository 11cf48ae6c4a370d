use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    auth::require_auth,
    handlers::{auth, chat, generate, health},
    AppState,
};

pub const API_PREFIX: &str = "/api/v1";

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/generate", post(generate::generate_code))
        .route("/chats", post(chat::create_chat).get(chat::list_chats))
        .route("/chats/:id", get(chat::get_chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .merge(protected);

    Router::new()
        .route("/health", get(health::health))
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
