//! HTTP backend for a code-generation chat app: accounts, JWT sessions,
//! chat history and a pass-through call to a text-generation model.

pub mod auth;
pub mod config;
pub mod error;
pub mod generate;
pub mod handlers;
pub mod models;
pub mod rest;
pub mod store;
pub mod validate;

use std::sync::Arc;

use auth::TokenService;
use generate::CodeGenerator;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub generator: Arc<dyn CodeGenerator>,
}
