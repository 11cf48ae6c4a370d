#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use copilot_api::{
    auth::TokenService,
    generate::{CodeGenerator, GenerateError},
    rest,
    store::Store,
    AppState,
};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

/// Echoes the request back as a fenced-free snippet, or fails on demand.
pub struct StubGenerator {
    pub fail: bool,
}

#[async_trait]
impl CodeGenerator for StubGenerator {
    async fn generate(&self, language: &str, prompt: &str) -> Result<String, GenerateError> {
        if self.fail {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(format!("// {language}: {prompt}"))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub tokens: TokenService,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(StubGenerator { fail: false }).await
}

pub async fn spawn_app_with(generator: impl CodeGenerator + 'static) -> TestApp {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    let store = Store::new(pool, Duration::from_secs(5));
    store.migrate().await.unwrap();

    let tokens = TokenService::new(SECRET).unwrap();
    let state = AppState {
        store: store.clone(),
        tokens: tokens.clone(),
        generator: Arc::new(generator),
    };

    TestApp {
        router: rest::router(state),
        store,
        tokens,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Sign up a user and return `(user_id, token)`.
    pub async fn signup(&self, name: &str, email: &str) -> (i64, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["user"]["id"].as_i64().unwrap();
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (id, token)
    }
}
