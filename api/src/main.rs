use std::sync::Arc;

use copilot_api::{
    auth::TokenService, config::Config, generate::GeminiClient, rest, store::Store, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "copilot_api=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = Store::connect(
        &config.database_url,
        config.db_max_connections,
        config.db_timeout,
    )
    .await?;
    store.migrate().await?;
    tracing::info!("database ready");

    let tokens = TokenService::new(&config.jwt_secret)?;

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; /generate will fail");
    }
    let generator = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.generate_timeout,
    )?;

    let app_state = AppState {
        store,
        tokens,
        generator: Arc::new(generator),
    };

    let app = rest::router(app_state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
