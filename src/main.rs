use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chat::auth::JwtAuthProvider;
use chat::chat::{ChatService, ChatSettings};
use chat::config::{AppConfig, Cli};
use chat::db::Database;
use chat::llm::create_provider;
use chat::routes::configure_routes;
use chat::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from(Cli::parse());
    if config.uses_default_jwt_secret() {
        tracing::warn!("CHAT_JWT_SECRET is not set; using the built-in development secret");
    }

    let db = Database::open(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    let endpoint = config.endpoint()?;
    let provider = create_provider(config.model, endpoint)
        .await
        .context("creating Claude client")?;

    let auth = Arc::new(JwtAuthProvider::new(
        db.clone(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    ));
    let chat = ChatService::new(db, Arc::from(provider), ChatSettings::from(&config));

    let bind_addr = config.bind_addr;
    tracing::info!(
        backend = %config.backend_display_name(),
        model = config.model.display_name(),
        "Starting server on http://{}",
        bind_addr
    );

    let routes = configure_routes(AppState::new(config, auth, chat));
    warp::serve(routes).run(bind_addr).await;

    Ok(())
}
