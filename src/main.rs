mod ai;
mod auth;
mod categories;
mod config;
mod db;
mod expenses;
mod response;
mod routes;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use ws::dispatcher::EventDispatcher;
use ws::registry::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "catatan_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "catatan_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Catatan server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    if config.google_client_id.is_empty() {
        tracing::warn!("google_client_id not set, login is disabled");
    }
    if config.webhook_url.is_empty() {
        tracing::warn!("webhook_url not set, AI receipt endpoints are disabled");
    }

    // Connection registry doubles as the event transport
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = EventDispatcher::new(registry.clone());

    let app_state = state::AppState {
        db,
        registry,
        dispatcher,
        http: reqwest::Client::new(),
        cors_origin: config.cors_origin.clone(),
        public_url: config.public_url.clone(),
        google_client_id: config.google_client_id.clone(),
        google_client_secret: config.google_client_secret.clone(),
        google_android_client_id: config.google_android_client_id.clone(),
        webhook_url: config.webhook_url.clone(),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
