use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;

use crate::ai;
use crate::auth::middleware::require_auth;
use crate::auth::{account, google};
use crate::categories;
use crate::expenses;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Receipts arrive as base64 data URLs inside JSON bodies, so the default
/// 2 MB body limit is far too small for a photographed receipt.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on login: 5 requests per minute per IP
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Login entry points are the only rate-limited routes; everything behind
    // them already requires a valid token.
    let login_routes = Router::new()
        .route(
            "/api/auth/google",
            axum::routing::post(google::google_login).get(google::oauth_redirect),
        )
        .route(
            "/api/auth/google/callback",
            axum::routing::get(google::oauth_callback),
        )
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Public OAuth client ids for mobile apps (no secrets)
    let public_routes = Router::new().route(
        "/api/auth/config",
        axum::routing::get(google::auth_config),
    );

    // Authenticated REST API
    let api_routes = Router::new()
        .route("/api/auth/me", axum::routing::get(account::get_me))
        .route("/api/auth/profile", axum::routing::put(account::update_profile))
        .route("/api/auth/logout", axum::routing::post(account::logout))
        .route("/api/auth/account", axum::routing::delete(account::delete_account))
        .route("/api/expenses", axum::routing::get(expenses::list_expenses))
        .route("/api/expenses", axum::routing::post(expenses::create_expense))
        .route("/api/expenses/{id}", axum::routing::put(expenses::update_expense))
        .route("/api/expenses/{id}", axum::routing::delete(expenses::delete_expense))
        .route("/api/categories", axum::routing::get(categories::list_categories))
        .route("/api/categories", axum::routing::post(categories::create_category))
        .route("/api/categories/{id}", axum::routing::put(categories::update_category))
        .route("/api/categories/{id}", axum::routing::delete(categories::delete_category))
        .route("/api/ai/analyze-receipt", axum::routing::post(ai::analyze_receipt))
        .route("/api/ai/save-expense", axum::routing::post(ai::save_expense))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // WebSocket endpoint (auth via in-band authenticate message, not headers)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .merge(login_routes)
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

/// Basic health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
