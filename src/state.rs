use std::sync::Arc;

use crate::db::DbPool;
use crate::ws::dispatcher::EventDispatcher;
use crate::ws::registry::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Active WebSocket connections per user
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out of domain events to a user's connections
    pub dispatcher: EventDispatcher,
    /// Shared HTTP client for Google token verification and the OCR webhook
    pub http: reqwest::Client,
    /// Allowed CORS origin; also where OAuth callbacks send the browser
    pub cors_origin: String,
    /// Public base URL of this server (OAuth redirect URI)
    pub public_url: String,
    /// Google OAuth client id (empty = login disabled)
    pub google_client_id: String,
    /// Google OAuth client secret (empty = redirect flow disabled)
    pub google_client_secret: String,
    /// Google OAuth client id for the Android app
    pub google_android_client_id: String,
    /// Receipt OCR webhook URL (empty = AI endpoints disabled)
    pub webhook_url: String,
}
