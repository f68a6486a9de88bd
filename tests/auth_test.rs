//! Integration tests for bearer-token auth, profile management, and
//! account deletion.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return (base_url, db).
async fn start_test_server() -> (String, catatan_server::db::DbPool) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = catatan_server::db::init_db(&data_dir).expect("Failed to init DB");

    let registry = Arc::new(catatan_server::ws::registry::ConnectionRegistry::new());
    let dispatcher = catatan_server::ws::dispatcher::EventDispatcher::new(registry.clone());

    let state = catatan_server::state::AppState {
        db: db.clone(),
        registry,
        dispatcher,
        http: reqwest::Client::new(),
        cors_origin: "http://localhost:5173".to_string(),
        public_url: "http://localhost:3001".to_string(),
        google_client_id: String::new(),
        google_client_secret: String::new(),
        google_android_client_id: String::new(),
        webhook_url: String::new(),
    };

    let app = catatan_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), db)
}

fn seed_user(db: &catatan_server::db::DbPool, id: &str, email: &str) {
    let conn = db.lock().unwrap();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (id, email, monthly_budget, onboarding_completed, dark_mode, \
         created_at, updated_at) VALUES (?1, ?2, 0, 0, 0, ?3, ?3)",
        rusqlite::params![id, email, now],
    )
    .unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let (base_url, _db) = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let (base_url, _db) = start_test_server().await;
    let client = reqwest::Client::new();

    // No token at all
    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Token that matches no user
    let resp = client
        .get(format!("{}/api/expenses", base_url))
        .bearer_auth("no-such-user")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_me_returns_the_profile() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], "user-1");
    assert_eq!(body["data"]["email"], "one@example.com");
    assert_eq!(body["data"]["onboarding_completed"], false);
}

#[tokio::test]
async fn test_profile_update_is_partial() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{}/api/auth/profile", base_url))
        .bearer_auth("user-1")
        .json(&json!({
            "full_name": "Budi Santoso",
            "monthly_budget": 2500000.0,
            "onboarding_completed": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["full_name"], "Budi Santoso");
    assert_eq!(body["data"]["monthly_budget"], 2500000.0);
    assert_eq!(body["data"]["onboarding_completed"], true);

    // A second update leaves earlier fields intact
    let resp = client
        .put(format!("{}/api/auth/profile", base_url))
        .bearer_auth("user-1")
        .json(&json!({ "dark_mode": true }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["dark_mode"], true);
    assert_eq!(body["data"]["full_name"], "Budi Santoso");
}

#[tokio::test]
async fn test_logout_succeeds() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/logout", base_url))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_account_deletion_removes_user_and_data() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let client = reqwest::Client::new();

    // Give the user a custom category and an expense
    let resp = client
        .post(format!("{}/api/categories", base_url))
        .bearer_auth("user-1")
        .json(&json!({ "name": "Kopi", "color": "#6F4E37" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/api/expenses", base_url))
        .bearer_auth("user-1")
        .json(&json!({
            "category_id": category_id,
            "amount": 12000.0,
            "expense_date": "2026-08-22",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .delete(format!("{}/api/auth/account", base_url))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The token is dead now
    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // All owned rows are gone; the seeded defaults survive
    let conn = db.lock().unwrap();
    let expenses: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM expenses WHERE user_id = 'user-1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(expenses, 0);
    let custom: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE user_id = 'user-1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(custom, 0);
    let defaults: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE is_default = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(defaults, 8);
}

#[tokio::test]
async fn test_google_login_guards() {
    let (base_url, _db) = start_test_server().await;
    let client = reqwest::Client::new();

    // Empty credential
    let resp = client
        .post(format!("{}/api/auth/google", base_url))
        .json(&json!({ "credential": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Client id not configured
    let resp = client
        .post(format!("{}/api/auth/google", base_url))
        .json(&json!({ "credential": "some-google-credential" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_auth_config_exposes_client_ids_without_secrets() {
    let (base_url, _db) = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/auth/config", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["data"]["webClientId"].is_string());
    assert!(body["data"]["androidClientId"].is_string());
    // The secret never leaves the server
    assert!(body["data"].get("clientSecret").is_none());
}

#[tokio::test]
async fn test_oauth_redirect_requires_configuration() {
    let (base_url, _db) = start_test_server().await;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let resp = client
        .get(format!("{}/api/auth/google", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_oauth_callback_failures_redirect_to_login() {
    let (base_url, _db) = start_test_server().await;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    // Consent denied at Google
    let resp = client
        .get(format!(
            "{}/api/auth/google/callback?error=access_denied",
            base_url
        ))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    let location = resp.headers()["location"].to_str().unwrap();
    assert!(location.ends_with("/login?error=oauth_denied"), "{location}");

    // No authorization code in the callback
    let resp = client
        .get(format!("{}/api/auth/google/callback", base_url))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    let location = resp.headers()["location"].to_str().unwrap();
    assert!(location.ends_with("/login?error=no_code"), "{location}");
}
