//! Integration tests for category listing, custom category CRUD, and the
//! default-category protections.

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

async fn list_categories(base_url: &str, token: &str) -> Vec<serde_json::Value> {
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .get(format!("{}/api/categories", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"].as_array().unwrap().clone()
}

async fn create_category(base_url: &str, token: &str, name: &str, color: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/categories", base_url))
        .bearer_auth(token)
        .json(&json!({ "name": name, "color": color }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn test_fresh_user_sees_the_eight_defaults() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let categories = list_categories(&base_url, "user-1").await;
    assert_eq!(categories.len(), 8);
    assert!(categories.iter().all(|c| c["is_default"] == true));

    let names: Vec<&str> = categories
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Makanan & Minuman"));
    assert!(names.contains(&"Lainnya"));
}

#[tokio::test]
async fn test_custom_categories_are_per_user() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");
    seed_user(&db, "user-2", "two@example.com");

    let created = create_category(&base_url, "user-1", "Kopi", "#6F4E37").await;
    assert_eq!(created["is_default"], false);
    assert_eq!(created["user_id"], "user-1");

    let mine = list_categories(&base_url, "user-1").await;
    assert_eq!(mine.len(), 9);
    assert!(mine.iter().any(|c| c["name"] == "Kopi"));

    // Another user only sees the defaults
    let theirs = list_categories(&base_url, "user-2").await;
    assert_eq!(theirs.len(), 8);
}

#[tokio::test]
async fn test_create_requires_name_and_color() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let client = reqwest::Client::new();
    for body in [json!({ "name": "Kopi" }), json!({ "color": "#fff" }), json!({ "name": "  " , "color": "#fff" })] {
        let resp = client
            .post(format!("{}/api/categories", base_url))
            .bearer_auth("user-1")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }
}

#[tokio::test]
async fn test_update_and_delete_own_category() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let created = create_category(&base_url, "user-1", "Kopi", "#6F4E37").await;
    let id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{}/api/categories/{}", base_url, id))
        .bearer_auth("user-1")
        .json(&json!({ "name": "Kopi Susu" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Kopi Susu");
    // Color untouched
    assert_eq!(body["data"]["color"], "#6F4E37");

    let resp = client
        .delete(format!("{}/api/categories/{}", base_url, id))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let categories = list_categories(&base_url, "user-1").await;
    assert_eq!(categories.len(), 8);
}

#[tokio::test]
async fn test_default_categories_are_read_only() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let categories = list_categories(&base_url, "user-1").await;
    let default_id = categories[0]["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{}/api/categories/{}", base_url, default_id))
        .bearer_auth("user-1")
        .json(&json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{}/api/categories/{}", base_url, default_id))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_cannot_touch_another_users_category() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");
    seed_user(&db, "user-2", "two@example.com");

    let created = create_category(&base_url, "user-1", "Kopi", "#6F4E37").await;
    let id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{}/api/categories/{}", base_url, id))
        .bearer_auth("user-2")
        .json(&json!({ "name": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{}/api/categories/{}", base_url, id))
        .bearer_auth("user-2")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_deleting_a_category_detaches_its_expenses() {
    let (base_url, db) = start_test_server().await;
    seed_user(&db, "user-1", "one@example.com");

    let created = create_category(&base_url, "user-1", "Kopi", "#6F4E37").await;
    let category_id = created["id"].as_str().unwrap().to_string();

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/expenses", base_url))
        .bearer_auth("user-1")
        .json(&json!({
            "category_id": category_id,
            "amount": 18000.0,
            "expense_date": "2026-08-21",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .delete(format!("{}/api/categories/{}", base_url, category_id))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The expense survives with its category detached
    let body: serde_json::Value = client
        .get(format!("{}/api/expenses", base_url))
        .bearer_auth("user-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0]["category"].is_null());
    assert!(list[0]["category_id"].is_null());
}
