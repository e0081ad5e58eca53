use super::*;
use crate::{AppState, Config, StorageConfig, posts::PostStore};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header::AUTHORIZATION},
    routing::get,
};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn test_state() -> AppState {
    let mut users = UserDatabase::new();
    users.insert("alice".to_string(), "alice@example.com".to_string());

    let mut config = Config::default();
    config.app.auth_secret = SECRET.to_string();
    config.storage = StorageConfig { data_file: None };

    AppState {
        store: Arc::new(PostStore::in_memory()),
        users: Arc::new(users),
        config,
    }
}

async fn whoami(user: AuthUser) -> String {
    user.username
}

async fn call(headers: &[(&str, &str)]) -> (StatusCode, String) {
    let app = Router::new()
        .route("/whoami", get(whoami))
        .with_state(test_state());

    let mut request = Request::builder().uri("/whoami");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[test]
fn test_token_verifies_with_same_secret() {
    let token = issue_token(SECRET, "alice").unwrap();
    assert!(token.starts_with("alice:"));
    assert_eq!(verify_token(SECRET, &token), Some("alice".to_string()));
}

#[test]
fn test_token_rejected_with_other_secret_or_tampering() {
    let token = issue_token(SECRET, "alice").unwrap();
    assert_eq!(verify_token("other-secret", &token), None);

    let tampered = token.replacen("alice", "bob", 1);
    assert_eq!(verify_token(SECRET, &tampered), None);

    assert_eq!(verify_token(SECRET, "alice"), None);
    assert_eq!(verify_token(SECRET, "alice:not-base64!"), None);
}

#[test]
fn test_generate_secret_is_random_hex() {
    let a = generate_secret();
    let b = generate_secret();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[test]
fn test_token_from_headers_prefers_bearer() {
    let mut headers = HeaderMap::new();
    headers.insert("cookie", HeaderValue::from_static("theme=dark; auth=from-cookie"));
    assert_eq!(token_from_headers(&headers), Some("from-cookie".to_string()));

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(token_from_headers(&headers), Some("from-header".to_string()));

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(bearer_token(&headers), None);
}

#[test]
fn test_user_lookup_by_email() {
    let db = test_state().users;

    let (username, user) = db.find("Alice@Example.com").unwrap();
    assert_eq!(username, "alice");
    assert_eq!(user.email, "alice@example.com");

    assert_eq!(db.find("alice").map(|(name, _)| name), Some("alice"));
    assert!(db.find("bob").is_none());
}

#[test]
fn test_insert_keeps_existing_user() {
    let mut db = UserDatabase::new();
    assert!(db.insert("alice".to_string(), "alice@example.com".to_string()));
    assert!(!db.insert("alice".to_string(), "other@example.com".to_string()));
    assert_eq!(db.find("alice").unwrap().1.email, "alice@example.com");
    assert_eq!(db.len(), 1);

    assert!(db.remove("alice").is_some());
    assert!(db.is_empty());
}

#[test]
fn test_normalize_username() {
    assert_eq!(
        UserDatabase::normalize_username("  Alice "),
        Some("alice".to_string())
    );
    assert_eq!(UserDatabase::normalize_username("   "), None);
    assert_eq!(UserDatabase::normalize_username("a:b"), None);
}

#[tokio::test]
async fn test_user_database_file_round_trip() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("users.toml");

    let db = test_state().users;
    db.write(&path).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("alice@example.com"));

    let loaded = UserDatabase::read(&path).await.unwrap();
    assert_eq!(loaded.find("alice"), db.find("alice"));
}

#[tokio::test]
async fn test_user_database_rejects_invalid_toml() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("users.toml");
    std::fs::write(&path, "[users.alice\nemail = ").unwrap();

    assert!(matches!(
        UserDatabase::read(&path).await,
        Err(UserDatabaseError::Parse(_))
    ));
    assert!(matches!(
        UserDatabase::read(&temp_dir.path().join("missing.toml")).await,
        Err(UserDatabaseError::Io(_))
    ));
}

#[tokio::test]
async fn test_extractor_accepts_valid_bearer_token() {
    let token = issue_token(SECRET, "alice").unwrap();
    let header = format!("Bearer {}", token);

    let (status, body) = call(&[("authorization", header.as_str())]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alice");
}

#[tokio::test]
async fn test_extractor_accepts_auth_cookie() {
    let token = issue_token(SECRET, "alice").unwrap();
    let cookie = format!("auth={}", token);

    let (status, body) = call(&[("cookie", cookie.as_str())]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alice");
}

#[tokio::test]
async fn test_extractor_rejects_missing_and_unknown() {
    let (status, body) = call(&[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Unauthenticated."));

    // Correctly signed, but not in the user database
    let token = issue_token(SECRET, "mallory").unwrap();
    let header = format!("Bearer {}", token);
    let (status, _) = call(&[("authorization", header.as_str())]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = issue_token("wrong-secret", "alice").unwrap();
    let header = format!("Bearer {}", token);
    let (status, _) = call(&[("authorization", header.as_str())]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
