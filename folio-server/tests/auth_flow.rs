//! # Account and token tests
//!
//! Registration, email verification, login, token inspection and the
//! bearer-token middleware, driven through the full router.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use async_trait::async_trait;
use common::{TestApp, PASSWORD, SECRET};
use folio_core::TokenService;
use folio_server::mail::{MailError, Mailer};
use serde_json::json;
use std::sync::Arc;

struct DownMailer;

#[async_trait]
impl Mailer for DownMailer {
    async fn send_verification(&self, _email: &str, _link: &str) -> Result<(), MailError> {
        Err(MailError::Transport("smtp down".to_string()))
    }
}

#[tokio::test]
async fn test_register_creates_unverified_user_and_sends_mail() {
    let app = TestApp::new().await;

    let res = app.register("ada@example.com").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["userId"], "1");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ada@example.com");
    assert!(sent[0].1.starts_with("http://localhost:5000/verify?token="));

    let db = app.raw_db();
    let user = &db["users"][0];
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["emailVerified"], false);
    assert_ne!(user["password"], PASSWORD);
    assert!(user["salt"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_register_mail_failure_stores_nothing() {
    let app = TestApp::with_mailer(Arc::new(DownMailer)).await;

    let res = app.register("ada@example.com").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.message(), "Internal server error");
    assert_eq!(app.raw_db()["users"], json!([]));

    // No account exists to log into
    let res = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_uses_origin_header_for_link() {
    let app = TestApp::new().await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://blog.example.com")
        .body(Body::from(
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": PASSWORD,
                "passwordConfirm": PASSWORD,
            })
            .to_string(),
        ))
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let link = app.mailer.last_link_for("ada@example.com").unwrap();
    assert!(link.starts_with("https://blog.example.com/verify?token="));
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;

    // Missing lastName
    let res = app
        .request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "firstName": "Ada",
                "email": "ada@example.com",
                "password": PASSWORD,
                "passwordConfirm": PASSWORD,
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid user data");

    let res = app
        .request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": PASSWORD,
                "passwordConfirm": "something else",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Passwords not equal");

    assert!(app.mailer.sent().is_empty());
    assert_eq!(app.raw_db()["users"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = TestApp::new().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.message().is_empty());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    assert_eq!(app.register("ada@example.com").await.status, StatusCode::CREATED);

    let res = app.register("ada@example.com").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.message(), "Email already registered");
    assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_verify_marks_email_and_issues_token() {
    let app = TestApp::new().await;
    app.register("ada@example.com").await;
    let token = app.verify_token_for("ada@example.com");

    let res = app.get(&format!("/api/verify?token={}", token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["userId"], "1");
    assert_eq!(app.raw_db()["users"][0]["emailVerified"], true);

    // The returned token opens protected routes
    let auth_token = res.body["authToken"].as_str().unwrap();
    let res = app.get("/api/articles", Some(auth_token)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_rejects_bad_tokens() {
    let app = TestApp::new().await;
    let (_, auth_token) = app.signed_in("ada@example.com").await;

    let res = app.get("/api/verify", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid token");

    let res = app.get("/api/verify?token=garbage", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // A bearer token is not a verification token
    let res = app
        .get(&format!("/api/verify?token={}", auth_token), None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_for_unknown_user() {
    let app = TestApp::new().await;
    let token = TokenService::new(SECRET)
        .generate_verify_token("ghost@example.com")
        .unwrap();

    let res = app.get(&format!("/api/verify?token={}", token), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "User not found");
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new().await;
    app.register("ada@example.com").await;

    let res = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["userId"], "1");
    assert_eq!(res.body["email"], "ada@example.com");

    let issued = res.body["issued"].as_i64().unwrap();
    let expires = res.body["expires"].as_i64().unwrap();
    assert_eq!(expires - issued, 3600 * 1000);
    assert_eq!(issued % 1000, 0);

    let token = res.body["authToken"].as_str().unwrap();
    let claims = app.state.auth.tokens().validate_auth_token(token).unwrap();
    assert_eq!(claims.user_id, "1");
}

#[tokio::test]
async fn test_login_failures_share_a_message() {
    let app = TestApp::new().await;
    app.register("ada@example.com").await;

    let wrong_password = app.login("ada@example.com", "nope").await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.message(), "Invalid credentials");

    let unknown = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.message(), "Invalid credentials");

    let missing = app
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.message(), "Invalid user data");
}

#[tokio::test]
async fn test_middleware_rejections() {
    let app = TestApp::new().await;

    let res = app.get("/api/articles", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Authorization header missing");

    let req = Request::builder()
        .uri("/api/articles")
        .header(header::AUTHORIZATION, "Bearer")
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Token missing from authorization header");

    let res = app.get("/api/articles", Some("not.a.token")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Invalid token");

    let foreign = TokenService::new("some-other-secret")
        .generate_auth_token("1")
        .unwrap();
    let res = app.get("/api/users/1", Some(&foreign.token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Invalid token");
}

#[tokio::test]
async fn test_expired_token_rejected_but_readable() {
    let app = TestApp::new().await;
    let expired = TokenService::new(SECRET)
        .with_auth_ttl(chrono::Duration::hours(-2))
        .generate_auth_token("1")
        .unwrap();

    let res = app.get("/api/articles", Some(&expired.token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Token expired");

    // /api/token only decodes
    let res = app.get("/api/token", Some(&expired.token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["authToken"]["userId"], "1");
}

#[tokio::test]
async fn test_token_inspection() {
    let app = TestApp::new().await;
    let (user_id, token) = app.signed_in("ada@example.com").await;

    let res = app.get("/api/token", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    let info = &res.body["authToken"];
    assert_eq!(info["userId"], user_id.as_str());
    assert_eq!(info["issued"].as_str().unwrap().len(), 19);
    assert_eq!(info["expires"].as_str().unwrap().len(), 19);

    let res = app.get("/api/token", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/token", Some("garbage")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
