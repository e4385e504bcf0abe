//! Shared harness: an in-process router over a temporary JSON file.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use folio_server::{
    mail::{Mailer, MemoryMailer},
    router, AppState, Config,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<MemoryMailer>,
    dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let mailer = Arc::new(MemoryMailer::default());
        Self::build(mailer.clone(), mailer).await
    }

    /// Same app, but verification mail goes through `transport`.
    /// `self.mailer` then stays empty.
    pub async fn with_mailer(transport: Arc<dyn Mailer>) -> Self {
        Self::build(transport, Arc::new(MemoryMailer::default())).await
    }

    async fn build(transport: Arc<dyn Mailer>, mailer: Arc<MemoryMailer>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_secret(SECRET);
        config.db_path = dir.path().join("api-data").join("db.json");
        config.build_dir = dir.path().join("dist");

        let state = Arc::new(
            AppState::from_config(config, transport)
                .await
                .unwrap(),
        );

        Self {
            router: router(state.clone()),
            state,
            mailer,
            dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.state.config.db_path.clone()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": email,
                "password": PASSWORD,
                "passwordConfirm": PASSWORD,
            })),
        )
        .await
    }

    /// Token from the most recent verification mail sent to `email`.
    pub fn verify_token_for(&self, email: &str) -> String {
        let link = self.mailer.last_link_for(email).expect("no mail sent");
        link.split("token=")
            .nth(1)
            .expect("link without token")
            .to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers, verifies and returns `(user_id, auth_token)`.
    pub async fn signed_in(&self, email: &str) -> (String, String) {
        let res = self.register(email).await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {:?}", res.body);

        let token = self.verify_token_for(email);
        let res = self.get(&format!("/api/verify?token={}", token), None).await;
        assert_eq!(res.status, StatusCode::OK, "verify failed: {:?}", res.body);

        (
            res.body["userId"].as_str().unwrap().to_string(),
            res.body["authToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_article(&self, token: &str, title: &str, content: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/articles",
            Some(token),
            Some(json!({ "title": title, "content": content })),
        )
        .await
    }

    pub fn raw_db(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(self.db_path()).unwrap()).unwrap()
    }
}
