#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use movie_catalog::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{MovieFields, NewUser, User},
    repository::{Repository, RepositoryState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

// --- Shared Router Test Harness ---

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repo(Arc::new(InMemoryRepository::new()))
    }

    pub fn with_repo(repo: Arc<InMemoryRepository>) -> Self {
        let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default());
        let router = create_router(state.clone());
        Self {
            router,
            state,
            repo,
        }
    }

    /// Stores a user with a properly hashed password.
    pub async fn seed_user(&self, name: &str, login: &str, password: &str, admin: bool) -> User {
        let password_hash = self.state.passwords.encode(password).unwrap();
        self.repo
            .create_user(NewUser {
                name: name.to_string(),
                login: login.to_string(),
                password_hash,
                is_admin: admin,
            })
            .await
            .unwrap()
    }

    pub async fn seed_movie(&self, title: &str) -> i64 {
        self.repo
            .create_movie(MovieFields {
                title: title.to_string(),
                description: "Some description".to_string(),
                ..MovieFields::default()
            })
            .await
            .unwrap()
            .id
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.tokens.issue(user).unwrap().token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, token, Some(body))).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("PUT", uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("PUT", uri, token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, token, None)).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// The first user-facing message of an error envelope.
pub fn message(body: &Value) -> &str {
    body["user_message"][0].as_str().unwrap_or_default()
}
