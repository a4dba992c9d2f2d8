#![allow(dead_code)]

/// Common test utilities for HTTP tests
///
/// Builds the full router over in-memory collaborators, so the tests need
/// neither PostgreSQL nor a mail relay.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use taskmarket_api::{
    app::{build_router, AppState, Collaborators},
    config::Config,
};
use taskmarket_shared::{
    auth::password::hash_password,
    infra::token::JwtTokenIssuer,
    memory::{MemoryDenylist, MemoryFileStore, MemoryIdentityStore, MemoryOtpDispatcher},
    models::account::{Account, AccountRole, CreateAccount},
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub const BOUNDARY: &str = "taskmarket-test-boundary";

/// Test context holding the router and handles on its collaborators
pub struct TestContext {
    pub app: Router,
    pub identity: MemoryIdentityStore,
    pub otp: MemoryOtpDispatcher,
    pub files: MemoryFileStore,
}

impl TestContext {
    pub fn new() -> Self {
        let identity = MemoryIdentityStore::new();
        let otp = MemoryOtpDispatcher::new();
        let files = MemoryFileStore::new();

        let tokens = JwtTokenIssuer::new(
            JWT_SECRET,
            chrono::Duration::hours(1),
            Arc::new(MemoryDenylist::new()),
        );

        let mut config = Config::for_testing(JWT_SECRET);
        config.uploads.max_bytes = 1024;

        let state = AppState::new(
            config,
            Collaborators {
                identity: Arc::new(identity.clone()),
                tokens: Arc::new(tokens),
                otp: Arc::new(otp.clone()),
                files: Arc::new(files.clone()),
            },
        );

        Self {
            app: build_router(state),
            identity,
            otp,
            files,
        }
    }

    /// Sends a request and returns the status with the JSON body (Null if empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };

        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Logs in through the API and returns the bearer token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post_json(
                "/v1/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Inserts an account with a real password hash
    pub fn seed_account(&self, first_name: &str, email: &str, password: &str, role: AccountRole) -> Account {
        self.identity.insert_account(
            CreateAccount {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                handle: first_name.to_lowercase(),
                email: email.to_string(),
                password_hash: hash_password(password).unwrap(),
                role,
            },
            false,
        )
    }
}

/// JSON request carrying a bearer token
pub fn authed_json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    let mut request = json_request(method, uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Builds a `multipart/form-data` request
pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A valid plain user registration for `email`
pub fn ada(email: &str) -> Value {
    serde_json::json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "password": "analytical",
        "password_confirmation": "analytical",
        "address": "12 St James's Square, London"
    })
}
