//! Shared harness for the HTTP tests: an in-memory garden behind the real
//! router, driven with `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use garden_api::{AppState, AppStateInner, Limits, SeedOptions};
use garden_db::Database;
use garden_types::models::AuthMode;

pub const ADMIN_PASSWORD: &str = "garden-admin";
pub const PASSPHRASE: &str = "moonlight";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new(mode: AuthMode) -> Self {
        Self::with_limits(mode, Limits::default())
    }

    pub fn with_limits(mode: AuthMode, limits: Limits) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        garden_api::seed(&db, &SeedOptions::default()).expect("seed");
        let state = AppStateInner::new(db, mode, &limits);
        let router = garden_api::router(state.clone());
        Self { state, router }
    }

    /// Send a request from 127.0.0.1 and decode the JSON reply.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.call_from([127, 0, 0, 1], method, uri, token, body).await
    }

    pub async fn call_from(
        &self,
        ip: [u8; 4],
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let mut req = builder.body(body).expect("request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40_000))));

        let res = self.router.clone().oneshot(req).await.expect("router is infallible");
        let status = res.status();
        let bytes = res
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn register(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
        token_of(&body)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {username}: {body}");
        token_of(&body)
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/login",
                None,
                Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login: {body}");
        token_of(&body)
    }

    /// Create a diary and return its id.
    pub async fn write_diary(&self, token: &str, title: &str, content: &str, public: bool) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/secret/diaries",
                Some(token),
                Some(json!({ "title": title, "content": content, "is_public": public })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create diary: {body}");
        body["id"].as_i64().expect("diary id")
    }
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token in body").to_string()
}

pub fn items(body: &Value) -> &Vec<Value> {
    body["items"].as_array().expect("items array")
}
