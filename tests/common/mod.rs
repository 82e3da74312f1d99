#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

use link_manager::config::CorsPolicy;
use link_manager::memory::MemoryStore;
use link_manager::model::ValidationRules;
use link_manager::store::{Repository, Store};
use link_manager::{create_router, AppState};

pub struct TestApp {
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

/// A fresh application over an empty in-memory store.
pub fn app() -> TestApp {
    app_with(ValidationRules::default(), &CorsPolicy::AnyOrigin)
}

pub fn app_with(rules: ValidationRules, cors: &CorsPolicy) -> TestApp {
    let repository = Repository::new(
        Store::Memory(MemoryStore::new()),
        rules,
        Duration::from_secs(5),
    );
    TestApp {
        router: create_router(AppState { repository }, cors),
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None, &[]).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(json_body(&body)), &[])
            .await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, path, Some(json_body(&body)), &[])
            .await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request(Method::POST, path, Some(Body::from(body.to_string())), &[])
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, None, &[]).await
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    pub async fn create_link(&self, name: &str, url: &str) -> Value {
        let resp = self
            .post_json(
                "/api/links",
                serde_json::json!({ "name": name, "description": format!("{name} site"), "url": url }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "create link: {:?}", resp.json());
        resp.json()
    }

    pub async fn create_social(&self, platform: &str, username: &str) -> Value {
        let resp = self
            .post_json(
                "/api/social",
                serde_json::json!({
                    "platform": platform,
                    "username": username,
                    "url": format!("https://example.com/{username}"),
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "create social: {:?}", resp.json());
        resp.json()
    }

    pub async fn list_ids(&self, path: &str) -> Vec<String> {
        let resp = self.get(path).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()
            .as_array()
            .expect("list body is an array")
            .iter()
            .map(|record| record["id"].as_str().unwrap().to_string())
            .collect()
    }
}

fn json_body(body: &Value) -> Body {
    Body::from(serde_json::to_string(body).unwrap())
}
