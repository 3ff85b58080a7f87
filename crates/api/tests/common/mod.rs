#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use folio_api::auth::jwt::{generate_access_token, JwtConfig};
use folio_api::config::{LogFormat, ServerConfig};
use folio_api::router::build_app_router;
use folio_api::state::AppState;
use folio_core::clock::ManualClock;
use folio_core::types::DbId;
use folio_db::models::organization::{CreateOrganization, Organization};
use folio_db::repositories::OrganizationRepo;
use folio_events::{CacheInvalidator, LogInvalidator, ReqwestTransport};

/// Fixed start time for the manual clock.
pub const T0: i64 = 1_700_000_000;

pub const LOCK_TTL_SECS: i64 = 1800;
pub const PRESENCE_TTL_SECS: i64 = 120;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        lock_ttl_secs: LOCK_TTL_SECS,
        presence_ttl_secs: PRESENCE_TTL_SECS,
        version_max_keep: 50,
        webhook_max_attempts: 5,
        webhook_timeout_secs: 2,
        cache_purge_url: None,
        log_format: LogFormat::Pretty,
    }
}

/// Application under test with a controllable clock.
///
/// The router is rebuilt for every request because `oneshot` consumes it;
/// the state (pool, clock, dispatcher) is shared across requests.
pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.state.pool
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<DbId>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", token(user_id)));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, user_id: DbId) -> Response {
        self.send(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn post(&self, uri: &str, user_id: DbId) -> Response {
        self.send(Method::POST, uri, Some(user_id), None).await
    }

    pub async fn post_json(&self, uri: &str, user_id: DbId, body: Value) -> Response {
        self.send(Method::POST, uri, Some(user_id), Some(body)).await
    }

    pub async fn put_json(&self, uri: &str, user_id: DbId, body: Value) -> Response {
        self.send(Method::PUT, uri, Some(user_id), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user_id: DbId) -> Response {
        self.send(Method::DELETE, uri, Some(user_id), None).await
    }
}

/// Build the full application with a manual clock, the real reqwest
/// transport, and log-only cache invalidation.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with_cache(pool, Arc::new(LogInvalidator))
}

/// Same as [`build_test_app`] with a caller-chosen cache backend.
pub fn build_test_app_with_cache(pool: PgPool, cache: Arc<dyn CacheInvalidator>) -> TestApp {
    let clock = Arc::new(ManualClock::new(T0));
    let state = AppState::new(
        pool,
        test_config(),
        clock.clone(),
        Arc::new(ReqwestTransport::new(Duration::from_secs(2))),
        cache,
    );
    TestApp { state, clock }
}

/// A valid bearer token for `user_id`.
pub fn token(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the body's `data` field.
pub async fn expect_data(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await["data"].clone()
}

pub async fn seed_org(pool: &PgPool, slug: &str) -> Organization {
    OrganizationRepo::create(
        pool,
        &CreateOrganization {
            slug: slug.to_string(),
            name: slug.to_uppercase(),
        },
    )
    .await
    .unwrap()
}

/// Create a post through the API and return its id.
pub async fn create_post(app: &TestApp, org_id: DbId, user_id: DbId, slug: &str) -> DbId {
    let response = app
        .post_json(
            &format!("/api/v1/organizations/{org_id}/posts"),
            user_id,
            serde_json::json!({
                "title": "Hello world",
                "slug": slug,
                "content": "first draft",
            }),
        )
        .await;
    let data = expect_data(response, StatusCode::CREATED).await;
    data["id"].as_i64().unwrap()
}

pub fn post_uri(org_id: DbId, post_id: DbId) -> String {
    format!("/api/v1/organizations/{org_id}/posts/{post_id}")
}
