//! HTTP-level tests for webhook endpoints, test sends, and event delivery.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{create_post, expect_data, post_uri, seed_org, T0};
use serde_json::{json, Value};
use sqlx::PgPool;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::types::DbId;
use folio_core::webhooks::{compute_signature, verify_signature};

const ALICE: i64 = 101;

fn webhooks_uri(org_id: DbId) -> String {
    format!("/api/v1/organizations/{org_id}/webhooks")
}

async fn create_endpoint(
    app: &common::TestApp,
    org_id: DbId,
    url: &str,
    events: &[&str],
) -> Value {
    expect_data(
        app.post_json(
            &webhooks_uri(org_id),
            ALICE,
            json!({
                "name": "receiver",
                "url": url,
                "subscribed_events": events,
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await
}

/// Poll the delivery log until `done` holds or about five seconds pass.
async fn wait_for_deliveries(
    app: &common::TestApp,
    uri: &str,
    done: impl Fn(&Value) -> bool,
) -> Value {
    let mut page = Value::Null;
    for _ in 0..100 {
        page = expect_data(app.get(uri, ALICE).await, StatusCode::OK).await;
        if done(&page) {
            return page;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("deliveries never settled: {page}");
}

// ---------------------------------------------------------------------------
// Endpoint CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_secret_only_returned_on_create(pool: PgPool) {
    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;

    let created = create_endpoint(&app, org.id, "https://example.com/hook", &["*"]).await;
    let secret = created["secret"].as_str().unwrap();
    assert_eq!(secret.len(), 32);
    assert_eq!(created["active"], true);
    assert_eq!(created["created_at"], T0);

    let listed = expect_data(app.get(&webhooks_uri(org.id), ALICE).await, StatusCode::OK).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("secret").is_none());

    let id = created["id"].as_i64().unwrap();
    let fetched = expect_data(
        app.get(&format!("{}/{id}", webhooks_uri(org.id)), ALICE)
            .await,
        StatusCode::OK,
    )
    .await;
    assert!(fetched.get("secret").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unknown_event_type_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;

    let response = app
        .post_json(
            &webhooks_uri(org.id),
            ALICE,
            json!({
                "name": "receiver",
                "url": "https://example.com/hook",
                "subscribed_events": ["post.exploded"],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_and_soft_delete(pool: PgPool) {
    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    let created = create_endpoint(&app, org.id, "https://example.com/hook", &["*"]).await;
    let uri = format!("{}/{}", webhooks_uri(org.id), created["id"]);

    app.clock.advance(7);
    let updated = expect_data(
        app.put_json(&uri, ALICE, json!({"active": false, "name": "paused"}))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["active"], false);
    assert_eq!(updated["name"], "paused");
    assert_eq!(updated["updated_at"], T0 + 7);

    let response = app.delete(&uri, ALICE).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&uri, ALICE).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.delete(&uri, ALICE).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed = expect_data(app.get(&webhooks_uri(org.id), ALICE).await, StatusCode::OK).await;
    assert!(listed.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test send / delivery log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_send_test_delivery_is_signed_and_logged(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("X-Webhook-Event", "webhook.test"))
        .and(header_exists("X-Webhook-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    let created = create_endpoint(&app, org.id, &format!("{}/hook", server.uri()), &["*"]).await;
    let secret = created["secret"].as_str().unwrap().to_string();
    let uri = format!("{}/{}", webhooks_uri(org.id), created["id"]);

    let result = expect_data(
        app.post(&format!("{uri}/test"), ALICE).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(result["status"], "delivered");
    assert_eq!(result["event_type"], "webhook.test");
    assert_eq!(result["attempt_count"], 1);
    assert_eq!(result["attempts"][0]["response_status"], 200);
    assert_eq!(result["attempts"][0]["response_snippet"], "ok");

    let received = server.received_requests().await.unwrap();
    let request = &received[0];
    let signature = request
        .headers
        .get("X-Webhook-Signature")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(signature, compute_signature(&secret, &request.body));

    let page = expect_data(
        app.get(&format!("{uri}/deliveries"), ALICE).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 20);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["items"][0]["attempts"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_send_test_to_failing_receiver_schedules_retry(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    let created = create_endpoint(&app, org.id, &server.uri(), &["*"]).await;
    let uri = format!("{}/{}", webhooks_uri(org.id), created["id"]);

    let result = expect_data(
        app.post(&format!("{uri}/test"), ALICE).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(result["status"], "retry_scheduled");
    assert_eq!(result["last_response_status"], 503);
    assert_eq!(result["next_retry_at"], T0 + 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_send_test_unknown_endpoint_is_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;

    let response = app
        .post(&format!("{}/999999/test", webhooks_uri(org.id)), ALICE)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Post events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_post_update_delivers_subscribed_events(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    let created = create_endpoint(
        &app,
        org.id,
        &server.uri(),
        &["post.updated", "post.published"],
    )
    .await;
    let deliveries_uri = format!("{}/{}/deliveries", webhooks_uri(org.id), created["id"]);

    let post_id = create_post(&app, org.id, ALICE, "hello").await;
    app.put_json(
        &post_uri(org.id, post_id),
        ALICE,
        json!({"content": "second draft", "status": "published"}),
    )
    .await;

    let page = wait_for_deliveries(&app, &deliveries_uri, |page| {
        page["total"] == 2
            && page["items"]
                .as_array()
                .is_some_and(|items| items.iter().all(|d| d["status"] == "delivered"))
    })
    .await;

    let mut events: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["event_type"].as_str().unwrap())
        .collect();
    events.sort_unstable();
    assert_eq!(events, vec!["post.published", "post.updated"]);

    let payload = &page["items"][0]["payload"];
    assert_eq!(payload["data"]["id"], post_id);
    assert_eq!(payload["data"]["status"], "published");
    assert_eq!(payload["timestamp"], T0);

    let secret = created["secret"].as_str().unwrap();
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    for request in &received {
        let signature = request
            .headers
            .get("X-Webhook-Signature")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(verify_signature(secret, &request.body, signature));
        assert!(!verify_signature("some-other-secret", &request.body, signature));
    }
}
