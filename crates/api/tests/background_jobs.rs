//! Tests for the lock GC sweep and the webhook retry worker.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{create_post, expect_data, post_uri, seed_org, LOCK_TTL_SECS, T0};
use serde_json::json;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_api::background::{lock_gc, webhook_worker};
use folio_core::collaboration::PRESENCE_RETENTION_SECS;
use folio_db::repositories::{EditLockRepo, WebhookDeliveryRepo};
use folio_events::WebhookEvent;

const ALICE: i64 = 101;

#[sqlx::test(migrations = "../db/migrations")]
async fn sweep_purges_expired_locks_then_stale_presence(pool: PgPool) {
    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    let post_id = create_post(&app, org.id, ALICE, "hello").await;
    let uri = post_uri(org.id, post_id);

    app.post(&format!("{uri}/lock/acquire"), ALICE).await;
    app.post(&format!("{uri}/presence/heartbeat"), ALICE).await;

    assert_eq!(
        lock_gc::sweep(app.pool(), app.clock.as_ref()).await.unwrap(),
        (0, 0)
    );

    app.clock.set(T0 + LOCK_TTL_SECS + 1);
    assert_eq!(
        lock_gc::sweep(app.pool(), app.clock.as_ref()).await.unwrap(),
        (1, 0)
    );
    assert!(EditLockRepo::get(app.pool(), post_id).await.unwrap().is_none());

    app.clock.set(T0 + PRESENCE_RETENTION_SECS + 1);
    assert_eq!(
        lock_gc::sweep(app.pool(), app.clock.as_ref()).await.unwrap(),
        (0, 1)
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn worker_delivers_pending_and_stops_on_cancel(pool: PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = common::build_test_app(pool);
    let org = seed_org(app.pool(), "acme").await;
    expect_data(
        app.post_json(
            &format!("/api/v1/organizations/{}/webhooks", org.id),
            ALICE,
            json!({"name": "receiver", "url": server.uri(), "subscribed_events": ["*"]}),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    // Persist without the immediate attempt; only the worker sends it.
    let deliveries = app
        .state
        .webhooks
        .dispatch(org.id, &WebhookEvent::new("post.updated", json!({"id": 1})))
        .await
        .unwrap();
    assert_eq!(deliveries.len(), 1);
    let delivery_id = deliveries[0].id;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(webhook_worker::run(
        app.state.webhooks.clone(),
        cancel.clone(),
    ));

    let mut status = String::new();
    for _ in 0..100 {
        status = WebhookDeliveryRepo::find_by_id(app.pool(), delivery_id)
            .await
            .unwrap()
            .unwrap()
            .status;
        if status == "delivered" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, "delivered");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker stops after cancel")
        .unwrap();
}
