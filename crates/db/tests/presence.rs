//! Integration tests for the presence repository.

mod common;

use common::{seed_org, seed_post, T0};
use folio_db::repositories::PresenceRepo;
use sqlx::PgPool;

const TTL: i64 = 30;

#[sqlx::test(migrations = "./migrations")]
async fn test_heartbeat_upserts_single_row(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    PresenceRepo::upsert(&pool, post.id, 1, T0).await.unwrap();
    let entry = PresenceRepo::upsert(&pool, post.id, 1, T0 + 5).await.unwrap();
    assert_eq!(entry.last_seen_at, T0 + 5);

    let live = PresenceRepo::list_live(&pool, post.id, T0 + 5, TTL).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].user_id, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_last_seen_never_moves_backwards(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    PresenceRepo::upsert(&pool, post.id, 1, T0 + 10).await.unwrap();
    let entry = PresenceRepo::upsert(&pool, post.id, 1, T0).await.unwrap();
    assert_eq!(entry.last_seen_at, T0 + 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_entries_are_hidden_not_deleted(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    PresenceRepo::upsert(&pool, post.id, 1, T0).await.unwrap();
    PresenceRepo::upsert(&pool, post.id, 2, T0 + 20).await.unwrap();

    // User 1 is exactly TTL old at T0 + 30, which counts as gone.
    let live = PresenceRepo::list_live(&pool, post.id, T0 + TTL, TTL).await.unwrap();
    let users: Vec<i64> = live.iter().map(|e| e.user_id).collect();
    assert_eq!(users, vec![2]);

    // A fresh heartbeat brings user 1 back; the row was never removed.
    PresenceRepo::upsert(&pool, post.id, 1, T0 + 31).await.unwrap();
    let live = PresenceRepo::list_live(&pool, post.id, T0 + 31, TTL).await.unwrap();
    let users: Vec<i64> = live.iter().map(|e| e.user_id).collect();
    assert_eq!(users, vec![1, 2], "newest heartbeat first");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_presence_is_scoped_per_post(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let a = seed_post(&pool, org.id, "a").await;
    let b = seed_post(&pool, org.id, "b").await;

    PresenceRepo::upsert(&pool, a.id, 1, T0).await.unwrap();
    assert!(PresenceRepo::list_live(&pool, b.id, T0, TTL).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_purge_keeps_recent_rows(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    PresenceRepo::upsert(&pool, post.id, 1, T0).await.unwrap();
    PresenceRepo::upsert(&pool, post.id, 2, T0 + 1000).await.unwrap();

    let purged = PresenceRepo::purge_older_than(&pool, T0 + 1).await.unwrap();
    assert_eq!(purged, 1);

    let left = PresenceRepo::list_live(&pool, post.id, T0 + 1000, TTL).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].user_id, 2);
}
