//! Integration tests for the version store repository.

mod common;

use common::{seed_org, seed_post, T0};
use folio_core::versioning::VersionSnapshot;
use folio_db::models::post::UpdatePost;
use folio_db::repositories::{PostRepo, PostVersionRepo};
use sqlx::PgPool;

fn snapshot(n: i32) -> VersionSnapshot {
    VersionSnapshot {
        title: format!("Title v{n}"),
        slug: "hello".to_string(),
        content: format!("body {n}"),
        excerpt: None,
        custom_fields: serde_json::json!({ "n": n }),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sequences_start_at_one_and_increase(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    let mut conn = pool.acquire().await.unwrap();
    for n in 1..=3 {
        let v = PostVersionRepo::create(&mut conn, post.id, 7, &snapshot(n), T0 + n as i64)
            .await
            .unwrap();
        assert_eq!(v.sequence, n);
        assert_eq!(v.author_user_id, 7);
    }

    let listed = PostVersionRepo::list_by_post(&pool, post.id).await.unwrap();
    let seqs: Vec<i32> = listed.iter().map(|v| v.sequence).collect();
    assert_eq!(seqs, vec![3, 2, 1]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sequences_are_per_post(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let a = seed_post(&pool, org.id, "a").await;
    let b = seed_post(&pool, org.id, "b").await;

    let mut conn = pool.acquire().await.unwrap();
    PostVersionRepo::create(&mut conn, a.id, 1, &snapshot(1), T0).await.unwrap();
    PostVersionRepo::create(&mut conn, a.id, 1, &snapshot(2), T0).await.unwrap();
    let first_b = PostVersionRepo::create(&mut conn, b.id, 1, &snapshot(1), T0)
        .await
        .unwrap();
    assert_eq!(first_b.sequence, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_version_rolls_back_with_the_mutation(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    let mut tx = pool.begin().await.unwrap();
    let locked = PostRepo::find_for_update(&mut tx, org.id, post.id)
        .await
        .unwrap()
        .unwrap();
    PostVersionRepo::create(&mut tx, post.id, 1, &locked.snapshot(), T0)
        .await
        .unwrap();
    let update = UpdatePost {
        title: Some("Changed".to_string()),
        ..Default::default()
    };
    PostRepo::update(&mut tx, post.id, &update, None, T0 + 1)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(PostVersionRepo::count_by_post(&pool, post.id).await.unwrap(), 0);
    let unchanged = PostRepo::find_by_id(&pool, org.id, post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, post.title);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cleanup_keeps_newest(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    let mut conn = pool.acquire().await.unwrap();
    for n in 1..=12 {
        PostVersionRepo::create(&mut conn, post.id, 1, &snapshot(n), T0).await.unwrap();
    }
    drop(conn);

    let removed = PostVersionRepo::cleanup_old(&pool, post.id, 5).await.unwrap();
    assert_eq!(removed, 7);

    let seqs: Vec<i32> = PostVersionRepo::list_by_post(&pool, post.id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.sequence)
        .collect();
    assert_eq!(seqs, vec![12, 11, 10, 9, 8]);

    // Nothing to do once within the limit.
    assert_eq!(PostVersionRepo::cleanup_old(&pool, post.id, 5).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sequences_keep_growing_after_cleanup(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let post = seed_post(&pool, org.id, "hello").await;

    let mut conn = pool.acquire().await.unwrap();
    for n in 1..=4 {
        PostVersionRepo::create(&mut conn, post.id, 1, &snapshot(n), T0).await.unwrap();
    }
    PostVersionRepo::cleanup_old(&pool, post.id, 1).await.unwrap();
    let next = PostVersionRepo::create(&mut conn, post.id, 1, &snapshot(5), T0)
        .await
        .unwrap();
    assert_eq!(next.sequence, 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_is_scoped_to_post(pool: PgPool) {
    let org = seed_org(&pool, "acme").await;
    let a = seed_post(&pool, org.id, "a").await;
    let b = seed_post(&pool, org.id, "b").await;

    let mut conn = pool.acquire().await.unwrap();
    let v = PostVersionRepo::create(&mut conn, a.id, 1, &snapshot(1), T0).await.unwrap();

    let found = PostVersionRepo::find(&pool, a.id, v.id).await.unwrap().unwrap();
    assert_eq!(found.snapshot(), snapshot(1));
    assert!(PostVersionRepo::find(&pool, b.id, v.id).await.unwrap().is_none());
}
