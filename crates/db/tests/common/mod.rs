//! Fixtures shared by the repository integration tests.

#![allow(dead_code)]

use folio_db::models::organization::{CreateOrganization, Organization};
use folio_db::models::post::{CreatePost, Post};
use folio_db::repositories::{OrganizationRepo, PostRepo};
use sqlx::PgPool;

pub const T0: i64 = 1_700_000_000;

pub async fn seed_org(pool: &PgPool, slug: &str) -> Organization {
    OrganizationRepo::create(
        pool,
        &CreateOrganization {
            slug: slug.to_string(),
            name: format!("Org {slug}"),
        },
    )
    .await
    .unwrap()
}

pub fn new_post(slug: &str) -> CreatePost {
    CreatePost {
        title: format!("Title {slug}"),
        slug: slug.to_string(),
        content: "initial body".to_string(),
        excerpt: None,
        status: None,
        custom_fields: Some(serde_json::json!({ "hero": "a.png" })),
    }
}

pub async fn seed_post(pool: &PgPool, org_id: i64, slug: &str) -> Post {
    PostRepo::create(pool, org_id, 1, &new_post(slug), T0)
        .await
        .unwrap()
}
