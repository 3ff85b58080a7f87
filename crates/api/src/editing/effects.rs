//! Work that follows a committed post write.

use folio_core::webhooks::events;
use folio_db::models::organization::Organization;
use folio_db::models::post::Post;
use folio_db::repositories::PostVersionRepo;
use folio_events::WebhookEvent;

use crate::state::AppState;

/// Webhook events implied by a status change, in addition to the write's own
/// event. `before` is `None` for a newly created post.
pub fn lifecycle_events(before: Option<&Post>, after: &Post) -> Vec<&'static str> {
    let was_published = before.is_some_and(Post::is_published);
    let is_published = after.is_published();
    match (was_published, is_published) {
        (false, true) => vec![events::POST_PUBLISHED],
        (true, false) => vec![events::POST_UNPUBLISHED],
        _ => vec![],
    }
}

/// Whether a write changes what the organization's taxonomy views list.
/// Those views only count published posts.
pub fn affects_taxonomy(emitted: &[&str], post: &Post) -> bool {
    emitted.iter().any(|event| match *event {
        events::POST_PUBLISHED | events::POST_UNPUBLISHED => true,
        events::POST_DELETED => post.is_published(),
        _ => false,
    })
}

/// Payload `data` for post events.
pub fn post_event_data(post: &Post) -> serde_json::Value {
    serde_json::json!({
        "id": post.id,
        "organization_id": post.organization_id,
        "title": post.title,
        "slug": post.slug,
        "status": post.status,
        "updated_at": post.updated_at,
    })
}

/// Post-commit side effects of one write.
pub struct AfterCommit<'a> {
    state: &'a AppState,
    organization: &'a Organization,
    post: &'a Post,
    events: Vec<&'static str>,
    stale_slug: Option<String>,
    trim_versions: bool,
}

impl<'a> AfterCommit<'a> {
    pub fn new(state: &'a AppState, organization: &'a Organization, post: &'a Post) -> Self {
        Self {
            state,
            organization,
            post,
            events: Vec::new(),
            stale_slug: None,
            trim_versions: false,
        }
    }

    /// Queue webhook events, in order.
    pub fn events(mut self, events: impl IntoIterator<Item = &'static str>) -> Self {
        self.events.extend(events);
        self
    }

    /// The post was previously reachable under `slug`; invalidate it too.
    pub fn previous_slug(mut self, slug: &str) -> Self {
        if slug != self.post.slug {
            self.stale_slug = Some(slug.to_string());
        }
        self
    }

    /// Trim the post's version history to the configured retention.
    pub fn trim_versions(mut self) -> Self {
        self.trim_versions = true;
        self
    }

    /// Run the side effects. Version trimming is awaited; cache invalidation
    /// and webhook fan-out run on detached tasks. Nothing here can fail the
    /// write that already committed.
    pub async fn run(self) {
        let state = self.state;
        let org = self.organization;
        let post = self.post;

        if self.trim_versions {
            match PostVersionRepo::cleanup_old(&state.pool, post.id, state.config.version_max_keep)
                .await
            {
                Ok(0) => {}
                Ok(deleted) => {
                    tracing::debug!(post_id = post.id, deleted, "Old post versions trimmed")
                }
                Err(e) => {
                    tracing::warn!(post_id = post.id, error = %e, "Version cleanup failed")
                }
            }
        }

        state
            .cache
            .spawn_post_invalidation(org.slug.clone(), post.slug.clone());
        if let Some(stale) = self.stale_slug {
            state.cache.spawn_post_invalidation(org.slug.clone(), stale);
        }
        if affects_taxonomy(&self.events, post) {
            state.cache.spawn_taxonomy_invalidation(org.slug.clone());
        }

        let data = post_event_data(post);
        for event_type in self.events {
            state
                .webhooks
                .spawn_dispatch(org.id, WebhookEvent::new(event_type, data.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_core::post::PostStatus;

    use super::*;

    fn post(status: PostStatus) -> Post {
        Post {
            id: 1,
            organization_id: 1,
            title: "Hello".into(),
            slug: "hello".into(),
            content: String::new(),
            excerpt: None,
            status: status.as_str().to_string(),
            custom_fields: serde_json::json!({}),
            created_by: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn publishing_emits_published() {
        let before = post(PostStatus::Draft);
        let after = post(PostStatus::Published);
        assert_eq!(
            lifecycle_events(Some(&before), &after),
            vec![events::POST_PUBLISHED]
        );
    }

    #[test]
    fn leaving_published_emits_unpublished() {
        let before = post(PostStatus::Published);
        assert_eq!(
            lifecycle_events(Some(&before), &post(PostStatus::Archived)),
            vec![events::POST_UNPUBLISHED]
        );
        assert_eq!(
            lifecycle_events(Some(&before), &post(PostStatus::Draft)),
            vec![events::POST_UNPUBLISHED]
        );
    }

    #[test]
    fn unchanged_status_emits_nothing() {
        let published = post(PostStatus::Published);
        assert!(lifecycle_events(Some(&published), &published).is_empty());
        let draft = post(PostStatus::Draft);
        assert!(lifecycle_events(Some(&draft), &draft).is_empty());
    }

    #[test]
    fn created_published_emits_published() {
        assert_eq!(
            lifecycle_events(None, &post(PostStatus::Published)),
            vec![events::POST_PUBLISHED]
        );
        assert!(lifecycle_events(None, &post(PostStatus::Draft)).is_empty());
    }

    #[test]
    fn taxonomy_follows_published_set() {
        let draft = post(PostStatus::Draft);
        let published = post(PostStatus::Published);
        assert!(affects_taxonomy(&[events::POST_UPDATED, events::POST_PUBLISHED], &published));
        assert!(affects_taxonomy(&[events::POST_UNPUBLISHED], &draft));
        assert!(affects_taxonomy(&[events::POST_DELETED], &published));
        assert!(!affects_taxonomy(&[events::POST_DELETED], &draft));
        assert!(!affects_taxonomy(&[events::POST_UPDATED], &published));
    }

    #[test]
    fn event_data_carries_identity() {
        let data = post_event_data(&post(PostStatus::Draft));
        assert_eq!(data["id"], 1);
        assert_eq!(data["slug"], "hello");
        assert_eq!(data["status"], "draft");
    }
}
