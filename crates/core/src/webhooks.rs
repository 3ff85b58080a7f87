//! Webhook event names, HMAC signing, and the delivery state machine.
//!
//! Everything here is pure so the dispatcher, the repositories, and the
//! handlers agree on how an HTTP outcome moves a delivery between
//! `pending`, `retry_scheduled`, `delivered`, and `exhausted`.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::types::EpochSecs;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Attempts made for a delivery before it is exhausted.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Per-attempt HTTP timeout in seconds.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Seconds to wait after attempt N fails (index N-1). The last value repeats.
pub const RETRY_SCHEDULE_SECS: [i64; 5] = [1, 5, 30, 120, 600];

/// Response bodies are stored up to this many bytes.
pub const RESPONSE_SNIPPET_MAX_BYTES: usize = 1024;

/// How long a claimed delivery is hidden from other workers. Must exceed the
/// attempt timeout so a slow attempt is never picked up twice.
pub const CLAIM_LEASE_SECS: i64 = 60;

/// Length of generated signing secrets.
pub const SECRET_LENGTH: usize = 32;

/// Subscribing to this matches every event.
pub const WILDCARD_EVENT: &str = "*";

pub const HEADER_SIGNATURE: &str = "X-Webhook-Signature";
pub const HEADER_EVENT: &str = "X-Webhook-Event";
pub const HEADER_DELIVERY: &str = "X-Webhook-Delivery";

/// Event type names emitted by the post write path.
pub mod events {
    pub const POST_CREATED: &str = "post.created";
    pub const POST_UPDATED: &str = "post.updated";
    pub const POST_DELETED: &str = "post.deleted";
    pub const POST_PUBLISHED: &str = "post.published";
    pub const POST_UNPUBLISHED: &str = "post.unpublished";
    pub const POST_RESTORED: &str = "post.restored";
    pub const WEBHOOK_TEST: &str = "webhook.test";

    pub const ALL: &[&str] = &[
        POST_CREATED,
        POST_UPDATED,
        POST_DELETED,
        POST_PUBLISHED,
        POST_UNPUBLISHED,
        POST_RESTORED,
        WEBHOOK_TEST,
    ];
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Whether an endpoint subscribed to `subscribed` should receive `event_type`.
pub fn subscribes_to(subscribed: &[String], event_type: &str) -> bool {
    subscribed
        .iter()
        .any(|e| e == event_type || e == WILDCARD_EVENT)
}

pub fn validate_event_types(subscribed: &[String]) -> Result<(), String> {
    if subscribed.is_empty() {
        return Err("At least one event type is required".to_string());
    }
    for event in subscribed {
        if event != WILDCARD_EVENT && !events::ALL.contains(&event.as_str()) {
            return Err(format!(
                "Unknown event type '{event}'. Must be one of: {}, or '*'",
                events::ALL.join(", ")
            ));
        }
    }
    Ok(())
}

pub fn validate_webhook_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("Webhook URL must not be empty".to_string());
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err("Webhook URL must start with http:// or https://".to_string());
    }
    if url.len() > 2048 {
        return Err("Webhook URL must be at most 2048 characters".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of the exact request body, hex-encoded in lowercase.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a received signature against the body.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Generate a random alphanumeric signing secret.
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The JSON body POSTed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: EpochSecs,
}

// ---------------------------------------------------------------------------
// Delivery state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    RetryScheduled,
    Exhausted,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::RetryScheduled => "retry_scheduled",
            DeliveryStatus::Exhausted => "exhausted",
        }
    }

    /// Terminal deliveries are never attempted again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Exhausted)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "retry_scheduled" => Ok(DeliveryStatus::RetryScheduled),
            "exhausted" => Ok(DeliveryStatus::Exhausted),
            other => Err(format!("Invalid delivery status '{other}'")),
        }
    }
}

/// How a single HTTP attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Worth retrying: 5xx, 408, 425, 429, timeouts, connection errors.
    Retryable,
    /// The receiver rejected the request; retrying will not help.
    Permanent,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> AttemptOutcome {
    match status {
        200..=299 => AttemptOutcome::Success,
        408 | 425 | 429 => AttemptOutcome::Retryable,
        400..=499 => AttemptOutcome::Permanent,
        _ => AttemptOutcome::Retryable,
    }
}

/// Delay before the next try after `attempt_number` attempts have failed.
pub fn retry_delay_secs(attempt_number: i32) -> i64 {
    let idx = (attempt_number.max(1) - 1) as usize;
    RETRY_SCHEDULE_SECS[idx.min(RETRY_SCHEDULE_SECS.len() - 1)]
}

/// Where a delivery goes after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: DeliveryStatus,
    /// Set only when another attempt is scheduled.
    pub next_retry_at: Option<EpochSecs>,
}

/// Apply the outcome of attempt number `attempt_number` (1-based).
pub fn next_transition(
    outcome: AttemptOutcome,
    attempt_number: i32,
    max_attempts: i32,
    now: EpochSecs,
) -> Transition {
    match outcome {
        AttemptOutcome::Success => Transition {
            status: DeliveryStatus::Delivered,
            next_retry_at: None,
        },
        AttemptOutcome::Permanent => Transition {
            status: DeliveryStatus::Exhausted,
            next_retry_at: None,
        },
        AttemptOutcome::Retryable if attempt_number >= max_attempts => Transition {
            status: DeliveryStatus::Exhausted,
            next_retry_at: None,
        },
        AttemptOutcome::Retryable => Transition {
            status: DeliveryStatus::RetryScheduled,
            next_retry_at: Some(now + retry_delay_secs(attempt_number)),
        },
    }
}

/// Truncate a response body to at most `max_bytes` without splitting a char.
pub fn truncate_snippet(body: &str, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body.to_string();
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

pub fn validate_max_attempts(max_attempts: i32) -> Result<(), String> {
    if !(1..=20).contains(&max_attempts) {
        return Err(format!(
            "max_attempts must be between 1 and 20, got {max_attempts}"
        ));
    }
    Ok(())
}

/// The attempt timeout must be at least a second and end before the claim
/// lease does.
pub fn validate_attempt_timeout(timeout_secs: u64) -> Result<(), String> {
    let lease = CLAIM_LEASE_SECS.unsigned_abs();
    if timeout_secs == 0 || timeout_secs >= lease {
        return Err(format!(
            "attempt timeout must be between 1 and {} seconds, got {timeout_secs}",
            lease - 1
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Subscriptions -----------------------------------------------------

    #[test]
    fn exact_and_wildcard_subscriptions_match() {
        let subs = vec!["post.updated".to_string()];
        assert!(subscribes_to(&subs, "post.updated"));
        assert!(!subscribes_to(&subs, "post.deleted"));
        assert!(subscribes_to(&["*".to_string()], "post.deleted"));
        assert!(!subscribes_to(&[], "post.updated"));
    }

    #[test]
    fn event_type_validation() {
        assert!(validate_event_types(&["post.created".into(), "*".into()]).is_ok());
        assert!(validate_event_types(&[]).is_err());
        assert!(validate_event_types(&["post.exploded".into()]).is_err());
    }

    #[test]
    fn url_validation() {
        assert!(validate_webhook_url("https://hooks.example.com/x").is_ok());
        assert!(validate_webhook_url("ftp://example.com").is_err());
        assert!(validate_webhook_url("").is_err());
    }

    // -- Signing -----------------------------------------------------------

    #[test]
    fn signature_is_lowercase_hex() {
        let sig = compute_signature("secret", br#"{"event":"post.updated"}"#);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn signature_matches_known_vector() {
        // RFC 4231 test case 2.
        let sig = compute_signature("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verify_accepts_own_signature_only() {
        let body = b"payload";
        let sig = compute_signature("s3cret", body);
        assert!(verify_signature("s3cret", body, &sig));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature("s3cret", b"payload2", &sig));
        assert!(!verify_signature("s3cret", body, "not-hex"));
    }

    #[test]
    fn generated_secrets_differ() {
        let a = generate_secret();
        assert_eq!(a.len(), SECRET_LENGTH);
        assert_ne!(a, generate_secret());
    }

    // -- Classification ----------------------------------------------------

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(200), AttemptOutcome::Success);
        assert_eq!(classify_status(204), AttemptOutcome::Success);
        assert_eq!(classify_status(500), AttemptOutcome::Retryable);
        assert_eq!(classify_status(503), AttemptOutcome::Retryable);
        assert_eq!(classify_status(429), AttemptOutcome::Retryable);
        assert_eq!(classify_status(408), AttemptOutcome::Retryable);
        assert_eq!(classify_status(400), AttemptOutcome::Permanent);
        assert_eq!(classify_status(404), AttemptOutcome::Permanent);
        assert_eq!(classify_status(410), AttemptOutcome::Permanent);
    }

    // -- Backoff -----------------------------------------------------------

    #[test]
    fn backoff_follows_schedule_then_repeats() {
        assert_eq!(retry_delay_secs(1), 1);
        assert_eq!(retry_delay_secs(2), 5);
        assert_eq!(retry_delay_secs(3), 30);
        assert_eq!(retry_delay_secs(4), 120);
        assert_eq!(retry_delay_secs(5), 600);
        assert_eq!(retry_delay_secs(9), 600);
        assert_eq!(retry_delay_secs(0), 1);
    }

    // -- Transitions -------------------------------------------------------

    #[test]
    fn success_is_delivered() {
        let t = next_transition(AttemptOutcome::Success, 3, 5, 100);
        assert_eq!(t.status, DeliveryStatus::Delivered);
        assert_eq!(t.next_retry_at, None);
    }

    #[test]
    fn retryable_schedules_until_max() {
        let t = next_transition(AttemptOutcome::Retryable, 1, 5, 100);
        assert_eq!(t.status, DeliveryStatus::RetryScheduled);
        assert_eq!(t.next_retry_at, Some(101));

        let t = next_transition(AttemptOutcome::Retryable, 5, 5, 100);
        assert_eq!(t.status, DeliveryStatus::Exhausted);
        assert_eq!(t.next_retry_at, None);
    }

    #[test]
    fn permanent_exhausts_immediately() {
        let t = next_transition(AttemptOutcome::Permanent, 1, 5, 100);
        assert_eq!(t.status, DeliveryStatus::Exhausted);
    }

    #[test]
    fn terminal_states() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Exhausted.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::RetryScheduled.is_terminal());
    }

    #[test]
    fn delivery_status_parses() {
        assert_eq!(
            "retry_scheduled".parse::<DeliveryStatus>().unwrap(),
            DeliveryStatus::RetryScheduled
        );
        assert!("failed".parse::<DeliveryStatus>().is_err());
    }

    // -- Snippets ----------------------------------------------------------

    #[test]
    fn snippet_truncates_on_char_boundary() {
        assert_eq!(truncate_snippet("short", 1024), "short");
        let long = "a".repeat(2000);
        assert_eq!(truncate_snippet(&long, 1024).len(), 1024);
        // 'é' is two bytes; cutting at 3 would split the second one.
        assert_eq!(truncate_snippet("éé", 3), "é");
    }

    #[test]
    fn payload_shape() {
        let payload = WebhookPayload {
            event: "post.updated".into(),
            data: serde_json::json!({"id": 1}),
            timestamp: 1_700_000_000,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["event"], "post.updated");
        assert_eq!(v["data"]["id"], 1);
        assert_eq!(v["timestamp"], 1_700_000_000);
    }

    #[test]
    fn attempt_timeout_must_end_inside_the_lease() {
        assert!(validate_attempt_timeout(DEFAULT_ATTEMPT_TIMEOUT_SECS).is_ok());
        assert!(validate_attempt_timeout(59).is_ok());
        assert!(validate_attempt_timeout(0).is_err());
        assert!(validate_attempt_timeout(60).is_err());
        assert!(validate_attempt_timeout(120).is_err());
    }
}
