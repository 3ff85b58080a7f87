//! Tests for the reqwest transport against a mock HTTP receiver.

use std::time::Duration;

use folio_core::webhooks::{
    compute_signature, verify_signature, HEADER_EVENT, HEADER_SIGNATURE,
    RESPONSE_SNIPPET_MAX_BYTES,
};
use folio_events::{OutboundRequest, ReqwestTransport, WebhookError, WebhookTransport};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_request(url: String, body: &[u8]) -> OutboundRequest {
    OutboundRequest {
        url,
        body: body.to_vec(),
        headers: vec![
            (HEADER_SIGNATURE, compute_signature("secret", body)),
            (HEADER_EVENT, "post.updated".to_string()),
        ],
    }
}

#[tokio::test]
async fn sends_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .and(header("x-webhook-event", "post.updated"))
        .and(header_exists("x-webhook-signature"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .expect(1)
        .mount(&server)
        .await;

    let body = br#"{"event":"post.updated","data":{},"timestamp":1}"#;
    let transport = ReqwestTransport::new(Duration::from_secs(5));
    let response = transport
        .send(&signed_request(format!("{}/hook", server.uri()), body))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "thanks");

    let received = server.received_requests().await.unwrap();
    let request = &received[0];
    assert_eq!(request.body, body.to_vec());
    let signature = request.headers.get("x-webhook-signature").unwrap().to_str().unwrap();
    assert!(verify_signature("secret", &request.body, signature));
}

#[tokio::test]
async fn error_statuses_are_responses_not_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Duration::from_secs(5));
    let response = transport
        .send(&signed_request(server.uri(), b"{}"))
        .await
        .unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.body, "busy");
}

#[tokio::test]
async fn slow_receiver_times_out_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Duration::from_millis(200));
    let err = transport
        .send(&signed_request(server.uri(), b"{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::Transient(ref msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn large_response_body_is_read_only_up_to_the_snippet_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(1024 * 1024)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Duration::from_secs(5));
    let response = transport
        .send(&signed_request(server.uri(), b"{}"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.len() <= RESPONSE_SNIPPET_MAX_BYTES + 3);
    assert!(response.body.len() >= RESPONSE_SNIPPET_MAX_BYTES);
    assert!(response.body.chars().all(|c| c == 'x'));
}
