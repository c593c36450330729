//! Tests for the transport layer: outcome normalization, the fixed
//! browser-shaped header set, and the close lifecycle.

use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deepwiki::transport::{Transport, TransportFailure};

// ---------------------------------------------------------------------------
// Outcome normalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_with_json_body_yields_parsed_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queries": []})))
        .mount(&server)
        .await;

    let transport = Transport::new();
    let url = format!("{}/query/abc", server.uri());
    let outcome = transport.request(Method::GET, &url, None).await;

    assert!(outcome.ok);
    assert_eq!(outcome.status, Some(200));
    assert!(outcome.error.is_none());
    assert_eq!(outcome.data, Some(json!({"queries": []})));
}

#[tokio::test]
async fn non_2xx_yields_http_failure_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let transport = Transport::new();
    let outcome = transport.request(Method::GET, &server.uri(), None).await;

    assert!(!outcome.ok);
    assert_eq!(outcome.status, Some(503));
    assert_eq!(outcome.error, Some(TransportFailure::Http));
    assert!(outcome.data.is_none());
}

#[tokio::test]
async fn non_json_2xx_body_is_success_without_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let transport = Transport::new();
    let outcome = transport.request(Method::GET, &server.uri(), None).await;

    // Leniency: transport success does not guarantee parseable content.
    assert!(outcome.ok);
    assert_eq!(outcome.status, Some(200));
    assert!(outcome.error.is_none());
    assert!(outcome.data.is_none());
}

#[tokio::test]
async fn connection_failure_yields_client_failure() {
    // Bind to a kernel-assigned port, then drop the listener so nothing
    // serves the address and the connection is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = Transport::new();
    let url = format!("http://{addr}/query/abc");
    let outcome = transport.request(Method::GET, &url, None).await;

    assert!(!outcome.ok);
    assert_eq!(outcome.status, None);
    assert_eq!(outcome.error, Some(TransportFailure::Client));
    assert!(outcome.data.is_none());
}

// ---------------------------------------------------------------------------
// Fixed headers and request bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_request_carries_the_browser_header_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true})))
        .mount(&server)
        .await;

    let transport = Transport::new();
    let body = json!({"probe": 1});
    let outcome = transport
        .request(Method::POST, &server.uri(), Some(&body))
        .await;
    assert!(outcome.ok);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;

    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    assert_eq!(get("accept"), "*/*");
    assert_eq!(get("content-type"), "application/json");
    assert_eq!(get("origin"), "https://deepwiki.com/");
    assert_eq!(get("referer"), "https://deepwiki.com/");
    assert!(get("user-agent").contains("Chrome/"));
}

#[tokio::test]
async fn post_body_is_sent_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"query_id": "qid-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new();
    let body = json!({"query_id": "qid-1", "user_query": "hello"});
    let outcome = transport
        .request(Method::POST, &server.uri(), Some(&body))
        .await;
    assert!(outcome.ok);
}

// ---------------------------------------------------------------------------
// Close lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_after_close_fails_without_touching_the_network() {
    let server = MockServer::start().await;

    let transport = Transport::new();
    transport.close();
    assert!(transport.is_closed());

    let outcome = transport.request(Method::GET, &server.uri(), None).await;
    assert!(!outcome.ok);
    assert_eq!(outcome.error, Some(TransportFailure::Closed));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn close_is_idempotent() {
    let transport = Transport::new();
    transport.close();
    transport.close();
    assert!(transport.is_closed());
}
