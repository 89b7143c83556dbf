//! Database Rules client tests against a mock database endpoint.

use std::sync::Arc;

use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fbrules_client::transport::CLIENT_VERSION;
use fbrules_client::{
    DatabaseRulesClient, ErrorCodes, RulesConfig, RulesError, StaticToken, TransportError,
};

const RULES_PATH: &str = "/.settings/rules.json";
const RULES: &str = r#"{"rules": {".read": true, ".write": false}}"#;

fn client_for(server: &MockServer) -> DatabaseRulesClient {
    let config = RulesConfig::default().with_database_url(server.uri());
    DatabaseRulesClient::new(&config, Arc::new(StaticToken::new("owner"))).unwrap()
}

#[tokio::test]
async fn test_get_rules_returns_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .and(header("Authorization", "Bearer owner"))
        .and(header("X-Client-Version", CLIENT_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_string(RULES))
        .expect(1)
        .mount(&server)
        .await;

    let rules = client_for(&server).get_rules().await.unwrap();
    assert_eq!(rules, RULES);
}

#[tokio::test]
async fn test_set_rules_puts_content_verbatim() {
    let server = MockServer::start().await;
    // Comments are valid in database rules; the body must not be re-encoded.
    let content = "{\n  // comment\n  \"rules\": {}\n}";
    Mock::given(method("PUT"))
        .and(path(RULES_PATH))
        .and(body_string(content))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).set_rules(content).await.unwrap();
}

#[tokio::test]
async fn test_get_rules_maps_known_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized request."))
        .mount(&server)
        .await;

    let err = client_for(&server).get_rules().await.unwrap_err();
    assert_eq!(err.to_string(), "Get Database rules: Request not authorized.");
    assert_eq!(err.http_status(), Some(401));
    match err.detail() {
        Some(TransportError::Status { body, .. }) => assert_eq!(body, "Unauthorized request."),
        other => panic!("unexpected detail: {:?}", other),
    }
}

#[tokio::test]
async fn test_set_rules_maps_locked_database() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(423))
        .mount(&server)
        .await;

    let err = client_for(&server).set_rules(RULES).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Set Database rules: The database has been manually locked by an owner."
    );
}

#[tokio::test]
async fn test_unmapped_status_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client_for(&server).get_rules().await.unwrap_err();
    assert_eq!(err.to_string(), "Get Database rules: Error 429.");
}

#[tokio::test]
async fn test_emulator_namespace_sent_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .and(query_param("ns", "my-db"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RULES))
        .expect(1)
        .mount(&server)
        .await;

    let config = RulesConfig::default().with_database_url(format!("{}?ns=my-db", server.uri()));
    let client = DatabaseRulesClient::new(&config, Arc::new(StaticToken::new("owner"))).unwrap();
    assert_eq!(client.get_rules().await.unwrap(), RULES);
}

#[tokio::test]
async fn test_custom_error_codes() {
    static LOCKED_ONLY: &[(u16, &str)] = &[(423, "Locked for maintenance.")];

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(423))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server).with_error_codes(ErrorCodes::new(LOCKED_ONLY));
    assert_eq!(
        client.get_rules().await.unwrap_err().to_string(),
        "Get Database rules: Locked for maintenance."
    );
    assert_eq!(
        client.set_rules(RULES).await.unwrap_err().to_string(),
        "Set Database rules: Error 401."
    );
}

#[tokio::test]
async fn test_network_failure_is_api_call_error() {
    // Reserve a port and release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = RulesConfig::default().with_database_url(format!("http://127.0.0.1:{}", port));
    let client = DatabaseRulesClient::new(&config, Arc::new(StaticToken::new("owner"))).unwrap();

    let err = client.get_rules().await.unwrap_err();
    assert!(matches!(err, RulesError::ApiCall { .. }));
    assert!(err.to_string().starts_with("Get Database rules: Network error"));
    assert_eq!(err.http_status(), None);
}
