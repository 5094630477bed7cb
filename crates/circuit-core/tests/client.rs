//! End-to-end tests of `CircuitClient` against a mock Circuit server.
//!
//! The client is blocking, so every client call runs on a
//! `spawn_blocking` thread while the mock server lives on the test runtime.

use circuit_core::{CircuitClient, CircuitError, ClientConfig, MessageOptions, Protocol};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.address().to_string())
        .with_protocol(Protocol::Http)
        .with_credentials("abc", "def")
}

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task panicked")
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn list_conversations_sends_bearer_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/conversations"))
        .and(header("authorization", "Bearer tok123"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"topic": "A", "convId": "1"},
            {"topic": "B", "convId": "2", "type": "GROUP"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let conversations = blocking(move || CircuitClient::new(config).list_conversations())
        .await
        .expect("list conversations");

    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].conv_id, "1");
    assert_eq!(conversations[0].topic.as_deref(), Some("A"));
    assert_eq!(conversations[1].conversation_type.as_deref(), Some("GROUP"));

    let requests = server.received_requests().await.expect("recorded requests");
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == "/oauth/token")
        .expect("token request");
    let form = String::from_utf8_lossy(&token_request.body);
    assert!(form.contains("client_id=abc"), "{form}");
    assert!(form.contains("client_secret=def"), "{form}");
    assert!(form.contains("scope=ALL"), "{form}");
    assert!(
        token_request
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn token_is_fetched_once_per_client() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let config = config_for(&server);
    blocking(move || {
        let client = CircuitClient::new(config);
        for _ in 0..3 {
            client.list_conversations().expect("list conversations");
        }
        assert_eq!(client.access_token().expect("cached token"), "tok123");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn configured_scope_is_requested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("scope=READ_CONVERSATIONS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_auth_scope("READ_CONVERSATIONS");
    let token = blocking(move || {
        CircuitClient::new(config)
            .auth_client_credentials()
            .expect("token")
    })
    .await;
    assert_eq!(token, "t");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_message_posts_json_to_conversation() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/conv1/messages"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"content": "hello", "subject": "Today"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itemId": "item-1",
            "convId": "conv1",
            "type": "TEXT",
            "text": {"content": "hello", "subject": "Today"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let item = blocking(move || {
        CircuitClient::new(config).create_message(
            "conv1",
            "hello",
            &MessageOptions::new().with_subject("Today"),
        )
    })
    .await
    .expect("create message");

    assert_eq!(item.item_id, "item-1");
    assert_eq!(
        item.text.and_then(|t| t.subject).as_deref(),
        Some("Today")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_message_with_item_id_edits_in_place() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/conv1/messages/X"))
        .and(body_json(json!({"content": "edited"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"itemId": "X"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let item = blocking(move || {
        CircuitClient::new(config).create_message(
            "conv1",
            "edited",
            &MessageOptions::new().with_item_id("X"),
        )
    })
    .await
    .expect("edit message");
    assert_eq!(item.item_id, "X");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_group_and_direct_conversations() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/group"))
        .and(body_json(json!({"participants": ["a@example.com", "u2"], "topic": "Release"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "convId": "g1", "type": "GROUP", "topic": "Release"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/direct"))
        .and(body_json(json!({"participant": "b@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "convId": "d1", "type": "DIRECT"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (group, direct) = blocking(move || {
        let client = CircuitClient::new(config);
        let participants = vec!["a@example.com".to_string(), "u2".to_string()];
        let group = client
            .create_group_conversation(&participants, "Release")
            .expect("group");
        let direct = client
            .create_direct_conversation("b@example.com")
            .expect("direct");
        (group, direct)
    })
    .await;

    assert_eq!(group.conv_id, "g1");
    assert_eq!(direct.conv_id, "d1");
}

#[tokio::test(flavor = "multi_thread")]
async fn leave_group_conversation_removes_current_user_once_profiled() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "me-1", "displayName": "Me"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v2/conversations/group/conv1/participants"))
        .and(query_param("participants[]", "me-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "convId": "conv1", "participants": ["other"]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(&server);
    blocking(move || {
        let client = CircuitClient::new(config);
        let conv = client.leave_group_conversation("conv1").expect("leave");
        assert_eq!(conv.participants, vec!["other"]);
        client.leave_group_conversation("conv1").expect("leave again");
    })
    .await;

    let requests = server.received_requests().await.expect("recorded requests");
    for request in requests.iter().filter(|r| r.method.as_str() == "DELETE") {
        let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("participants[]".to_string(), "me-1".to_string())]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn user_lookups_hit_user_paths() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/users/u42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "u42", "emailAddress": "u42@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/users/u42/presence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "u42", "state": "AVAILABLE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (user, presence) = blocking(move || {
        let client = CircuitClient::new(config);
        (
            client.get_users("u42").expect("user"),
            client.get_users_presence("u42").expect("presence"),
        )
    })
    .await;

    assert_eq!(user.email_address.as_deref(), Some("u42@example.com"));
    assert_eq!(presence.state.as_deref(), Some("AVAILABLE"));
}

#[tokio::test(flavor = "multi_thread")]
async fn json_client_error_is_typed() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/conv1/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_raw(
            r#"{"errorCode":"NOT_PERMITTED","errorDescription":"bad thing"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || {
        CircuitClient::new(config).create_message("conv1", "hi", &MessageOptions::new())
    })
    .await
    .expect_err("should fail");

    assert!(err.is_client_error(), "{err:?}");
    let message = err.to_string();
    assert!(message.contains("bad thing"), "{message}");
    assert!(message.contains("403"), "{message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_client_error_reports_status() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/conversations"))
        .respond_with(ResponseTemplate::new(400).set_body_raw("{oops", "application/json"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || CircuitClient::new(config).list_conversations())
        .await
        .expect_err("should fail");

    assert!(err.is_client_error(), "{err:?}");
    assert_eq!(
        err.to_string(),
        "server response with status 400 and malformed JSON"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_client_error_is_generic() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/users/profile"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("not here", "text/plain"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || CircuitClient::new(config).get_user_profile())
        .await
        .expect_err("should fail");

    assert!(!err.is_client_error());
    assert!(matches!(err, CircuitError::Http { status: 404, ref body, .. } if body == "not here"));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_generic_even_with_json() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v2/conversations"))
        .respond_with(ResponseTemplate::new(503).set_body_raw(
            r#"{"errorDescription":"maintenance"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || CircuitClient::new(config).list_conversations())
        .await
        .expect_err("should fail");

    assert!(err.is_transport_error(), "{err:?}");
    assert_eq!(err.status(), Some(503));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_surface_as_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_raw(
            r#"{"error":"invalid_client","errorDescription":"unknown client"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || CircuitClient::new(config).list_conversations())
        .await
        .expect_err("should fail");

    assert!(err.is_client_error(), "{err:?}");
    assert!(err.to_string().contains("unknown client"));
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1, "no API call after failed auth");
}

#[tokio::test(flavor = "multi_thread")]
async fn response_missing_required_field_is_decode_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v2/conversations/group"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topic": "no id"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = blocking(move || {
        CircuitClient::new(config).create_group_conversation(&["u1".to_string()], "no id")
    })
    .await
    .expect_err("should fail");

    assert!(matches!(err, CircuitError::Decode { .. }), "{err:?}");
    assert!(
        err.to_string()
            .starts_with("decoding POST /conversations/group response"),
        "{err}"
    );
    assert!(!err.is_transport_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_auth_method_makes_no_request() {
    let server = MockServer::start().await;

    let config =
        config_for(&server).with_auth_method(circuit_core::AuthMethod::Other("saml".to_string()));
    let err = blocking(move || CircuitClient::new(config).list_conversations())
        .await
        .expect_err("should fail");

    assert!(err.is_config_error(), "{err:?}");
    let requests = server.received_requests().await.expect("recorded requests");
    assert!(requests.is_empty());
}
