#![allow(clippy::unwrap_used)]
// Integration tests for `SmartCocoonClient` using wiremock.

use pretty_assertions::assert_eq;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use smartcocoon_api::{
    ApiRequest, ClientConfig, Error, FanKey, FanMode, LoginOutcome, SmartCocoonClient,
    UpdateOutcome,
};

const ROOMS_FILTER: &str = "filter[thermostat][client_system_id]";

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: Url::parse(&format!("{}/api", server.uri())).unwrap(),
        ..ClientConfig::default()
    }
}

async fn setup() -> (MockServer, SmartCocoonClient) {
    let server = MockServer::start().await;
    let client = SmartCocoonClient::with_client(reqwest::Client::new(), config_for(&server));
    (server, client)
}

/// 200 carrying a fresh token triple.
fn ok(body: Value, token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("access-token", token)
        .insert_header("client", "client-1")
        .insert_header("uid", "user@example.com")
        .set_body_json(body)
}

fn api_error(status: u16, name: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": { "statusCode": status, "name": name, "message": message }
    }))
}

fn invalid_token() -> ResponseTemplate {
    api_error(401, "Unauthorized", "Invalid Access Token")
}

fn password() -> SecretString {
    SecretString::from("hunter2".to_string())
}

fn sign_in_request() -> MockBuilder {
    Mock::given(method("POST")).and(path("/api/auth/sign_in"))
}

fn sign_in(token: &str) -> Mock {
    sign_in_request().respond_with(ok(json!({ "data": { "id": 42 } }), token))
}

async fn login(client: &SmartCocoonClient) {
    let outcome = client.login("user@example.com", &password()).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Success);
}

fn systems_body() -> Value {
    json!({
        "client_systems": [
            { "id": 1, "name": "Home", "location": { "city": "Austin", "state": "TX" } },
            { "id": 2, "name": "Cabin", "location": { "postal_code": "78701" } }
        ]
    })
}

fn rooms_body(system_id: i64) -> Value {
    json!({
        "rooms": [{
            "id": system_id * 10,
            "name": "Office",
            "fans": [{ "id": system_id * 100, "fan_id": format!("SC-{system_id}"), "power": 5000, "connected": true }]
        }]
    })
}

async fn mount_hierarchy(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(ok(systems_body(), "token-1"))
        .mount(server)
        .await;
    for id in [1, 2] {
        Mock::given(method("GET"))
            .and(path("/api/rooms"))
            .and(query_param(ROOMS_FILTER, id.to_string()))
            .respond_with(ok(rooms_body(id), "token-1"))
            .mount(server)
            .await;
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_stores_tokens_and_user() {
    let (server, client) = setup().await;

    sign_in_request()
        .and(body_json(json!({ "email": "user@example.com", "password": "hunter2" })))
        .respond_with(ok(json!({ "data": { "id": 42 } }), "token-1"))
        .expect(1)
        .mount(&server)
        .await;

    login(&client).await;

    let tokens = client.tokens().await.unwrap();
    assert_eq!(tokens.access_token.expose_secret(), "token-1");
    assert_eq!(tokens.client, "client-1");
    assert_eq!(tokens.uid, "user@example.com");
    assert_eq!(client.user_id().await, Some(42));
}

#[tokio::test]
async fn test_login_classified_failures() {
    let cases = [
        (api_error(401, "Unauthorized", "Login Failed"), LoginOutcome::Failed),
        (api_error(403, "Forbidden", "Too many failed attempts"), LoginOutcome::TooManyAttempts),
        (api_error(500, "InternalError", "boom"), LoginOutcome::Failed),
    ];

    for (response, expected) in cases {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign_in"))
            .respond_with(response)
            .mount(&server)
            .await;

        let outcome = client.login("user@example.com", &password()).await.unwrap();
        assert_eq!(outcome, expected);
        assert!(client.tokens().await.is_none());
    }
}

#[tokio::test]
async fn test_login_unparseable_error_is_not_classified() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/sign_in"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let result = client.login("user@example.com", &password()).await;
    assert!(
        matches!(result, Err(Error::UnexpectedResponse { status: 502, .. })),
        "expected UnexpectedResponse, got: {result:?}"
    );
}

// ── Token handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_tokens_are_sent_and_rotated() {
    let (server, client) = setup().await;
    sign_in("token-1").mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .and(header("access-token", "token-1"))
        .and(header("client", "client-1"))
        .and(header("uid", "user@example.com"))
        .respond_with(ok(json!({ "client_systems": [] }), "token-2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .and(header("access-token", "token-2"))
        .respond_with(ok(json!({ "client_systems": [] }), "token-3"))
        .expect(1)
        .mount(&server)
        .await;

    login(&client).await;
    client.call(ApiRequest::get("client_systems")).await.unwrap();
    client.call(ApiRequest::get("client_systems")).await.unwrap();

    let tokens = client.tokens().await.unwrap();
    assert_eq!(tokens.access_token.expose_secret(), "token-3");
}

#[tokio::test]
async fn test_preexisting_tokens_are_used() {
    let server = MockServer::start().await;
    let client = SmartCocoonClient::with_client(
        reqwest::Client::new(),
        ClientConfig {
            tokens: Some(smartcocoon_api::TokenSet::new("saved", "client-9", "me@example.com")),
            ..config_for(&server)
        },
    );

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .and(header("access-token", "saved"))
        .and(header("client", "client-9"))
        .respond_with(ok(json!({ "client_systems": [] }), "rotated"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.call(ApiRequest::get("client_systems")).await.unwrap();
    assert_eq!(body, Some(json!({ "client_systems": [] })));
}

#[tokio::test]
async fn test_expired_token_triggers_one_relogin_and_retry() {
    let (server, client) = setup().await;

    sign_in("token-1").up_to_n_times(1).expect(1).mount(&server).await;
    sign_in("token-2").expect(1).mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .and(header("access-token", "token-1"))
        .respond_with(invalid_token())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .and(header("access-token", "token-2"))
        .respond_with(ok(json!({ "client_systems": [{ "id": 1 }] }), "token-3"))
        .expect(1)
        .mount(&server)
        .await;

    login(&client).await;
    let body = client.call(ApiRequest::get("client_systems")).await.unwrap();

    assert_eq!(body, Some(json!({ "client_systems": [{ "id": 1 }] })));
    let tokens = client.tokens().await.unwrap();
    assert_eq!(tokens.access_token.expose_secret(), "token-3");
}

#[tokio::test]
async fn test_second_invalid_token_is_not_retried() {
    let (server, client) = setup().await;

    // Initial login plus exactly one silent re-login.
    sign_in("token-1").expect(2).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(invalid_token())
        .expect(2)
        .mount(&server)
        .await;

    login(&client).await;
    let err = client
        .call(ApiRequest::get("client_systems"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_token(), "expected invalid token error, got: {err:?}");
}

#[tokio::test]
async fn test_failed_silent_login_surfaces_original_error() {
    let (server, client) = setup().await;

    sign_in("token-1").up_to_n_times(1).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/sign_in"))
        .respond_with(api_error(401, "Unauthorized", "Login Failed"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(invalid_token())
        .expect(1)
        .mount(&server)
        .await;

    login(&client).await;
    let err = client
        .call(ApiRequest::get("client_systems"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_token(), "expected invalid token error, got: {err:?}");
}

#[tokio::test]
async fn test_malformed_silent_login_surfaces_original_error() {
    let (server, client) = setup().await;

    sign_in("token-1").up_to_n_times(1).mount(&server).await;
    sign_in_request()
        .respond_with(ok(json!({ "data": {} }), "token-2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(invalid_token())
        .mount(&server)
        .await;

    login(&client).await;
    let err = client
        .call(ApiRequest::get("client_systems"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_token(), "expected invalid token error, got: {err:?}");

    // The stale-cache downgrade still applies.
    let outcome = client.update(None).await.unwrap();
    match outcome {
        UpdateOutcome::Failed { error, previous } => {
            assert!(error.is_invalid_token(), "expected invalid token error, got: {error:?}");
            assert!(previous.is_empty());
        }
        UpdateOutcome::Refreshed(_) => panic!("expected a failed update"),
    }
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let (server, client) = setup().await;

    sign_in("token-1").expect(1).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(api_error(401, "Unauthorized", "Some Other Problem"))
        .expect(1)
        .mount(&server)
        .await;

    login(&client).await;
    let err = client
        .call(ApiRequest::get("client_systems"))
        .await
        .unwrap_err();

    assert_eq!(err.api_parts(), Some((401, "Unauthorized", "Some Other Problem")));
}

#[tokio::test]
async fn test_invalid_token_without_credentials_is_returned() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/sign_in"))
        .respond_with(ok(json!({ "data": { "id": 1 } }), "never"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(invalid_token())
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .call(ApiRequest::get("client_systems"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_token());
}

#[tokio::test]
async fn test_unsupported_method_is_a_noop() {
    let (server, client) = setup().await;

    let result = client
        .call(ApiRequest::new(Method::DELETE, "fans/1"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_builds_hierarchy() {
    let (server, client) = setup().await;
    mount_hierarchy(&server).await;

    let outcome = client.update(None).await.unwrap();
    assert!(outcome.is_refreshed());

    let systems = outcome.systems();
    assert_eq!(systems.len(), 2);
    assert_eq!(systems[0].name_location(), "Home (Austin, TX)");
    assert_eq!(systems[1].name_location(), "Cabin (78701)");

    let rooms = systems[1].rooms();
    assert_eq!(rooms[0].id(), Some(20));
    let fan = rooms[0].fans()[0];
    assert_eq!(fan.id(), Some(200));
    assert_eq!(fan.power_pct(), Some(50));
    assert_eq!(fan.fan_id_location(), "SC-2 (Office)");

    assert_eq!(client.systems(), systems.to_vec());
}

#[tokio::test]
async fn test_update_filters_target_systems() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(ok(systems_body(), "token-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param(ROOMS_FILTER, "2"))
        .respond_with(ok(rooms_body(2), "token-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param(ROOMS_FILTER, "1"))
        .respond_with(ok(rooms_body(1), "token-1"))
        .expect(0)
        .mount(&server)
        .await;

    let systems = client.update(Some(&[2])).await.unwrap().into_result().unwrap();
    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0].id(), Some(2));

    let key = FanKey {
        system_id: 2,
        room_id: 20,
        fan_id: 200,
    };
    assert_eq!(key.find(&systems).and_then(|f| f.fan_id()), Some("SC-2"));
}

#[tokio::test]
async fn test_update_failure_keeps_previous_systems() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(ok(systems_body(), "token-1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param(ROOMS_FILTER, "1"))
        .respond_with(ok(rooms_body(1), "token-1"))
        .mount(&server)
        .await;
    // System 2's rooms succeed once, then fail.
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param(ROOMS_FILTER, "2"))
        .respond_with(ok(rooms_body(2), "token-1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param(ROOMS_FILTER, "2"))
        .respond_with(api_error(500, "InternalError", "database unavailable"))
        .mount(&server)
        .await;

    let first = client.update(None).await.unwrap().into_result().unwrap();
    let before = client.systems();
    assert_eq!(before, first);

    let outcome = client.update(None).await.unwrap();
    match &outcome {
        UpdateOutcome::Failed { error, previous } => {
            assert_eq!(error.api_parts(), Some((500, "InternalError", "database unavailable")));
            assert_eq!(previous, &before);
        }
        UpdateOutcome::Refreshed(_) => panic!("expected a failed update"),
    }
    assert_eq!(client.systems(), before);
}

#[tokio::test]
async fn test_update_first_failure_yields_empty_previous() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(api_error(503, "ServiceUnavailable", "maintenance"))
        .mount(&server)
        .await;

    let outcome = client.update(None).await.unwrap();
    assert!(!outcome.is_refreshed());
    assert!(outcome.systems().is_empty());
    assert!(outcome.error().is_some());
}

#[tokio::test]
async fn test_update_malformed_listing_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(ok(json!({ "systems": [] }), "token-1"))
        .mount(&server)
        .await;

    let result = client.update(None).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

// ── Fan mutators ────────────────────────────────────────────────────

async fn fan_put(server: &MockServer, body: Value) {
    Mock::given(method("PUT"))
        .and(path("/api/fans/100"))
        .and(body_json(body))
        .respond_with(ok(json!({ "id": 100 }), "token-1"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_set_power_pct_sends_vendor_units() {
    let (server, client) = setup().await;
    mount_hierarchy(&server).await;
    fan_put(&server, json!({ "power": 10000 })).await;

    let systems = client.update(None).await.unwrap().into_result().unwrap();
    let fan = systems[0].fans()[0];
    let body = fan.set_power_pct(100).await.unwrap();

    assert_eq!(body, Some(json!({ "id": 100 })));
    // No optimistic update: the local fragment still says 50%.
    assert_eq!(fan.power_pct(), Some(50));
}

#[tokio::test]
async fn test_set_speed_level_pct_maps_label() {
    let (server, client) = setup().await;
    mount_hierarchy(&server).await;
    fan_put(&server, json!({ "speed_level": 4 })).await;

    let systems = client.update(None).await.unwrap().into_result().unwrap();
    let fan = systems[0].fans()[0];
    fan.set_speed_level_pct("33_pct").await.unwrap();
    assert!(fan.set_speed_level_pct("34_pct").await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_mode_sends_literal() {
    for mode in FanMode::options() {
        let (server, client) = setup().await;
        mount_hierarchy(&server).await;
        fan_put(&server, json!({ "mode": mode })).await;

        let systems = client.update(None).await.unwrap().into_result().unwrap();
        let fan = systems[0].fans()[0];
        fan.set_mode(mode).await.unwrap();
        assert!(fan.set_mode("turbo").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_turn_on_with_power_is_one_call() {
    let (server, client) = setup().await;
    mount_hierarchy(&server).await;
    fan_put(&server, json!({ "mode": "always_on", "power": 2500 })).await;
    fan_put(&server, json!({ "mode": "eco" })).await;

    let systems = client.update(None).await.unwrap().into_result().unwrap();
    let fan = systems[0].fans()[0];
    fan.turn_on(None, Some(25)).await.unwrap();
    fan.turn_on(Some(FanMode::Eco), None).await.unwrap();
}

#[tokio::test]
async fn test_turn_off_auto_eco() {
    let (server, client) = setup().await;
    mount_hierarchy(&server).await;
    fan_put(&server, json!({ "mode": "always_off" })).await;
    fan_put(&server, json!({ "mode": "auto" })).await;
    fan_put(&server, json!({ "mode": "eco" })).await;

    let systems = client.update(None).await.unwrap().into_result().unwrap();
    let fan = systems[0].fans()[0];
    fan.turn_off().await.unwrap();
    fan.set_auto().await.unwrap();
    fan.set_eco().await.unwrap();
}

// ── Persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_responses_are_persisted_by_path() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("responses");
    let client = SmartCocoonClient::with_client(
        reqwest::Client::new(),
        ClientConfig {
            save_location: Some(dir.clone()),
            ..config_for(&server)
        },
    );

    Mock::given(method("GET"))
        .and(path("/api/a/b.c"))
        .respond_with(ok(json!({ "b": 2, "a": 1 }), "token-1"))
        .mount(&server)
        .await;

    client.call(ApiRequest::get("a/b.c")).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["a_b_c.json".to_string()]);

    let text = std::fs::read_to_string(dir.join("a_b_c.json")).unwrap();
    assert_eq!(text, "{\n    \"a\": 1,\n    \"b\": 2\n}");
}

#[tokio::test]
async fn test_failed_responses_are_not_persisted() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("responses");
    let client = SmartCocoonClient::with_client(
        reqwest::Client::new(),
        ClientConfig {
            save_location: Some(dir.clone()),
            ..config_for(&server)
        },
    );

    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(api_error(500, "InternalError", "boom"))
        .mount(&server)
        .await;

    assert!(client.call(ApiRequest::get("client_systems")).await.is_err());
    assert!(!dir.exists());
}
