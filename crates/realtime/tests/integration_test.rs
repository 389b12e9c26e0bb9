use lostfound_realtime::{RealtimeError, RealtimeStore, RestStore, StorePath};
use reqwest::Client;
use serde_json::{json, Map};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> RestStore {
    RestStore::new(&server.uri(), Client::new()).expect("valid mock URL")
}

fn p(path: &str) -> StorePath {
    StorePath::parse(path).unwrap()
}

#[tokio::test]
async fn test_push_returns_assigned_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items.json"))
        .and(body_json(json!({"title": "Wallet"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-NkeyA"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let key = store.push(&p("items"), json!({"title": "Wallet"})).await.unwrap();
    assert_eq!(key, "-NkeyA");
}

#[tokio::test]
async fn test_update_patches_named_fields_with_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/items/abc123.json"))
        .and(query_param("auth", "id-token"))
        .and(body_json(json!({"status_id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status_id": 2})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    store.set_auth(Some("id-token".to_string())).await;
    let mut fields = Map::new();
    fields.insert("status_id".to_string(), json!(2));
    store.update(&p("items/abc123"), fields).await.unwrap();
}

#[tokio::test]
async fn test_remove_deletes_record_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/abc123.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    store.remove(&p("items/abc123")).await.unwrap();
}

#[tokio::test]
async fn test_denied_write_maps_to_permission_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/abc123.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let err = store.remove(&p("items/abc123")).await.unwrap_err();
    match err {
        RealtimeError::PermissionDenied(msg) => assert_eq!(msg, "Permission denied"),
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_subscribe_rebuilds_value_from_events() {
    let mock_server = MockServer::start().await;

    let body = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"a\":{\"title\":\"Wallet\",\"status_id\":1}}}\n\n",
        "event: keep-alive\n",
        "data: null\n\n",
        "event: patch\n",
        "data: {\"path\":\"/a\",\"data\":{\"status_id\":2}}\n\n",
        "event: put\n",
        "data: {\"path\":\"/b\",\"data\":{\"title\":\"Keys\"}}\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/items.json"))
        .and(header("Accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let mut subscription = store.subscribe(&p("items")).await.unwrap();

    let first = subscription.next().await.unwrap().unwrap();
    assert_eq!(first.value()["a"]["status_id"], 1);

    let second = subscription.next().await.unwrap().unwrap();
    assert_eq!(second.value()["a"]["status_id"], 2);
    assert_eq!(second.value()["a"]["title"], "Wallet");

    let third = subscription.next().await.unwrap().unwrap();
    assert_eq!(third.children().len(), 2);

    assert!(subscription.next().await.is_none(), "stream should end with the body");
}

#[tokio::test]
async fn test_subscribe_reports_cancelled_stream() {
    let mock_server = MockServer::start().await;

    let body = "event: cancel\ndata: Permission denied\n\n";
    Mock::given(method("GET"))
        .and(path("/users.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let mut subscription = store.subscribe(&p("users")).await.unwrap();
    match subscription.next().await {
        Some(Err(RealtimeError::PermissionDenied(reason))) => {
            assert_eq!(reason, "Permission denied")
        }
        other => panic!("Expected a permission error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_subscribe_rejected_up_front() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let err = store.subscribe(&p("users")).await.unwrap_err();
    assert!(matches!(err, RealtimeError::RequestRejected { status: 500, .. }));
}
