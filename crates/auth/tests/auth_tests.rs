use lostfound_auth::{Auth, AuthError, AuthOptions, Session, User};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_for(server: &MockServer) -> Auth {
    Auth::new(
        "test_api_key",
        Client::new(),
        AuthOptions {
            identity_url: server.uri(),
            token_url: server.uri(),
            ..AuthOptions::default()
        },
    )
}

fn session_for(uid: &str, expires_in: i64) -> Session {
    Session::new(
        "old_id_token".to_string(),
        "old_refresh_token".to_string(),
        expires_in,
        User {
            uid: uid.to_string(),
            email: Some("admin@example.com".to_string()),
            display_name: Some("Admin".to_string()),
        },
    )
}

async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "email": "admin@example.com",
            "displayName": "Admin",
            "idToken": "id_token_1",
            "refreshToken": "refresh_token_1",
            "expiresIn": "3600"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_notifies_watchers() {
    let mock_server = MockServer::start().await;
    mount_sign_in(&mock_server).await;

    let auth = auth_for(&mock_server);
    let mut state = auth.on_auth_state_change();
    assert!(state.borrow().is_none());

    auth.sign_in_with_password("admin@example.com", "secret")
        .await
        .unwrap();

    state.changed().await.unwrap();
    let seen = state.borrow().clone().unwrap();
    assert_eq!(seen.user.uid, "uid-1");
    assert_eq!(seen.user.display_name.as_deref(), Some("Admin"));
}

#[tokio::test]
async fn test_wrong_password_is_credential_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "INVALID_PASSWORD",
                "errors": [{"message": "INVALID_PASSWORD", "domain": "global", "reason": "invalid"}]
            }
        })))
        .mount(&mock_server)
        .await;

    let auth = auth_for(&mock_server);
    let err = auth
        .sign_in_with_password("admin@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(err.is_credential_error(), "got {:?}", err);
    assert!(auth.get_session().is_none());
}

#[tokio::test]
async fn test_throttled_sign_in_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "TOO_MANY_ATTEMPTS_TRY_LATER : Try again later."}
        })))
        .mount(&mock_server)
        .await;

    let auth = auth_for(&mock_server);
    match auth.sign_in_with_password("admin@example.com", "x").await {
        Err(AuthError::ApiError(msg)) => assert!(msg.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER")),
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_session_replaces_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test_api_key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old_refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "new_refresh_token",
            "id_token": "new_id_token",
            "user_id": "uid-1",
            "project_id": "1234"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = auth_for(&mock_server);
    auth.set_session(session_for("uid-1", 10));

    let session = auth.valid_session().await.unwrap();
    assert_eq!(session.id_token, "new_id_token");
    assert_eq!(session.refresh_token, "new_refresh_token");
    assert_eq!(session.user.email.as_deref(), Some("admin@example.com"));
    assert_eq!(auth.get_session().unwrap().id_token, "new_id_token");
}

#[tokio::test]
async fn test_valid_session_skips_refresh_when_fresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = auth_for(&mock_server);
    auth.set_session(session_for("uid-1", 3600));
    let session = auth.valid_session().await.unwrap();
    assert_eq!(session.id_token, "old_id_token");
}

#[tokio::test]
async fn test_refresh_for_other_user_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "refresh_token": "r",
            "id_token": "i",
            "user_id": "someone-else"
        })))
        .mount(&mock_server)
        .await;

    let auth = auth_for(&mock_server);
    auth.set_session(session_for("uid-1", 3600));
    let err = auth.refresh_session().await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)));
    assert_eq!(auth.get_session().unwrap().id_token, "old_id_token");
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let mock_server = MockServer::start().await;
    mount_sign_in(&mock_server).await;

    let auth = auth_for(&mock_server);
    auth.sign_in_with_password("admin@example.com", "secret")
        .await
        .unwrap();

    let mut state = auth.on_auth_state_change();
    auth.sign_out().unwrap();

    state.changed().await.unwrap();
    assert!(state.borrow().is_none());
    assert!(auth.get_session().is_none());
    assert!(matches!(auth.sign_out(), Err(AuthError::MissingSession)));
}
