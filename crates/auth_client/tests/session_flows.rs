//! End-to-end session flows against a mock auth server

use std::sync::Arc;
use std::time::Duration;

use auth_client::{
    ApiRequest, Config, FileTokenStore, HttpAuthApi, MemoryTokenStore, OAuthProvider,
    ProfileUpdate, RefreshFailure, SessionError, SessionManager, TokenPair, TokenStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> Arc<HttpAuthApi> {
    let config = Config {
        api_base_url: server.uri(),
        ..Config::default()
    };
    Arc::new(HttpAuthApi::new(&config).expect("http client"))
}

fn user_json() -> serde_json::Value {
    json!({
        "id": "1",
        "username": "jane",
        "email": "jane@example.com",
        "roles": ["USER"],
        "permissions": ["project:read"]
    })
}

async fn manager_with_tokens(
    server: &MockServer,
    tokens: Option<TokenPair>,
) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(match tokens {
        Some(tokens) => MemoryTokenStore::with_tokens(tokens),
        None => MemoryTokenStore::new(),
    });
    let manager = SessionManager::init(api_for(server), store.clone())
        .await
        .expect("init");
    (manager, store)
}

#[tokio::test]
async fn login_persists_session_and_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "username": "jane",
            "password": "Secret123",
            "rememberMe": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "A",
            "refreshToken": "R",
            "tokenType": "Bearer",
            "expiresIn": 3600,
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, None).await;
    let session = manager.login("jane", "Secret123", false).await.unwrap();

    assert_eq!(session.user.username, "jane");
    assert_eq!(session.tokens, TokenPair::new("A", "R"));
    assert!(session.login_time.is_some());
    assert_eq!(store.snapshot(), Some(TokenPair::new("A", "R")));

    let state = manager.state().await;
    assert!(state.is_authenticated);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn failed_login_records_error_and_stays_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, None).await;
    let err = manager.login("jane", "wrong", false).await.unwrap_err();
    assert!(matches!(err, SessionError::Auth(_)));

    let state = manager.state().await;
    assert!(!state.is_authenticated);
    assert!(state.error.as_deref().unwrap_or_default().contains("Bad credentials"));
    assert_eq!(store.snapshot(), None);

    manager.clear_error().await;
    assert!(manager.state().await.error.is_none());
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refreshToken": "R"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "A2", "refreshToken": "R2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;

    let (first, second) = tokio::join!(
        manager.execute(ApiRequest::get("/api/projects")),
        manager.execute(ApiRequest::get("/api/projects")),
    );

    assert_eq!(first.unwrap().body, json!([{"id": 1}]));
    assert_eq!(second.unwrap().body, json!([{"id": 1}]));
    assert_eq!(store.snapshot(), Some(TokenPair::new("A2", "R2")));
    assert!(!manager.is_refreshing());
}

#[tokio::test]
async fn request_is_retried_at_most_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    let err = manager
        .execute(ApiRequest::get("/api/projects"))
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::Unauthorized);
    // Refresh succeeded, so the rotated pair stays; the old refresh token is kept.
    assert_eq!(store.snapshot(), Some(TokenPair::new("A2", "R")));
}

#[tokio::test]
async fn refresh_failure_ends_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    let err = manager
        .execute(ApiRequest::get("/api/projects"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Refresh(RefreshFailure::Rejected("Refresh token expired".into()))
    );
    assert_eq!(store.snapshot(), None);
    assert!(manager.session().await.is_none());
    assert!(manager.state().await.tokens.is_none());
}

#[tokio::test]
async fn logout_clears_even_when_the_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({"refreshToken": "R"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    manager.logout().await;

    assert_eq!(store.snapshot(), None);
    assert!(manager.state().await.tokens.is_none());
}

#[tokio::test]
async fn check_status_restores_a_persisted_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    assert!(manager.session().await.is_none());

    let session = manager.check_status().await.unwrap();
    assert_eq!(session.user.username, "jane");
    assert!(session.user.permissions.contains("project:read"));
}

#[tokio::test]
async fn check_status_failure_clears_without_refreshing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    let err = manager.check_status().await.unwrap_err();

    assert_eq!(err, SessionError::NotAuthenticated);
    assert_eq!(store.snapshot(), None);
    assert!(!manager.state().await.is_loading);
}

#[tokio::test]
async fn check_status_without_tokens_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, None).await;
    assert_eq!(manager.check_status().await.unwrap_err(), SessionError::NotAuthenticated);
}

#[tokio::test]
async fn refresh_superseded_by_logout_never_rewrites_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "A2", "refreshToken": "R2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    let manager = Arc::new(manager);

    let refreshing = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.refresh().await })
    };
    while !manager.is_refreshing() {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.logout().await;

    let outcome = refreshing.await.unwrap();
    assert_eq!(outcome, Err(SessionError::Refresh(RefreshFailure::Superseded)));
    assert_eq!(store.snapshot(), None);
    assert!(manager.session().await.is_none());
}

#[tokio::test]
async fn validation_failures_issue_no_requests() {
    let server = MockServer::start().await;
    let (manager, _) = manager_with_tokens(&server, None).await;

    let err = manager
        .register("jane", "jane@example.com", "Secret123", "Secret124")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(ref v) if v.field == "confirmPassword"));

    let err = manager.login("jane", "", false).await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(ref v) if v.field == "password"));

    let err = manager.forgot_password("not-an-email").await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(ref v) if v.field == "email"));

    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn profile_update_replaces_session_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .and(header("Authorization", "Bearer A"))
        .and(body_json(json!({"firstName": "Jane"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1",
            "username": "jane",
            "email": "jane@example.com",
            "firstName": "Jane"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/permissions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"permissions": ["project:read"]})),
        )
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    manager.check_status().await.unwrap();

    let update = ProfileUpdate {
        first_name: Some("Jane".into()),
        ..Default::default()
    };
    let user = manager.update_profile(&update).await.unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Jane"));

    let session = manager.session().await.unwrap();
    assert_eq!(session.user.first_name.as_deref(), Some("Jane"));

    let permissions = manager.fetch_permissions().await.unwrap();
    assert_eq!(permissions, vec!["project:read".to_string()]);
}

#[tokio::test]
async fn file_store_survives_a_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "A",
            "refreshToken": "R",
            "user": user_json()
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");

    let first = SessionManager::init(api_for(&server), Arc::new(FileTokenStore::new(&path)))
        .await
        .unwrap();
    first.login("jane", "Secret123", true).await.unwrap();
    first.dispose().await;

    let store = Arc::new(FileTokenStore::new(&path));
    let second = SessionManager::init(api_for(&server), store.clone())
        .await
        .unwrap();
    assert_eq!(second.state().await.tokens, Some(TokenPair::new("A", "R")));

    second.logout().await;
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn refresh_failure_during_profile_update_is_reported_as_such() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    let update = ProfileUpdate {
        first_name: Some("Jane".into()),
        ..Default::default()
    };
    let err = manager.update_profile(&update).await.unwrap_err();

    assert_eq!(
        err,
        SessionError::Refresh(RefreshFailure::Rejected("Refresh token expired".into()))
    );
    let state = manager.state().await;
    assert!(!state.is_loading);
    assert!(!state.is_authenticated);
    assert!(state.tokens.is_none());
    assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn late_401_for_a_rotated_token_reuses_the_current_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // Answers long after the first request has finished rotating A -> A2.
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(400)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["p"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["r"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refreshToken": "R"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2", "refreshToken": "R2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;

    let (projects, reports) = tokio::join!(
        manager.execute(ApiRequest::get("/api/projects")),
        manager.execute(ApiRequest::get("/api/reports")),
    );

    assert_eq!(projects.unwrap().body, json!(["p"]));
    assert_eq!(reports.unwrap().body, json!(["r"]));
    assert_eq!(store.snapshot(), Some(TokenPair::new("A2", "R2")));
}

#[tokio::test]
async fn oauth_callback_signs_in_like_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/oauth/github/callback"))
        .and(body_json(json!({"code": "gh-code", "state": "xyz"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "A",
            "refreshToken": "R",
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager_with_tokens(&server, None).await;
    assert_eq!(
        manager.oauth_login_url(OAuthProvider::Github),
        format!("{}/api/auth/oauth/github", server.uri())
    );

    let session = manager
        .handle_oauth_callback(OAuthProvider::Github, "gh-code", Some("xyz"))
        .await
        .unwrap();
    assert_eq!(session.user.username, "jane");
    assert_eq!(store.snapshot(), Some(TokenPair::new("A", "R")));

    let err = manager
        .handle_oauth_callback(OAuthProvider::Google, " ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(ref v) if v.field == "code"));
}

#[tokio::test]
async fn two_factor_enrolment_updates_the_session_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/2fa/enable"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "qrCode": "data:image/png;base64,AAAA",
            "secret": "JBSWY3DP"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/2fa/verify"))
        .and(body_json(json!({"code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "enabled"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/2fa/disable"))
        .and(body_json(json!({"code": "654321"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "disabled"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/resend-verification"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "sent"})))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    manager.check_status().await.unwrap();

    let setup = manager.enable_two_factor().await.unwrap();
    assert_eq!(setup.secret, "JBSWY3DP");
    assert!(!manager.session().await.unwrap().user.two_factor_enabled);

    assert_eq!(manager.verify_two_factor("123456").await.unwrap(), "enabled");
    assert!(manager.session().await.unwrap().user.two_factor_enabled);

    assert_eq!(manager.disable_two_factor("654321").await.unwrap(), "disabled");
    assert!(!manager.session().await.unwrap().user.two_factor_enabled);

    assert_eq!(manager.resend_verification_email().await.unwrap(), "sent");
    assert!(!manager.state().await.is_loading);
}

#[tokio::test]
async fn session_management_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/sessions"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s-1", "ip": "10.0.0.1", "userAgent": "Firefox",
             "lastActiveAt": "2024-03-01T10:00:00Z", "current": true},
            {"id": "s-2", "ip": "10.0.0.2", "userAgent": "curl",
             "lastActiveAt": "2024-02-27T08:00:00Z", "current": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/auth/sessions/s-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "revoked"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/revoke-sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "all revoked"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login-history"))
        .and(query_param("page", "2"))
        .and(query_param("size", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "h1", "ip": "10.0.0.1", "userAgent": "Firefox",
                      "loginAt": "2024-03-01T10:00:00Z", "success": true}],
            "total": 6,
            "page": 2,
            "size": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;

    let sessions = manager.active_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[0].current);

    assert_eq!(manager.revoke_session("s-2").await.unwrap(), "revoked");
    let err = manager.revoke_session("../me").await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(ref v) if v.field == "sessionId"));
    assert_eq!(manager.revoke_all_sessions().await.unwrap(), "all revoked");

    let history = manager.login_history(2, 5).await.unwrap();
    assert_eq!(history.total, 6);
    assert_eq!(history.data[0].id, "h1");
    assert!(manager.login_history(0, 5).await.is_err());
}

#[tokio::test]
async fn permission_check_answers_false_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/permissions/check"))
        .and(query_param("permission", "project:write"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hasPermission": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/permissions/check"))
        .and(query_param("permission", "admin:all"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (manager, _) = manager_with_tokens(&server, Some(TokenPair::new("A", "R"))).await;
    assert!(manager.check_permission("project:write").await);
    assert!(!manager.check_permission("admin:all").await);
    assert!(!manager.check_permission("").await);
}
