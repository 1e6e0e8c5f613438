//! Tenant token acquisition and caching

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sheetsync_core::ports::{ISheetClient, RemoteError};
use sheetsync_feishu::FeishuError;

use crate::common::{self, range, values_path, TOKEN};

#[tokio::test]
async fn test_token_is_fetched_once_and_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
        .and(body_json(json!({"app_id": "cli_test", "app_secret": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "tenant_access_token": TOKEN,
            "expire": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client_for(&server);
    assert_eq!(client.tenant_token().await.unwrap(), TOKEN);
    assert_eq!(client.tenant_token().await.unwrap(), TOKEN);
}

#[tokio::test]
async fn test_short_lived_token_is_refreshed() {
    let server = MockServer::start().await;
    // Expires inside the refresh margin, so every call fetches again
    Mock::given(method("POST"))
        .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "tenant_access_token": TOKEN,
            "expire": 60
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = common::client_for(&server);
    client.tenant_token().await.unwrap();
    client.tenant_token().await.unwrap();
}

#[tokio::test]
async fn test_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10003,
            "msg": "invalid param"
        })))
        .mount(&server)
        .await;

    let err = common::client_for(&server).tenant_token().await.unwrap_err();
    assert!(matches!(err, FeishuError::Auth { code: 10003, .. }));
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("PUT"))
        .and(path(values_path("values")))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(common::ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .overwrite_range(&range("s!A1:A1"), &[vec!["x".into()]])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_failure_is_fatal_for_the_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10014,
            "msg": "app secret invalid"
        })))
        .mount(&server)
        .await;
    let provider = sheetsync_feishu::provider::FeishuSheetProvider::new(
        common::client_for(&server),
        common::SPREADSHEET.parse().unwrap(),
    );

    let err = provider.read_range(&range("s!A1:B2")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Fatal { code: 10014, .. }));
}
