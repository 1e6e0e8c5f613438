//! Shared test helpers for Feishu API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary endpoints and returns a provider pointing at the mock server.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sheetsync_core::domain::{CellRange, SpreadsheetToken};
use sheetsync_feishu::client::FeishuClient;
use sheetsync_feishu::provider::FeishuSheetProvider;

pub const SPREADSHEET: &str = "shtTest";
pub const TOKEN: &str = "t-test-token";

/// Path of a value endpoint of the test spreadsheet
pub fn values_path(endpoint: &str) -> String {
    format!("/open-apis/sheets/v2/spreadsheets/{SPREADSHEET}/{endpoint}")
}

pub fn range(s: &str) -> CellRange {
    s.parse().unwrap()
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "msg": "success", "data": data}))
}

pub fn api_error(code: i64, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": code, "msg": msg}))
}

pub fn client_for(server: &MockServer) -> FeishuClient {
    FeishuClient::with_base_url("cli_test", "secret", &server.uri(), Duration::from_secs(5)).unwrap()
}

/// Mounts the tenant token endpoint with a two-hour token
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/open-apis/auth/v3/tenant_access_token/internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": TOKEN,
            "expire": 7200
        })))
        .mount(server)
        .await;
}

/// Sets up a mock server with the token endpoint and returns a
/// (MockServer, FeishuSheetProvider) tuple.
pub async fn setup_feishu_mock() -> (MockServer, FeishuSheetProvider) {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let provider = FeishuSheetProvider::new(
        client_for(&server),
        SpreadsheetToken::new(SPREADSHEET.to_string()).unwrap(),
    );
    (server, provider)
}
