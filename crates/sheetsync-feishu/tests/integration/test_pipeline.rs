//! A sync driven end to end through the engine against the mock API

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sheetsync_core::config::TransportConfig;
use sheetsync_core::domain::{
    Anchor, CellRef, CellValue, Dataset, DuplicateKeyPolicy, SheetId, SyncMode,
};
use sheetsync_core::ports::ISheetClient;
use sheetsync_sync::engine::{EngineSettings, SyncModeEngine};

use crate::common::{self, api_error, values_path};

fn engine(provider: sheetsync_feishu::provider::FeishuSheetProvider) -> SyncModeEngine {
    SyncModeEngine::new(
        Arc::new(provider) as Arc<dyn ISheetClient>,
        EngineSettings {
            anchor: Anchor::new(SheetId::new("s".into()).unwrap(), CellRef::origin()),
            row_batch_size: 500,
            col_batch_size: 80,
            duplicate_keys: DuplicateKeyPolicy::LastWins,
            selective_columns: Vec::new(),
            auto_include_index: true,
            transport: TransportConfig {
                rate_limit_delay_ms: 0,
                backoff_unit_ms: 10,
                ..TransportConfig::default()
            },
        },
    )
}

fn local() -> Dataset {
    Dataset::new(
        vec!["id".into(), "qty".into()],
        vec![
            vec![CellValue::text("A"), CellValue::Number(1.0)],
            vec![CellValue::text("B"), CellValue::Number(2.0)],
            vec![CellValue::text("C"), CellValue::Number(3.0)],
        ],
    )
}

async fn mount_snapshot(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/open-apis/sheets/v2/spreadsheets/shtTest/values/s!A1:ZZ500000$"))
        .respond_with(common::ok(json!({
            "valueRange": {"values": [["id", "qty"], ["A", 9]]}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_incremental_sync_appends_new_keys() {
    let (server, provider) = common::setup_feishu_mock().await;
    mount_snapshot(&server).await;
    Mock::given(method("POST"))
        .and(path(values_path("values_append")))
        .and(body_json(json!({
            "valueRange": {"range": "s!A2:B3", "values": [["B", 2], ["C", 3]]}
        })))
        .respond_with(common::ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = engine(provider)
        .execute(SyncMode::Incremental, &local(), Some("id"))
        .await
        .unwrap();
    assert_eq!(report.summary.rows_inserted, 2);
    assert_eq!(report.summary.rows_skipped, 1);
}

#[tokio::test]
async fn test_throttled_request_is_retried() {
    let (server, provider) = common::setup_feishu_mock().await;
    mount_snapshot(&server).await;
    Mock::given(method("POST"))
        .and(path(values_path("values_append")))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(values_path("values_append")))
        .respond_with(common::ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = engine(provider)
        .execute(SyncMode::Incremental, &local(), Some("id"))
        .await
        .unwrap();
    assert_eq!(report.requests, 1);
}

#[tokio::test]
async fn test_too_large_append_is_split() {
    let (server, provider) = common::setup_feishu_mock().await;
    mount_snapshot(&server).await;
    Mock::given(method("POST"))
        .and(path(values_path("values_append")))
        .respond_with(api_error(90227, "request too large"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    for (range, values) in [("s!A2:B2", json!([["B", 2]])), ("s!A3:B3", json!([["C", 3]]))] {
        Mock::given(method("POST"))
            .and(path(values_path("values_append")))
            .and(body_json(json!({"valueRange": {"range": range, "values": values}})))
            .respond_with(common::ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let report = engine(provider)
        .execute(SyncMode::Incremental, &local(), Some("id"))
        .await
        .unwrap();
    assert_eq!(report.splits, 1);
    assert_eq!(report.requests, 2);
}
