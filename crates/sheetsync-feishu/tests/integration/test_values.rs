//! Value endpoint requests and response classification

use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use sheetsync_core::domain::{CellValue, RangeValues, Row};
use sheetsync_core::ports::{ISheetClient, RemoteError};

use crate::common::{self, api_error, range, values_path};

fn rows() -> Vec<Row> {
    vec![
        vec![CellValue::text("id"), CellValue::text("qty")],
        vec![CellValue::text("A"), CellValue::Number(3.0)],
    ]
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_read_range_parses_values() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/open-apis/sheets/v2/spreadsheets/shtTest/values/s!A1:ZZ10$"))
        .respond_with(common::ok(json!({
            "revision": 3,
            "valueRange": {
                "majorDimension": "ROWS",
                "range": "s!A1:ZZ10",
                "values": [["id", "qty", null], ["A", 3, null], [null, null, null]]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let values = provider.read_range(&range("s!A1:ZZ10")).await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[1][1], CellValue::Number(3.0));
    assert_eq!(values[0][2], CellValue::Empty);
}

#[tokio::test]
async fn test_read_of_empty_sheet() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/open-apis/sheets/v2/spreadsheets/shtTest/values/.+$"))
        .respond_with(common::ok(json!({"valueRange": {"range": "s!A1:B2"}})))
        .mount(&server)
        .await;

    assert!(provider.read_range(&range("s!A1:B2")).await.unwrap().is_empty());
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_overwrite_puts_value_range() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("PUT"))
        .and(path(values_path("values")))
        .and(body_json(json!({
            "valueRange": {"range": "s!B2:C3", "values": [["id", "qty"], ["A", 3]]}
        })))
        .respond_with(common::ok(json!({"updatedCells": 4})))
        .expect(1)
        .mount(&server)
        .await;

    provider.overwrite_range(&range("s!B2:C3"), &rows()).await.unwrap();
}

#[tokio::test]
async fn test_append_and_prepend_endpoints() {
    let (server, provider) = common::setup_feishu_mock().await;
    for endpoint in ["values_append", "values_prepend"] {
        Mock::given(method("POST"))
            .and(path(values_path(endpoint)))
            .and(body_json(json!({
                "valueRange": {"range": "s!A2:B3", "values": [["id", "qty"], ["A", 3]]}
            })))
            .respond_with(common::ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;
    }

    provider.append_rows(&range("s!A2:B3"), &rows()).await.unwrap();
    provider.prepend_rows(&range("s!A2:B3"), &rows()).await.unwrap();
}

#[tokio::test]
async fn test_batch_update_sends_every_range() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("POST"))
        .and(path(values_path("values_batch_update")))
        .and(body_json(json!({
            "valueRanges": [
                {"range": "s!A1:B2", "values": [["id", "qty"], ["A", 3]]},
                {"range": "s!D1:D9", "values": []}
            ]
        })))
        .respond_with(common::ok(json!({"responses": []})))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .batch_overwrite_ranges(&[
            RangeValues {
                range: range("s!A1:B2"),
                values: rows(),
            },
            RangeValues::clear(range("s!D1:D9")),
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_clear_tolerates_invalid_range() {
    let (server, provider) = common::setup_feishu_mock().await;
    Mock::given(method("POST"))
        .and(path(values_path("values_batch_update")))
        .respond_with(api_error(90202, "range invalid"))
        .mount(&server)
        .await;

    provider
        .batch_overwrite_ranges(&[RangeValues::clear(range("s!A1:ZZ9"))])
        .await
        .unwrap();

    // Not tolerated once the batch carries values
    let err = provider
        .batch_overwrite_ranges(&[RangeValues {
            range: range("s!A1:B2"),
            values: rows(),
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Fatal { code: 90202, .. }));
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_error_responses_are_classified() {
    let cases = [
        (api_error(90227, "request too large"), RemoteError::RequestTooLarge),
        (api_error(99991400, "frequency limit"), RemoteError::RateLimited),
        (
            ResponseTemplate::new(429).set_body_string("slow down"),
            RemoteError::RateLimited,
        ),
        (
            ResponseTemplate::new(503).set_body_string("unavailable"),
            RemoteError::ServerError { status: 503 },
        ),
        (
            ResponseTemplate::new(400).set_body_json(json!({"code": 1310214, "msg": "sheet not found"})),
            RemoteError::Fatal {
                code: 1310214,
                message: "sheet not found".into(),
            },
        ),
    ];

    for (response, expected) in cases {
        let (server, provider) = common::setup_feishu_mock().await;
        Mock::given(method("PUT"))
            .and(path(values_path("values")))
            .respond_with(response)
            .mount(&server)
            .await;

        let err = provider
            .overwrite_range(&range("s!A1:B2"), &rows())
            .await
            .unwrap_err();
        assert_eq!(err, expected);
    }
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let (server, provider) = common::setup_feishu_mock().await;
    drop(server);

    let err = provider
        .overwrite_range(&range("s!A1:B2"), &rows())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NetworkError(_)));
}
