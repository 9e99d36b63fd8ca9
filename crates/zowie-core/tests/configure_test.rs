// Integration tests for read-merge-write configuration.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zowie_api::models::NdiConfig;
use zowie_api::{Credentials, Error as ApiError, ProtocolClient};
use zowie_core::{configure_ndi, CoreError, NdiChange};

async fn setup() -> (MockServer, ProtocolClient) {
    let server = MockServer::start().await;
    let client = ProtocolClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Credentials::new("admin", "secret"),
    );
    (server, client)
}

fn device_ndi() -> Value {
    json!({
        "switch": 0,
        "machinename": "ZOWIEBOX-1",
        "mode_id": 1,
        "groups": "public",
        "activate": 1,
        "ndi_hx": {"bandwidth": 2},
    })
}

fn reply(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": code, "rsp": "ok"}))
}

/// A device that only accepts complete NDI records: the full body answers
/// `000000`, anything partial answers `00003`.
async fn mount_strict_ndi(server: &MockServer, expected: Value) {
    Mock::given(method("POST"))
        .and(path("/video"))
        .and(query_param("option", "getinfo"))
        .and(body_partial_json(json!({"group": "ndi", "opt": "get_ndi_info"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "00000",
            "rsp": "succeed",
            "data": device_ndi(),
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/video"))
        .and(query_param("option", "setinfo"))
        .and(body_partial_json(json!({"opt": "set_ndi_info", "data": expected})))
        .respond_with(reply("000000"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/video"))
        .and(query_param("option", "setinfo"))
        .and(body_partial_json(json!({"opt": "set_ndi_info"})))
        .respond_with(reply("00003"))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_merged_write_is_accepted() {
    let (server, client) = setup().await;
    let mut expected = device_ndi();
    expected["switch"] = json!(1);
    mount_strict_ndi(&server, expected.clone()).await;

    let change = NdiChange {
        enabled: Some(true),
        ..NdiChange::default()
    };
    let written = configure_ndi(&client, &change).await.unwrap();

    assert!(written.is_enabled());
    assert_eq!(serde_json::to_value(&written).unwrap(), expected);
}

#[tokio::test]
async fn test_partial_write_is_rejected() {
    let (server, client) = setup().await;
    mount_strict_ndi(&server, device_ndi()).await;

    let partial = NdiConfig {
        switch: Some(1),
        ..NdiConfig::default()
    };
    let err = client.set_ndi_config(&partial).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));

    let core: CoreError = err.into();
    assert!(matches!(core, CoreError::ValidationFailed { .. }));
}

#[tokio::test]
async fn test_empty_change_writes_nothing() {
    let (server, client) = setup().await;
    mount_strict_ndi(&server, device_ndi()).await;
    Mock::given(method("POST"))
        .and(query_param("option", "setinfo"))
        .respond_with(reply("00000"))
        .with_priority(1)
        .expect(0)
        .mount(&server)
        .await;

    let config = configure_ndi(&client, &NdiChange::default()).await.unwrap();
    assert_eq!(config.machinename.as_deref(), Some("ZOWIEBOX-1"));
}
