// Integration tests for `ProtocolClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use zowie_api::models::NdiConfig;
use zowie_api::{Credentials, Error, FeatureDomain, ProtocolClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ProtocolClient) {
    setup_with(TransportConfig::default()).await
}

async fn setup_with(transport: TransportConfig) -> (MockServer, ProtocolClient) {
    let server = MockServer::start().await;
    let transport = transport.with_retry_delays(vec![Duration::from_millis(5); 3]);
    let client = ProtocolClient::new(
        Url::parse(&server.uri()).unwrap(),
        Credentials::new("admin", "secret"),
        &transport,
    )
    .unwrap();
    (server, client)
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "00000",
        "rsp": "succeed",
        "data": data,
    }))
}

fn status(code: &str, rsp: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": code, "rsp": rsp }))
}

async fn mount_login(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/system"))
        .and(query_param("option", "setinfo"))
        .and(body_partial_json(json!({
            "group": "user",
            "user": "admin",
            "psw": "secret",
        })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn input_info() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/video"))
        .and(query_param("option", "getinfo"))
        .and(query_param("login_check_flag", "1"))
        .and(body_partial_json(json!({"group": "hdmi", "opt": "get_input_info"})))
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_system_attributes() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/system"))
        .and(body_partial_json(json!({"group": "sys_attr", "opt": "get_sys_attr_info"})))
        .respond_with(ok(json!({
            "SN": "ZB2024001",
            "device_name": "Stage Left",
            "firmware_version": "1.2.3",
            "model": "ZowieBox-4K",
            "undocumented": true,
        })))
        .mount(&server)
        .await;

    let attrs = assert_ok!(client.system_attributes().await);

    assert_eq!(attrs.serial.as_deref(), Some("ZB2024001"));
    assert_eq!(attrs.device_name.as_deref(), Some("Stage Left"));
    assert_eq!(attrs.model.as_deref(), Some("ZowieBox-4K"));
    assert!(attrs.manufacturer.is_none());
}

#[tokio::test]
async fn test_six_digit_success_code() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "000000",
            "rsp": "succeed",
            "data": {"signal": 1, "width": 1920, "height": 1080},
        })))
        .mount(&server)
        .await;

    let input = client.input_signal().await.unwrap();
    assert!(input.has_signal());
    assert_eq!(input.width, Some(1920));
}

#[tokio::test]
async fn test_encoder_channels_from_top_level_section() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/video"))
        .and(body_partial_json(json!({"group": "venc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "00000",
            "rsp": "succeed",
            "venc": [
                {"venc_chnid": 0, "desc": "main", "width": 3840, "height": 2160,
                 "codec": {"codec_list": ["H.264", "H.265"], "selected_id": 0},
                 "bitrate": 12_000_000},
                {"venc_chnid": 1, "desc": "sub", "width": 1280, "height": 720},
            ],
        })))
        .mount(&server)
        .await;

    let channels = client.encoder_channels().await.unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].codec_name().as_deref(), Some("H.264"));
    assert_eq!(channels[1].desc.as_deref(), Some("sub"));
}

#[tokio::test]
async fn test_audio_info_under_all_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/audio"))
        .and(body_partial_json(json!({"group": "all"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "00000",
            "rsp": "succeed",
            "all": {"codec": "AAC", "sample_rate": "48000", "volume": 80},
        })))
        .mount(&server)
        .await;

    let audio = client.audio_info().await.unwrap();
    assert_eq!(audio.codec.as_deref(), Some("AAC"));
    assert_eq!(audio.sample_rate, Some(48000));
    assert_eq!(audio.volume, Some(80));
}

#[tokio::test]
async fn test_streamplay_sources_bare_list() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(body_partial_json(json!({"group": "streamplay", "opt": "get_streamplay_info"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "00000",
            "rsp": "succeed",
            "data": [
                {"index": 2, "name": "Sydney", "url": "rtsp://live.example.com/stream",
                 "streamtype": 1, "switch": 1, "streamplay_status": 1},
            ],
            "streamplay": [],
        })))
        .mount(&server)
        .await;

    let sources = client.streamplay_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name.as_deref(), Some("Sydney"));
    assert_eq!(sources[0].index, Some(2));
    assert!(sources[0].is_active());
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_required_reauthenticates_once_and_replays() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("80003", "not login"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    input_info()
        .respond_with(ok(json!({"signal": 0})))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, ok(json!({"token": "abc123"})), 1).await;

    let input = client.input_signal().await.unwrap();

    assert!(!input.has_signal());
    let session = client.session().await;
    assert_eq!(session.token(), Some("abc123"));
    assert!(session.last_authenticated().is_some());
}

#[tokio::test]
async fn test_second_auth_required_is_surfaced() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("80003", "not login"))
        .expect(2)
        .mount(&server)
        .await;
    mount_login(&server, ok(json!({})), 1).await;

    let err = client.input_signal().await.unwrap_err();
    assert!(matches!(err, Error::AuthRequired), "got {err:?}");
}

#[tokio::test]
async fn test_wrong_password_is_auth_failed() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("80003", "not login"))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, status("80005", "password error"), 1).await;

    let err = client.input_signal().await.unwrap_err();
    assert!(matches!(err, Error::AuthFailed { .. }), "got {err:?}");
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_writes_carry_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(query_param("option", "setinfo"))
        .and(body_partial_json(json!({
            "group": "streamplay",
            "opt": "streamplay_add",
            "name": "My Stream",
            "url": "rtsp://camera.local/stream",
            "streamtype": 1,
            "switch": 1,
            "user": "admin",
            "psw": "secret",
        })))
        .respond_with(status("00000", "succeed"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .add_streamplay_source(
            "My Stream",
            "rtsp://camera.local/stream",
            zowie_api::models::StreamType::Rtsp,
            true,
        )
        .await
        .unwrap();
}

// ── Status classes ──────────────────────────────────────────────────

#[tokio::test]
async fn test_validation_error_is_never_retried() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("00003", "param error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.input_signal().await.unwrap_err();
    assert!(matches!(err, Error::Validation { ref code, .. } if code == "00003"));
}

#[tokio::test]
async fn test_busy_read_is_retried() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("00002", "not ready"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    input_info()
        .respond_with(ok(json!({"signal": 1})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.input_signal().await.unwrap().has_signal());
}

#[tokio::test]
async fn test_busy_read_gives_up_after_schedule() {
    let (server, client) = setup().await;

    input_info()
        .respond_with(status("00002", "not ready"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client.input_signal().await.unwrap_err();
    assert!(matches!(err, Error::TransientBusy { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_restart_status_accepted_for_restart_writes_only() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/video"))
        .and(body_partial_json(json!({"group": "ndi", "opt": "set_ndi_info"})))
        .respond_with(status("10000", "mpp restart"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/video"))
        .and(body_partial_json(json!({"group": "hdmi", "opt": "set_output_info"})))
        .respond_with(status("10000", "mpp restart"))
        .expect(1)
        .mount(&server)
        .await;

    let config = NdiConfig {
        switch: Some(1),
        ..NdiConfig::default()
    };
    client.set_ndi_config(&config).await.unwrap();

    let err = client.set_output_format("1080p60").await.unwrap_err();
    assert!(matches!(err, Error::TransientBusy { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_feature_error_domain() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/audio"))
        .respond_with(status("10001", "HDMI no signal"))
        .mount(&server)
        .await;

    let err = client.set_volume(40).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Feature {
            domain: FeatureDomain::Signal,
            ..
        }
    ));
}

// ── Compound operations ─────────────────────────────────────────────

#[tokio::test]
async fn test_stop_switches_off_active_source() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(query_param("option", "getinfo"))
        .respond_with(ok(json!({"streamplay": [
            {"index": 0, "name": "A", "url": "rtsp://a", "switch": 0},
            {"index": 1, "name": "B", "url": "rtsp://b", "switch": 1},
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(body_partial_json(json!({
            "opt": "streamplay_switch",
            "data": {"index": 1, "switch": 0},
        })))
        .respond_with(status("00000", "succeed"))
        .expect(1)
        .mount(&server)
        .await;

    client.stop_streamplay().await.unwrap();
}

#[tokio::test]
async fn test_stop_without_active_source_is_noop() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(query_param("option", "getinfo"))
        .respond_with(ok(json!({"streamplay": [{"index": 0, "switch": 0}]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(query_param("option", "setinfo"))
        .respond_with(status("00000", "succeed"))
        .expect(0)
        .mount(&server)
        .await;

    client.stop_streamplay().await.unwrap();
}

#[tokio::test]
async fn test_reboot_tolerates_dropped_reply() {
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let (server, client) = setup_with(transport).await;

    Mock::given(method("POST"))
        .and(path("/system"))
        .and(body_partial_json(json!({
            "group": "syscontrol",
            "opt": "set_reboot_info",
            "data": {"command": "reboot"},
        })))
        .respond_with(status("00000", "succeed").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    client.reboot().await.unwrap();
}

#[tokio::test]
async fn test_publish_toggle_looks_up_index() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/stream"))
        .and(query_param("option", "getinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "00000",
            "rsp": "succeed",
            "publish": [
                {"index": 0, "type": "rtmp", "switch": 0, "url": "rtmp://a/live"},
                {"index": 1, "type": "srt", "switch": 0},
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .and(body_partial_json(json!({
            "opt": "update_publish_switch",
            "data": {"index": 1, "switch": 1},
        })))
        .respond_with(status("00000", "succeed"))
        .expect(1)
        .mount(&server)
        .await;

    client.set_publish_enabled("srt", true).await.unwrap();

    let err = client.set_publish_enabled("hls", true).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn test_unreachable_device() {
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = ProtocolClient::new(
        Url::parse("http://127.0.0.1:9").unwrap(),
        Credentials::new("admin", "secret"),
        &transport.with_retry_delays(Vec::new()),
    )
    .unwrap();

    let err = client.ping().await.unwrap_err();
    assert!(err.is_unreachable(), "got {err:?}");
}
