// End-to-end tests for the `Device` facade: background tasks, bridge
// wiring, and teardown.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zowie_api::{BridgeConfig, Error as ApiError, Go2rtcClient};
use zowie_core::{
    Availability, DecoderState, Device, DeviceConfig, Provisioned, StreamBridge, StreamSourceRef,
};

const PLAYLIST: &str = "http://cdn.example/live/playlist.m3u8";

fn config(url: &str) -> DeviceConfig {
    DeviceConfig {
        retry_delays: Vec::new(),
        bridge: None,
        ..DeviceConfig::new(
            Url::parse(url).unwrap(),
            "admin",
            SecretString::from("secret".to_owned()),
        )
    }
}

struct LocalBridge;

#[async_trait]
impl StreamBridge for LocalBridge {
    async fn provision(&self, _source_url: &str) -> Result<Provisioned, ApiError> {
        Ok(Provisioned {
            endpoint: "rtsp://127.0.0.1:8554/zowie_local".into(),
            token: "zowie_local".into(),
        })
    }

    async fn release(&self, _token: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "00000",
        "rsp": "succeed",
        "data": data,
    }))
}

#[tokio::test]
async fn test_start_refreshes_and_shutdown_stops() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let device = Device::new(config(&server.uri())).unwrap();
    let mut availability = device.availability();
    device.start().await;

    tokio::time::timeout(Duration::from_secs(5), availability.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*availability.borrow(), Availability::Healthy);
    assert_eq!(device.snapshot().cycles, 1);

    device.shutdown().await;
    assert!(device.refresh_now().await.is_none());
}

#[tokio::test]
async fn test_unreachable_device_marks_decoder_unavailable() {
    let device = Device::new(config("http://127.0.0.1:9")).unwrap();
    let mut decoder = device.decoder_updates();
    device.start().await;

    tokio::time::timeout(Duration::from_secs(5), decoder.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*decoder.borrow(), DecoderState::Unavailable);

    device.shutdown().await;
}

#[tokio::test]
async fn test_bridged_play_through_go2rtc() {
    let device_server = MockServer::start().await;
    let bridge_server = MockServer::start().await;
    let bridge = BridgeConfig {
        host: "127.0.0.1".into(),
        api_port: bridge_server.address().port(),
        ..BridgeConfig::default()
    };
    let go2rtc = Go2rtcClient::new(&bridge).unwrap();
    let name = go2rtc.stream_name(PLAYLIST);
    let endpoint = go2rtc.endpoint(&name);

    Mock::given(method("PUT"))
        .and(path("/api/streams"))
        .and(query_param("name", name.as_str()))
        .and(query_param("src", PLAYLIST))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&bridge_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/streams"))
        .and(query_param("src", name.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&bridge_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(query_param("option", "getinfo"))
        .respond_with(ok(json!({"streamplay": []})))
        .mount(&device_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/streamplay"))
        .and(body_partial_json(json!({
            "opt": "streamplay_add",
            "url": endpoint,
            "streamtype": 1,
        })))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&device_server)
        .await;

    let device = Device::new(DeviceConfig {
        bridge: Some(bridge),
        ..config(&device_server.uri())
    })
    .unwrap();

    device
        .play(StreamSourceRef::url(PLAYLIST).unwrap())
        .await
        .unwrap();
    assert!(device.decoder_state().is_playing());
    assert_eq!(device.cache().unwrap().len(), 1);

    device.shutdown().await;
    assert!(device.cache().unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_sweep_interval_still_sweeps() {
    let bridge: Arc<dyn StreamBridge> = Arc::new(LocalBridge);
    let device = Device::with_bridge(
        DeviceConfig {
            sweep_interval: Duration::ZERO,
            cache_ttl: Duration::ZERO,
            ..config("http://127.0.0.1:9")
        },
        Some(bridge),
    )
    .unwrap();

    let cache = device.cache().unwrap();
    cache.acquire(PLAYLIST).await.unwrap();
    cache.release(PLAYLIST);
    device.start().await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while !cache.is_empty() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .unwrap();

    device.shutdown().await;
}
