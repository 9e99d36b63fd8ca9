// go2rtc stream bridge client
//
// Registers a source with a local go2rtc instance and hands back the RTSP
// endpoint it re-serves the stream on. Stream names are derived from the
// source so the same source always maps to the same endpoint.

use std::time::Duration;

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Where the bridge listens and how streams are named.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub api_port: u16,
    pub rtsp_port: u16,
    pub stream_prefix: String,
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            api_port: 1984,
            rtsp_port: 8554,
            stream_prefix: "zowie_".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for go2rtc's `/api/streams`.
pub struct Go2rtcClient {
    http: reqwest::Client,
    streams_url: Url,
    rtsp_base: String,
    prefix: String,
}

impl Go2rtcClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, Error> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let api = Url::parse(&format!("http://{}:{}", config.host, config.api_port))?;
        Self::with_client(transport.build_client()?, &api, config)
    }

    /// Build against an explicit API root (used when the API is not on
    /// `host:api_port`, e.g. behind a proxy or in tests).
    pub fn with_client(
        http: reqwest::Client,
        api_url: &Url,
        config: &BridgeConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            streams_url: api_url.join("/api/streams")?,
            rtsp_base: format!("rtsp://{}:{}", config.host, config.rtsp_port),
            prefix: config.stream_prefix.clone(),
        })
    }

    /// Stable stream name for a source: prefix plus 8 hex chars of a UUIDv5.
    pub fn stream_name(&self, source: &str) -> String {
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, source.as_bytes()).simple().to_string();
        format!("{}{}", self.prefix, digest.get(..8).unwrap_or(&digest))
    }

    /// RTSP endpoint go2rtc serves `name` on.
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.rtsp_base)
    }

    /// `PUT /api/streams?src={source}&name={name}`
    pub async fn add_stream(&self, name: &str, source: &str) -> Result<(), Error> {
        debug!(name, source, "registering bridge stream");
        let resp = self
            .http
            .put(self.streams_url.clone())
            .query(&[("src", source), ("name", name)])
            .send()
            .await
            .map_err(Error::Transport)?;
        check(resp).await
    }

    /// `DELETE /api/streams?src={name}`
    pub async fn delete_stream(&self, name: &str) -> Result<(), Error> {
        debug!(name, "removing bridge stream");
        let resp = self
            .http
            .delete(self.streams_url.clone())
            .query(&[("src", name)])
            .send()
            .await
            .map_err(Error::Transport)?;
        check(resp).await
    }
}

async fn check(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    Err(Error::Bridge {
        message: format!("HTTP {status}: {text}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stream_names_are_stable_and_prefixed() {
        let config = BridgeConfig::default();
        let client = Go2rtcClient::new(&config).unwrap();

        let a = client.stream_name("http://cam/playlist.m3u8");
        let b = client.stream_name("http://cam/playlist.m3u8");
        let c = client.stream_name("http://cam/other.m3u8");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("zowie_"));
        assert_eq!(a.len(), "zowie_".len() + 8);
        assert_eq!(client.endpoint(&a), format!("rtsp://127.0.0.1:8554/{a}"));
    }
}
