// ── Stream bridge ──
//
// The conversion collaborator: takes a source the decoder cannot play and
// hands back a local endpoint it can, plus a token to release it with.

use async_trait::async_trait;
use tracing::debug;
use zowie_api::{BridgeConfig, Error as ApiError, Go2rtcClient};

/// A provisioned conversion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Locally reachable URL the decoder can play.
    pub endpoint: String,
    /// Ownership token passed back to [`StreamBridge::release`].
    pub token: String,
}

/// Produces playable endpoints for sources that need conversion.
#[async_trait]
pub trait StreamBridge: Send + Sync {
    async fn provision(&self, source_url: &str) -> Result<Provisioned, ApiError>;

    async fn release(&self, token: &str) -> Result<(), ApiError>;
}

/// go2rtc-backed bridge. Re-serves every source over RTSP.
pub struct Go2rtcBridge {
    client: Go2rtcClient,
}

impl Go2rtcBridge {
    pub fn new(client: Go2rtcClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, ApiError> {
        Ok(Self::new(Go2rtcClient::new(config)?))
    }
}

/// go2rtc source string: host cameras go through its ffmpeg source.
fn bridge_source(source_url: &str) -> String {
    if source_url.starts_with("camera.") {
        format!("ffmpeg:{source_url}")
    } else {
        source_url.to_owned()
    }
}

#[async_trait]
impl StreamBridge for Go2rtcBridge {
    async fn provision(&self, source_url: &str) -> Result<Provisioned, ApiError> {
        let name = self.client.stream_name(source_url);
        self.client
            .add_stream(&name, &bridge_source(source_url))
            .await?;
        let endpoint = self.client.endpoint(&name);
        debug!(source_url, endpoint = %endpoint, "bridge stream provisioned");
        Ok(Provisioned {
            endpoint,
            token: name,
        })
    }

    async fn release(&self, token: &str) -> Result<(), ApiError> {
        self.client.delete_stream(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cameras_use_ffmpeg_source() {
        assert_eq!(bridge_source("camera.front_door"), "ffmpeg:camera.front_door");
        assert_eq!(
            bridge_source("http://host/playlist.m3u8"),
            "http://host/playlist.m3u8"
        );
    }
}
