// Audio module endpoints

use serde_json::json;

use crate::client::ProtocolClient;
use crate::envelope::{Module, Request};
use crate::error::Error;
use crate::models::AudioInfo;

impl ProtocolClient {
    /// `/audio getinfo {"group": "all"}`, payload under the `all` key.
    pub async fn audio_info(&self) -> Result<AudioInfo, Error> {
        let request = Request::get(Module::Audio, "all");
        self.execute(&request).await?.decode_section("all")
    }

    /// Set output volume (0-100). Fails with a signal error when HDMI input is absent.
    pub async fn set_volume(&self, volume: u8) -> Result<(), Error> {
        let request = Request::set(Module::Audio, "audio").field("volume", json!(volume.min(100)));
        self.execute(&request).await.map(|_| ())
    }
}
