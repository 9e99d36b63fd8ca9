// Video module endpoints
//
// HDMI input/output, encoder channels, and the NDI encoder configuration.

use serde_json::{json, Value};
use tracing::debug;

use crate::client::ProtocolClient;
use crate::envelope::{Module, Request};
use crate::error::Error;
use crate::models::{EncoderChannel, InputSignal, NdiConfig, OutputInfo};

impl ProtocolClient {
    /// `/video getinfo {"group": "hdmi", "opt": "get_input_info"}`
    pub async fn input_signal(&self) -> Result<InputSignal, Error> {
        let request = Request::get(Module::Video, "hdmi").opt("get_input_info");
        self.execute(&request).await?.decode()
    }

    /// `/video getinfo {"group": "hdmi", "opt": "get_output_info"}`
    pub async fn output_info(&self) -> Result<OutputInfo, Error> {
        let request = Request::get(Module::Video, "hdmi").opt("get_output_info");
        self.execute(&request).await?.decode()
    }

    /// Encoder channels from the top-level `venc` array.
    ///
    /// `/video getinfo {"group": "venc"}`
    pub async fn encoder_channels(&self) -> Result<Vec<EncoderChannel>, Error> {
        let request = Request::get(Module::Video, "venc");
        self.execute(&request).await?.decode_section("venc")
    }

    /// `/video getinfo {"group": "ndi", "opt": "get_ndi_info"}`
    pub async fn ndi_config(&self) -> Result<NdiConfig, Error> {
        let request = Request::get(Module::Video, "ndi").opt("get_ndi_info");
        self.execute(&request).await?.decode()
    }

    /// Write the full NDI configuration.
    ///
    /// The device rejects partial payloads with `00003`; callers fetch with
    /// [`ndi_config`](Self::ndi_config), change fields, and write the whole
    /// record back. Reconfiguring NDI restarts the media pipeline.
    pub async fn set_ndi_config(&self, config: &NdiConfig) -> Result<(), Error> {
        let data = serde_json::to_value(config).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        debug!(switch = ?config.switch, mode_id = ?config.mode_id, "writing NDI config");
        let request = Request::set(Module::Video, "ndi")
            .opt("set_ndi_info")
            .data(data)
            .expecting_restart();
        self.execute(&request).await.map(|_| ())
    }

    /// Select an HDMI output format such as `1080p60`.
    pub async fn set_output_format(&self, format: &str) -> Result<(), Error> {
        self.set_output(json!({ "format": format })).await
    }

    /// Enable or disable HDMI loop-out.
    pub async fn set_loop_out(&self, enabled: bool) -> Result<(), Error> {
        self.set_output(json!({ "loop_out_switch": i64::from(enabled) }))
            .await
    }

    async fn set_output(&self, data: Value) -> Result<(), Error> {
        let request = Request::set(Module::Video, "hdmi")
            .opt("set_output_info")
            .data(data);
        self.execute(&request).await.map(|_| ())
    }

    /// Change the main channel codec (index into its codec list).
    pub async fn set_encoder_codec(&self, codec_id: i64) -> Result<(), Error> {
        self.set_main_encoder(json!({ "codec": { "selected_id": codec_id } }))
            .await
    }

    /// Change the main channel bitrate in bits per second.
    pub async fn set_encoder_bitrate(&self, bitrate: i64) -> Result<(), Error> {
        self.set_main_encoder(json!({ "bitrate": bitrate })).await
    }

    async fn set_main_encoder(&self, change: Value) -> Result<(), Error> {
        let mut channel = json!({ "venc_chnid": 0, "desc": "main" });
        if let (Some(target), Value::Object(fields)) = (channel.as_object_mut(), change) {
            target.extend(fields);
        }
        let request = Request::set(Module::Video, "venc")
            .field("venc", Value::Array(vec![channel]))
            .expecting_restart();
        self.execute(&request).await.map(|_| ())
    }
}
