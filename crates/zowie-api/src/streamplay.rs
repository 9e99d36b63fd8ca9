// Streamplay (decoder) endpoints
//
// The decoder plays one of a list of configured sources, or an NDI source
// found on the network. Add/modify/delete put their fields at the top level
// of the body; switching uses `data`.

use serde_json::{json, Value};
use tracing::debug;

use crate::client::ProtocolClient;
use crate::envelope::{decode_value, Module, Request};
use crate::error::Error;
use crate::models::{DecoderStatus, NdiSource, StreamType, StreamplaySource};

impl ProtocolClient {
    /// Configured decoder sources.
    ///
    /// Usually `data.streamplay`; some firmware returns `data` as the bare list.
    pub async fn streamplay_sources(&self) -> Result<Vec<StreamplaySource>, Error> {
        let request = Request::get(Module::Streamplay, "streamplay").opt("get_streamplay_info");
        let response = self.execute(&request).await?;

        match response.data {
            Some(Value::Array(ref list)) => decode_value(Value::Array(list.clone())),
            _ => response.decode_section("streamplay"),
        }
    }

    /// `/streamplay getinfo {"group": "streamplay", "opt": "get_decoder_status"}`
    pub async fn decoder_status(&self) -> Result<DecoderStatus, Error> {
        let request = Request::get(Module::Streamplay, "streamplay").opt("get_decoder_status");
        self.execute(&request).await?.decode()
    }

    /// NDI sources the decoder currently sees.
    pub async fn ndi_sources(&self) -> Result<Vec<NdiSource>, Error> {
        let request = Request::get(Module::Streamplay, "streamplay").opt("get_ndi_sources");
        self.execute(&request).await?.decode_section("ndi_sources")
    }

    /// Ask the decoder to rescan for NDI sources.
    pub async fn ndi_find(&self) -> Result<(), Error> {
        let request = Request::set(Module::Streamplay, "streamplay").opt("ndi_find");
        self.execute(&request).await.map(|_| ())
    }

    /// Add a decoder source.
    pub async fn add_streamplay_source(
        &self,
        name: &str,
        url: &str,
        stream_type: StreamType,
        enabled: bool,
    ) -> Result<(), Error> {
        debug!(name, url, %stream_type, enabled, "adding decoder source");
        let request = Request::set(Module::Streamplay, "streamplay")
            .opt("streamplay_add")
            .field("name", json!(name))
            .field("url", json!(url))
            .field("streamtype", json!(stream_type.code()))
            .field("switch", json!(i64::from(enabled)));
        self.execute(&request).await.map(|_| ())
    }

    /// Replace the name, URL and transport of an existing source.
    pub async fn modify_streamplay_source(
        &self,
        index: i64,
        name: &str,
        url: &str,
        stream_type: StreamType,
    ) -> Result<(), Error> {
        debug!(index, name, url, %stream_type, "modifying decoder source");
        let request = Request::set(Module::Streamplay, "streamplay")
            .opt("streamplay_modify")
            .field("index", json!(index))
            .field("name", json!(name))
            .field("url", json!(url))
            .field("streamtype", json!(stream_type.code()));
        self.execute(&request).await.map(|_| ())
    }

    pub async fn delete_streamplay_source(&self, index: i64) -> Result<(), Error> {
        let request = Request::set(Module::Streamplay, "streamplay")
            .opt("streamplay_del")
            .field("index", json!(index));
        self.execute(&request).await.map(|_| ())
    }

    /// Turn a configured source on or off.
    pub async fn switch_streamplay_source(&self, index: i64, enabled: bool) -> Result<(), Error> {
        debug!(index, enabled, "switching decoder source");
        let request = Request::set(Module::Streamplay, "streamplay")
            .opt("streamplay_switch")
            .data(json!({ "index": index, "switch": i64::from(enabled) }));
        self.execute(&request).await.map(|_| ())
    }

    /// Switch off whichever configured source is active. No-op when none is.
    pub async fn stop_streamplay(&self) -> Result<(), Error> {
        let active = self
            .streamplay_sources()
            .await?
            .into_iter()
            .find(StreamplaySource::is_active)
            .and_then(|source| source.index);

        match active {
            Some(index) => self.switch_streamplay_source(index, false).await,
            None => {
                debug!("no active decoder source to stop");
                Ok(())
            }
        }
    }

    /// Decode the named NDI source.
    pub async fn enable_ndi_decoding(&self, ndi_name: &str) -> Result<(), Error> {
        debug!(ndi_name, "starting NDI decode");
        let request = Request::set(Module::Streamplay, "streamplay")
            .opt("ndi_enable")
            .field("ndi_name", json!(ndi_name));
        self.execute(&request).await.map(|_| ())
    }

    pub async fn disable_ndi_decoding(&self) -> Result<(), Error> {
        let request = Request::set(Module::Streamplay, "streamplay").opt("ndi_close");
        self.execute(&request).await.map(|_| ())
    }
}
