// Stream module endpoints
//
// Publish destinations (RTMP/SRT). NDI encode settings live under video.

use serde_json::json;
use tracing::debug;

use crate::client::ProtocolClient;
use crate::envelope::{Module, Request};
use crate::error::Error;
use crate::models::PublishEntry;

impl ProtocolClient {
    /// Publish destinations from the `publish` list.
    ///
    /// `/stream getinfo {"group": "publish"}`
    pub async fn publish_list(&self) -> Result<Vec<PublishEntry>, Error> {
        let request = Request::get(Module::Stream, "publish");
        self.execute(&request).await?.decode_section("publish")
    }

    /// Toggle the publish destination of the given type (`rtmp`, `srt`).
    ///
    /// Looks up the destination's index first; an unknown type is a
    /// validation error since nothing on the device matches it.
    pub async fn set_publish_enabled(&self, kind: &str, enabled: bool) -> Result<(), Error> {
        let index = self
            .publish_list()
            .await?
            .into_iter()
            .find(|entry| entry.kind.as_deref() == Some(kind))
            .and_then(|entry| entry.index)
            .ok_or_else(|| Error::Validation {
                code: "00003".into(),
                message: format!("no '{kind}' destination in publish list"),
            })?;

        debug!(kind, index, enabled, "switching publish destination");
        let request = Request::set(Module::Stream, "publish")
            .opt("update_publish_switch")
            .data(json!({ "index": index, "switch": i64::from(enabled) }));
        self.execute(&request).await.map(|_| ())
    }

    /// Set the RTMP destination, appending the stream key when given.
    pub async fn set_rtmp_url(&self, url: &str, key: Option<&str>) -> Result<(), Error> {
        let full = match key {
            Some(key) => format!("{}/{key}", url.trim_end_matches('/')),
            None => url.to_owned(),
        };
        let request = Request::set(Module::Stream, "publish")
            .opt("update_publish_url")
            .data(json!({ "index": 0, "type": "rtmp", "url": full }));
        self.execute(&request).await.map(|_| ())
    }

    /// Configure the SRT listener.
    pub async fn set_srt_settings(
        &self,
        port: u16,
        latency_ms: Option<u32>,
        passphrase: Option<&str>,
    ) -> Result<(), Error> {
        let mut data = json!({ "index": 1, "type": "srt", "port": port });
        if let Some(latency) = latency_ms {
            data["latency"] = json!(latency);
        }
        if let Some(passphrase) = passphrase {
            data["passphrase"] = json!(passphrase);
        }
        let request = Request::set(Module::Stream, "publish")
            .opt("update_srt_info")
            .data(data);
        self.execute(&request).await.map(|_| ())
    }
}
