// Device response types
//
// Typed records for each group payload. Firmware revisions disagree about
// field presence and about numbers-vs-strings, so optional fields use
// `#[serde(default)]` and numeric fields go through the `lenient` helpers.
// Unknown fields are ignored, or kept in `extra` where a record is written
// back to the device.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── System ───────────────────────────────────────────────────────────

/// `sys_attr` / `get_sys_attr_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemAttributes {
    #[serde(default, rename = "SN", deserialize_with = "lenient::string")]
    pub serial: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub firmware_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub hardware_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ndi_version: Option<String>,
}

/// `get_dashboard_info`: uptime and load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Seconds since boot.
    #[serde(default, deserialize_with = "lenient::int")]
    pub persistent_time: Option<i64>,
    /// Boot timestamp as reported (the device spells it `strat`).
    #[serde(default, rename = "device_strat_time", deserialize_with = "lenient::string")]
    pub device_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub cpu_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub cpu_payload: Option<f64>,
    #[serde(default)]
    pub memory_info: Option<MemoryInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    #[serde(default, deserialize_with = "lenient::int")]
    pub used: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub total: Option<i64>,
}

/// `syscontrol` run status: 0 = standby, 1 = running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default, deserialize_with = "lenient::int")]
    pub run_status: Option<i64>,
}

impl RunStatus {
    pub fn is_standby(&self) -> bool {
        self.run_status == Some(0)
    }
}

// ── Video ────────────────────────────────────────────────────────────

/// `hdmi` / `get_input_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSignal {
    #[serde(default, deserialize_with = "lenient::int")]
    pub signal: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub hdmi_signal: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub height: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub framerate: Option<i64>,
}

impl InputSignal {
    /// Either signal key reporting 1 counts as a live input.
    pub fn has_signal(&self) -> bool {
        self.signal == Some(1) || self.hdmi_signal == Some(1)
    }
}

/// A device-side pick list: options plus the selected index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectList {
    #[serde(default, alias = "codec_list")]
    pub list: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub selected_id: Option<i64>,
}

impl SelectList {
    /// The selected option rendered as text.
    pub fn selected(&self) -> Option<String> {
        let index = usize::try_from(self.selected_id?).ok()?;
        self.list.get(index).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// `hdmi` / `get_output_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub format: Option<String>,
    #[serde(default)]
    pub format_list: Option<SelectList>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub loop_out_switch: Option<i64>,
}

/// One entry of the top-level `venc` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderChannel {
    #[serde(default, deserialize_with = "lenient::int")]
    pub venc_chnid: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub desc: Option<String>,
    #[serde(default)]
    pub codec: Option<SelectList>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub height: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub framerate: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub bitrate: Option<i64>,
}

impl EncoderChannel {
    pub fn codec_name(&self) -> Option<String> {
        self.codec.as_ref().and_then(SelectList::selected)
    }
}

/// Pick the `desc == "main"` channel, falling back to the first.
pub fn main_encoder(channels: &[EncoderChannel]) -> Option<&EncoderChannel> {
    channels
        .iter()
        .find(|channel| channel.desc.as_deref() == Some("main"))
        .or_else(|| channels.first())
}

/// `ndi` / `get_ndi_info`.
///
/// The device rejects partial `set_ndi_info` writes, so this record keeps
/// every field it was given in `extra` and serializes back losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NdiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::int")]
    pub switch: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::string")]
    pub machinename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::int")]
    pub mode_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::string")]
    pub groups: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::int")]
    pub activate: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NdiConfig {
    pub fn is_enabled(&self) -> bool {
        self.switch == Some(1)
    }
}

// ── Audio ────────────────────────────────────────────────────────────

/// `all` section of the audio module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    #[serde(default, alias = "switch", deserialize_with = "lenient::int")]
    pub audio_enabled: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub input_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub codec: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub sample_rate: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub bitrate: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub volume: Option<i64>,
}

// ── Stream (publish) ─────────────────────────────────────────────────

/// One entry of the `publish` list (RTMP/SRT outputs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishEntry {
    #[serde(default, deserialize_with = "lenient::int")]
    pub index: Option<i64>,
    #[serde(default, rename = "type", deserialize_with = "lenient::string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub switch: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
}

impl PublishEntry {
    pub fn is_enabled(&self) -> bool {
        self.switch == Some(1)
    }
}

// ── Streamplay (decoder) ─────────────────────────────────────────────

/// Transport of a decoder source, as the device numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreamType {
    Rtsp,
    Rtmp,
    Srt,
    Http,
}

impl StreamType {
    pub fn code(self) -> i64 {
        match self {
            Self::Rtsp => 1,
            Self::Rtmp => 2,
            Self::Srt => 3,
            Self::Http => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Rtsp),
            2 => Some(Self::Rtmp),
            3 => Some(Self::Srt),
            4 => Some(Self::Http),
            _ => None,
        }
    }

    /// Map a URL scheme onto a decoder transport.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "rtsp" | "rtsps" => Some(Self::Rtsp),
            "rtmp" | "rtmps" => Some(Self::Rtmp),
            "srt" => Some(Self::Srt),
            "http" | "https" => Some(Self::Http),
            _ => None,
        }
    }
}

/// A configured decoder source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamplaySource {
    #[serde(default, deserialize_with = "lenient::int")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub switch: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub streamtype: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub streamplay_status: Option<i64>,
}

impl StreamplaySource {
    pub fn is_active(&self) -> bool {
        self.switch == Some(1)
    }
}

/// Decoder runtime status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderStatus {
    #[serde(default, deserialize_with = "lenient::int")]
    pub decoder_state: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub active_source: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub height: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub framerate: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub bandwidth: Option<i64>,
}

impl DecoderStatus {
    pub fn is_playing(&self) -> bool {
        self.decoder_state == Some(1)
    }
}

/// An NDI source visible to the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NdiSource {
    #[serde(default, deserialize_with = "lenient::int")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
}

// ── Lenient scalar decoding ──────────────────────────────────────────

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Integer from a number or numeric string; anything else is `None`.
    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .and_then(|f| format!("{f:.0}").parse().ok())
            }),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(Value::Bool(b)) => Some(i64::from(b)),
            _ => None,
        })
    }

    /// Float from a number or numeric string.
    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// String from a string or a scalar.
    pub fn string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_and_strings_both_decode() {
        let input: InputSignal =
            serde_json::from_value(json!({"signal": "1", "width": 1920, "height": "1080"}))
                .unwrap();
        assert_eq!(input.signal, Some(1));
        assert_eq!(input.height, Some(1080));
        assert!(input.has_signal());

        let attrs: SystemAttributes =
            serde_json::from_value(json!({"SN": 12345, "device_name": "Box"})).unwrap();
        assert_eq!(attrs.serial.as_deref(), Some("12345"));
    }

    #[test]
    fn main_encoder_prefers_main_desc() {
        let channels: Vec<EncoderChannel> = serde_json::from_value(json!([
            {"venc_chnid": 1, "desc": "sub"},
            {"venc_chnid": 0, "desc": "main",
             "codec": {"codec_list": ["H.264", "H.265"], "selected_id": 1}},
        ]))
        .unwrap();
        let main = main_encoder(&channels).unwrap();
        assert_eq!(main.venc_chnid, Some(0));
        assert_eq!(main.codec_name().as_deref(), Some("H.265"));
        assert!(main_encoder(&[]).is_none());
    }

    #[test]
    fn ndi_config_keeps_unknown_fields() {
        let raw = json!({
            "switch": 1,
            "machinename": "ZowieBox-1234",
            "mode_id": 2,
            "groups": "public",
            "activate": 1,
            "enc_type": 0,
            "multicast": {"switch": 0}
        });
        let mut config: NdiConfig = serde_json::from_value(raw.clone()).unwrap();
        assert!(config.is_enabled());
        config.switch = Some(0);

        let written = serde_json::to_value(&config).unwrap();
        assert_eq!(written["switch"], json!(0));
        assert_eq!(written["enc_type"], raw["enc_type"]);
        assert_eq!(written["multicast"], raw["multicast"]);
    }

    #[test]
    fn stream_type_codes() {
        assert_eq!(StreamType::from_scheme("RTSP"), Some(StreamType::Rtsp));
        assert_eq!(StreamType::from_scheme("https").map(StreamType::code), Some(4));
        assert_eq!(StreamType::from_code(3), Some(StreamType::Srt));
        assert_eq!(StreamType::from_scheme("udp"), None);
    }
}
