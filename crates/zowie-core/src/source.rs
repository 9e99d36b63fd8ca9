// ── Playback sources ──
//
// What a caller can ask the decoder to play, and how each kind of source
// reaches it: natively, through the stream bridge, or not at all.

use std::fmt;

use serde::Serialize;
use zowie_api::models::StreamType;

use crate::error::CoreError;

/// URL scheme of a direct source reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SourceScheme {
    Rtsp,
    Rtmp,
    Srt,
    Http,
    Https,
    /// A host camera entity (`camera.<id>`).
    Camera,
    Other(String),
}

impl SourceScheme {
    pub fn parse(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "rtsp" | "rtsps" => Self::Rtsp,
            "rtmp" | "rtmps" => Self::Rtmp,
            "srt" => Self::Srt,
            "http" => Self::Http,
            "https" => Self::Https,
            "camera" => Self::Camera,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// A requested playback source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StreamSourceRef {
    /// A source already configured on the device, by index.
    ConfiguredOutput(i64),
    /// Another device on the network, by serial.
    DiscoveredPeer(String),
    /// An arbitrary URL or host camera reference.
    DirectUrl {
        scheme: SourceScheme,
        address: String,
    },
}

impl StreamSourceRef {
    /// Build a direct reference from user input: a URL with a scheme, or a
    /// `camera.<id>` entity reference.
    pub fn url(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();
        if input.starts_with("camera.") {
            return Ok(Self::DirectUrl {
                scheme: SourceScheme::Camera,
                address: input.to_owned(),
            });
        }
        let Some((scheme, rest)) = input.split_once("://") else {
            return Err(CoreError::UnsupportedSource {
                source_ref: input.to_owned(),
            });
        };
        if scheme.is_empty() || rest.is_empty() {
            return Err(CoreError::UnsupportedSource {
                source_ref: input.to_owned(),
            });
        }
        Ok(Self::DirectUrl {
            scheme: SourceScheme::parse(scheme),
            address: input.to_owned(),
        })
    }

    /// How this source reaches the decoder.
    pub fn route(&self) -> Result<Route, CoreError> {
        match self {
            Self::ConfiguredOutput(index) => Ok(Route::Configured(*index)),
            Self::DiscoveredPeer(serial) => Ok(Route::Peer(serial.clone())),
            Self::DirectUrl { scheme, address } => match scheme {
                SourceScheme::Rtsp => Ok(Route::Direct(StreamType::Rtsp)),
                SourceScheme::Rtmp => Ok(Route::Direct(StreamType::Rtmp)),
                SourceScheme::Srt => Ok(Route::Direct(StreamType::Srt)),
                SourceScheme::Http | SourceScheme::Https | SourceScheme::Camera => {
                    Ok(Route::Bridged)
                }
                SourceScheme::Other(_) => Err(CoreError::UnsupportedSource {
                    source_ref: address.clone(),
                }),
            },
        }
    }
}

impl fmt::Display for SourceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rtsp => "rtsp",
            Self::Rtmp => "rtmp",
            Self::Srt => "srt",
            Self::Http => "http",
            Self::Https => "https",
            Self::Camera => "camera",
            Self::Other(scheme) => scheme,
        })
    }
}

impl fmt::Display for StreamSourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfiguredOutput(index) => write!(f, "source #{index}"),
            Self::DiscoveredPeer(serial) => write!(f, "peer {serial}"),
            Self::DirectUrl { address, .. } => f.write_str(address),
        }
    }
}

/// Resolution path for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Configured(i64),
    Peer(String),
    /// The decoder plays it natively.
    Direct(StreamType),
    /// Needs the stream bridge first.
    Bridged,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn native_transports_are_direct() {
        for (url, expected) in [
            ("rtsp://host/stream", StreamType::Rtsp),
            ("RTMP://host/live/key", StreamType::Rtmp),
            ("srt://host:9000", StreamType::Srt),
        ] {
            let source = StreamSourceRef::url(url).unwrap();
            assert_eq!(source.route().unwrap(), Route::Direct(expected), "{url}");
        }
    }

    #[test]
    fn http_and_cameras_are_bridged() {
        for url in [
            "http://host/playlist.m3u8",
            "https://host/manifest.mpd",
            "http://host/stream.ts",
            "camera.front_door",
        ] {
            let source = StreamSourceRef::url(url).unwrap();
            assert_eq!(source.route().unwrap(), Route::Bridged, "{url}");
        }
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        let source = StreamSourceRef::url("udp://239.0.0.1:5000").unwrap();
        assert!(matches!(
            source.route(),
            Err(CoreError::UnsupportedSource { .. })
        ));
        assert!(StreamSourceRef::url("not a url").is_err());
        assert!(StreamSourceRef::url("rtsp://").is_err());
    }
}
