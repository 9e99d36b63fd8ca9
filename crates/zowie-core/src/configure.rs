// ── Stream configuration ──
//
// Writes to endpoints the device only accepts whole. Each operation reads
// the current record, overlays the requested change, and writes the full
// record back; fields the caller did not mention keep their device values.

use serde::Serialize;
use tracing::debug;
use zowie_api::models::NdiConfig;
use zowie_api::ProtocolClient;

use crate::error::CoreError;

/// Requested NDI changes. `None` leaves a field as the device has it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NdiChange {
    pub enabled: Option<bool>,
    pub machine_name: Option<String>,
    pub groups: Option<String>,
    pub mode_id: Option<i64>,
}

impl NdiChange {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overlay this change onto `config`.
    pub fn apply(&self, config: &mut NdiConfig) {
        if let Some(enabled) = self.enabled {
            config.switch = Some(i64::from(enabled));
        }
        if let Some(ref name) = self.machine_name {
            config.machinename = Some(name.clone());
        }
        if let Some(ref groups) = self.groups {
            config.groups = Some(groups.clone());
        }
        if let Some(mode_id) = self.mode_id {
            config.mode_id = Some(mode_id);
        }
    }
}

/// Read-merge-write the NDI configuration. Returns the record written.
///
/// An empty change is a read: nothing is written.
pub async fn configure_ndi(
    client: &ProtocolClient,
    change: &NdiChange,
) -> Result<NdiConfig, CoreError> {
    let mut config = client.ndi_config().await?;
    if change.is_empty() {
        return Ok(config);
    }

    change.apply(&mut config);
    debug!(?change, "writing merged NDI config");
    client.set_ndi_config(&config).await?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn apply_keeps_untouched_fields() {
        let mut config: NdiConfig = serde_json::from_value(json!({
            "switch": 0,
            "machinename": "ZOWIEBOX-1",
            "mode_id": 2,
            "groups": "public",
            "activate": 1,
            "ndi_multicast": {"switch": 0, "ttl": 1}
        }))
        .unwrap();

        NdiChange {
            enabled: Some(true),
            ..NdiChange::default()
        }
        .apply(&mut config);

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "switch": 1,
                "machinename": "ZOWIEBOX-1",
                "mode_id": 2,
                "groups": "public",
                "activate": 1,
                "ndi_multicast": {"switch": 0, "ttl": 1}
            })
        );
    }

    #[test]
    fn default_change_is_empty() {
        assert!(NdiChange::default().is_empty());
        assert!(
            !NdiChange {
                mode_id: Some(1),
                ..NdiChange::default()
            }
            .is_empty()
        );
    }
}
