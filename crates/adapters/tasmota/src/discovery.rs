//! Discovery from Tasmota's retained per-device config topics.
//!
//! Devices with `SetOption19 0` publish a retained descriptor on
//! `tasmota/discovery/<MAC>/config`; each message describes exactly one
//! device, so results upsert into the device list by address.

use serde::Deserialize;

use devbridge_app::discovery::{DiscoveryParser, MergeStrategy};
use devbridge_domain::device::Device;
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::model::{Model, Protocol};

const DISCOVERY_PREFIX: &str = "tasmota/discovery/";
const CONFIG_SUFFIX: &str = "/config";

#[derive(Debug, Deserialize)]
struct ConfigEntry {
    /// MAC address.
    mac: String,
    /// Device name.
    dn: String,
    /// Module or template name, absent on unconfigured devices.
    md: Option<String>,
}

/// Parses per-device retained discovery descriptors.
#[derive(Debug, Default)]
pub struct TasmotaDiscoveryParser;

impl TasmotaDiscoveryParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DiscoveryParser for TasmotaDiscoveryParser {
    fn subscription_topics(&self) -> Vec<String> {
        vec![format!("{DISCOVERY_PREFIX}+{CONFIG_SUFFIX}")]
    }

    fn matches(&self, topic: &str) -> bool {
        topic.starts_with(DISCOVERY_PREFIX) && topic.ends_with(CONFIG_SUFFIX)
    }

    fn merge_strategy(&self) -> MergeStrategy {
        MergeStrategy::UpsertByAddress
    }

    fn parse(&self, _topic: &str, payload: &str) -> Result<Vec<Device>, DecodingError> {
        let entry: ConfigEntry =
            serde_json::from_str(payload).map_err(|_| DecodingError::InvalidJson {
                payload: truncate_payload(payload),
            })?;
        Ok(vec![Device {
            address: entry.mac,
            friendly_name: entry.dn,
            model: Model::from_label(entry.md.as_deref()),
            protocol: Protocol::Tasmota,
        }])
    }
}
