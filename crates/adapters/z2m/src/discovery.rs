//! Discovery from the gateway's retained device list.
//!
//! Zigbee2MQTT republishes the whole device list on
//! `<base>/bridge/devices` whenever the network changes; only end devices
//! are kept (the coordinator and routers are infrastructure, not devices
//! to bridge).

use serde::Deserialize;

use devbridge_app::discovery::{DiscoveryParser, MergeStrategy};
use devbridge_domain::device::Device;
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::model::{Model, Protocol};

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    ieee_address: String,
    friendly_name: String,
    #[serde(rename = "type")]
    device_type: String,
    definition: Option<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    model: Option<String>,
}

/// Parses the gateway-wide retained device list.
pub struct ZigbeeDiscoveryParser {
    devices_topic: String,
}

impl ZigbeeDiscoveryParser {
    #[must_use]
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            devices_topic: format!("{}/bridge/devices", base_topic.into()),
        }
    }
}

impl DiscoveryParser for ZigbeeDiscoveryParser {
    fn subscription_topics(&self) -> Vec<String> {
        vec![self.devices_topic.clone()]
    }

    fn matches(&self, topic: &str) -> bool {
        topic == self.devices_topic
    }

    fn merge_strategy(&self) -> MergeStrategy {
        MergeStrategy::Replace
    }

    fn parse(&self, _topic: &str, payload: &str) -> Result<Vec<Device>, DecodingError> {
        let entries: Vec<DeviceEntry> =
            serde_json::from_str(payload).map_err(|_| DecodingError::InvalidJson {
                payload: truncate_payload(payload),
            })?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.device_type == "EndDevice")
            .map(|entry| Device {
                address: entry.ieee_address,
                friendly_name: entry.friendly_name,
                model: Model::from_label(
                    entry
                        .definition
                        .as_ref()
                        .and_then(|definition| definition.model.as_deref()),
                ),
                protocol: Protocol::Z2m,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_LIST: &str = r#"[
        {"ieee_address":"0x00124b0098b3bd47","type":"Coordinator","friendly_name":"Coordinator"},
        {"ieee_address":"0x00124b00250bd193","type":"EndDevice","friendly_name":"garden_probe",
         "definition":{"model":"SNZB-02","vendor":"SONOFF"}},
        {"ieee_address":"0xa4c138b6a4e2fa2b","type":"Router","friendly_name":"relay_hall",
         "definition":{"model":"ZBMINI-L","vendor":"SONOFF"}},
        {"ieee_address":"0xa4c1384e1b8f1bb5","type":"EndDevice","friendly_name":"mystery",
         "definition":{"model":"FRIDGE-9000","vendor":"ACME"}},
        {"ieee_address":"0x00124b0022abcdEf","type":"EndDevice","friendly_name":"bare"}
    ]"#;

    #[test]
    fn should_keep_end_devices_only() {
        let parser = ZigbeeDiscoveryParser::new("zigbee2mqtt");
        let devices = parser.parse("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();

        let names: Vec<_> = devices.iter().map(|d| d.friendly_name.as_str()).collect();
        assert_eq!(names, vec!["garden_probe", "mystery", "bare"]);
    }

    #[test]
    fn should_map_labels_through_the_model_table() {
        let parser = ZigbeeDiscoveryParser::new("zigbee2mqtt");
        let devices = parser.parse("zigbee2mqtt/bridge/devices", DEVICE_LIST).unwrap();

        assert_eq!(devices[0].model, Model::ZbAirSensor);
        assert_eq!(devices[1].model, Model::Unknown);
        assert_eq!(devices[2].model, Model::None);
        assert!(devices.iter().all(|d| d.protocol == Protocol::Z2m));
    }

    #[test]
    fn should_reject_malformed_device_list() {
        let parser = ZigbeeDiscoveryParser::new("zigbee2mqtt");
        let err = parser
            .parse("zigbee2mqtt/bridge/devices", "not a list")
            .unwrap_err();
        assert!(matches!(err, DecodingError::InvalidJson { .. }));
    }

    #[test]
    fn should_match_only_the_device_list_topic() {
        let parser = ZigbeeDiscoveryParser::new("zigbee2mqtt");
        assert!(parser.matches("zigbee2mqtt/bridge/devices"));
        assert!(!parser.matches("zigbee2mqtt/garden_probe"));
        assert_eq!(parser.merge_strategy(), MergeStrategy::Replace);
    }
}
