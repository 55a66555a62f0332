//! Hardware model and wire-protocol lookup keys.
//!
//! Closed enumerations used purely as keys into the codec factory. Labels
//! match what the gateways report in their discovery payloads.

use serde::{Deserialize, Serialize};

/// Hardware model of a physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    /// TuYa TS0002 Zigbee dual-relay switch module.
    #[serde(rename = "TS0002")]
    TuyaTs0002,
    /// Neo NAS-AB02B2 Zigbee siren.
    #[serde(rename = "NAS-AB02B2")]
    NeoAlarm,
    /// Shelly Plug S WiFi smart plug (Tasmota firmware).
    #[serde(rename = "Shelly Plug S")]
    ShellyPlugS,
    /// Shelly Uni WiFi relay (Tasmota firmware).
    #[serde(rename = "Shelly Uni")]
    ShellyUni,
    /// TuYa TS0601 Zigbee soil moisture sensor.
    #[serde(rename = "TS0601_soil")]
    TuyaSoil,
    /// Sonoff SNZB-02 Zigbee air temperature/humidity sensor.
    #[serde(rename = "SNZB-02")]
    ZbAirSensor,
    /// Sonoff SNZB-01 Zigbee wireless button.
    #[serde(rename = "SNZB-01")]
    ZbButton,
    /// Sonoff SNZB-03 Zigbee motion sensor.
    #[serde(rename = "SNZB-03")]
    ZbMotion,
    /// Sonoff ZBMINI-L Zigbee switch module.
    #[serde(rename = "ZBMINI-L")]
    ZbMini,
    /// No model reported.
    #[serde(rename = "None")]
    None,
    /// A model label the bridge does not recognize.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Model {
    /// Every model with a concrete label (excludes the sentinels).
    const LABELLED: [(Model, &'static str); 9] = [
        (Model::TuyaTs0002, "TS0002"),
        (Model::NeoAlarm, "NAS-AB02B2"),
        (Model::ShellyPlugS, "Shelly Plug S"),
        (Model::ShellyUni, "Shelly Uni"),
        (Model::TuyaSoil, "TS0601_soil"),
        (Model::ZbAirSensor, "SNZB-02"),
        (Model::ZbButton, "SNZB-01"),
        (Model::ZbMotion, "SNZB-03"),
        (Model::ZbMini, "ZBMINI-L"),
    ];

    /// Map a discovery label to a model.
    ///
    /// Absent labels map to [`Model::None`], unrecognized labels to
    /// [`Model::Unknown`] — discovery never fails on an exotic device.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::None;
        };
        Self::LABELLED
            .iter()
            .find(|(_, known)| *known == label)
            .map_or(Self::Unknown, |(model, _)| *model)
    }

    /// The vendor label for this model.
    #[must_use]
    pub fn label(self) -> &'static str {
        Self::LABELLED
            .iter()
            .find(|(model, _)| *model == self)
            .map_or_else(
                || match self {
                    Self::None => "None",
                    _ => "Unknown",
                },
                |(_, label)| label,
            )
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Wire-protocol family a device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Resolve to the sole registered protocol for a model.
    #[serde(rename = "default")]
    Default,
    /// Zigbee2MQTT gateway.
    #[serde(rename = "Zigbee2MQTT")]
    Z2m,
    /// Tasmota firmware speaking directly to the broker.
    #[serde(rename = "Tasmota")]
    Tasmota,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Z2m => f.write_str("Zigbee2MQTT"),
            Self::Tasmota => f.write_str("Tasmota"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_known_label_to_model() {
        assert_eq!(Model::from_label(Some("SNZB-02")), Model::ZbAirSensor);
        assert_eq!(Model::from_label(Some("ZBMINI-L")), Model::ZbMini);
    }

    #[test]
    fn should_map_absent_label_to_none() {
        assert_eq!(Model::from_label(None), Model::None);
    }

    #[test]
    fn should_map_unrecognized_label_to_unknown() {
        assert_eq!(Model::from_label(Some("FRIDGE-9000")), Model::Unknown);
    }

    #[test]
    fn should_roundtrip_label() {
        for (model, label) in Model::LABELLED {
            assert_eq!(Model::from_label(Some(label)), model);
            assert_eq!(model.label(), label);
        }
    }

    #[test]
    fn should_deserialize_model_from_vendor_label() {
        let model: Model = serde_json::from_str("\"SNZB-01\"").unwrap();
        assert_eq!(model, Model::ZbButton);
    }

    #[test]
    fn should_deserialize_protocol_from_label() {
        let protocol: Protocol = serde_json::from_str("\"Zigbee2MQTT\"").unwrap();
        assert_eq!(protocol, Protocol::Z2m);
    }
}
