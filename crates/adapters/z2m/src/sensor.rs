//! Passive Zigbee devices: air/soil sensors, buttons and motion sensors.
//!
//! All of them publish one combined JSON payload on the device root topic;
//! housekeeping fields (battery, linkquality, voltage) are not mapped to
//! any virtual device.

use devbridge_app::codec::{Codec, Payload};
use devbridge_app::device::VirtualDevice;
use devbridge_app::factory::CodecConfig;
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::kind::DeviceKind;
use devbridge_domain::value::Value;

use crate::codec::Z2mCodec;

fn missing_key(key: &'static str, payload: &Payload) -> DecodingError {
    let rendered = match payload {
        Payload::Json(doc) => doc.to_string(),
        Payload::Text(text) => text.clone(),
    };
    DecodingError::MissingKey {
        key,
        payload: truncate_payload(&rendered),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_int(value: f64) -> i64 {
    value.round() as i64
}

fn decode_temperature(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    doc.get("temperature")
        .and_then(serde_json::Value::as_f64)
        .map(Value::Float)
        .map(Some)
        .ok_or_else(|| missing_key("temperature", payload))
}

fn decode_humidity(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    doc.get("humidity")
        .and_then(serde_json::Value::as_f64)
        .map(|value| Value::Int(as_int(value)))
        .map(Some)
        .ok_or_else(|| missing_key("humidity", payload))
}

fn decode_soil_moisture(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    doc.get("soil_moisture")
        .and_then(serde_json::Value::as_f64)
        .map(|value| Value::Int(as_int(value)))
        .map(Some)
        .ok_or_else(|| missing_key("soil_moisture", payload))
}

fn decode_action(topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    let action = doc
        .get("action")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| missing_key("action", payload))?;
    match action {
        "single" | "double" | "long" => Ok(Some(Value::from(action))),
        other => Err(DecodingError::UnexpectedValue {
            value: truncate_payload(other),
            topic: topic.to_string(),
        }),
    }
}

fn decode_occupancy(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    doc.get("occupancy")
        .and_then(serde_json::Value::as_bool)
        .map(Value::Bool)
        .map(Some)
        .ok_or_else(|| missing_key("occupancy", payload))
}

/// Sonoff SNZB-02 air temperature and humidity sensor.
///
/// <https://www.zigbee2mqtt.io/devices/SNZB-02.html>
pub fn sonoff_snzb02(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let temperature = VirtualDevice::new(
        DeviceKind::Temperature,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let humidity = VirtualDevice::new(
        DeviceKind::Humidity,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_temperature, &temperature);
    codec.registry_mut().add(root.as_str(), decode_humidity, &humidity);
    Box::new(codec)
}

/// TuYa TS0601 soil sensor; soil moisture is surfaced as the humidity
/// property.
///
/// <https://www.zigbee2mqtt.io/devices/TS0601_soil.html>
pub fn ts0601_soil(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let temperature = VirtualDevice::new(
        DeviceKind::Temperature,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let moisture = VirtualDevice::new(
        DeviceKind::Humidity,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_temperature, &temperature);
    codec.registry_mut().add(root.as_str(), decode_soil_moisture, &moisture);
    Box::new(codec)
}

/// Sonoff SNZB-01 wireless button.
///
/// <https://www.zigbee2mqtt.io/devices/SNZB-01.html>
pub fn sonoff_snzb01(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let button = VirtualDevice::new(
        DeviceKind::Button,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_action, &button);
    Box::new(codec)
}

/// Sonoff SNZB-03 motion sensor.
///
/// <https://www.zigbee2mqtt.io/devices/SNZB-03.html>
pub fn sonoff_snzb3(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let motion = VirtualDevice::new(
        DeviceKind::Motion,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_occupancy, &motion);
    Box::new(codec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devbridge_app::bridge::Bridge;
    use devbridge_app::memory_bus::MemoryBus;
    use devbridge_app::ports::bus::SharedBus;
    use std::sync::Arc;

    fn bridged(constructor: fn(&CodecConfig) -> Box<dyn Codec>) -> Bridge {
        let bus: SharedBus = Arc::new(MemoryBus::new());
        let config = CodecConfig::new("probe", "zigbee2mqtt");
        Bridge::new(bus, constructor(&config))
    }

    #[tokio::test]
    async fn should_decode_air_sensor_payload_end_to_end() {
        let mut bridge = bridged(sonoff_snzb02);
        bridge
            .handle_message(
                "zigbee2mqtt/probe",
                r#"{"battery":100,"humidity":64,"linkquality":60,"temperature":19.649,"voltage":3000}"#,
            )
            .unwrap();

        let devices = bridge.devices();
        assert_eq!(devices[0].value(), Some(Value::Float(19.6)));
        assert_eq!(devices[1].value(), Some(Value::Int(64)));
    }

    #[tokio::test]
    async fn should_report_missing_sensor_key_without_losing_the_other() {
        let mut bridge = bridged(sonoff_snzb02);
        bridge
            .handle_message("zigbee2mqtt/probe", r#"{"temperature":21.0}"#)
            .unwrap();

        let devices = bridge.devices();
        assert_eq!(devices[0].value(), Some(Value::Float(21.0)));
        assert_eq!(devices[1].value(), None);
    }

    #[tokio::test]
    async fn should_map_soil_moisture_to_humidity() {
        let mut bridge = bridged(ts0601_soil);
        bridge
            .handle_message(
                "zigbee2mqtt/probe",
                r#"{"soil_moisture":41,"temperature":18.2}"#,
            )
            .unwrap();

        let devices = bridge.devices();
        assert_eq!(devices[0].value(), Some(Value::Float(18.2)));
        assert_eq!(devices[1].value(), Some(Value::Int(41)));
    }

    #[tokio::test]
    async fn should_decode_button_actions() {
        let mut bridge = bridged(sonoff_snzb01);
        for action in ["single", "double", "long"] {
            bridge
                .handle_message("zigbee2mqtt/probe", &format!(r#"{{"action":"{action}"}}"#))
                .unwrap();
            assert_eq!(bridge.devices()[0].value(), Some(Value::from(action)));
        }
    }

    #[tokio::test]
    async fn should_drop_unknown_button_action() {
        let mut bridge = bridged(sonoff_snzb01);
        bridge
            .handle_message("zigbee2mqtt/probe", r#"{"action":"triple"}"#)
            .unwrap();
        assert_eq!(bridge.devices()[0].value(), None);
    }

    #[tokio::test]
    async fn should_decode_occupancy() {
        let mut bridge = bridged(sonoff_snzb3);
        bridge
            .handle_message(
                "zigbee2mqtt/probe",
                r#"{"battery":100,"occupancy":true,"tamper":false}"#,
            )
            .unwrap();
        assert_eq!(bridge.devices()[0].value(), Some(Value::Bool(true)));
    }

    #[test]
    fn should_name_missing_key_in_error() {
        let payload = Payload::parse_json(r#"{"battery":100}"#).unwrap();
        let err = decode_occupancy("zigbee2mqtt/probe", &payload).unwrap_err();
        assert!(err.to_string().contains("occupancy"));
    }
}
