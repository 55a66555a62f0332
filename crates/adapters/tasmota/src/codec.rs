//! Shared Tasmota codec plumbing.

use devbridge_app::codec::{Codec, Payload};
use devbridge_app::factory::CodecConfig;
use devbridge_app::ports::encoder::Request;
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::value::Value;

/// One Tasmota device. Models differ in the handlers their constructors
/// register and in the one-time configuration sent on first contact.
pub(crate) struct TasmotaCodec {
    device_name: String,
    friendly_name: String,
    stat_power_topic: String,
    sensor_topic: String,
    availability_topic: String,
    registry: devbridge_app::codec::HandlerRegistry,
    initial: Vec<Request>,
}

impl TasmotaCodec {
    pub(crate) fn new(config: &CodecConfig) -> Self {
        let prefix = topic_prefix(&config.base_topic);
        let device = &config.device_name;
        Self {
            device_name: device.clone(),
            friendly_name: config.friendly_name.clone(),
            stat_power_topic: format!("{prefix}stat/{device}/POWER"),
            sensor_topic: format!("{prefix}tele/{device}/SENSOR"),
            availability_topic: format!("{prefix}tele/{device}/LWT"),
            registry: devbridge_app::codec::HandlerRegistry::new(),
            initial: Vec::new(),
        }
    }

    /// Relay-state report topic, `stat/<device>/POWER` plus the channel
    /// digit on multi-relay devices.
    pub(crate) fn stat_power_topic(&self, channel: Option<u8>) -> String {
        match channel {
            None => self.stat_power_topic.clone(),
            Some(digit) => format!("{}{digit}", self.stat_power_topic),
        }
    }

    pub(crate) fn sensor_topic(&self) -> &str {
        &self.sensor_topic
    }

    pub(crate) fn registry_mut(&mut self) -> &mut devbridge_app::codec::HandlerRegistry {
        &mut self.registry
    }

    pub(crate) fn push_initial(&mut self, request: Request) {
        self.initial.push(request);
    }
}

impl Codec for TasmotaCodec {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn availability_topic(&self) -> &str {
        &self.availability_topic
    }

    fn decode_availability(&self, payload: &str) -> Result<bool, DecodingError> {
        match payload {
            "Online" => Ok(true),
            "Offline" => Ok(false),
            other => Err(DecodingError::UnknownAvailability {
                payload: truncate_payload(other),
            }),
        }
    }

    fn fit_payload(&self, topic: &str, raw: &str) -> Result<Payload, DecodingError> {
        if topic == self.sensor_topic {
            Payload::parse_json(raw)
        } else {
            Ok(Payload::Text(raw.to_string()))
        }
    }

    fn registry(&self) -> &devbridge_app::codec::HandlerRegistry {
        &self.registry
    }

    fn initial_requests(&self) -> Vec<Request> {
        self.initial.clone()
    }
}

/// `<base>/` when a base topic is configured, empty otherwise (Tasmota's
/// default full-topic layout has no base).
pub(crate) fn topic_prefix(base_topic: &str) -> String {
    if base_topic.is_empty() {
        String::new()
    } else {
        format!("{base_topic}/")
    }
}

/// Decode a relay-state report.
///
/// The empty payload is the device's response to a bare status query and
/// carries no state.
pub(crate) fn decode_power_report(
    topic: &str,
    payload: &Payload,
) -> Result<Option<Value>, DecodingError> {
    match payload.as_text() {
        Some("ON") => Ok(Some(Value::Bool(true))),
        Some("OFF") => Ok(Some(Value::Bool(false))),
        Some("") | None => Ok(None),
        Some(other) => Err(DecodingError::UnexpectedValue {
            value: truncate_payload(other),
            topic: topic.to_string(),
        }),
    }
}

/// Extract `section.property` from a telemetry JSON payload, naming the
/// missing piece on failure.
pub(crate) fn telemetry_value(
    payload: &Payload,
    section: &'static str,
    property: &'static str,
) -> Result<Option<f64>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    let section_doc = doc.get(section).ok_or_else(|| DecodingError::MissingKey {
        key: section,
        payload: truncate_payload(&doc.to_string()),
    })?;
    let value = section_doc
        .get(property)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| DecodingError::MissingKey {
            key: property,
            payload: truncate_payload(&doc.to_string()),
        })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TasmotaCodec {
        TasmotaCodec::new(&CodecConfig::new("plug_office", ""))
    }

    #[test]
    fn should_build_firmware_topics_without_base() {
        let codec = codec();
        assert_eq!(codec.availability_topic(), "tele/plug_office/LWT");
        assert_eq!(codec.sensor_topic(), "tele/plug_office/SENSOR");
        assert_eq!(codec.stat_power_topic(None), "stat/plug_office/POWER");
        assert_eq!(codec.stat_power_topic(Some(1)), "stat/plug_office/POWER1");
    }

    #[test]
    fn should_prefix_topics_with_base_when_configured() {
        let codec = TasmotaCodec::new(&CodecConfig::new("plug_office", "lab"));
        assert_eq!(codec.availability_topic(), "lab/tele/plug_office/LWT");
    }

    #[test]
    fn should_decode_capitalized_availability_vocabulary() {
        let codec = codec();
        assert!(codec.decode_availability("Online").unwrap());
        assert!(!codec.decode_availability("Offline").unwrap());
        assert!(codec.decode_availability("online").is_err());
    }

    #[test]
    fn should_decode_power_reports() {
        let on = Payload::Text("ON".to_string());
        let off = Payload::Text("OFF".to_string());
        let empty = Payload::Text(String::new());
        assert_eq!(decode_power_report("t", &on).unwrap(), Some(Value::Bool(true)));
        assert_eq!(decode_power_report("t", &off).unwrap(), Some(Value::Bool(false)));
        assert_eq!(decode_power_report("t", &empty).unwrap(), None);
        assert!(decode_power_report("t", &Payload::Text("HALF".into())).is_err());
    }

    #[test]
    fn should_name_missing_telemetry_section() {
        let payload = Payload::parse_json(r#"{"Time":"2024-04-16T09:15:03"}"#).unwrap();
        let err = telemetry_value(&payload, "ANALOG", "Temperature").unwrap_err();
        assert!(err.to_string().contains("ANALOG"));
    }

    #[test]
    fn should_name_missing_telemetry_property() {
        let payload = Payload::parse_json(r#"{"ANALOG":{"Humidity":50}}"#).unwrap();
        let err = telemetry_value(&payload, "ANALOG", "Temperature").unwrap_err();
        assert!(err.to_string().contains("Temperature"));
    }
}
