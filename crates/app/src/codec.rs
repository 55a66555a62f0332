//! Wire-format decoding contract.
//!
//! A codec owns the mapping from raw broker messages to virtual-device
//! updates for one physical device: which topics to subscribe to, how to
//! recognise availability payloads, and which decode handlers feed which
//! virtual devices.

use std::collections::HashMap;

use devbridge_domain::error::{ConfigurationError, DecodingError};
use devbridge_domain::value::Value;

use crate::device::VirtualDevice;
use crate::ports::encoder::Request;

/// A message body, pre-parsed once per delivery.
///
/// JSON-speaking protocols parse the body up front so every handler on the
/// topic shares the parse; plain-text payloads stay as-is.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Parse a raw body as JSON.
    ///
    /// # Errors
    ///
    /// [`DecodingError::InvalidJson`] when the body is not valid JSON.
    pub fn parse_json(raw: &str) -> Result<Self, DecodingError> {
        let value = serde_json::from_str(raw).map_err(|_| DecodingError::InvalidJson {
            payload: devbridge_domain::error::truncate_payload(raw),
        })?;
        Ok(Self::Json(value))
    }

    /// Borrow the JSON document, if this payload is one.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Borrow the plain-text body, if this payload is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Json(_) => None,
        }
    }
}

/// Extract one typed value from a payload.
///
/// `Ok(None)` means the field this handler looks for is absent from the
/// payload, which is normal for multi-property messages and must not be
/// treated as an error.
pub type DecodeFn = fn(topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError>;

struct Handler {
    decode: DecodeFn,
    device: VirtualDevice,
}

/// Topic-keyed multimap of decode handlers.
///
/// Several handlers may share a topic (one JSON document carrying several
/// properties) and the same virtual device may appear under several
/// topics.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Handler>>,
    devices: Vec<VirtualDevice>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic`, appended after any existing ones.
    pub fn add(&mut self, topic: impl Into<String>, decode: DecodeFn, device: &VirtualDevice) {
        if !self.devices.iter().any(|known| known.same_device(device)) {
            self.devices.push(device.clone());
        }
        self.handlers
            .entry(topic.into())
            .or_default()
            .push(Handler {
                decode,
                device: device.clone(),
            });
    }

    /// Topics with at least one handler.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn handles(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    /// Every distinct virtual device registered, in registration order.
    #[must_use]
    pub fn devices(&self) -> &[VirtualDevice] {
        &self.devices
    }

    /// Run every handler registered for `topic` against `payload`.
    ///
    /// Each handler yields `(device, decoded)` where `decoded` is `None`
    /// when the handler's field is absent. Handler order within a topic is
    /// registration order.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnregisteredTopic`] when no handler is
    /// registered for `topic`. Individual decode failures are returned in
    /// the per-handler results, not as a registry error.
    #[allow(clippy::type_complexity)]
    pub fn dispatch(
        &self,
        topic: &str,
        payload: &Payload,
    ) -> Result<Vec<(VirtualDevice, Result<Option<Value>, DecodingError>)>, ConfigurationError>
    {
        let handlers = self
            .handlers
            .get(topic)
            .ok_or_else(|| ConfigurationError::UnregisteredTopic {
                topic: topic.to_string(),
            })?;
        Ok(handlers
            .iter()
            .map(|handler| (handler.device.clone(), (handler.decode)(topic, payload)))
            .collect())
    }
}

/// Protocol-specific decoding for one physical device.
pub trait Codec: Send {
    /// Broker-facing device identifier (topic segment).
    fn device_name(&self) -> &str;

    /// Human-readable name used on the canonical surface.
    fn friendly_name(&self) -> &str;

    /// Topic carrying availability messages for this device.
    fn availability_topic(&self) -> &str;

    /// Decode an availability payload into online/offline.
    ///
    /// # Errors
    ///
    /// [`DecodingError::UnknownAvailability`] when the payload is outside
    /// the protocol's vocabulary.
    fn decode_availability(&self, payload: &str) -> Result<bool, DecodingError>;

    /// Pre-parse a raw body for `topic` into the payload form the
    /// handlers expect.
    ///
    /// # Errors
    ///
    /// [`DecodingError::InvalidJson`] when a JSON-carrying topic receives
    /// a malformed body.
    fn fit_payload(&self, topic: &str, raw: &str) -> Result<Payload, DecodingError>;

    /// Value-handler registry for this device.
    fn registry(&self) -> &HandlerRegistry;

    /// Requests to publish once the device first comes online.
    fn initial_requests(&self) -> Vec<Request> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("device_name", &self.device_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devbridge_domain::kind::DeviceKind;

    fn decode_temperature(
        _topic: &str,
        payload: &Payload,
    ) -> Result<Option<Value>, DecodingError> {
        let Some(doc) = payload.as_json() else {
            return Ok(None);
        };
        Ok(doc
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(Value::Float))
    }

    fn decode_humidity(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
        let Some(doc) = payload.as_json() else {
            return Ok(None);
        };
        Ok(doc
            .get("humidity")
            .and_then(serde_json::Value::as_i64)
            .map(Value::Int))
    }

    #[test]
    fn should_parse_json_payload() {
        let payload = Payload::parse_json(r#"{"temperature": 19.6}"#).unwrap();
        assert!(payload.as_json().is_some());
    }

    #[test]
    fn should_reject_malformed_json() {
        let err = Payload::parse_json("{not json").unwrap_err();
        assert!(matches!(err, DecodingError::InvalidJson { .. }));
    }

    #[test]
    fn should_dispatch_every_handler_on_a_shared_topic() {
        let temperature = VirtualDevice::new(DeviceKind::Temperature, "air", false);
        let humidity = VirtualDevice::new(DeviceKind::Humidity, "air", false);
        let mut registry = HandlerRegistry::new();
        registry.add("z/air", decode_temperature, &temperature);
        registry.add("z/air", decode_humidity, &humidity);

        let payload = Payload::parse_json(r#"{"temperature": 19.6, "humidity": 64}"#).unwrap();
        let results = registry.dispatch("z/air", &payload).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].1.as_ref().unwrap(),
            &Some(Value::Float(19.6))
        );
        assert_eq!(results[1].1.as_ref().unwrap(), &Some(Value::Int(64)));
    }

    #[test]
    fn should_yield_none_for_absent_field() {
        let humidity = VirtualDevice::new(DeviceKind::Humidity, "air", false);
        let mut registry = HandlerRegistry::new();
        registry.add("z/air", decode_humidity, &humidity);

        let payload = Payload::parse_json(r#"{"temperature": 19.6}"#).unwrap();
        let results = registry.dispatch("z/air", &payload).unwrap();
        assert_eq!(results[0].1.as_ref().unwrap(), &None);
    }

    #[test]
    fn should_fail_on_unregistered_topic() {
        let registry = HandlerRegistry::new();
        let err = registry
            .dispatch("z/ghost", &Payload::Text(String::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnregisteredTopic { .. }));
    }

    #[test]
    fn should_deduplicate_devices_registered_under_several_topics() {
        let device = VirtualDevice::new(DeviceKind::Temperature, "air", false);
        let mut registry = HandlerRegistry::new();
        registry.add("z/air", decode_temperature, &device);
        registry.add("z/air/backup", decode_temperature, &device);

        assert_eq!(registry.devices().len(), 1);
    }
}
