//! Shared Zigbee2MQTT codec plumbing.

use devbridge_app::codec::{Codec, HandlerRegistry, Payload};
use devbridge_app::factory::CodecConfig;
use devbridge_app::ports::encoder::Request;
use devbridge_domain::error::{DecodingError, truncate_payload};

/// Base topic Zigbee2MQTT publishes under when left unconfigured.
pub const DEFAULT_BASE_TOPIC: &str = "zigbee2mqtt";

/// One device behind the Zigbee2MQTT gateway.
///
/// All models share this shape; they differ only in the handlers their
/// constructors register and in the requests sent on first contact.
pub(crate) struct Z2mCodec {
    device_name: String,
    friendly_name: String,
    root_topic: String,
    availability_topic: String,
    registry: HandlerRegistry,
    initial: Vec<Request>,
}

impl Z2mCodec {
    pub(crate) fn new(config: &CodecConfig) -> Self {
        let base = if config.base_topic.is_empty() {
            DEFAULT_BASE_TOPIC
        } else {
            config.base_topic.as_str()
        };
        let root_topic = format!("{base}/{}", config.device_name);
        Self {
            device_name: config.device_name.clone(),
            friendly_name: config.friendly_name.clone(),
            availability_topic: format!("{root_topic}/availability"),
            root_topic,
            registry: HandlerRegistry::new(),
            initial: Vec::new(),
        }
    }

    /// Topic carrying the combined JSON payload.
    pub(crate) fn root_topic(&self) -> &str {
        &self.root_topic
    }

    /// Command topic (`<root>/set`).
    pub(crate) fn set_topic(&self) -> String {
        format!("{}/set", self.root_topic)
    }

    /// State-query topic (`<root>/get`).
    pub(crate) fn get_topic(&self) -> String {
        format!("{}/get", self.root_topic)
    }

    pub(crate) fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    pub(crate) fn push_initial(&mut self, request: Request) {
        self.initial.push(request);
    }
}

impl Codec for Z2mCodec {
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
            "online" => Ok(true),
            "offline" => Ok(false),
            // Gateways running with legacy_availability_payload disabled
            // wrap the state in JSON; flag the misconfiguration.
            r#"{"state":"online"}"# | r#"{"state":"offline"}"# => {
                tracing::error!(
                    device = %self.device_name,
                    "gateway misconfiguration: enable legacy_availability_payload"
                );
                Err(DecodingError::UnknownAvailability {
                    payload: truncate_payload(payload),
                })
            }
            other => Err(DecodingError::UnknownAvailability {
                payload: truncate_payload(other),
            }),
        }
    }

    fn fit_payload(&self, _topic: &str, raw: &str) -> Result<Payload, DecodingError> {
        Payload::parse_json(raw)
    }

    fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn initial_requests(&self) -> Vec<Request> {
        self.initial.clone()
    }
}
