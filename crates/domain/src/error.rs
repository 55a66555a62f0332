//! Error taxonomy shared across the workspace.
//!
//! Three distinct classes, matching how they must be handled:
//!
//! - [`DecodingError`] — malformed or semantically-invalid payload.
//!   Recoverable: logged with truncated payload context, message dropped.
//! - [`ConfigurationError`] — wiring mistakes (unregistered topic, unknown
//!   model/protocol pair). Programmer error, fails fast.
//! - [`DeviceError`] — invalid value or binding on a typed virtual device,
//!   raised immediately at the call site.

use crate::kind::DeviceKind;
use crate::model::{Model, Protocol};
use crate::value::ValueType;

/// Maximum number of payload characters kept in error messages.
const PAYLOAD_CONTEXT_LEN: usize = 100;

/// Truncate a payload for inclusion in an error message.
#[must_use]
pub fn truncate_payload(payload: &str) -> String {
    if payload.len() <= PAYLOAD_CONTEXT_LEN {
        payload.to_string()
    } else {
        let cut = payload
            .char_indices()
            .take_while(|(idx, _)| *idx < PAYLOAD_CONTEXT_LEN)
            .last()
            .map_or(0, |(idx, ch)| idx + ch.len_utf8());
        format!("{}…", &payload[..cut])
    }
}

/// A payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {payload}")]
    InvalidJson {
        /// Offending payload, truncated.
        payload: String,
    },

    /// An expected key or section is missing from a JSON payload.
    #[error("missing {key:?} in payload: {payload}")]
    MissingKey {
        /// The missing key or section name.
        key: &'static str,
        /// Offending payload, truncated.
        payload: String,
    },

    /// A field carried a value outside the protocol's vocabulary.
    #[error("unexpected value {value:?} on topic {topic:?}")]
    UnexpectedValue {
        /// The offending value, truncated.
        value: String,
        /// Topic the message arrived on.
        topic: String,
    },

    /// An availability payload outside the protocol's defined vocabulary.
    #[error("unknown availability payload: {payload}")]
    UnknownAvailability {
        /// Offending payload, truncated.
        payload: String,
    },
}

/// The core was wired incorrectly.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A message arrived on a topic with no registered handler.
    #[error("no handler registered for topic {topic:?}")]
    UnregisteredTopic {
        /// The unhandled topic.
        topic: String,
    },

    /// No codec constructor is registered for the model at all.
    #[error("no codec registered for model {model}")]
    UnknownModel {
        /// The model the caller asked for.
        model: Model,
    },

    /// No codec constructor is registered for the (model, protocol) pair.
    #[error("no codec registered for model {model} and protocol {protocol}")]
    UnknownProtocol {
        /// The model the caller asked for.
        model: Model,
        /// The protocol the caller asked for.
        protocol: Protocol,
    },

    /// `Protocol::Default` was used but several protocols are registered.
    #[error("model {model} has {count} registered protocols, none can be defaulted")]
    AmbiguousProtocol {
        /// The model the caller asked for.
        model: Model,
        /// Number of registered protocols.
        count: usize,
    },
}

/// Invalid value or binding on a typed virtual device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A value of the wrong runtime type was assigned to a property.
    #[error("value {value:?} is not of type {expected} for property {kind}")]
    TypeMismatch {
        /// The declared property type.
        expected: ValueType,
        /// Debug rendering of the rejected value.
        value: String,
        /// The property the assignment targeted.
        kind: DeviceKind,
    },

    /// A button received a value outside the action vocabulary.
    #[error("button value {action:?} is invalid, must be one of: single, double, long, off")]
    InvalidAction {
        /// The rejected action string.
        action: String,
    },

    /// A siren melody index outside the device's supported range.
    #[error("melody {melody} is invalid, must be between 1 and 18")]
    InvalidMelody {
        /// The rejected melody index.
        melody: u8,
    },

    /// A processor was appended to a device kind it does not accept.
    #[error("processor {processor:?} is not compatible with device kind {kind}")]
    IncompatibleProcessor {
        /// Name of the rejected processor.
        processor: &'static str,
        /// The device kind it was appended to.
        kind: DeviceKind,
    },
}

/// Umbrella error for the bridge core.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("decoding error")]
    Decoding(#[from] DecodingError),

    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    #[error("device error")]
    Device(#[from] DeviceError),
}
