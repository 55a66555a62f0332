//! # devbridge-adapter-mqtt-rumqttc
//!
//! MQTT transport for devbridge, backed by `rumqttc`.
//!
//! [`MqttTransport`] implements the `MessageBus` port. Construction is
//! two-phase: the transport starts in a pending state so that wiring code
//! can register last-will messages and queue publishes before the broker
//! connection exists, then [`MqttTransport::start`] builds the client
//! (wills included in the connect packet) and pumps broker activity into
//! the supervisor's event channel. Reconnection is `rumqttc`'s job; the
//! transport only reports connection transitions.

mod bus;
mod config;

pub use bus::MqttTransport;
pub use config::MqttConfig;
