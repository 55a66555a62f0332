//! The pub/sub transport capability consumed by the core.
//!
//! The transport itself (connect/reconnect, TLS, wildcard matching, QoS
//! handshakes) lives behind this port. Outbound calls are synchronous and
//! fire-and-forget — nothing in the core blocks on a network round trip.
//! Inbound delivery is channel-based: the transport adapter forwards broker
//! activity as [`BusEvent`]s over a tokio mpsc channel consumed by the
//! supervisor loop.

use std::sync::Arc;

/// MQTT-style quality-of-service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Broker activity forwarded by the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// The transport (re)connected; subscriptions must be (re)established.
    Connected,
    /// The transport lost its connection.
    Disconnected,
    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message was published on.
        topic: String,
        /// Payload decoded as UTF-8 (lossy — these protocols are textual).
        payload: String,
    },
}

/// Outbound transport failures.
///
/// Publish is fire-and-forget; these are the only ways it can refuse.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The transport's outbound queue is full.
    #[error("transport request queue is full")]
    QueueFull,
    /// The transport has shut down.
    #[error("transport is closed")]
    Closed,
}

/// The pub/sub transport capability.
pub trait MessageBus: Send + Sync {
    /// Publish a payload. Never blocks.
    ///
    /// # Errors
    ///
    /// [`BusError`] when the outbound queue rejects the request.
    fn publish(&self, topic: &str, payload: &str, qos: Qos, retain: bool) -> Result<(), BusError>;

    /// Subscribe to a topic filter.
    ///
    /// # Errors
    ///
    /// [`BusError`] when the outbound queue rejects the request.
    fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), BusError>;

    /// Register the broker-side last-will message.
    ///
    /// Transports apply the will on their next connection attempt; the
    /// latest registration wins.
    fn set_will(&self, topic: &str, payload: &str, qos: Qos, retain: bool);
}

/// Shared handle to the transport, cloneable into timers and processors.
pub type SharedBus = Arc<dyn MessageBus>;
