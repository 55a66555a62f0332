//! The bridge binding one codec to the message bus.
//!
//! One bridge per physical device: it subscribes to the codec's topics,
//! tracks the device's availability tri-state and fans incoming messages
//! out to the codec's decode handlers.

use devbridge_domain::availability::Availability;
use devbridge_domain::error::BridgeError;

use crate::codec::Codec;
use crate::device::VirtualDevice;
use crate::ports::bus::{Qos, SharedBus};
use crate::ports::processor::AvailabilityProcessor;

/// Surrogate of one physical device on the message bus.
pub struct Bridge {
    bus: SharedBus,
    codec: Box<dyn Codec>,
    availability: Availability,
    availability_processors: Vec<Box<dyn AvailabilityProcessor>>,
}

impl Bridge {
    #[must_use]
    pub fn new(bus: SharedBus, codec: Box<dyn Codec>) -> Self {
        Self {
            bus,
            codec,
            availability: Availability::Unknown,
            availability_processors: Vec::new(),
        }
    }

    #[must_use]
    pub fn device_name(&self) -> &str {
        self.codec.device_name()
    }

    #[must_use]
    pub fn friendly_name(&self) -> &str {
        self.codec.friendly_name()
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Virtual devices managed by this bridge.
    #[must_use]
    pub fn devices(&self) -> &[VirtualDevice] {
        self.codec.registry().devices()
    }

    /// Attach an availability processor, giving it its one-time setup
    /// hook.
    pub fn availability_processor_append(&mut self, mut processor: Box<dyn AvailabilityProcessor>) {
        processor.attach(self.codec.friendly_name(), &self.bus);
        self.availability_processors.push(processor);
    }

    /// Whether this bridge consumes messages on `topic`.
    #[must_use]
    pub fn handles(&self, topic: &str) -> bool {
        topic == self.codec.availability_topic() || self.codec.registry().handles(topic)
    }

    /// (Re)establish the bridge's subscriptions.
    ///
    /// Called on every transport (re)connection; a refused subscription is
    /// logged and the remaining ones are still requested.
    pub fn subscribe_all(&self) {
        let availability_topic = self.codec.availability_topic().to_string();
        let topics = std::iter::once(availability_topic.as_str())
            .chain(self.codec.registry().topics());
        for topic in topics {
            if let Err(err) = self.bus.subscribe(topic, Qos::AtLeastOnce) {
                tracing::error!(
                    device = %self.codec.friendly_name(),
                    topic,
                    error = %err,
                    "subscription rejected by transport"
                );
            }
        }
    }

    /// Route one inbound message through the codec.
    ///
    /// Malformed payloads are logged with truncated context and dropped;
    /// they never tear the bridge down.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Configuration`] when the topic has no handler at
    /// all, which means the subscription set and the registry disagree.
    pub fn handle_message(&mut self, topic: &str, raw: &str) -> Result<(), BridgeError> {
        if topic == self.codec.availability_topic() {
            self.handle_availability(topic, raw);
            return Ok(());
        }
        self.handle_value_message(topic, raw)
    }

    fn handle_availability(&mut self, topic: &str, raw: &str) {
        let online = match self.codec.decode_availability(raw) {
            Ok(online) => online,
            Err(err) => {
                tracing::warn!(
                    device = %self.codec.friendly_name(),
                    topic,
                    error = %err,
                    "availability payload dropped"
                );
                return;
            }
        };

        let next = Availability::from(online);
        if next == self.availability {
            return;
        }
        let first_contact = self.availability == Availability::Unknown;
        self.availability = next;
        tracing::info!(
            device = %self.codec.friendly_name(),
            availability = %next,
            "availability changed"
        );

        for processor in &self.availability_processors {
            if let Err(err) =
                processor.on_availability_change(next, self.codec.friendly_name(), &self.bus)
            {
                tracing::error!(
                    device = %self.codec.friendly_name(),
                    error = %err,
                    "availability processor failed, continuing with the next one"
                );
            }
        }

        if first_contact && next.is_online() {
            for request in self.codec.initial_requests() {
                self.publish_message(&request.topic, &request.payload);
            }
        }
    }

    fn handle_value_message(&mut self, topic: &str, raw: &str) -> Result<(), BridgeError> {
        let payload = match self.codec.fit_payload(topic, raw) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    device = %self.codec.friendly_name(),
                    topic,
                    error = %err,
                    "message dropped"
                );
                return Ok(());
            }
        };

        for (device, decoded) in self.codec.registry().dispatch(topic, &payload)? {
            match decoded {
                Ok(value) => {
                    if let Err(err) = device.handle_value(value, &self.bus) {
                        tracing::warn!(
                            device = %device.friendly_name(),
                            topic,
                            error = %err,
                            "decoded value rejected"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        device = %device.friendly_name(),
                        topic,
                        error = %err,
                        "handler failed to decode, message dropped for this property"
                    );
                }
            }
        }
        Ok(())
    }

    /// Publish on behalf of this bridge's device.
    pub fn publish_message(&self, topic: &str, payload: &str) {
        if let Err(err) = self.bus.publish(topic, payload, Qos::AtLeastOnce, false) {
            tracing::error!(
                device = %self.codec.friendly_name(),
                topic,
                error = %err,
                "publish rejected by transport"
            );
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("device_name", &self.codec.device_name())
            .field("availability", &self.availability)
            .finish_non_exhaustive()
    }
}
