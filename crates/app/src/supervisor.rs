//! The supervisor event loop.
//!
//! Single consumer of the transport's event channel: it owns every bridge
//! and discoverer, re-establishes subscriptions on (re)connection and
//! routes inbound messages by topic. Running it on one task keeps message
//! handling sequential, so bridge state never needs its own locking.

use tokio::sync::mpsc;

use crate::bridge::Bridge;
use crate::discovery::Discoverer;
use crate::ports::bus::{BusEvent, SharedBus};

pub struct Supervisor {
    bus: SharedBus,
    bridges: Vec<Bridge>,
    discoverers: Vec<Discoverer>,
}

impl Supervisor {
    #[must_use]
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            bridges: Vec::new(),
            discoverers: Vec::new(),
        }
    }

    pub fn bridge_append(&mut self, bridge: Bridge) {
        self.bridges.push(bridge);
    }

    pub fn discoverer_append(&mut self, discoverer: Discoverer) {
        self.discoverers.push(discoverer);
    }

    #[must_use]
    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    /// (Re)establish every bridge and discovery subscription.
    pub fn subscribe_all(&self) {
        for bridge in &self.bridges {
            bridge.subscribe_all();
        }
        for discoverer in &self.discoverers {
            discoverer.subscribe_all(&self.bus);
        }
    }

    /// Consume transport events until the channel closes.
    ///
    /// Closing the channel is the shutdown signal: pending auto-stop
    /// timers are cancelled before returning.
    pub async fn run(mut self, mut events: mpsc::Receiver<BusEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                BusEvent::Connected => {
                    tracing::info!(bridges = self.bridges.len(), "transport connected");
                    self.subscribe_all();
                }
                BusEvent::Disconnected => {
                    tracing::warn!("transport disconnected, awaiting reconnection");
                }
                BusEvent::Message { topic, payload } => {
                    self.route(&topic, &payload);
                }
            }
        }
        tracing::info!("event channel closed, shutting down");
        self.shutdown();
    }

    fn route(&mut self, topic: &str, payload: &str) {
        let mut matched = false;
        for bridge in &mut self.bridges {
            if bridge.handles(topic) {
                matched = true;
                if let Err(err) = bridge.handle_message(topic, payload) {
                    tracing::error!(topic, error = %err, "bridge failed to handle message");
                }
            }
        }
        for discoverer in &mut self.discoverers {
            if discoverer.handles(topic) {
                matched = true;
                discoverer.handle_message(topic, payload);
            }
        }
        if !matched {
            tracing::debug!(topic, "message on unclaimed topic ignored");
        }
    }

    fn shutdown(&self) {
        for bridge in &self.bridges {
            for device in bridge.devices() {
                device.cancel_auto_stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, HandlerRegistry, Payload};
    use crate::device::VirtualDevice;
    use crate::memory_bus::MemoryBus;
    use devbridge_domain::error::DecodingError;
    use devbridge_domain::kind::DeviceKind;
    use devbridge_domain::value::Value;
    use std::sync::Arc;

    struct FakeCodec {
        registry: HandlerRegistry,
    }

    fn decode_power(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
        Ok(payload.as_text().map(|text| Value::Bool(text == "ON")))
    }

    impl FakeCodec {
        fn new() -> (Self, VirtualDevice) {
            let device = VirtualDevice::new(DeviceKind::Switch, "plug", false);
            let mut registry = HandlerRegistry::new();
            registry.add("fake/plug/power", decode_power, &device);
            (Self { registry }, device)
        }
    }

    impl Codec for FakeCodec {
        fn device_name(&self) -> &str {
            "plug"
        }

        fn friendly_name(&self) -> &str {
            "plug"
        }

        fn availability_topic(&self) -> &str {
            "fake/plug/availability"
        }

        fn decode_availability(&self, payload: &str) -> Result<bool, DecodingError> {
            Ok(payload == "online")
        }

        fn fit_payload(&self, _topic: &str, raw: &str) -> Result<Payload, DecodingError> {
            Ok(Payload::Text(raw.to_string()))
        }

        fn registry(&self) -> &HandlerRegistry {
            &self.registry
        }
    }

    #[tokio::test]
    async fn should_resubscribe_on_connect_and_route_messages() {
        let bus = Arc::new(MemoryBus::new());
        let (codec, device) = FakeCodec::new();
        let bridge = Bridge::new(Arc::clone(&bus) as SharedBus, Box::new(codec));
        let mut supervisor = Supervisor::new(Arc::clone(&bus) as SharedBus);
        supervisor.bridge_append(bridge);

        let (sender, receiver) = mpsc::channel(16);
        let task = tokio::spawn(supervisor.run(receiver));

        sender.send(BusEvent::Connected).await.unwrap();
        sender
            .send(BusEvent::Message {
                topic: "fake/plug/power".to_string(),
                payload: "ON".to_string(),
            })
            .await
            .unwrap();
        sender
            .send(BusEvent::Message {
                topic: "unrelated/topic".to_string(),
                payload: "x".to_string(),
            })
            .await
            .unwrap();
        drop(sender);
        task.await.unwrap();

        assert!(bus
            .subscriptions()
            .contains(&"fake/plug/power".to_string()));
        assert_eq!(device.value(), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn should_cancel_pending_timers_on_shutdown() {
        let bus = Arc::new(MemoryBus::new());
        let (codec, device) = FakeCodec::new();
        let device = device.with_countdown(3600);
        let bridge = Bridge::new(Arc::clone(&bus) as SharedBus, Box::new(codec));
        let mut supervisor = Supervisor::new(Arc::clone(&bus) as SharedBus);
        supervisor.bridge_append(bridge);

        let (sender, receiver) = mpsc::channel(16);
        let task = tokio::spawn(supervisor.run(receiver));
        sender
            .send(BusEvent::Message {
                topic: "fake/plug/power".to_string(),
                payload: "ON".to_string(),
            })
            .await
            .unwrap();
        drop(sender);
        task.await.unwrap();

        assert!(!device.has_pending_stop());
    }
}
