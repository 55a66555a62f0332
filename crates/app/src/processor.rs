//! Stock processors: logging, actuator triggers and the canonical
//! republish surface.

use devbridge_domain::availability::Availability;
use devbridge_domain::device::Device;
use devbridge_domain::error::BridgeError;
use devbridge_domain::kind::{ButtonAction, DeviceKind};
use devbridge_domain::value::Value;

use crate::device::VirtualDevice;
use crate::ports::bus::{Qos, SharedBus};
use crate::ports::processor::{AvailabilityProcessor, DiscoveryProcessor, ValueProcessor};

/// Default on-time armed by a double press, in seconds.
const DOUBLE_PRESS_COUNTDOWN_SECS: u32 = 60 * 10;

/// Logs every accepted value update. Attachable to any kind.
#[derive(Debug, Default)]
pub struct DeviceLogger;

impl ValueProcessor for DeviceLogger {
    fn name(&self) -> &'static str {
        "device-logger"
    }

    fn accepts(&self, _kind: DeviceKind) -> bool {
        true
    }

    fn on_value_update(&self, device: &VirtualDevice, _bus: &SharedBus) -> Result<(), BridgeError> {
        tracing::info!(
            device = %device.friendly_name(),
            kind = %device.kind(),
            value = device.value().as_ref().map(ToString::to_string),
            "value updated"
        );
        Ok(())
    }
}

/// Drives a set of operable devices from button presses.
///
/// Single press starts the targets with their default countdown, double
/// press starts them with a longer one, long press stops them. Release
/// events are ignored.
pub struct ButtonTrigger {
    targets: Vec<VirtualDevice>,
    countdown_long: u32,
}

impl ButtonTrigger {
    #[must_use]
    pub fn new(targets: Vec<VirtualDevice>) -> Self {
        Self {
            targets,
            countdown_long: DOUBLE_PRESS_COUNTDOWN_SECS,
        }
    }

    /// Override the on-time armed by a double press.
    #[must_use]
    pub fn with_countdown_long(mut self, secs: u32) -> Self {
        self.countdown_long = secs;
        self
    }

    /// Fan one action out to the targets. An unrecognized action is logged
    /// and ignored; it never propagates as a failure.
    fn apply_action(&self, raw: &str, device: &VirtualDevice, bus: &SharedBus) {
        let action = match raw.parse::<ButtonAction>() {
            Ok(action) => action,
            Err(err) => {
                tracing::error!(
                    device = %device.friendly_name(),
                    error = %err,
                    "unrecognized button action ignored"
                );
                return;
            }
        };
        match action {
            ButtonAction::Single => {
                for target in &self.targets {
                    target.trigger_start(bus, None);
                }
            }
            ButtonAction::Double => {
                for target in &self.targets {
                    target.trigger_start(bus, Some(self.countdown_long));
                }
            }
            ButtonAction::Long => {
                for target in &self.targets {
                    target.trigger_stop(bus);
                }
            }
            ButtonAction::Off => {}
        }
    }
}

impl ValueProcessor for ButtonTrigger {
    fn name(&self) -> &'static str {
        "button-trigger"
    }

    fn accepts(&self, kind: DeviceKind) -> bool {
        kind == DeviceKind::Button
    }

    fn on_value_update(&self, device: &VirtualDevice, bus: &SharedBus) -> Result<(), BridgeError> {
        if let Some(Value::Str(raw)) = device.value() {
            self.apply_action(&raw, device, bus);
        }
        Ok(())
    }
}

/// Starts a set of operable devices when motion is detected.
///
/// Only reacts to occupancy turning on; switching off is left to the
/// targets' auto-stop countdowns.
pub struct MotionTrigger {
    targets: Vec<VirtualDevice>,
}

impl MotionTrigger {
    #[must_use]
    pub fn new(targets: Vec<VirtualDevice>) -> Self {
        Self { targets }
    }
}

impl ValueProcessor for MotionTrigger {
    fn name(&self) -> &'static str {
        "motion-trigger"
    }

    fn accepts(&self, kind: DeviceKind) -> bool {
        kind == DeviceKind::Motion
    }

    fn on_value_update(&self, device: &VirtualDevice, bus: &SharedBus) -> Result<(), BridgeError> {
        if device.is_on() {
            for target in &self.targets {
                target.trigger_start(bus, None);
            }
        }
        Ok(())
    }
}

/// Republishes accepted values on the canonical topic tree.
///
/// Topic shape: `{base}/device/{friendly_name}/{node}/{name}`, retained so
/// late subscribers see the current value.
pub struct PropertyPublisher {
    base_topic: String,
}

impl PropertyPublisher {
    #[must_use]
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: base_topic.into(),
        }
    }
}

impl ValueProcessor for PropertyPublisher {
    fn name(&self) -> &'static str {
        "property-publisher"
    }

    fn accepts(&self, _kind: DeviceKind) -> bool {
        true
    }

    fn on_value_update(&self, device: &VirtualDevice, bus: &SharedBus) -> Result<(), BridgeError> {
        let Some(value) = device.value() else {
            return Ok(());
        };
        let property = device.kind().property();
        let topic = format!(
            "{}/device/{}/{}/{}",
            self.base_topic,
            device.friendly_name(),
            property.node,
            property.name
        );
        if let Err(err) = bus.publish(&topic, &value.to_string(), Qos::AtLeastOnce, true) {
            tracing::error!(topic, error = %err, "canonical publish rejected by transport");
        }
        Ok(())
    }
}

/// Logs availability transitions.
#[derive(Debug, Default)]
pub struct AvailabilityLogger;

impl AvailabilityProcessor for AvailabilityLogger {
    fn on_availability_change(
        &self,
        availability: Availability,
        device_name: &str,
        _bus: &SharedBus,
    ) -> Result<(), BridgeError> {
        tracing::info!(device = device_name, availability = %availability, "device availability");
        Ok(())
    }
}

/// Publishes the device liveness on the canonical `$state` topic.
///
/// Publishes `init` (retained) on attach, registers `lost` as the
/// transport's last will, then tracks transitions with `ready` and
/// `disconnected`.
pub struct AvailabilityPublisher {
    base_topic: String,
}

impl AvailabilityPublisher {
    #[must_use]
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: base_topic.into(),
        }
    }

    fn state_topic(&self, device_name: &str) -> String {
        format!("{}/device/{}/$state", self.base_topic, device_name)
    }
}

impl AvailabilityProcessor for AvailabilityPublisher {
    fn attach(&mut self, device_name: &str, bus: &SharedBus) {
        let topic = self.state_topic(device_name);
        bus.set_will(&topic, "lost", Qos::AtLeastOnce, true);
        if let Err(err) = bus.publish(
            &topic,
            Availability::Unknown.state_payload(),
            Qos::AtLeastOnce,
            true,
        ) {
            tracing::error!(topic, error = %err, "initial state publish rejected by transport");
        }
    }

    fn on_availability_change(
        &self,
        availability: Availability,
        device_name: &str,
        bus: &SharedBus,
    ) -> Result<(), BridgeError> {
        let topic = self.state_topic(device_name);
        if let Err(err) = bus.publish(&topic, availability.state_payload(), Qos::AtLeastOnce, true)
        {
            tracing::error!(topic, error = %err, "state publish rejected by transport");
        }
        Ok(())
    }
}

/// Logs the discovered-device inventory on every update.
#[derive(Debug, Default)]
pub struct DiscoveryLogger;

impl DiscoveryProcessor for DiscoveryLogger {
    fn on_discovery_update(&self, devices: &[Device]) {
        tracing::info!(count = devices.len(), "device inventory updated");
        for device in devices {
            tracing::debug!(
                address = %device.address,
                name = %device.friendly_name,
                model = %device.model,
                "discovered device"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_bus::MemoryBus;
    use crate::ports::encoder::{Encoder, Request};
    use std::sync::Arc;

    struct OnOffEncoder;

    impl Encoder for OnOffEncoder {
        fn change_state_request(
            &self,
            is_on: bool,
            _channel: Option<u8>,
            _on_time: Option<u32>,
        ) -> Request {
            Request::new("lamp/set", if is_on { "ON" } else { "OFF" })
        }

        fn state_request(&self, _channel: Option<u8>) -> Option<Request> {
            None
        }

        fn pulse_allowed(&self, _channel: Option<u8>) -> bool {
            true
        }
    }

    fn shared(bus: MemoryBus) -> (SharedBus, Arc<MemoryBus>) {
        let bus = Arc::new(bus);
        (Arc::clone(&bus) as SharedBus, bus)
    }

    fn lamp() -> VirtualDevice {
        let lamp = VirtualDevice::new(DeviceKind::Switch, "lamp", false);
        lamp.bind_encoder(Arc::new(OnOffEncoder));
        lamp
    }

    #[tokio::test]
    async fn should_start_targets_on_single_press() {
        let (bus, log) = shared(MemoryBus::new());
        let lamp = lamp();
        let button = VirtualDevice::new(DeviceKind::Button, "button", false);
        button
            .processor_append(Arc::new(ButtonTrigger::new(vec![lamp])))
            .unwrap();

        button
            .handle_value(Some(Value::from("single")), &bus)
            .unwrap();
        assert_eq!(log.published()[0].payload, "ON");
    }

    #[tokio::test]
    async fn should_stop_targets_on_long_press() {
        let (bus, log) = shared(MemoryBus::new());
        let lamp = lamp();
        lamp.handle_value(Some(Value::Bool(true)), &bus).unwrap();
        let button = VirtualDevice::new(DeviceKind::Button, "button", false);
        button
            .processor_append(Arc::new(ButtonTrigger::new(vec![lamp])))
            .unwrap();

        button.handle_value(Some(Value::from("long")), &bus).unwrap();
        assert_eq!(log.published().last().unwrap().payload, "OFF");
    }

    #[tokio::test]
    async fn should_ignore_release_event() {
        let (bus, log) = shared(MemoryBus::new());
        let button = VirtualDevice::new(DeviceKind::Button, "button", false);
        button
            .processor_append(Arc::new(ButtonTrigger::new(vec![lamp()])))
            .unwrap();

        button.handle_value(Some(Value::from("off")), &bus).unwrap();
        assert!(log.published().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_unrecognized_action_without_failing() {
        let (bus, log) = shared(MemoryBus::new());
        let button = VirtualDevice::new(DeviceKind::Button, "button", false);
        let trigger = ButtonTrigger::new(vec![lamp()]);

        trigger.apply_action("triple", &button, &bus);
        assert!(log.published().is_empty());
    }

    #[test]
    fn should_refuse_button_trigger_on_non_button() {
        let lamp = lamp();
        let err = lamp
            .processor_append(Arc::new(ButtonTrigger::new(Vec::new())))
            .unwrap_err();
        assert!(err.to_string().contains("button-trigger"));
    }

    #[tokio::test]
    async fn should_start_targets_when_motion_detected() {
        let (bus, log) = shared(MemoryBus::new());
        let motion = VirtualDevice::new(DeviceKind::Motion, "hall", false);
        motion
            .processor_append(Arc::new(MotionTrigger::new(vec![lamp()])))
            .unwrap();

        motion.handle_value(Some(Value::Bool(true)), &bus).unwrap();
        assert_eq!(log.published()[0].payload, "ON");

        log.clear();
        motion.handle_value(Some(Value::Bool(false)), &bus).unwrap();
        assert!(log.published().is_empty());
    }

    #[tokio::test]
    async fn should_republish_value_on_canonical_topic() {
        let (bus, log) = shared(MemoryBus::new());
        let sensor = VirtualDevice::new(DeviceKind::Temperature, "office", false);
        sensor
            .processor_append(Arc::new(PropertyPublisher::new("canonical")))
            .unwrap();

        sensor.handle_value(Some(Value::Float(19.6)), &bus).unwrap();
        let published = log.published();
        assert_eq!(published[0].topic, "canonical/device/office/sensor/temperature");
        assert_eq!(published[0].payload, "19.6");
        assert!(published[0].retain);
    }

    #[tokio::test]
    async fn should_publish_init_and_will_on_attach() {
        let (bus, log) = shared(MemoryBus::new());
        let mut publisher = AvailabilityPublisher::new("canonical");
        publisher.attach("office", &bus);

        let will = log.will().unwrap();
        assert_eq!(will.topic, "canonical/device/office/$state");
        assert_eq!(will.payload, "lost");
        assert!(will.retain);
        assert_eq!(log.published()[0].payload, "init");
    }

    #[tokio::test]
    async fn should_publish_state_transitions() {
        let (bus, log) = shared(MemoryBus::new());
        let publisher = AvailabilityPublisher::new("canonical");

        publisher
            .on_availability_change(Availability::Online, "office", &bus)
            .unwrap();
        publisher
            .on_availability_change(Availability::Offline, "office", &bus)
            .unwrap();
        let payloads: Vec<_> = log.published().iter().map(|m| m.payload.clone()).collect();
        assert_eq!(payloads, vec!["ready".to_string(), "disconnected".to_string()]);
    }
}
