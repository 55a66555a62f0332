//! Shareable virtual-device handles.
//!
//! Wraps the pure [`DeviceState`] machine with everything IO-facing: the
//! processor chain, the encoder binding and the per-device auto-stop
//! timer. Handles are cheap clones of one shared device; the mutex makes
//! every device single-writer, and it is never held across a processor
//! callback or a publish.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use devbridge_domain::error::DeviceError;
use devbridge_domain::kind::DeviceKind;
use devbridge_domain::state::{DeviceState, Transition};
use devbridge_domain::value::Value;

use crate::ports::bus::{Qos, SharedBus};
use crate::ports::encoder::{Encoder, Request};
use crate::ports::processor::ValueProcessor;

struct Inner {
    state: DeviceState,
    /// Default auto-stop duration armed by `trigger_start`, in seconds.
    countdown: Option<u32>,
    encoder: Option<Arc<dyn Encoder>>,
    processors: Vec<Arc<dyn ValueProcessor>>,
    /// Pending auto-stop task. Invariant: at most one live timer per
    /// device; arming aborts and replaces under the lock.
    stop_timer: Option<JoinHandle<()>>,
}

/// Handle to one virtual device (one property of a physical device).
///
/// Created by a codec at construction time; lives as long as the bridge.
#[derive(Clone)]
pub struct VirtualDevice {
    inner: Arc<Mutex<Inner>>,
}

impl VirtualDevice {
    /// Create a device with an unset value.
    #[must_use]
    pub fn new(kind: DeviceKind, friendly_name: impl Into<String>, quiet_mode: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: DeviceState::new(kind, friendly_name, quiet_mode),
                countdown: None,
                encoder: None,
                processors: Vec::new(),
                stop_timer: None,
            })),
        }
    }

    /// Set the default auto-stop duration (`0` disables it).
    #[must_use]
    pub fn with_countdown(self, secs: u32) -> Self {
        self.lock().countdown = (secs > 0).then_some(secs);
        self
    }

    /// Bind the encoder capability used to build outbound requests.
    pub fn bind_encoder(&self, encoder: Arc<dyn Encoder>) {
        self.lock().encoder = Some(encoder);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("virtual device lock poisoned")
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.lock().state.kind()
    }

    #[must_use]
    pub fn friendly_name(&self) -> String {
        self.lock().state.friendly_name().to_string()
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.lock().state.value().cloned()
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.lock().state.is_on()
    }

    #[must_use]
    pub fn has_pending_stop(&self) -> bool {
        self.lock().stop_timer.is_some()
    }

    /// Whether two handles point at the same underlying device.
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append a processor to the notification chain.
    ///
    /// # Errors
    ///
    /// [`DeviceError::IncompatibleProcessor`] when the processor does not
    /// accept this device kind.
    pub fn processor_append(&self, processor: Arc<dyn ValueProcessor>) -> Result<(), DeviceError> {
        let mut inner = self.lock();
        let kind = inner.state.kind();
        if !processor.accepts(kind) {
            return Err(DeviceError::IncompatibleProcessor {
                processor: processor.name(),
                kind,
            });
        }
        inner.processors.push(processor);
        Ok(())
    }

    /// Feed one decoded value into the device.
    ///
    /// Applies the state machine, then notifies every registered processor
    /// in registration order (outside the lock). A processor error is
    /// logged and isolated; the remaining processors still run. A device
    /// with a configured countdown arms its auto-stop timer when a payload
    /// reports it on with no timer pending.
    ///
    /// # Errors
    ///
    /// [`DeviceError`] when the value fails type validation; the stored
    /// value is left untouched.
    pub fn handle_value(
        &self,
        value: Option<Value>,
        bus: &SharedBus,
    ) -> Result<Transition, DeviceError> {
        let turned_on = value.as_ref().is_some_and(Value::is_on);
        let (transition, processors, arm_countdown) = {
            let mut inner = self.lock();
            let transition = inner.state.apply(value, Utc::now())?;
            let arm = inner
                .countdown
                .filter(|_| turned_on && inner.stop_timer.is_none());
            let processors = if transition.notifies() {
                inner.processors.clone()
            } else {
                Vec::new()
            };
            (transition, processors, arm)
        };

        if let Some(secs) = arm_countdown {
            tracing::debug!(
                device = %self.friendly_name(),
                secs,
                "turned on, arming countdown"
            );
            self.arm_auto_stop(bus, secs);
        }

        for processor in processors {
            if let Err(err) = processor.on_value_update(self, bus) {
                tracing::error!(
                    device = %self.friendly_name(),
                    processor = processor.name(),
                    error = %err,
                    "processor failed, continuing with the next one"
                );
            }
        }
        Ok(transition)
    }

    /// Issue a change-state command through the bound encoder.
    ///
    /// Pulse-capable encoders get `on_time` forwarded (the device manages
    /// its own auto-off). Otherwise a plain request is published and, when
    /// `on_time` is set, a local one-shot timer is armed that calls
    /// [`trigger_stop`](Self::trigger_stop) after `on_time` seconds.
    pub fn trigger_change_state(&self, bus: &SharedBus, is_on: bool, on_time: Option<u32>) {
        let (encoder, channel) = {
            let inner = self.lock();
            (inner.encoder.clone(), inner.state.kind().channel())
        };
        let Some(encoder) = encoder else {
            tracing::error!(
                device = %self.friendly_name(),
                "no encoder bound, dropping change-state command"
            );
            return;
        };

        if encoder.pulse_allowed(channel) {
            self.publish_request(bus, &encoder.change_state_request(is_on, channel, on_time));
        } else {
            self.publish_request(bus, &encoder.change_state_request(is_on, channel, None));
            if let Some(secs) = on_time {
                self.arm_auto_stop(bus, secs);
            }
        }
    }

    /// Ask the device to start.
    ///
    /// No-op when it is already on. `on_time` defaults to the configured
    /// countdown. Returns `true` iff a command was issued.
    pub fn trigger_start(&self, bus: &SharedBus, on_time: Option<u32>) -> bool {
        let (is_on, countdown) = {
            let inner = self.lock();
            (inner.state.is_on(), inner.countdown)
        };
        if is_on {
            tracing::debug!(device = %self.friendly_name(), "already on, no action required");
            return false;
        }
        self.trigger_change_state(bus, true, on_time.or(countdown));
        true
    }

    /// Ask the device to stop, clearing any pending auto-stop timer.
    ///
    /// No-op when it is already off. Returns `true` iff a command was
    /// issued.
    pub fn trigger_stop(&self, bus: &SharedBus) -> bool {
        let is_on = {
            let mut inner = self.lock();
            if let Some(timer) = inner.stop_timer.take() {
                timer.abort();
            }
            inner.state.is_on()
        };
        if !is_on {
            tracing::debug!(device = %self.friendly_name(), "already off, no action required");
            return false;
        }
        self.trigger_change_state(bus, false, None);
        true
    }

    /// Ask the device for its current state.
    ///
    /// Silent no-op when the encoder supports no state query.
    pub fn trigger_get_state(&self, bus: &SharedBus) {
        let (encoder, channel) = {
            let inner = self.lock();
            (inner.encoder.clone(), inner.state.kind().channel())
        };
        let Some(encoder) = encoder else {
            return;
        };
        match encoder.state_request(channel) {
            Some(request) => self.publish_request(bus, &request),
            None => {
                tracing::debug!(
                    device = %self.friendly_name(),
                    "state query not supported by this device"
                );
            }
        }
    }

    /// Abort any pending auto-stop timer (bridge teardown).
    pub fn cancel_auto_stop(&self) {
        if let Some(timer) = self.lock().stop_timer.take() {
            timer.abort();
        }
    }

    /// Arm the one-shot auto-stop timer, replacing any pending one.
    ///
    /// Cancellation is linearizable: the slot is swapped under the device
    /// lock, so at most one timer is ever live.
    fn arm_auto_stop(&self, bus: &SharedBus, secs: u32) {
        let device = self.clone();
        let bus = Arc::clone(bus);
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(secs))).await;
            tracing::debug!(device = %device.friendly_name(), "auto-stop timer fired");
            device.trigger_stop(&bus);
        });

        let mut inner = self.lock();
        if let Some(previous) = inner.stop_timer.replace(task) {
            previous.abort();
        }
    }

    fn publish_request(&self, bus: &SharedBus, request: &Request) {
        tracing::debug!(
            device = %self.friendly_name(),
            topic = %request.topic,
            payload = %request.payload,
            "sending command"
        );
        if let Err(err) = bus.publish(&request.topic, &request.payload, Qos::AtLeastOnce, false) {
            tracing::error!(
                device = %self.friendly_name(),
                topic = %request.topic,
                error = %err,
                "publish rejected by transport"
            );
        }
    }
}

impl std::fmt::Debug for VirtualDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("VirtualDevice")
            .field("kind", &inner.state.kind())
            .field("friendly_name", &inner.state.friendly_name())
            .field("value", &inner.state.value())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_bus::MemoryBus;
    use devbridge_domain::error::BridgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PlainEncoder {
        pulse: bool,
    }

    impl Encoder for PlainEncoder {
        fn change_state_request(
            &self,
            is_on: bool,
            _channel: Option<u8>,
            on_time: Option<u32>,
        ) -> Request {
            let payload = match (is_on, on_time) {
                (true, Some(secs)) => format!("ON+{secs}"),
                (true, None) => "ON".to_string(),
                (false, _) => "OFF".to_string(),
            };
            Request::new("dev/set", payload)
        }

        fn state_request(&self, _channel: Option<u8>) -> Option<Request> {
            Some(Request::new("dev/get", ""))
        }

        fn pulse_allowed(&self, _channel: Option<u8>) -> bool {
            self.pulse
        }
    }

    struct CountingProcessor {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ValueProcessor for CountingProcessor {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn accepts(&self, _kind: DeviceKind) -> bool {
            true
        }

        fn on_value_update(
            &self,
            _device: &VirtualDevice,
            _bus: &SharedBus,
        ) -> Result<(), BridgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(devbridge_domain::error::DeviceError::InvalidAction {
                    action: "boom".to_string(),
                }
                .into())
            } else {
                Ok(())
            }
        }
    }

    struct MotionOnly;

    impl ValueProcessor for MotionOnly {
        fn name(&self) -> &'static str {
            "motion-only"
        }

        fn accepts(&self, kind: DeviceKind) -> bool {
            kind == DeviceKind::Motion
        }

        fn on_value_update(
            &self,
            _device: &VirtualDevice,
            _bus: &SharedBus,
        ) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    fn shared(bus: MemoryBus) -> (SharedBus, Arc<MemoryBus>) {
        let bus = Arc::new(bus);
        (Arc::clone(&bus) as SharedBus, bus)
    }

    fn switch_with_encoder(pulse: bool) -> VirtualDevice {
        let device = VirtualDevice::new(DeviceKind::Switch, "lamp", false);
        device.bind_encoder(Arc::new(PlainEncoder { pulse }));
        device
    }

    #[tokio::test]
    async fn should_issue_start_command_when_off() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        assert!(device.trigger_start(&bus, None));
        let published = log.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "dev/set");
        assert_eq!(published[0].payload, "ON");
        assert_eq!(published[0].qos, Qos::AtLeastOnce);
        assert!(!published[0].retain);
    }

    #[tokio::test]
    async fn should_not_start_when_already_on() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);
        device.handle_value(Some(Value::Bool(true)), &bus).unwrap();

        assert!(!device.trigger_start(&bus, None));
        assert!(log.published().is_empty());
    }

    #[tokio::test]
    async fn should_not_stop_when_already_off() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        assert!(!device.trigger_stop(&bus));
        assert!(log.published().is_empty());
    }

    #[tokio::test]
    async fn should_stop_when_on() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);
        device.handle_value(Some(Value::Bool(true)), &bus).unwrap();

        assert!(device.trigger_stop(&bus));
        assert_eq!(log.published().last().unwrap().payload, "OFF");
    }

    #[tokio::test]
    async fn should_forward_on_time_to_pulse_capable_encoder() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(true);

        device.trigger_change_state(&bus, true, Some(13));
        assert_eq!(log.published()[0].payload, "ON+13");
        assert!(!device.has_pending_stop());
    }

    #[tokio::test]
    async fn should_arm_local_timer_when_pulse_not_allowed() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        device.trigger_change_state(&bus, true, Some(13));
        assert_eq!(log.published()[0].payload, "ON");
        assert!(device.has_pending_stop());
    }

    #[tokio::test(start_paused = true)]
    async fn should_auto_stop_after_on_time_elapses() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        device.trigger_change_state(&bus, true, Some(3));
        device.handle_value(Some(Value::Bool(true)), &bus).unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        let payloads: Vec<_> = log.published().iter().map(|m| m.payload.clone()).collect();
        assert_eq!(payloads, vec!["ON".to_string(), "OFF".to_string()]);
        assert!(!device.has_pending_stop());
    }

    #[tokio::test(start_paused = true)]
    async fn should_replace_pending_timer_on_rearm() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        device.trigger_change_state(&bus, true, Some(3));
        device.handle_value(Some(Value::Bool(true)), &bus).unwrap();
        // Re-arm with a longer duration; the first timer must not fire.
        device.trigger_change_state(&bus, true, Some(60));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let offs = log.published().iter().filter(|m| m.payload == "OFF").count();
        assert_eq!(offs, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let offs = log.published().iter().filter(|m| m.payload == "OFF").count();
        assert_eq!(offs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_arm_countdown_when_switch_reports_on() {
        let (bus, log) = shared(MemoryBus::new());
        let device = VirtualDevice::new(DeviceKind::Switch, "lamp", false).with_countdown(5);
        device.bind_encoder(Arc::new(PlainEncoder { pulse: false }));

        device.handle_value(Some(Value::Bool(true)), &bus).unwrap();
        assert!(device.has_pending_stop());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(log.published().last().unwrap().payload, "OFF");
    }

    #[tokio::test]
    async fn should_default_on_time_to_countdown_on_start() {
        let (bus, _log) = shared(MemoryBus::new());
        let device = VirtualDevice::new(DeviceKind::Switch, "lamp", false).with_countdown(30);
        device.bind_encoder(Arc::new(PlainEncoder { pulse: false }));

        assert!(device.trigger_start(&bus, None));
        assert!(device.has_pending_stop());
    }

    #[tokio::test]
    async fn should_publish_state_query() {
        let (bus, log) = shared(MemoryBus::new());
        let device = switch_with_encoder(false);

        device.trigger_get_state(&bus);
        assert_eq!(log.published()[0].topic, "dev/get");
    }

    #[tokio::test]
    async fn should_notify_processors_in_order_and_isolate_failures() {
        let (bus, _log) = shared(MemoryBus::new());
        let device = VirtualDevice::new(DeviceKind::Temperature, "t", false);

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        device
            .processor_append(Arc::new(CountingProcessor {
                calls: Arc::clone(&first),
                fail: true,
            }))
            .unwrap();
        device
            .processor_append(Arc::new(CountingProcessor {
                calls: Arc::clone(&second),
                fail: false,
            }))
            .unwrap();

        device.handle_value(Some(Value::Float(19.6)), &bus).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_not_notify_processors_on_ignored_value() {
        let (bus, _log) = shared(MemoryBus::new());
        let device = VirtualDevice::new(DeviceKind::Temperature, "t", false);
        let calls = Arc::new(AtomicUsize::new(0));
        device
            .processor_append(Arc::new(CountingProcessor {
                calls: Arc::clone(&calls),
                fail: false,
            }))
            .unwrap();

        let transition = device.handle_value(None, &bus).unwrap();
        assert_eq!(transition, Transition::Ignored);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_reject_incompatible_processor() {
        let device = VirtualDevice::new(DeviceKind::Button, "b", false);
        let err = device.processor_append(Arc::new(MotionOnly)).unwrap_err();
        assert!(matches!(err, DeviceError::IncompatibleProcessor { .. }));
    }

    #[tokio::test]
    async fn should_compare_handles_by_identity() {
        let device = VirtualDevice::new(DeviceKind::Switch, "lamp", false);
        let clone = device.clone();
        let other = VirtualDevice::new(DeviceKind::Switch, "lamp", false);
        assert!(device.same_device(&clone));
        assert!(!device.same_device(&other));
    }
}
