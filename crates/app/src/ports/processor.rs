//! Processor ports — observer chains reacting to device activity.

use devbridge_domain::availability::Availability;
use devbridge_domain::device::Device;
use devbridge_domain::error::BridgeError;
use devbridge_domain::kind::DeviceKind;

use crate::device::VirtualDevice;
use crate::ports::bus::SharedBus;

/// Observer of virtual-device value updates.
///
/// Invoked synchronously, in registration order, on the dispatch task.
/// Implementations must not block; a returned error is logged and isolated
/// so that subsequent processors still run.
pub trait ValueProcessor: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether this processor can be attached to the given device kind.
    ///
    /// Checked by `VirtualDevice::processor_append`; an incompatible pair
    /// is rejected at wiring time.
    fn accepts(&self, kind: DeviceKind) -> bool;

    /// React to an accepted value update.
    ///
    /// # Errors
    ///
    /// Any [`BridgeError`]; the caller logs and continues with the next
    /// processor.
    fn on_value_update(&self, device: &VirtualDevice, bus: &SharedBus) -> Result<(), BridgeError>;
}

/// Observer of bridge availability transitions.
pub trait AvailabilityProcessor: Send + Sync {
    /// Called once when the processor is attached to a bridge.
    fn attach(&mut self, _device_name: &str, _bus: &SharedBus) {}

    /// React to an availability change (only invoked on real transitions).
    ///
    /// # Errors
    ///
    /// Any [`BridgeError`]; the caller logs and continues with the next
    /// processor.
    fn on_availability_change(
        &self,
        availability: Availability,
        device_name: &str,
        bus: &SharedBus,
    ) -> Result<(), BridgeError>;
}

/// Observer of the discovered-device list.
///
/// Notified on every update, not just the first.
pub trait DiscoveryProcessor: Send + Sync {
    fn on_discovery_update(&self, devices: &[Device]);
}
