//! Discovery record for a physical device.

use crate::model::{Model, Protocol};

/// Immutable descriptive record produced by a discoverer.
///
/// Not a virtual device — purely metadata used to pick and instantiate
/// the right codec later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Protocol-level address (e.g. Zigbee ieee address, Tasmota MAC).
    pub address: String,
    /// Human-readable name the gateway knows the device by.
    pub friendly_name: String,
    /// Hardware model, [`Model::Unknown`] when unrecognized.
    pub model: Model,
    /// Protocol family the device was discovered on.
    pub protocol: Protocol,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} over {}, address {})",
            self.friendly_name, self.model, self.protocol, self.address
        )
    }
}
