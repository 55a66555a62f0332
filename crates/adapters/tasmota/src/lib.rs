//! # devbridge-adapter-tasmota
//!
//! Tasmota adapter — codecs for WiFi devices flashed with the Tasmota
//! firmware, speaking to the broker directly.
//!
//! Topic layout, per device (optionally under a base topic):
//!
//! ```text
//! tele/<device_name>
//! ├── LWT    : "Online" | "Offline"        availability (broker will)
//! └── SENSOR : telemetry JSON
//! stat/<device_name>
//! └── POWER[n] : "ON" | "OFF" | ""         relay state reports
//! cmnd/<device_name>
//! ├── Power[n]     : commands and state queries
//! ├── PulseTime[n] : auto-off duration, offset by 100
//! └── Backlog      : batched commands
//! ```
//!
//! Supported models: Shelly Plug S and Shelly Uni. [`register_codecs`]
//! adds both to a factory.

mod codec;
mod discovery;
mod encoder;
mod plug;
mod uni;

pub use discovery::TasmotaDiscoveryParser;
pub use plug::tasmota_plug_s;
pub use uni::tasmota_uni;

use devbridge_app::factory::CodecFactory;
use devbridge_domain::model::{Model, Protocol};

/// Register every codec this adapter provides.
pub fn register_codecs(factory: &mut CodecFactory) {
    factory.register(Model::ShellyPlugS, Protocol::Tasmota, tasmota_plug_s);
    factory.register(Model::ShellyUni, Protocol::Tasmota, tasmota_uni);
}

#[cfg(test)]
mod tests {
    use super::*;
    use devbridge_app::factory::CodecConfig;

    #[test]
    fn should_register_both_models() {
        let mut factory = CodecFactory::new();
        register_codecs(&mut factory);

        let config = CodecConfig::new("plug", "");
        assert!(
            factory
                .create(Model::ShellyPlugS, Protocol::Tasmota, &config)
                .is_ok()
        );
        assert!(
            factory
                .create(Model::ShellyUni, Protocol::Default, &config)
                .is_ok()
        );
    }
}
