//! # devbridge-adapter-z2m
//!
//! Zigbee2MQTT adapter — codecs for devices reachable through a
//! Zigbee2MQTT gateway.
//!
//! Topic layout, per device:
//!
//! ```text
//! <base_topic>
//! └── <device_name> : combined JSON payload
//!     ├── availability : "online" | "offline"
//!     ├── set          : commands
//!     └── get          : state queries
//! ```
//!
//! Supported models: SNZB-02 air sensor, TS0601 soil sensor, SNZB-01
//! button, SNZB-03 motion sensor, ZBMINI-L switch, TS0002 dual relay and
//! the NAS-AB02B2 siren. [`register_codecs`] adds them all to a factory.

mod alarm;
mod codec;
mod discovery;
mod sensor;
mod switch;

pub use alarm::neo_nas_ab02b2;
pub use codec::DEFAULT_BASE_TOPIC;
pub use discovery::ZigbeeDiscoveryParser;
pub use sensor::{sonoff_snzb01, sonoff_snzb02, sonoff_snzb3, ts0601_soil};
pub use switch::{sonoff_zbmini_l, tuya_ts0002};

use devbridge_app::factory::CodecFactory;
use devbridge_domain::model::{Model, Protocol};

/// Register every codec this adapter provides.
pub fn register_codecs(factory: &mut CodecFactory) {
    factory.register(Model::ZbAirSensor, Protocol::Z2m, sonoff_snzb02);
    factory.register(Model::TuyaSoil, Protocol::Z2m, ts0601_soil);
    factory.register(Model::ZbButton, Protocol::Z2m, sonoff_snzb01);
    factory.register(Model::ZbMotion, Protocol::Z2m, sonoff_snzb3);
    factory.register(Model::ZbMini, Protocol::Z2m, sonoff_zbmini_l);
    factory.register(Model::TuyaTs0002, Protocol::Z2m, tuya_ts0002);
    factory.register(Model::NeoAlarm, Protocol::Z2m, neo_nas_ab02b2);
}
