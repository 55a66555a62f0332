//! Shelly Uni running Tasmota.
//!
//! Two relays reporting on `stat/<device>/POWER0` and `POWER1`, plus the
//! ADC input surfaced as a voltage: the firmware reports `ANALOG.Range`
//! scaled by 100.

use std::sync::Arc;

use devbridge_app::codec::{Codec, Payload};
use devbridge_app::device::VirtualDevice;
use devbridge_app::factory::CodecConfig;
use devbridge_app::ports::encoder::Encoder;
use devbridge_domain::error::DecodingError;
use devbridge_domain::kind::DeviceKind;
use devbridge_domain::value::Value;

use crate::codec::{TasmotaCodec, decode_power_report, telemetry_value};
use crate::encoder::TasmotaEncoder;

const CONFIGURE_BATCH: &str = "PulseTime 0; AdcParam 6,0,71,0,100";

fn decode_range_voltage(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    Ok(telemetry_value(payload, "ANALOG", "Range")?.map(|range| Value::Float(range / 100.0)))
}

/// Shelly Uni codec.
pub fn tasmota_uni(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = TasmotaCodec::new(config);
    let encoder = Arc::new(TasmotaEncoder::new(config, Some(CONFIGURE_BATCH)));

    for kind in [DeviceKind::Switch0, DeviceKind::Switch1] {
        let mut switch =
            VirtualDevice::new(kind, config.friendly_name.as_str(), config.quiet_mode);
        if let Some(secs) = config.countdown {
            switch = switch.with_countdown(secs);
        }
        switch.bind_encoder(Arc::clone(&encoder) as Arc<dyn Encoder>);
        let topic = codec.stat_power_topic(kind.channel());
        codec
            .registry_mut()
            .add(topic.as_str(), decode_power_report, &switch);
        if let Some(request) = encoder.state_request(kind.channel()) {
            codec.push_initial(request);
        }
    }

    let voltage = VirtualDevice::new(
        DeviceKind::Adc,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let sensor_topic = codec.sensor_topic().to_string();
    codec
        .registry_mut()
        .add(sensor_topic.as_str(), decode_range_voltage, &voltage);

    if let Some(request) = encoder.configure_request() {
        codec.push_initial(request);
    }
    Box::new(codec)
}
