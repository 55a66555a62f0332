//! Shelly Plug S running Tasmota.
//!
//! One relay plus two telemetry channels: the internal temperature probe
//! (`ANALOG.Temperature`) and the mains voltage (`ENERGY.Voltage`).

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

fn decode_temperature(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    Ok(telemetry_value(payload, "ANALOG", "Temperature")?.map(Value::Float))
}

fn decode_voltage(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    Ok(telemetry_value(payload, "ENERGY", "Voltage")?.map(Value::Float))
}

/// Shelly Plug S codec.
pub fn tasmota_plug_s(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = TasmotaCodec::new(config);
    let encoder = Arc::new(TasmotaEncoder::new(config, Some("PulseTime 0")));

    let mut switch = VirtualDevice::new(
        DeviceKind::Switch,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    if let Some(secs) = config.countdown {
        switch = switch.with_countdown(secs);
    }
    switch.bind_encoder(Arc::clone(&encoder) as Arc<dyn Encoder>);

    let temperature = VirtualDevice::new(
        DeviceKind::Temperature,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    let voltage = VirtualDevice::new(
        DeviceKind::Adc,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );

    let power_topic = codec.stat_power_topic(None);
    let sensor_topic = codec.sensor_topic().to_string();
    codec
        .registry_mut()
        .add(power_topic.as_str(), decode_power_report, &switch);
    codec
        .registry_mut()
        .add(sensor_topic.as_str(), decode_temperature, &temperature);
    codec
        .registry_mut()
        .add(sensor_topic.as_str(), decode_voltage, &voltage);

    if let Some(request) = encoder.configure_request() {
        codec.push_initial(request);
    }
    if let Some(request) = encoder.state_request(None) {
        codec.push_initial(request);
    }
    Box::new(codec)
}
