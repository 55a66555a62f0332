//! Neo NAS-AB02B2 Zigbee siren.
//!
//! <https://www.zigbee2mqtt.io/devices/NAS-AB02B2.html>

use std::sync::Arc;

use devbridge_app::codec::{Codec, Payload};
use devbridge_app::device::VirtualDevice;
use devbridge_app::factory::CodecConfig;
use devbridge_app::ports::encoder::{Encoder, Request};
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::kind::DeviceKind;
use devbridge_domain::sound::SoundLevel;
use devbridge_domain::value::Value;

use crate::codec::Z2mCodec;

fn decode_alarm(_topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    match doc.get("alarm") {
        Some(serde_json::Value::Bool(ringing)) => Ok(Some(Value::Bool(*ringing))),
        _ => Err(DecodingError::MissingKey {
            key: "alarm",
            payload: truncate_payload(&doc.to_string()),
        }),
    }
}

/// Siren command builder. The siren has no state-query operation; its
/// duration is carried in the set payload, so a missing `on_time` leaves
/// the siren ringing until an explicit stop.
struct SirenEncoder {
    set_topic: String,
    /// Melody index, validated to 1 through 18 at configuration time.
    melody: u8,
    volume: SoundLevel,
}

impl Encoder for SirenEncoder {
    fn change_state_request(
        &self,
        is_on: bool,
        _channel: Option<u8>,
        on_time: Option<u32>,
    ) -> Request {
        let body = serde_json::json!({
            "alarm": is_on,
            "melody": self.melody,
            "volume": self.volume.as_str(),
            "duration": on_time,
        });
        Request::new(self.set_topic.clone(), body.to_string())
    }

    fn state_request(&self, _channel: Option<u8>) -> Option<Request> {
        None
    }

    fn pulse_allowed(&self, _channel: Option<u8>) -> bool {
        false
    }
}

/// Neo NAS-AB02B2 siren codec.
///
/// Sound settings come from [`CodecConfig::sound`]; the device defaults to
/// melody 1 at low volume when none are configured.
pub fn neo_nas_ab02b2(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let sound = config.sound.unwrap_or_default();
    let encoder = Arc::new(SirenEncoder {
        set_topic: codec.set_topic(),
        melody: sound.melody(),
        volume: sound.level(),
    });

    let mut alarm = VirtualDevice::new(
        DeviceKind::Alarm,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    if let Some(secs) = config.countdown {
        alarm = alarm.with_countdown(secs);
    }
    alarm.bind_encoder(encoder);

    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_alarm, &alarm);
    Box::new(codec)
}
