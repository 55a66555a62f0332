//! Zigbee relay modules: ZBMINI-L (single) and TS0002 (dual).
//!
//! State arrives in the combined JSON payload under `state` for single
//! relays, `state_right`/`state_left` for the dual module. Commands go to
//! `<root>/set` with the same keys; the gateway reports the resulting
//! state back, so the relays never manage their own auto-off.

use std::sync::Arc;

use devbridge_app::codec::{Codec, DecodeFn, Payload};
use devbridge_app::device::VirtualDevice;
use devbridge_app::factory::CodecConfig;
use devbridge_app::ports::encoder::{Encoder, Request};
use devbridge_domain::error::{DecodingError, truncate_payload};
use devbridge_domain::kind::DeviceKind;
use devbridge_domain::value::Value;

use crate::codec::Z2mCodec;

const KEY_STATE: &str = "state";
const KEY_STATE_RIGHT: &str = "state_right";
const KEY_STATE_LEFT: &str = "state_left";

fn power_key(channel: Option<u8>) -> &'static str {
    match channel {
        None => KEY_STATE,
        Some(0) => KEY_STATE_RIGHT,
        Some(_) => KEY_STATE_LEFT,
    }
}

fn decode_power(topic: &str, payload: &Payload, key: &str) -> Result<Option<Value>, DecodingError> {
    let Some(doc) = payload.as_json() else {
        return Ok(None);
    };
    match doc.get(key) {
        // Combined payloads often carry only the other relay's key.
        None => Ok(None),
        Some(state) => match state.as_str() {
            Some("ON") => Ok(Some(Value::Bool(true))),
            Some("OFF") => Ok(Some(Value::Bool(false))),
            _ => Err(DecodingError::UnexpectedValue {
                value: truncate_payload(&state.to_string()),
                topic: topic.to_string(),
            }),
        },
    }
}

fn decode_state(topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    decode_power(topic, payload, KEY_STATE)
}

fn decode_state_right(topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    decode_power(topic, payload, KEY_STATE_RIGHT)
}

fn decode_state_left(topic: &str, payload: &Payload) -> Result<Option<Value>, DecodingError> {
    decode_power(topic, payload, KEY_STATE_LEFT)
}

/// Command builder shared by the Zigbee relay modules.
pub(crate) struct SwitchEncoder {
    set_topic: String,
    get_topic: String,
    multi_relay: bool,
}

impl SwitchEncoder {
    pub(crate) fn new(codec: &Z2mCodec, multi_relay: bool) -> Self {
        Self {
            set_topic: codec.set_topic(),
            get_topic: codec.get_topic(),
            multi_relay,
        }
    }
}

impl Encoder for SwitchEncoder {
    fn change_state_request(
        &self,
        is_on: bool,
        channel: Option<u8>,
        on_time: Option<u32>,
    ) -> Request {
        let mut body = serde_json::Map::new();
        body.insert(
            power_key(channel).to_string(),
            serde_json::Value::from(if is_on { "ON" } else { "OFF" }),
        );
        if let Some(secs) = on_time {
            body.insert("on_time".to_string(), serde_json::Value::from(secs));
        }
        Request::new(
            self.set_topic.clone(),
            serde_json::Value::Object(body).to_string(),
        )
    }

    fn state_request(&self, _channel: Option<u8>) -> Option<Request> {
        let body = if self.multi_relay {
            r#"{"state_left":"","state_right":""}"#
        } else {
            r#"{"state":""}"#
        };
        Some(Request::new(self.get_topic.clone(), body))
    }

    fn pulse_allowed(&self, _channel: Option<u8>) -> bool {
        false
    }
}

/// Sonoff ZBMINI-L single-relay switch module.
///
/// <https://www.zigbee2mqtt.io/devices/ZBMINI-L.html>
pub fn sonoff_zbmini_l(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let encoder = Arc::new(SwitchEncoder::new(&codec, false));

    let mut switch = VirtualDevice::new(
        DeviceKind::Switch,
        config.friendly_name.as_str(),
        config.quiet_mode,
    );
    if let Some(secs) = config.countdown {
        switch = switch.with_countdown(secs);
    }
    switch.bind_encoder(Arc::clone(&encoder) as Arc<dyn Encoder>);

    let root = codec.root_topic().to_string();
    codec.registry_mut().add(root.as_str(), decode_state, &switch);
    if let Some(request) = encoder.state_request(None) {
        codec.push_initial(request);
    }
    Box::new(codec)
}

/// TuYa TS0002 dual-relay switch module.
///
/// <https://www.zigbee2mqtt.io/devices/TS0002.html>
pub fn tuya_ts0002(config: &CodecConfig) -> Box<dyn Codec> {
    let mut codec = Z2mCodec::new(config);
    let encoder = Arc::new(SwitchEncoder::new(&codec, true));

    let root = codec.root_topic().to_string();
    let relays: [(DeviceKind, DecodeFn); 2] = [
        (DeviceKind::Switch0, decode_state_right),
        (DeviceKind::Switch1, decode_state_left),
    ];
    for (kind, decode) in relays {
        let mut switch =
            VirtualDevice::new(kind, config.friendly_name.as_str(), config.quiet_mode);
        if let Some(secs) = config.countdown {
            switch = switch.with_countdown(secs);
        }
        switch.bind_encoder(Arc::clone(&encoder) as Arc<dyn Encoder>);
        codec.registry_mut().add(root.as_str(), decode, &switch);
    }
    if let Some(request) = encoder.state_request(Some(0)) {
        codec.push_initial(request);
    }
    Box::new(codec)
}
