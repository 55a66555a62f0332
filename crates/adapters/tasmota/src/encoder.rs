//! Tasmota command builder.
//!
//! Commands go to `cmnd/<device>/Power[n]`. Timed starts ride the
//! firmware's own PulseTime mechanism through a Backlog batch, so the
//! relay switches itself off even if the bridge dies meanwhile.

use devbridge_app::ports::encoder::{Encoder, Request};

use crate::codec::topic_prefix;

/// PulseTime values above this threshold are seconds offset by 100
/// (below it they are 0.1s ticks, which the bridge never uses).
const PULSE_TIME_OFFSET: u32 = 100;

pub(crate) struct TasmotaEncoder {
    power_topic: String,
    backlog_topic: String,
    /// Backlog batch sent once on first contact, e.g. to reset PulseTime.
    configure: Option<&'static str>,
}

impl TasmotaEncoder {
    pub(crate) fn new(
        config: &devbridge_app::factory::CodecConfig,
        configure: Option<&'static str>,
    ) -> Self {
        let prefix = topic_prefix(&config.base_topic);
        let device = &config.device_name;
        Self {
            power_topic: format!("{prefix}cmnd/{device}/Power"),
            backlog_topic: format!("{prefix}cmnd/{device}/Backlog"),
            configure,
        }
    }

    fn power_topic(&self, channel: Option<u8>) -> String {
        match channel {
            None => self.power_topic.clone(),
            Some(digit) => format!("{}{digit}", self.power_topic),
        }
    }

    fn channel_suffix(channel: Option<u8>) -> String {
        channel.map(|digit| digit.to_string()).unwrap_or_default()
    }
}

impl Encoder for TasmotaEncoder {
    fn change_state_request(
        &self,
        is_on: bool,
        channel: Option<u8>,
        on_time: Option<u32>,
    ) -> Request {
        match (is_on, on_time) {
            // PulseTime arms the firmware's auto-off for this switch-on.
            (true, Some(secs)) => {
                let suffix = Self::channel_suffix(channel);
                Request::new(
                    self.backlog_topic.clone(),
                    format!(
                        "PulseTime{suffix} {}; Power{suffix} ON",
                        PULSE_TIME_OFFSET + secs
                    ),
                )
            }
            (true, None) => Request::new(self.power_topic(channel), "ON"),
            (false, _) => Request::new(self.power_topic(channel), "OFF"),
        }
    }

    fn state_request(&self, channel: Option<u8>) -> Option<Request> {
        // An empty payload on the Power topic is a status query.
        Some(Request::new(self.power_topic(channel), ""))
    }

    fn pulse_allowed(&self, _channel: Option<u8>) -> bool {
        true
    }

    fn configure_request(&self) -> Option<Request> {
        self.configure
            .map(|batch| Request::new(self.backlog_topic.clone(), batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devbridge_app::factory::CodecConfig;

    fn encoder() -> TasmotaEncoder {
        TasmotaEncoder::new(&CodecConfig::new("plug_office", ""), Some("PulseTime 0"))
    }

    #[test]
    fn should_build_plain_power_commands() {
        let encoder = encoder();
        let on = encoder.change_state_request(true, None, None);
        assert_eq!(on.topic, "cmnd/plug_office/Power");
        assert_eq!(on.payload, "ON");

        let off = encoder.change_state_request(false, None, Some(13));
        assert_eq!(off.payload, "OFF");
    }

    #[test]
    fn should_batch_pulse_time_with_timed_start() {
        let encoder = encoder();
        let request = encoder.change_state_request(true, None, Some(13));
        assert_eq!(request.topic, "cmnd/plug_office/Backlog");
        assert_eq!(request.payload, "PulseTime 113; Power ON");
    }

    #[test]
    fn should_address_the_channel_in_every_command() {
        let encoder = encoder();
        let request = encoder.change_state_request(true, Some(1), Some(360));
        assert_eq!(request.payload, "PulseTime1 460; Power1 ON");
        assert_eq!(
            encoder.change_state_request(false, Some(0), None).topic,
            "cmnd/plug_office/Power0"
        );
    }

    #[test]
    fn should_query_state_with_empty_payload() {
        let request = encoder().state_request(Some(0)).unwrap();
        assert_eq!(request.topic, "cmnd/plug_office/Power0");
        assert_eq!(request.payload, "");
    }

    #[test]
    fn should_expose_configure_batch() {
        let request = encoder().configure_request().unwrap();
        assert_eq!(request.topic, "cmnd/plug_office/Backlog");
        assert_eq!(request.payload, "PulseTime 0");
    }
}
