//! Encoder port — builds outbound command requests for one device model.

/// A ready-to-publish topic + payload pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub topic: String,
    pub payload: String,
}

impl Request {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Capability of building wire requests for an operable device.
///
/// Implemented per device model in the protocol adapter crates; bound to
/// the operable virtual devices at codec-construction time.
pub trait Encoder: Send + Sync {
    /// Build a change-state request.
    ///
    /// `channel` selects the relay on multi-relay devices. `on_time` is
    /// only honoured by pulse-capable encoders (see
    /// [`pulse_allowed`](Self::pulse_allowed)); everyone else ignores it
    /// and the caller arms a local auto-stop timer instead.
    fn change_state_request(&self, is_on: bool, channel: Option<u8>, on_time: Option<u32>)
    -> Request;

    /// Build a state-query request, or `None` when the protocol has no
    /// such operation (the caller treats that as a silent no-op).
    fn state_request(&self, channel: Option<u8>) -> Option<Request>;

    /// Whether the device manages its own auto-off from an `on_time`
    /// forwarded in the change-state request.
    fn pulse_allowed(&self, channel: Option<u8>) -> bool;

    /// One-time device-configuration request published when the device
    /// first comes online.
    fn configure_request(&self) -> Option<Request> {
        None
    }
}
