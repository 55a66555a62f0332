//! Tri-state liveness of a physical device.

/// Availability of a physical device, separate from its property values.
///
/// Owned by the bridge, one per codec instance. Starts [`Unknown`](Self::Unknown)
/// until the first availability message decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// No availability message decoded yet.
    #[default]
    Unknown,
    /// The device announced itself online.
    Online,
    /// The device announced itself offline.
    Offline,
}

impl Availability {
    /// Payload published to the canonical `$state` topic.
    #[must_use]
    pub fn state_payload(self) -> &'static str {
        match self {
            Self::Unknown => "init",
            Self::Online => "ready",
            Self::Offline => "disconnected",
        }
    }

    /// Whether the device is currently reachable.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl From<bool> for Availability {
    fn from(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}
