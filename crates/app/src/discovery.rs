//! Device discovery core.
//!
//! A protocol adapter supplies a [`DiscoveryParser`]; the [`Discoverer`]
//! owns the merged device list and notifies its processors on every
//! update.

use devbridge_domain::device::Device;
use devbridge_domain::error::DecodingError;

use crate::ports::bus::{Qos, SharedBus};
use crate::ports::processor::DiscoveryProcessor;

/// How a parse result folds into the known-device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The payload carries the whole device list; replace ours.
    Replace,
    /// The payload describes one device; insert or update by address.
    UpsertByAddress,
}

/// Protocol-specific discovery parsing.
pub trait DiscoveryParser: Send {
    /// Topic filters to subscribe for discovery traffic.
    fn subscription_topics(&self) -> Vec<String>;

    /// Whether `topic` carries discovery traffic for this parser.
    fn matches(&self, topic: &str) -> bool;

    /// How this parser's results merge into the device list.
    fn merge_strategy(&self) -> MergeStrategy;

    /// Parse one discovery payload into device records.
    ///
    /// # Errors
    ///
    /// [`DecodingError`] when the payload is malformed; the caller logs
    /// and drops it.
    fn parse(&self, topic: &str, payload: &str) -> Result<Vec<Device>, DecodingError>;
}

/// Tracks the devices visible on one protocol network.
pub struct Discoverer {
    parser: Box<dyn DiscoveryParser>,
    devices: Vec<Device>,
    processors: Vec<Box<dyn DiscoveryProcessor>>,
}

impl Discoverer {
    #[must_use]
    pub fn new(parser: Box<dyn DiscoveryParser>) -> Self {
        Self {
            parser,
            devices: Vec::new(),
            processors: Vec::new(),
        }
    }

    pub fn processor_append(&mut self, processor: Box<dyn DiscoveryProcessor>) {
        self.processors.push(processor);
    }

    /// Devices seen so far.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn handles(&self, topic: &str) -> bool {
        self.parser.matches(topic)
    }

    /// (Re)establish discovery subscriptions.
    pub fn subscribe_all(&self, bus: &SharedBus) {
        for topic in self.parser.subscription_topics() {
            if let Err(err) = bus.subscribe(&topic, Qos::AtLeastOnce) {
                tracing::error!(topic, error = %err, "discovery subscription rejected");
            }
        }
    }

    /// Fold one discovery message into the device list.
    ///
    /// Malformed payloads are logged and dropped. Processors are notified
    /// on every successful parse, even when the list is unchanged.
    pub fn handle_message(&mut self, topic: &str, raw: &str) {
        let parsed = match self.parser.parse(topic, raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(topic, error = %err, "discovery payload dropped");
                return;
            }
        };

        match self.parser.merge_strategy() {
            MergeStrategy::Replace => {
                self.devices = parsed;
            }
            MergeStrategy::UpsertByAddress => {
                for device in parsed {
                    match self
                        .devices
                        .iter_mut()
                        .find(|known| known.address == device.address)
                    {
                        Some(known) => *known = device,
                        None => self.devices.push(device),
                    }
                }
            }
        }
        tracing::debug!(topic, count = self.devices.len(), "device list updated");

        for processor in &self.processors {
            processor.on_discovery_update(&self.devices);
        }
    }
}
