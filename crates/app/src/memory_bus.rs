//! In-process message bus backed by a recorded-publish log.
//!
//! Loopback implementation of the [`MessageBus`] port: publishes are
//! recorded instead of hitting a broker. Used by tests across the
//! workspace and by the binary's dry-run mode.

use std::sync::Mutex;

use crate::ports::bus::{BusError, MessageBus, Qos};

/// One recorded outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub topic: String,
    pub payload: String,
    pub qos: Qos,
    pub retain: bool,
}

/// Loopback [`MessageBus`] recording all outbound traffic.
#[derive(Debug, Default)]
pub struct MemoryBus {
    published: Mutex<Vec<Recorded>>,
    subscriptions: Mutex<Vec<String>>,
    will: Mutex<Option<Recorded>>,
}

impl MemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message published so far, in order.
    #[must_use]
    pub fn published(&self) -> Vec<Recorded> {
        self.published.lock().expect("publish log poisoned").clone()
    }

    /// Every subscription requested so far, in order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .expect("subscription log poisoned")
            .clone()
    }

    /// The currently registered will message, if any.
    #[must_use]
    pub fn will(&self) -> Option<Recorded> {
        self.will.lock().expect("will slot poisoned").clone()
    }

    /// Drop all recorded traffic.
    pub fn clear(&self) {
        self.published.lock().expect("publish log poisoned").clear();
        self.subscriptions
            .lock()
            .expect("subscription log poisoned")
            .clear();
    }
}

impl MessageBus for MemoryBus {
    fn publish(&self, topic: &str, payload: &str, qos: Qos, retain: bool) -> Result<(), BusError> {
        self.published
            .lock()
            .expect("publish log poisoned")
            .push(Recorded {
                topic: topic.to_string(),
                payload: payload.to_string(),
                qos,
                retain,
            });
        Ok(())
    }

    fn subscribe(&self, topic: &str, _qos: Qos) -> Result<(), BusError> {
        self.subscriptions
            .lock()
            .expect("subscription log poisoned")
            .push(topic.to_string());
        Ok(())
    }

    fn set_will(&self, topic: &str, payload: &str, qos: Qos, retain: bool) {
        let mut slot = self.will.lock().expect("will slot poisoned");
        *slot = Some(Recorded {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retain,
        });
    }
}
