//! Codec factory — resolves `(model, protocol)` pairs to constructors.
//!
//! Protocol adapter crates register their constructors at startup; the
//! composition root then instantiates codecs from configuration or
//! discovery records without naming concrete types.

use std::collections::HashMap;

use devbridge_domain::error::ConfigurationError;
use devbridge_domain::model::{Model, Protocol};
use devbridge_domain::sound::SirenSound;

use crate::codec::Codec;

/// Construction-time settings shared by every codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Broker-facing device identifier (topic segment).
    pub device_name: String,
    /// Name used on the canonical surface.
    pub friendly_name: String,
    /// Gateway base topic (e.g. `zigbee2mqtt`). Ignored by protocols with
    /// fixed prefixes.
    pub base_topic: String,
    /// Quiet-mode throttling for the codec's sensor devices.
    pub quiet_mode: bool,
    /// Auto-stop countdown for the codec's operable devices, in seconds.
    /// `None` disables it.
    pub countdown: Option<u32>,
    /// Sound settings for siren codecs; other codecs ignore it.
    pub sound: Option<SirenSound>,
}

impl CodecConfig {
    /// Settings for one device, with the quieter defaults.
    #[must_use]
    pub fn new(device_name: impl Into<String>, base_topic: impl Into<String>) -> Self {
        let device_name = device_name.into();
        Self {
            friendly_name: device_name.clone(),
            device_name,
            base_topic: base_topic.into(),
            quiet_mode: false,
            countdown: None,
            sound: None,
        }
    }

    #[must_use]
    pub fn with_friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = friendly_name.into();
        self
    }

    #[must_use]
    pub fn with_quiet_mode(mut self, quiet_mode: bool) -> Self {
        self.quiet_mode = quiet_mode;
        self
    }

    #[must_use]
    pub fn with_countdown(mut self, secs: u32) -> Self {
        self.countdown = (secs > 0).then_some(secs);
        self
    }

    #[must_use]
    pub fn with_sound(mut self, sound: SirenSound) -> Self {
        self.sound = Some(sound);
        self
    }
}

/// Builds one codec from shared settings.
pub type CodecConstructor = fn(&CodecConfig) -> Box<dyn Codec>;

/// Registry of codec constructors keyed by `(model, protocol)`.
#[derive(Default)]
pub struct CodecFactory {
    constructors: HashMap<Model, Vec<(Protocol, CodecConstructor)>>,
}

impl CodecFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one for the same
    /// pair.
    pub fn register(&mut self, model: Model, protocol: Protocol, constructor: CodecConstructor) {
        let entries = self.constructors.entry(model).or_default();
        match entries.iter_mut().find(|(known, _)| *known == protocol) {
            Some(entry) => entry.1 = constructor,
            None => entries.push((protocol, constructor)),
        }
    }

    /// Models with at least one registered constructor.
    pub fn models(&self) -> impl Iterator<Item = Model> + '_ {
        self.constructors.keys().copied()
    }

    /// Protocols registered for `model`, in registration order.
    #[must_use]
    pub fn protocols(&self, model: Model) -> Vec<Protocol> {
        self.constructors
            .get(&model)
            .map(|entries| entries.iter().map(|(protocol, _)| *protocol).collect())
            .unwrap_or_default()
    }

    /// Instantiate a codec for `(model, protocol)`.
    ///
    /// [`Protocol::Default`] resolves only when exactly one protocol is
    /// registered for the model.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnknownModel`] when nothing is registered for
    /// the model, [`ConfigurationError::AmbiguousProtocol`] when `Default`
    /// cannot be resolved, [`ConfigurationError::UnknownProtocol`] when
    /// the explicit pair is absent.
    pub fn create(
        &self,
        model: Model,
        protocol: Protocol,
        config: &CodecConfig,
    ) -> Result<Box<dyn Codec>, ConfigurationError> {
        let entries = self
            .constructors
            .get(&model)
            .filter(|entries| !entries.is_empty())
            .ok_or(ConfigurationError::UnknownModel { model })?;

        let constructor = match protocol {
            Protocol::Default => match entries.as_slice() {
                [(_, constructor)] => *constructor,
                _ => {
                    return Err(ConfigurationError::AmbiguousProtocol {
                        model,
                        count: entries.len(),
                    });
                }
            },
            explicit => entries
                .iter()
                .find(|(known, _)| *known == explicit)
                .map(|(_, constructor)| *constructor)
                .ok_or(ConfigurationError::UnknownProtocol {
                    model,
                    protocol: explicit,
                })?,
        };
        Ok(constructor(config))
    }
}
