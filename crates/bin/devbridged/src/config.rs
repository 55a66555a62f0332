//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `devbridge.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use devbridge_adapter_mqtt_rumqttc::MqttConfig;
use devbridge_app::factory::CodecConfig;
use devbridge_domain::model::{Model, Protocol};
use devbridge_domain::sound::{MELODY_MIN, SirenSound, SoundLevel};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker settings.
    pub mqtt: MqttConfig,
    /// Canonical republish surface settings.
    pub canonical: CanonicalConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Gateway discovery settings.
    pub discovery: DiscoveryConfig,
    /// Devices to bridge.
    pub devices: Vec<DeviceEntry>,
    /// Record outbound traffic in memory instead of connecting.
    pub dry_run: bool,
}

/// Canonical topic namespace configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Root of the `{base}/device/...` republish tree.
    pub base_topic: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Gateway discovery configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Subscribe to the gateway inventory topics.
    pub enabled: bool,
    /// Zigbee2MQTT root topic to watch for the device list.
    pub zigbee_base_topic: String,
}

/// One `[[devices]]` entry.
#[derive(Debug, Deserialize)]
pub struct DeviceEntry {
    /// Name the device registered under at its gateway.
    pub name: String,
    /// Name used on the canonical surface (defaults to `name`).
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Hardware model, as the vendor labels it.
    pub model: Model,
    /// Wire protocol; `default` resolves when the model speaks only one.
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    /// Gateway root topic override (empty = protocol default).
    #[serde(default)]
    pub base_topic: Option<String>,
    /// Treat repeated identical values as distinct updates only after the
    /// quiet window expires.
    #[serde(default)]
    pub quiet_mode: bool,
    /// Auto-stop delay in seconds for actuators.
    #[serde(default)]
    pub countdown: Option<u32>,
    /// Siren melody index, 1 through 18.
    #[serde(default)]
    pub melody: Option<u8>,
    /// Siren volume level: `low`, `medium` or `high`.
    #[serde(default)]
    pub sound_level: Option<SoundLevel>,
}

fn default_protocol() -> Protocol {
    Protocol::Default
}

impl DeviceEntry {
    /// The canonical name this entry resolves to.
    #[must_use]
    pub fn resolved_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }

    /// Validated sound settings, when the entry configures any.
    fn sound(&self) -> Result<Option<SirenSound>, ConfigError> {
        if self.melody.is_none() && self.sound_level.is_none() {
            return Ok(None);
        }
        SirenSound::new(
            self.melody.unwrap_or(MELODY_MIN),
            self.sound_level.unwrap_or_default(),
        )
        .map(Some)
        .map_err(|err| ConfigError::Validation(format!("device {}: {err}", self.name)))
    }

    /// Build the codec configuration for this entry.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] when the sound settings are out of
    /// range.
    pub fn codec_config(&self) -> Result<CodecConfig, ConfigError> {
        let mut config = CodecConfig::new(
            self.name.as_str(),
            self.base_topic.clone().unwrap_or_default(),
        )
        .with_quiet_mode(self.quiet_mode);
        if let Some(friendly_name) = &self.friendly_name {
            config = config.with_friendly_name(friendly_name.as_str());
        }
        if let Some(secs) = self.countdown {
            config = config.with_countdown(secs);
        }
        if let Some(sound) = self.sound()? {
            config = config.with_sound(sound);
        }
        Ok(config)
    }
}

impl Config {
    /// Load configuration from `devbridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// the merged configuration fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("devbridge.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DEVBRIDGE_MQTT_HOST") {
            self.mqtt.host = val;
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.port = port;
            }
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_MQTT_USERNAME") {
            self.mqtt.username = Some(val);
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_BASE_TOPIC") {
            self.canonical.base_topic = val;
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_DRY_RUN") {
            self.dry_run = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("DEVBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Validation(
                "mqtt host must not be empty".to_string(),
            ));
        }
        if self.canonical.base_topic.is_empty() {
            return Err(ConfigError::Validation(
                "canonical base topic must not be empty".to_string(),
            ));
        }
        let mut names = std::collections::HashSet::new();
        for entry in &self.devices {
            if entry.name.is_empty() {
                return Err(ConfigError::Validation(
                    "device name must not be empty".to_string(),
                ));
            }
            if !names.insert(entry.resolved_name()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device name: {}",
                    entry.resolved_name()
                )));
            }
            entry.sound()?;
        }
        Ok(())
    }
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            base_topic: "canonical".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "devbridged=info,devbridge=info".to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zigbee_base_topic: devbridge_adapter_z2m::DEFAULT_BASE_TOPIC.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
