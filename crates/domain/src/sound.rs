//! Sound settings for siren devices.

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Lowest melody index a siren accepts.
pub const MELODY_MIN: u8 = 1;
/// Highest melody index a siren accepts.
pub const MELODY_MAX: u8 = 18;

/// Siren volume level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl SoundLevel {
    /// Wire representation of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for SoundLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated sound settings for a siren: melody index and volume level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SirenSound {
    melody: u8,
    level: SoundLevel,
}

impl Default for SirenSound {
    fn default() -> Self {
        Self {
            melody: MELODY_MIN,
            level: SoundLevel::Low,
        }
    }
}

impl SirenSound {
    /// Build sound settings, checking the melody index.
    ///
    /// # Errors
    ///
    /// [`DeviceError::InvalidMelody`] when `melody` is outside
    /// [`MELODY_MIN`]..=[`MELODY_MAX`].
    pub fn new(melody: u8, level: SoundLevel) -> Result<Self, DeviceError> {
        if !(MELODY_MIN..=MELODY_MAX).contains(&melody) {
            return Err(DeviceError::InvalidMelody { melody });
        }
        Ok(Self { melody, level })
    }

    #[must_use]
    pub fn melody(self) -> u8 {
        self.melody
    }

    #[must_use]
    pub fn level(self) -> SoundLevel {
        self.level
    }
}
