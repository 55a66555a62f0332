//! Virtual-device kinds and the fixed property triple each one carries.
//!
//! The reference hierarchy (Sensor/Operable subclass trees) is represented
//! here as a tagged variant: each kind knows its `(node, name, type)`
//! property triple, whether it accepts commands, and — for multi-relay
//! switches — its channel index. Dispatch is by `match`, not inheritance.

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Fixed `(node, name, type)` triple describing one device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    /// Canonical node segment (e.g. `"sensor"`, `"switch"`).
    pub node: &'static str,
    /// Canonical property name (e.g. `"temperature"`, `"power"`).
    pub name: &'static str,
    /// Declared runtime type of the property value.
    pub value_type: ValueType,
}

/// Every virtual-device kind the bridge knows how to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Temperature,
    Humidity,
    Light,
    Conductivity,
    Button,
    Motion,
    Adc,
    Switch,
    Switch0,
    Switch1,
    Alarm,
}

impl DeviceKind {
    /// The property triple this kind exposes.
    #[must_use]
    pub fn property(self) -> Property {
        match self {
            Self::Temperature => Property {
                node: "sensor",
                name: "temperature",
                value_type: ValueType::Float,
            },
            Self::Humidity => Property {
                node: "sensor",
                name: "humidity",
                value_type: ValueType::Int,
            },
            Self::Light => Property {
                node: "sensor",
                name: "light",
                value_type: ValueType::Int,
            },
            Self::Conductivity => Property {
                node: "sensor",
                name: "conductivity",
                value_type: ValueType::Int,
            },
            Self::Button => Property {
                node: "sensor",
                name: "action",
                value_type: ValueType::Str,
            },
            Self::Motion => Property {
                node: "sensor",
                name: "occupancy",
                value_type: ValueType::Bool,
            },
            Self::Adc => Property {
                node: "sensor",
                name: "voltage",
                value_type: ValueType::Float,
            },
            Self::Switch => Property {
                node: "switch",
                name: "power",
                value_type: ValueType::Bool,
            },
            Self::Switch0 => Property {
                node: "switch0",
                name: "power",
                value_type: ValueType::Bool,
            },
            Self::Switch1 => Property {
                node: "switch1",
                name: "power",
                value_type: ValueType::Bool,
            },
            Self::Alarm => Property {
                node: "alarm",
                name: "alarm",
                value_type: ValueType::Bool,
            },
        }
    }

    /// Whether this kind accepts commands (switches and alarms).
    #[must_use]
    pub fn is_operable(self) -> bool {
        matches!(self, Self::Switch | Self::Switch0 | Self::Switch1 | Self::Alarm)
    }

    /// Relay channel index for multi-relay switch kinds.
    #[must_use]
    pub fn channel(self) -> Option<u8> {
        match self {
            Self::Switch0 => Some(0),
            Self::Switch1 => Some(1),
            _ => None,
        }
    }

    /// Numeric sensors whose float input is rounded to one decimal before
    /// type validation.
    #[must_use]
    pub fn rounds_to_one_decimal(self) -> bool {
        matches!(self, Self::Temperature | Self::Adc)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let property = self.property();
        write!(f, "{}.{}", property.node, property.name)
    }
}

/// Closed vocabulary of button actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    Single,
    Double,
    Long,
    Off,
}

impl ButtonAction {
    /// Wire form of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Long => "long",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for ButtonAction {
    type Err = crate::error::DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            "long" => Ok(Self::Long),
            "off" => Ok(Self::Off),
            other => Err(crate::error::DeviceError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_expose_switch_property_triple() {
        let property = DeviceKind::Switch.property();
        assert_eq!(property.node, "switch");
        assert_eq!(property.name, "power");
        assert_eq!(property.value_type, ValueType::Bool);
    }

    #[test]
    fn should_expose_temperature_property_triple() {
        let property = DeviceKind::Temperature.property();
        assert_eq!(property.node, "sensor");
        assert_eq!(property.name, "temperature");
        assert_eq!(property.value_type, ValueType::Float);
    }

    #[test]
    fn should_mark_only_switches_and_alarm_operable() {
        assert!(DeviceKind::Switch.is_operable());
        assert!(DeviceKind::Switch0.is_operable());
        assert!(DeviceKind::Switch1.is_operable());
        assert!(DeviceKind::Alarm.is_operable());
        assert!(!DeviceKind::Temperature.is_operable());
        assert!(!DeviceKind::Button.is_operable());
        assert!(!DeviceKind::Motion.is_operable());
    }

    #[test]
    fn should_expose_channel_index_for_multi_relay_kinds() {
        assert_eq!(DeviceKind::Switch0.channel(), Some(0));
        assert_eq!(DeviceKind::Switch1.channel(), Some(1));
        assert_eq!(DeviceKind::Switch.channel(), None);
    }

    #[test]
    fn should_round_only_temperature_and_adc() {
        assert!(DeviceKind::Temperature.rounds_to_one_decimal());
        assert!(DeviceKind::Adc.rounds_to_one_decimal());
        assert!(!DeviceKind::Humidity.rounds_to_one_decimal());
    }

    #[test]
    fn should_parse_known_button_actions() {
        assert_eq!("single".parse::<ButtonAction>().unwrap(), ButtonAction::Single);
        assert_eq!("double".parse::<ButtonAction>().unwrap(), ButtonAction::Double);
        assert_eq!("long".parse::<ButtonAction>().unwrap(), ButtonAction::Long);
        assert_eq!("off".parse::<ButtonAction>().unwrap(), ButtonAction::Off);
    }

    #[test]
    fn should_reject_unknown_button_action() {
        let err = "triple".parse::<ButtonAction>().unwrap_err();
        assert!(err.to_string().contains("triple"));
    }

    #[test]
    fn should_display_qualified_property() {
        assert_eq!(DeviceKind::Switch.to_string(), "switch.power");
        assert_eq!(DeviceKind::Motion.to_string(), "sensor.occupancy");
    }
}
