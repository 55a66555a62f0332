//! The virtual-device state machine.
//!
//! Pure, clock-injected logic: value typing, change detection and
//! quiet-mode throttling live here, away from timers, processors and
//! transports. The `app` crate wraps this in a shareable handle that adds
//! the IO-facing behaviour.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::DeviceError;
use crate::kind::{ButtonAction, DeviceKind};
use crate::value::Value;

/// Quiet-mode suppression window.
pub const QUIET_DELAY_SECS: i64 = 60;

/// Outcome of feeding one decoded value into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No relevant value in the payload; nothing changed, nobody notified.
    Ignored,
    /// Quiet mode suppressed a repeated value inside the quiet window.
    Echo,
    /// The value was accepted. `notify` tells the caller whether to run
    /// the processor chain (repeated values in non-quiet mode are accepted
    /// silently).
    Success {
        /// Whether processors must be notified.
        notify: bool,
    },
}

impl Transition {
    /// Whether the processor chain must run for this transition.
    #[must_use]
    pub fn notifies(self) -> bool {
        matches!(self, Self::Success { notify: true })
    }
}

/// Typed state of one virtual-device property.
#[derive(Debug, Clone)]
pub struct DeviceState {
    kind: DeviceKind,
    friendly_name: String,
    quiet_mode: bool,
    value: Option<Value>,
    last_updated: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Create an unset state for the given kind.
    #[must_use]
    pub fn new(kind: DeviceKind, friendly_name: impl Into<String>, quiet_mode: bool) -> Self {
        Self {
            kind,
            friendly_name: friendly_name.into(),
            quiet_mode,
            value: None,
            last_updated: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    #[must_use]
    pub fn quiet_mode(&self) -> bool {
        self.quiet_mode
    }

    /// Current value, `None` until the first successful update.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// When the state machine last accepted or echoed a value.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Whether the current value is "on" (operable kinds).
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.value.as_ref().is_some_and(Value::is_on)
    }

    /// Feed one decoded value into the state machine.
    ///
    /// `None` means the payload carried nothing for this property (e.g. a
    /// battery-level housekeeping field) and is ignored without mutation.
    ///
    /// # Errors
    ///
    /// [`DeviceError::TypeMismatch`] when the value's runtime type does not
    /// match the declared property type, [`DeviceError::InvalidAction`] for
    /// button values outside the action vocabulary. The stored value is
    /// left untouched on error.
    pub fn apply(
        &mut self,
        value: Option<Value>,
        now: DateTime<Utc>,
    ) -> Result<Transition, DeviceError> {
        let Some(raw) = value else {
            return Ok(Transition::Ignored);
        };
        let value = self.validate(raw)?;

        if self.value.as_ref() == Some(&value) {
            let within_quiet_window = self
                .last_updated
                .is_some_and(|at| now - at < TimeDelta::seconds(QUIET_DELAY_SECS));
            self.last_updated = Some(now);
            if self.quiet_mode && within_quiet_window {
                return Ok(Transition::Echo);
            }
            // Repeated value outside quiet mode: accepted, not broadcast.
            let notify = self.quiet_mode;
            return Ok(Transition::Success { notify });
        }

        self.value = Some(value);
        self.last_updated = Some(now);
        Ok(Transition::Success { notify: true })
    }

    /// Round to one decimal where the kind asks for it, then check the
    /// runtime type against the declared property type.
    fn validate(&self, value: Value) -> Result<Value, DeviceError> {
        let value = match (value, self.kind.rounds_to_one_decimal()) {
            (Value::Float(v), true) => Value::Float((v * 10.0).round() / 10.0),
            (other, _) => other,
        };

        if self.kind == DeviceKind::Button {
            let Value::Str(ref action) = value else {
                return Err(self.type_mismatch(&value));
            };
            action.parse::<ButtonAction>()?;
            return Ok(value);
        }

        if value.value_type() == self.kind.property().value_type {
            Ok(value)
        } else {
            Err(self.type_mismatch(&value))
        }
    }

    fn type_mismatch(&self, value: &Value) -> DeviceError {
        DeviceError::TypeMismatch {
            expected: self.kind.property().value_type,
            value: format!("{value:?}"),
            kind: self.kind,
        }
    }
}
