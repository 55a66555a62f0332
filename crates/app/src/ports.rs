//! Port definitions — traits at the boundary between the core and the
//! outside world.
//!
//! They are defined here (in `app`) so that both the use-case layer and
//! the adapter layer can depend on them without creating circular
//! dependencies.

pub mod bus;
pub mod encoder;
pub mod processor;

pub use bus::{BusError, BusEvent, MessageBus, Qos, SharedBus};
pub use encoder::{Encoder, Request};
pub use processor::{AvailabilityProcessor, DiscoveryProcessor, ValueProcessor};
