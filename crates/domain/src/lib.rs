//! # devbridge-domain
//!
//! Pure domain model for the devbridge device-virtualization bridge.
//!
//! ## Responsibilities
//! - Typed scalar **values** and the property triples they belong to
//! - The **virtual-device state machine** (change detection, quiet-mode
//!   throttling, type validation) as pure, clock-injected logic
//! - **Model** / **Protocol** lookup keys and the **Device** discovery record
//! - Tri-state **availability**
//! - The error taxonomy shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! It must never import anything from `app`, adapters, or transport crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod availability;
pub mod device;
pub mod error;
pub mod kind;
pub mod model;
pub mod sound;
pub mod state;
pub mod value;
