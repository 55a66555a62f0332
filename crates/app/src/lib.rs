//! # devbridge-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement or consume:
//!   - [`ports::MessageBus`] — the pub/sub transport capability
//!   - [`ports::Encoder`] — builds outbound command requests
//!   - [`ports::ValueProcessor`] / [`ports::AvailabilityProcessor`] /
//!     [`ports::DiscoveryProcessor`] — observer chains
//! - Provide the **virtual-device handle** wrapping the domain state
//!   machine with processor fan-out and auto-stop timers
//! - Provide the **bridge** binding a codec to the message bus
//! - Provide the **codec registry**, **discovery core**, **codec factory**
//!   and the **supervisor** event loop
//! - Provide an in-process [`memory_bus::MemoryBus`] that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `devbridge-domain` only (plus `tokio` for channels/timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod bridge;
pub mod codec;
pub mod device;
pub mod discovery;
pub mod factory;
pub mod memory_bus;
pub mod ports;
pub mod processor;
pub mod supervisor;
