//! `gatehouse-events` — publish/subscribe mechanics.
//!
//! Transport only: the message types (session changes and the like) live in
//! the crates that own them.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
