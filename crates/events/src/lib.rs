//! `isperp-events`: change notification plumbing.
//!
//! Session stores publish change notifications and session managers publish
//! lifecycle events through the same small pub/sub contract, so nothing in the
//! client needs an ambient, process-global event target.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
