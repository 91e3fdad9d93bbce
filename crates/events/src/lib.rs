//! Domain events and alert distribution.
//!
//! Stock movements are modelled as [`Event`]s; derived notifications
//! (low stock, stock updated, catalog changes) travel as [`Alert`]s over an
//! [`EventBus`] behind the [`AlertEmitter`] boundary.

pub mod alert;
pub mod bus;
pub mod emitter;
pub mod event;
pub mod in_memory_bus;

pub use alert::{Alert, AlertKind};
pub use bus::{EventBus, Subscription};
pub use emitter::{AlertEmitter, AlertError, BusAlertEmitter, NoopAlertEmitter};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
