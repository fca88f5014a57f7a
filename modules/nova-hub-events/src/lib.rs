//! In-process event bus for dashboards and per-destination listeners.

pub mod bus;
pub mod event;

pub use bus::EventBus;
pub use event::HubEvent;
