//! # tripwire-app
//!
//! Automation runtime: routes events to automations.
//!
//! ## Responsibilities
//! - Define the [`Automation`](automation::Automation) contract user code implements
//! - Index device-event subscriptions by device id, attribute name and "all events"
//! - Dispatch device events to matching automations, isolating handler failures
//! - Fire timer events on fixed periods
//! - Keep the registry of automations and fan them out to every events service
//! - Define the **hub port** ([`HubClient`](ports::HubClient)) and cache device
//!   snapshots fed by it
//!
//! ## Dependency rule
//! Depends on `tripwire-domain` only (plus `tokio` for tasks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation;
pub mod collections;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod ports;
pub mod scheduler;
pub mod services;
