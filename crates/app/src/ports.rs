//! Port definitions: traits at the runtime's boundaries.
//!
//! [`EventsService`] is implemented by every event source inside this crate
//! so the registry can fan automations out to them. [`HubClient`] is
//! implemented by hub adapters.

pub mod events_service;
pub mod hub;

pub use events_service::EventsService;
pub use hub::HubClient;
