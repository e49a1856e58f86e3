//! Application services.
//!
//! Each service accepts its collaborators through the constructor, keeping
//! this layer decoupled from concrete adapters.

pub mod automations_service;
pub mod device_cache;

pub use automations_service::AutomationsService;
pub use device_cache::DeviceCache;
