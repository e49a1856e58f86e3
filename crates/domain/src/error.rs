//! Common error types used across the workspace.
//!
//! Each concern owns a typed error; [`TripwireError`] aggregates them through
//! `#[from]` so callers can use `?` across layers.

use crate::event::EventKind;
use crate::id::DeviceId;

/// Top-level error for the tripwire workspace.
#[derive(Debug, thiserror::Error)]
pub enum TripwireError {
    #[error("invalid trigger definition")]
    Builder(#[from] BuilderError),

    #[error("unexpected event kind")]
    EventKind(#[from] EventKindError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("invalid device data")]
    InvalidDevice(#[from] InvalidDeviceError),

    #[error("device mismatch")]
    DeviceMismatch(#[from] DeviceMismatchError),
}

/// Misuse of the trigger DSL, raised at the call site.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    #[error("invalid builder state: the trigger has no attribute filter")]
    NoAttributeFilter,

    #[error("invalid builder state: the last attribute filter has no change group")]
    NoChangeGroup,

    #[error("a device trigger needs at least one device id")]
    EmptyDevices,

    #[error("an attribute filter needs at least one attribute name")]
    EmptyAttributes,

    #[error("a timer interval must be greater than zero, got {value}")]
    NonPositiveInterval { value: f64 },

    #[error("a timer trigger needs at least one interval")]
    NoIntervals,

    #[error("multi-unit timer intervals are not supported, got {count} entries")]
    MultiUnitInterval { count: usize },
}

/// An event was asked to be handled as a kind it is not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a {expected} event, got a {actual} event")]
pub struct EventKindError {
    pub expected: EventKind,
    pub actual: EventKind,
}

/// A looked-up resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Device data reported by a hub could not be turned into a [`Device`](crate::device::Device).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device id {raw:?}")]
pub struct InvalidDeviceError {
    pub raw: String,
}

/// A device snapshot was refreshed from data describing another device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot update device {target} with data from device {source_id}")]
pub struct DeviceMismatchError {
    pub target: DeviceId,
    pub source_id: DeviceId,
}
