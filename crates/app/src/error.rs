//! Errors raised by the automation runtime.

use tripwire_domain::error::{BuilderError, DeviceMismatchError, InvalidDeviceError, NotFoundError};
use tripwire_domain::id::DeviceId;

/// An automation could not be registered on an events service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    #[error("automation {name:?} is already registered")]
    AlreadyRegistered { name: String },

    #[error("automation {name:?} declares an invalid trigger")]
    InvalidTrigger {
        name: String,
        #[source]
        source: BuilderError,
    },

    #[error("automation {name:?} needs a tokio runtime to schedule its timers")]
    NoRuntime { name: String },
}

/// At least one automation failed while handling an event.
///
/// Every failure is logged when it happens; this value only summarizes the
/// dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("automation {automation:?} failed to handle the event ({} failure(s) in total)", failed.len())]
    HandlerFailed {
        automation: String,
        failed: Vec<String>,
    },
}

/// Failure reported by a hub client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("device {0} is unknown to the hub")]
    UnknownDevice(DeviceId),

    #[error("device {device} does not support command {command:?}")]
    UnsupportedCommand { device: DeviceId, command: String },

    #[error("invalid value {value:?} for command {command:?}")]
    InvalidCommandValue { command: String, value: String },

    #[error("hub request failed: {0}")]
    Transport(String),
}

/// Failure of a device cache operation.
#[derive(Debug, thiserror::Error)]
pub enum DeviceCacheError {
    #[error("hub request failed")]
    Hub(#[from] HubError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("invalid device data")]
    InvalidDevice(#[from] InvalidDeviceError),

    #[error("device data mismatch")]
    DeviceMismatch(#[from] DeviceMismatchError),
}
