//! Typed device identifier.
//!
//! Hubs address devices by small integers but transmit them as strings, so
//! [`DeviceId`] parses from text and converts from the common integer types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidDeviceError;

/// Unique identifier of a device on the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(i64);

impl DeviceId {
    /// Wrap a raw hub identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Access the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for DeviceId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<i32> for DeviceId {
    fn from(raw: i32) -> Self {
        Self(i64::from(raw))
    }
}

impl From<u32> for DeviceId {
    fn from(raw: u32) -> Self {
        Self(i64::from(raw))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DeviceId {
    type Err = InvalidDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| InvalidDeviceError { raw: s.to_string() })
    }
}
