//! Events delivered to automations.
//!
//! A [`DeviceEvent`] records a single attribute change on one device. A
//! [`TimerEvent`] records a tick of an interval trigger. Both travel as an
//! [`AutomationEvent`], whose [`EventKind`] routes it to the right dispatcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventKindError;
use crate::id::DeviceId;

/// UTC timestamp attached to timer ticks.
pub type Timestamp = DateTime<Utc>;

/// Discriminates the two families of events and triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Device,
    Timer,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => f.write_str("device"),
            Self::Timer => f.write_str("timer"),
        }
    }
}

/// A single attribute value change on a device.
///
/// Values are kept as the strings the hub reports. `None` stands for a null
/// value, or for a previous value that was never seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: DeviceId,
    pub attribute_name: String,
    pub new_value: Option<String>,
    pub previous_value: Option<String>,
}

impl DeviceEvent {
    /// Create an event without a previous value.
    #[must_use]
    pub fn new(
        device_id: impl Into<DeviceId>,
        attribute_name: impl Into<String>,
        new_value: Option<&str>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            attribute_name: attribute_name.into(),
            new_value: new_value.map(str::to_string),
            previous_value: None,
        }
    }

    #[must_use]
    pub fn with_previous(mut self, previous_value: Option<&str>) -> Self {
        self.previous_value = previous_value.map(str::to_string);
        self
    }
}

/// A tick of an interval trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub fired_at: Timestamp,
}

impl TimerEvent {
    /// A tick stamped with the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            fired_at: Utc::now(),
        }
    }
}

/// Any event an automation can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AutomationEvent {
    Device(DeviceEvent),
    Timer(TimerEvent),
}

impl AutomationEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Device(_) => EventKind::Device,
            Self::Timer(_) => EventKind::Timer,
        }
    }

    #[must_use]
    pub fn as_device(&self) -> Option<&DeviceEvent> {
        match self {
            Self::Device(event) => Some(event),
            Self::Timer(_) => None,
        }
    }

    #[must_use]
    pub fn as_timer(&self) -> Option<&TimerEvent> {
        match self {
            Self::Timer(event) => Some(event),
            Self::Device(_) => None,
        }
    }
}

impl From<DeviceEvent> for AutomationEvent {
    fn from(event: DeviceEvent) -> Self {
        Self::Device(event)
    }
}

impl From<TimerEvent> for AutomationEvent {
    fn from(event: TimerEvent) -> Self {
        Self::Timer(event)
    }
}

impl TryFrom<AutomationEvent> for DeviceEvent {
    type Error = EventKindError;

    fn try_from(event: AutomationEvent) -> Result<Self, Self::Error> {
        match event {
            AutomationEvent::Device(event) => Ok(event),
            other => Err(EventKindError {
                expected: EventKind::Device,
                actual: other.kind(),
            }),
        }
    }
}

impl TryFrom<AutomationEvent> for TimerEvent {
    type Error = EventKindError;

    fn try_from(event: AutomationEvent) -> Result<Self, Self::Error> {
        match event {
            AutomationEvent::Timer(event) => Ok(event),
            other => Err(EventKindError {
                expected: EventKind::Timer,
                actual: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_device_event_with_previous_value() {
        let event = DeviceEvent::new(3, "switch", Some("on")).with_previous(Some("off"));
        assert_eq!(event.device_id, DeviceId::new(3));
        assert_eq!(event.attribute_name, "switch");
        assert_eq!(event.new_value.as_deref(), Some("on"));
        assert_eq!(event.previous_value.as_deref(), Some("off"));
    }

    #[test]
    fn should_report_kind_of_each_variant() {
        let device: AutomationEvent = DeviceEvent::new(1, "level", Some("5")).into();
        let timer: AutomationEvent = TimerEvent::now().into();
        assert_eq!(device.kind(), EventKind::Device);
        assert_eq!(timer.kind(), EventKind::Timer);
        assert!(device.as_device().is_some());
        assert!(device.as_timer().is_none());
        assert!(timer.as_timer().is_some());
    }

    #[test]
    fn should_convert_into_matching_kind() {
        let event: AutomationEvent = DeviceEvent::new(1, "level", Some("5")).into();
        let device = DeviceEvent::try_from(event).unwrap();
        assert_eq!(device.attribute_name, "level");
    }

    #[test]
    fn should_refuse_conversion_into_wrong_kind() {
        let event: AutomationEvent = TimerEvent::now().into();
        let err = DeviceEvent::try_from(event).unwrap_err();
        assert_eq!(err.expected, EventKind::Device);
        assert_eq!(err.actual, EventKind::Timer);

        let event: AutomationEvent = DeviceEvent::new(1, "level", None).into();
        assert!(TimerEvent::try_from(event).is_err());
    }

    #[test]
    fn should_tag_serialized_events_with_their_type() {
        let event: AutomationEvent = DeviceEvent::new(8, "contact", Some("open")).into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "device");
        assert_eq!(json["device_id"], 8);
        assert_eq!(json["new_value"], "open");
    }
}
