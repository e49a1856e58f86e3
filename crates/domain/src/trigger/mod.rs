//! Trigger rules and the DSL that builds them.
//!
//! A [`TriggerDefinition`] is either a [`DeviceTriggerDefinition`] (device
//! allow-list plus an OR of [`AttributeFilter`]s) or a
//! [`TimerTriggerDefinition`] (a fixed period). Definitions are plain data:
//! they serialize, compare and clone, except for [`ChangeFilter::Custom`].
//!
//! ```
//! use tripwire_domain::trigger::{Buildable, DeviceTrigger, IntervalUnit, TimerTrigger};
//!
//! let dimmed = DeviceTrigger::for_device(10)
//!     .attribute("level")
//!     .is(50)
//!     .or()
//!     .is(75)
//!     .build();
//! assert!(dimmed.as_device().is_some());
//!
//! let every_half_hour = TimerTrigger::every(30, IntervalUnit::Minutes)?.build();
//! assert!(every_half_hour.as_timer().is_some());
//! # Ok::<(), tripwire_domain::error::BuilderError>(())
//! ```

mod attribute_filter;
mod builder;
mod change_filter;
mod change_group;
mod device;
mod timer;

use serde::{Deserialize, Serialize};

pub use attribute_filter::AttributeFilter;
pub use builder::{AwaitingPredicate, DeviceTrigger, WithAttributes, WithoutAttributes};
pub use change_filter::{ChangeFilter, CustomFilter, FilterValue, MatchFn};
pub use change_group::ChangeGroup;
pub use device::DeviceTriggerDefinition;
pub use timer::{IntervalUnit, ShortInterval, ShortIntervalDefinition, TimerTrigger, TimerTriggerDefinition};

use crate::event::{AutomationEvent, EventKind};

/// A built rule, tagged by the kind of event it reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum TriggerDefinition {
    Device(DeviceTriggerDefinition),
    Timer(TimerTriggerDefinition),
}

impl TriggerDefinition {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Device(_) => EventKind::Device,
            Self::Timer(_) => EventKind::Timer,
        }
    }

    #[must_use]
    pub fn as_device(&self) -> Option<&DeviceTriggerDefinition> {
        match self {
            Self::Device(definition) => Some(definition),
            Self::Timer(_) => None,
        }
    }

    #[must_use]
    pub fn as_timer(&self) -> Option<&TimerTriggerDefinition> {
        match self {
            Self::Timer(definition) => Some(definition),
            Self::Device(_) => None,
        }
    }

    /// Whether this rule selects the given event.
    ///
    /// Timer rules carry no content predicate, so they accept every timer
    /// event. Rules never accept events of the other kind.
    #[must_use]
    pub fn matches(&self, event: &AutomationEvent) -> bool {
        match (self, event) {
            (Self::Device(definition), AutomationEvent::Device(event)) => definition.matches(event),
            (Self::Timer(_), AutomationEvent::Timer(_)) => true,
            (Self::Device(_), AutomationEvent::Timer(_))
            | (Self::Timer(_), AutomationEvent::Device(_)) => false,
        }
    }
}

impl From<DeviceTriggerDefinition> for TriggerDefinition {
    fn from(definition: DeviceTriggerDefinition) -> Self {
        Self::Device(definition)
    }
}

impl From<TimerTriggerDefinition> for TriggerDefinition {
    fn from(definition: TimerTriggerDefinition) -> Self {
        Self::Timer(definition)
    }
}

/// Anything that finalizes into a [`TriggerDefinition`].
pub trait Buildable {
    fn build(self) -> TriggerDefinition;
}

impl Buildable for TriggerDefinition {
    fn build(self) -> TriggerDefinition {
        self
    }
}

impl Buildable for DeviceTriggerDefinition {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Device(self)
    }
}

impl Buildable for TimerTriggerDefinition {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Timer(self)
    }
}
