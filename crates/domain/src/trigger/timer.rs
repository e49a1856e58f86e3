//! Timer trigger definition and its builder.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Buildable, TriggerDefinition};
use crate::error::BuilderError;

/// Unit of a [`ShortInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Ms,
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    /// Number of milliseconds in one unit.
    #[must_use]
    pub const fn millis(self) -> u64 {
        match self {
            Self::Ms => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ms => f.write_str("ms"),
            Self::Seconds => f.write_str("seconds"),
            Self::Minutes => f.write_str("minutes"),
            Self::Hours => f.write_str("hours"),
        }
    }
}

/// `value` units of time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortInterval {
    pub unit: IntervalUnit,
    pub value: f64,
}

impl ShortInterval {
    /// Length of the interval.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NonPositiveInterval`] when the value is not a
    /// positive, representable length.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Result<Duration, BuilderError> {
        let invalid = || BuilderError::NonPositiveInterval { value: self.value };
        if self.value.is_nan() || self.value <= 0.0 {
            return Err(invalid());
        }
        let seconds = self.value * self.unit.millis() as f64 / 1_000.0;
        Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
    }
}

impl fmt::Display for ShortInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Rule firing on a fixed period.
///
/// Only a single interval is supported today; more entries are rejected when
/// the period is computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerTriggerDefinition {
    pub intervals: Vec<ShortInterval>,
}

impl TimerTriggerDefinition {
    /// Period of this trigger.
    ///
    /// # Errors
    ///
    /// Fails when there is not exactly one interval or when that interval is
    /// not positive.
    pub fn period(&self) -> Result<Duration, BuilderError> {
        match self.intervals.as_slice() {
            [] => Err(BuilderError::NoIntervals),
            [interval] => interval.duration(),
            many => Err(BuilderError::MultiUnitInterval { count: many.len() }),
        }
    }
}

/// Entry point of the timer DSL.
pub struct TimerTrigger;

impl TimerTrigger {
    /// Fire every `value` `unit`s.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NonPositiveInterval`] when `value <= 0`.
    pub fn every(
        value: impl Into<f64>,
        unit: IntervalUnit,
    ) -> Result<ShortIntervalDefinition, BuilderError> {
        let value = value.into();
        if value.is_nan() || value <= 0.0 {
            return Err(BuilderError::NonPositiveInterval { value });
        }
        Ok(ShortIntervalDefinition {
            definition: TimerTriggerDefinition {
                intervals: vec![ShortInterval { unit, value }],
            },
        })
    }
}

/// A timer trigger whose interval is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortIntervalDefinition {
    definition: TimerTriggerDefinition,
}

impl ShortIntervalDefinition {
    #[must_use]
    pub fn definition(&self) -> &TimerTriggerDefinition {
        &self.definition
    }
}

impl Buildable for ShortIntervalDefinition {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Timer(self.definition)
    }
}
