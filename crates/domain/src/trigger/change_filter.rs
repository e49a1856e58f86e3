//! Change filter: a single predicate over one event's new/previous value.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::event::DeviceEvent;

/// A value compared for equality against an attribute value.
///
/// Numbers compare by their JavaScript number-to-string text, so
/// `Number(0.22)` matches `"0.22"` and never `"0.2199999999999"`, and
/// `Number(1e21)` matches `"1e+21"`. `Null` matches only a null value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Null,
}

impl FilterValue {
    /// Whether an attribute value (`None` = null) equals this filter value.
    #[must_use]
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Null, None) => true,
            (Self::Text(expected), Some(actual)) => expected == actual,
            (Self::Number(expected), Some(actual)) => {
                ryu_js::Buffer::new().format(*expected) == actual
            }
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Signature of a caller-supplied predicate.
pub type MatchFn = dyn Fn(&DeviceEvent) -> bool + Send + Sync;

/// A caller-supplied predicate, shared by reference.
#[derive(Clone)]
pub struct CustomFilter(Arc<MatchFn>);

impl CustomFilter {
    pub fn new(predicate: impl Fn(&DeviceEvent) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        (self.0)(event)
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomFilter(..)")
    }
}

impl PartialEq for CustomFilter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One comparison against an event's new and/or previous value.
///
/// Numeric variants parse the event's strings as decimals; a missing or
/// unparsable side makes the filter not match instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeFilter {
    /// The new value differs from the previous one.
    Changes,
    Is(FilterValue),
    IsNot(FilterValue),
    Was(FilterValue),
    WasNot(FilterValue),
    IsGreaterThan(f64),
    WasGreaterThan(f64),
    IsLesserThan(f64),
    WasLesserThan(f64),
    /// Both values are numeric and `previous < new`.
    Increased,
    /// Both values are numeric and `previous > new`.
    Decreased,
    /// Not serializable; rules holding one stay in-process.
    #[serde(skip)]
    Custom(CustomFilter),
}

impl ChangeFilter {
    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        let new = event.new_value.as_deref();
        let previous = event.previous_value.as_deref();
        match self {
            Self::Changes => new != previous,
            Self::Is(value) => value.matches(new),
            Self::IsNot(value) => !value.matches(new),
            Self::Was(value) => value.matches(previous),
            Self::WasNot(value) => !value.matches(previous),
            Self::IsGreaterThan(limit) => parse_number(new).is_some_and(|n| n > *limit),
            Self::WasGreaterThan(limit) => parse_number(previous).is_some_and(|p| p > *limit),
            Self::IsLesserThan(limit) => parse_number(new).is_some_and(|n| n < *limit),
            Self::WasLesserThan(limit) => parse_number(previous).is_some_and(|p| p < *limit),
            Self::Increased => compare_numbers(previous, new, |p, n| p < n),
            Self::Decreased => compare_numbers(previous, new, |p, n| p > n),
            Self::Custom(filter) => filter.matches(event),
        }
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|n| !n.is_nan())
}

fn compare_numbers(
    previous: Option<&str>,
    new: Option<&str>,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (parse_number(previous), parse_number(new)) {
        (Some(p), Some(n)) => cmp(p, n),
        _ => false,
    }
}
