//! Device trigger definition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::attribute_filter::AttributeFilter;
use crate::event::DeviceEvent;
use crate::id::DeviceId;

/// Rule over device events.
///
/// An empty `devices` list accepts every device and an empty `attributes`
/// list accepts every attribute change; when both are set, both must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTriggerDefinition {
    pub devices: Vec<DeviceId>,
    pub attributes: Vec<AttributeFilter>,
}

impl DeviceTriggerDefinition {
    /// Rule matching every device event.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_devices(devices: Vec<DeviceId>) -> Self {
        Self {
            devices,
            attributes: Vec::new(),
        }
    }

    /// Neither a device nor an attribute restriction.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.devices.is_empty() && self.attributes.is_empty()
    }

    #[must_use]
    pub fn last_attribute(&self) -> Option<&AttributeFilter> {
        self.attributes.last()
    }

    /// Distinct attribute names referenced by any attribute filter.
    #[must_use]
    pub fn all_attribute_names(&self) -> BTreeSet<&str> {
        self.attributes
            .iter()
            .flat_map(|filter| filter.attribute_names.iter().map(String::as_str))
            .collect()
    }

    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        if !self.devices.is_empty() && !self.devices.contains(&event.device_id) {
            return false;
        }
        self.attributes.is_empty() || self.attributes.iter().any(|filter| filter.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::ChangeFilter;

    fn level_is(value: i32) -> AttributeFilter {
        let mut filter = AttributeFilter::new(["level"]);
        filter.change_groups[0].push(ChangeFilter::Is(value.into()));
        filter
    }

    #[test]
    fn should_match_everything_when_unrestricted() {
        let definition = DeviceTriggerDefinition::any();
        assert!(definition.is_unrestricted());
        assert!(definition.matches(&DeviceEvent::new(5, "anything", None)));
    }

    #[test]
    fn should_restrict_to_listed_devices() {
        let definition = DeviceTriggerDefinition::for_devices(vec![DeviceId::new(42)]);
        assert!(definition.matches(&DeviceEvent::new(42, "switch", Some("on"))));
        assert!(!definition.matches(&DeviceEvent::new(7, "switch", Some("on"))));
    }

    #[test]
    fn should_and_devices_with_attributes() {
        let mut definition = DeviceTriggerDefinition::for_devices(vec![DeviceId::new(10)]);
        definition.attributes.push(level_is(50));

        assert!(definition.matches(&DeviceEvent::new(10, "level", Some("50"))));
        assert!(!definition.matches(&DeviceEvent::new(10, "level", Some("60"))));
        assert!(!definition.matches(&DeviceEvent::new(99, "level", Some("50"))));
    }

    #[test]
    fn should_or_attribute_filters() {
        let mut definition = DeviceTriggerDefinition::any();
        definition.attributes.push(level_is(50));
        definition.attributes.push(AttributeFilter::new(["switch"]));

        assert!(definition.matches(&DeviceEvent::new(1, "switch", Some("off"))));
        assert!(definition.matches(&DeviceEvent::new(1, "level", Some("50"))));
        assert!(!definition.matches(&DeviceEvent::new(1, "temperature", Some("50"))));
    }

    #[test]
    fn should_collect_distinct_attribute_names() {
        let mut definition = DeviceTriggerDefinition::any();
        definition.attributes.push(AttributeFilter::new(["level", "switch"]));
        definition.attributes.push(AttributeFilter::new(["switch", "contact"]));

        let names: Vec<_> = definition.all_attribute_names().into_iter().collect();
        assert_eq!(names, ["contact", "level", "switch"]);
    }
}
