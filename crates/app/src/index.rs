//! Subscription index for device events.
//!
//! Narrows the automations that may care about an event. The index never
//! decides delivery on its own: candidates are re-matched against their full
//! rules before being handed an event.

use std::collections::HashSet;
use std::sync::Arc;

use tripwire_domain::event::{AutomationEvent, DeviceEvent, EventKind};
use tripwire_domain::id::DeviceId;

use crate::automation::RegisteredAutomation;
use crate::collections::{SubscribersMap, SubscribersSet};
use crate::error::RegistrationError;

/// Where a device trigger is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    AllEvents,
    Devices(Vec<DeviceId>),
    Attributes(Vec<String>),
}

/// Automations indexed by device id, by attribute name, and "all events".
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_device: SubscribersMap<DeviceId>,
    by_attribute: SubscribersMap<String>,
    all_events: SubscribersSet,
    subscribed: SubscribersSet,
}

impl SubscriptionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File `automation` under every bucket its device triggers need.
    ///
    /// Returns `Ok(false)` without touching the index when the automation has
    /// no device trigger.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AlreadyRegistered`] before any change
    /// when an automation with the same name is indexed.
    pub fn insert(&mut self, automation: &Arc<RegisteredAutomation>) -> Result<bool, RegistrationError> {
        let name = automation.name();
        if self.subscribed.contains(name) {
            return Err(RegistrationError::AlreadyRegistered {
                name: name.to_string(),
            });
        }

        let placements = placements(automation);
        if placements.is_empty() {
            return Ok(false);
        }

        for placement in placements {
            match placement {
                Placement::AllEvents => {
                    self.all_events.insert(Arc::clone(automation));
                }
                Placement::Devices(devices) => {
                    for device in devices {
                        self.by_device.subscribe(device, Arc::clone(automation));
                    }
                }
                Placement::Attributes(names) => {
                    for attribute in names {
                        self.by_attribute.subscribe(attribute, Arc::clone(automation));
                    }
                }
            }
        }
        self.subscribed.insert(Arc::clone(automation));
        Ok(true)
    }

    /// Remove the automation named `name`; returns whether it was indexed.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(automation) = self.subscribed.get(name).cloned() else {
            return false;
        };

        for placement in placements(&automation) {
            match placement {
                Placement::AllEvents => {
                    self.all_events.remove(name);
                }
                Placement::Devices(devices) => {
                    for device in devices {
                        self.by_device.unsubscribe(&device, name);
                    }
                }
                Placement::Attributes(names) => {
                    for attribute in names {
                        self.by_attribute.unsubscribe(attribute.as_str(), name);
                    }
                }
            }
        }
        self.rebuild_subscribed();
        true
    }

    /// Recompute the set of indexed automations from the buckets.
    fn rebuild_subscribed(&mut self) {
        let mut subscribed = SubscribersSet::default();
        subscribed.extend_from(&self.all_events);
        for set in self.by_device.sets().chain(self.by_attribute.sets()) {
            subscribed.extend_from(set);
        }
        self.subscribed = subscribed;
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.subscribed.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }

    /// Automations whose rules select `event`, each at most once.
    ///
    /// Buckets are walked in a fixed order: "all events", then the event's
    /// device id, then its attribute name.
    #[must_use]
    pub fn matching(&self, event: &DeviceEvent) -> Vec<Arc<RegisteredAutomation>> {
        let wrapped = AutomationEvent::Device(event.clone());
        let buckets = [
            Some(&self.all_events),
            self.by_device.subscribers(&event.device_id),
            self.by_attribute.subscribers(event.attribute_name.as_str()),
        ];

        let mut delivered: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();
        for bucket in buckets.into_iter().flatten() {
            for automation in bucket.iter() {
                let name: &str = automation.name();
                if !delivered.contains(name) && automation.matches(&wrapped) {
                    delivered.insert(name);
                    matched.push(Arc::clone(automation));
                }
            }
        }
        matched
    }
}

/// Buckets for each device trigger of `automation`.
///
/// A trigger restricted by device ids is filed under those ids only, even
/// when it also filters attributes. A trigger whose attribute filters name no
/// attribute can never match and is not filed at all.
fn placements(automation: &RegisteredAutomation) -> Vec<Placement> {
    automation
        .triggers_of(EventKind::Device)
        .filter_map(|trigger| trigger.as_device())
        .filter_map(|definition| {
            if definition.is_unrestricted() {
                return Some(Placement::AllEvents);
            }
            if !definition.devices.is_empty() {
                return Some(Placement::Devices(definition.devices.clone()));
            }
            let names: Vec<String> = definition
                .all_attribute_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            (!names.is_empty()).then_some(Placement::Attributes(names))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{SpyAutomation, registered};
    use tripwire_domain::trigger::{
        AttributeFilter, Buildable, DeviceTrigger, DeviceTriggerDefinition, IntervalUnit,
        TimerTrigger,
    };

    fn names(automations: &[Arc<RegisteredAutomation>]) -> Vec<&str> {
        automations.iter().map(|a| &**a.name()).collect()
    }

    #[test]
    fn should_skip_automation_without_device_triggers() {
        let mut index = SubscriptionIndex::new();
        let timer_only = registered(&SpyAutomation::new(
            "tick",
            vec![TimerTrigger::every(1, IntervalUnit::Seconds).unwrap().build()],
        ));

        assert_eq!(index.insert(&timer_only), Ok(false));
        assert!(!index.contains("tick"));
        assert!(index.is_empty());
    }

    #[test]
    fn should_reject_duplicate_name_without_changing_index() {
        let mut index = SubscriptionIndex::new();
        let first = registered(&SpyAutomation::new(
            "lamp",
            vec![DeviceTrigger::for_device(1).build()],
        ));
        let second = registered(&SpyAutomation::new(
            "lamp",
            vec![DeviceTrigger::for_device(2).build()],
        ));
        index.insert(&first).unwrap();

        let err = index.insert(&second).unwrap_err();

        assert_eq!(
            err,
            RegistrationError::AlreadyRegistered {
                name: "lamp".to_string()
            }
        );
        assert!(index.by_device.subscribers(&DeviceId::new(2)).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn should_file_trigger_by_its_restriction() {
        let mut index = SubscriptionIndex::new();
        let everything = registered(&SpyAutomation::new(
            "everything",
            vec![DeviceTrigger::for_all_devices().build()],
        ));
        let by_device = registered(&SpyAutomation::new(
            "by_device",
            vec![
                DeviceTrigger::for_devices([4, 5])
                    .unwrap()
                    .attribute("switch")
                    .is("on")
                    .build(),
            ],
        ));
        let by_attribute = registered(&SpyAutomation::new(
            "by_attribute",
            vec![
                DeviceTrigger::for_all_devices()
                    .attribute("level")
                    .changes()
                    .and_attributes(["level", "switch"])
                    .unwrap()
                    .changes()
                    .build(),
            ],
        ));
        for automation in [&everything, &by_device, &by_attribute] {
            assert_eq!(index.insert(automation), Ok(true));
        }

        assert!(index.all_events.contains("everything"));
        assert!(index.by_device.subscribers(&DeviceId::new(4)).is_some());
        assert!(index.by_device.subscribers(&DeviceId::new(5)).is_some());
        assert!(index.by_attribute.subscribers("switch").is_none_or(|set| !set.contains("by_device")));
        let mut attributes: Vec<_> = index.by_attribute.keys().cloned().collect();
        attributes.sort();
        assert_eq!(attributes, ["level", "switch"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn should_return_each_match_once_in_bucket_order() {
        let mut index = SubscriptionIndex::new();
        let by_attribute = registered(&SpyAutomation::new(
            "a_by_attribute",
            vec![DeviceTrigger::for_all_devices().attribute("level").build()],
        ));
        let by_device = registered(&SpyAutomation::new(
            "b_by_device",
            vec![
                DeviceTrigger::for_device(10).build(),
                DeviceTrigger::for_all_devices().attribute("level").build(),
            ],
        ));
        let everything = registered(&SpyAutomation::new(
            "c_everything",
            vec![DeviceTrigger::for_all_devices().build()],
        ));
        for automation in [&by_attribute, &by_device, &everything] {
            index.insert(automation).unwrap();
        }

        let matched = index.matching(&DeviceEvent::new(10, "level", Some("3")));

        assert_eq!(names(&matched), ["c_everything", "b_by_device", "a_by_attribute"]);
    }

    #[test]
    fn should_rematch_candidates_against_full_rule() {
        let mut index = SubscriptionIndex::new();
        let dimmed = registered(&SpyAutomation::new(
            "dimmed",
            vec![DeviceTrigger::for_device(10).attribute("level").is(50).build()],
        ));
        index.insert(&dimmed).unwrap();

        assert_eq!(index.matching(&DeviceEvent::new(10, "level", Some("50"))).len(), 1);
        assert!(index.matching(&DeviceEvent::new(10, "level", Some("60"))).is_empty());
        assert!(index.matching(&DeviceEvent::new(10, "switch", Some("50"))).is_empty());
        assert!(index.matching(&DeviceEvent::new(7, "level", Some("50"))).is_empty());
    }

    #[test]
    fn should_forget_removed_automation_everywhere() {
        let mut index = SubscriptionIndex::new();
        let multi = registered(&SpyAutomation::new(
            "multi",
            vec![
                DeviceTrigger::for_all_devices().build(),
                DeviceTrigger::for_device(1).build(),
                DeviceTrigger::for_all_devices().attribute("switch").build(),
            ],
        ));
        let other = registered(&SpyAutomation::new(
            "other",
            vec![DeviceTrigger::for_device(1).build()],
        ));
        index.insert(&multi).unwrap();
        index.insert(&other).unwrap();

        assert!(index.remove("multi"));

        assert!(!index.contains("multi"));
        assert!(index.contains("other"));
        assert!(index.all_events.is_empty());
        assert!(index.by_attribute.is_empty());
        assert_eq!(names(&index.matching(&DeviceEvent::new(1, "switch", None))), ["other"]);
        assert!(!index.remove("multi"));
    }

    #[test]
    fn should_not_file_trigger_over_no_attribute_names() {
        let mut index = SubscriptionIndex::new();
        let definition = DeviceTriggerDefinition {
            devices: Vec::new(),
            attributes: vec![AttributeFilter::new(Vec::<String>::new())],
        };
        let nameless = registered(&SpyAutomation::new("nameless", vec![definition.build()]));
        let lamp = registered(&SpyAutomation::new("lamp", vec![DeviceTrigger::for_device(1).build()]));

        assert_eq!(index.insert(&nameless), Ok(false));
        index.insert(&lamp).unwrap();
        assert!(index.remove("lamp"));

        assert!(index.is_empty());
        assert!(index.by_attribute.is_empty());
    }

    #[test]
    fn should_accept_name_again_after_removal() {
        let mut index = SubscriptionIndex::new();
        let lamp = registered(&SpyAutomation::new("lamp", vec![DeviceTrigger::for_device(1).build()]));
        index.insert(&lamp).unwrap();
        index.remove("lamp");
        assert_eq!(index.insert(&lamp), Ok(true));
    }
}
