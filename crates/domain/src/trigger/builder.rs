//! Staged builder for device triggers.
//!
//! Each stage owns the definition under construction together with a cursor
//! (`attribute`, `group`) pointing at the change group that the next
//! predicate extends. Stages are consumed by every call, so a half-built
//! definition can never be reached and mutated behind the builder's back.
//! [`AwaitingPredicate::resume`] and [`WithAttributes::resume`] re-enter the
//! DSL from an existing definition. Besides them, only the steps taking a
//! list of device ids or attribute names can fail, on an empty list.

use super::attribute_filter::AttributeFilter;
use super::change_filter::{ChangeFilter, CustomFilter, FilterValue};
use super::change_group::ChangeGroup;
use super::device::DeviceTriggerDefinition;
use super::{Buildable, TriggerDefinition};
use crate::error::BuilderError;
use crate::event::DeviceEvent;
use crate::id::DeviceId;

/// Entry point of the device trigger DSL.
pub struct DeviceTrigger;

impl DeviceTrigger {
    /// Accept events from every device.
    pub fn for_all_devices() -> WithoutAttributes {
        WithoutAttributes {
            definition: DeviceTriggerDefinition::any(),
        }
    }

    /// Accept events from a single device.
    pub fn for_device(id: impl Into<DeviceId>) -> WithoutAttributes {
        WithoutAttributes {
            definition: DeviceTriggerDefinition::for_devices(vec![id.into()]),
        }
    }

    /// Accept events from any of the listed devices.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::EmptyDevices`] when `ids` is empty; use
    /// [`DeviceTrigger::for_all_devices`] to accept every device.
    pub fn for_devices<I>(ids: I) -> Result<WithoutAttributes, BuilderError>
    where
        I: IntoIterator,
        I::Item: Into<DeviceId>,
    {
        let devices: Vec<DeviceId> = ids.into_iter().map(Into::into).collect();
        if devices.is_empty() {
            return Err(BuilderError::EmptyDevices);
        }
        Ok(WithoutAttributes {
            definition: DeviceTriggerDefinition::for_devices(devices),
        })
    }
}

/// Devices are chosen, no attribute filter yet.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct WithoutAttributes {
    definition: DeviceTriggerDefinition,
}

impl WithoutAttributes {
    /// Start an attribute filter on a single attribute.
    pub fn attribute(self, name: impl Into<String>) -> AwaitingPredicate {
        AwaitingPredicate::push_attribute(self.definition, AttributeFilter::new([name]))
    }

    /// Start an attribute filter matching any of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::EmptyAttributes`] when `names` is empty.
    pub fn attributes<I, S>(self, names: I) -> Result<AwaitingPredicate, BuilderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = non_empty_filter(names)?;
        Ok(AwaitingPredicate::push_attribute(self.definition, filter))
    }

    #[must_use]
    pub fn definition(&self) -> &DeviceTriggerDefinition {
        &self.definition
    }
}

impl Buildable for WithoutAttributes {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Device(self.definition)
    }
}

/// An attribute filter is open and waits for a predicate.
///
/// Without any predicate, the current (empty) group matches every change of
/// the selected attributes.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct AwaitingPredicate {
    definition: DeviceTriggerDefinition,
    attribute: usize,
    group: usize,
}

impl AwaitingPredicate {
    /// Continue an existing definition on its last attribute filter and last
    /// change group.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NoAttributeFilter`] or
    /// [`BuilderError::NoChangeGroup`] when the definition has nothing to
    /// extend.
    pub fn resume(definition: DeviceTriggerDefinition) -> Result<Self, BuilderError> {
        let (attribute, group) = last_cursor(&definition)?;
        Ok(Self {
            definition,
            attribute,
            group,
        })
    }

    fn push_attribute(mut definition: DeviceTriggerDefinition, filter: AttributeFilter) -> Self {
        definition.attributes.push(filter);
        Self {
            attribute: definition.attributes.len() - 1,
            group: 0,
            definition,
        }
    }

    /// The new value differs from the previous one.
    pub fn changes(self) -> WithAttributes {
        self.push(ChangeFilter::Changes)
    }

    /// The new value equals `value`.
    pub fn is(self, value: impl Into<FilterValue>) -> WithAttributes {
        self.push(ChangeFilter::Is(value.into()))
    }

    pub fn is_not(self, value: impl Into<FilterValue>) -> WithAttributes {
        self.push(ChangeFilter::IsNot(value.into()))
    }

    /// The previous value equals `value`.
    pub fn was(self, value: impl Into<FilterValue>) -> WithAttributes {
        self.push(ChangeFilter::Was(value.into()))
    }

    pub fn was_not(self, value: impl Into<FilterValue>) -> WithAttributes {
        self.push(ChangeFilter::WasNot(value.into()))
    }

    pub fn is_greater_than(self, value: impl Into<f64>) -> WithAttributes {
        self.push(ChangeFilter::IsGreaterThan(value.into()))
    }

    pub fn was_greater_than(self, value: impl Into<f64>) -> WithAttributes {
        self.push(ChangeFilter::WasGreaterThan(value.into()))
    }

    pub fn is_lesser_than(self, value: impl Into<f64>) -> WithAttributes {
        self.push(ChangeFilter::IsLesserThan(value.into()))
    }

    pub fn was_lesser_than(self, value: impl Into<f64>) -> WithAttributes {
        self.push(ChangeFilter::WasLesserThan(value.into()))
    }

    pub fn increased(self) -> WithAttributes {
        self.push(ChangeFilter::Increased)
    }

    pub fn decreased(self) -> WithAttributes {
        self.push(ChangeFilter::Decreased)
    }

    /// Match with a caller-supplied predicate.
    pub fn custom_filter(
        self,
        predicate: impl Fn(&DeviceEvent) -> bool + Send + Sync + 'static,
    ) -> WithAttributes {
        self.push(ChangeFilter::Custom(CustomFilter::new(predicate)))
    }

    fn push(mut self, filter: ChangeFilter) -> WithAttributes {
        group_at(&mut self.definition, self.attribute, self.group).push(filter);
        WithAttributes {
            definition: self.definition,
            attribute: self.attribute,
            group: self.group,
        }
    }
}

impl Buildable for AwaitingPredicate {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Device(self.definition)
    }
}

/// At least one predicate is set; the trigger can be built or extended.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct WithAttributes {
    definition: DeviceTriggerDefinition,
    attribute: usize,
    group: usize,
}

impl WithAttributes {
    /// Continue an existing definition after its last predicate.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NoAttributeFilter`] or
    /// [`BuilderError::NoChangeGroup`] when the definition has nothing to
    /// extend.
    pub fn resume(definition: DeviceTriggerDefinition) -> Result<Self, BuilderError> {
        let (attribute, group) = last_cursor(&definition)?;
        Ok(Self {
            definition,
            attribute,
            group,
        })
    }

    /// Extend the current change group: both predicates must hold.
    pub fn and(self) -> AwaitingPredicate {
        AwaitingPredicate {
            definition: self.definition,
            attribute: self.attribute,
            group: self.group,
        }
    }

    /// Open a new change group on the current attribute filter.
    pub fn or(mut self) -> AwaitingPredicate {
        let groups = &mut attribute_at(&mut self.definition, self.attribute).change_groups;
        groups.push(ChangeGroup::new());
        AwaitingPredicate {
            group: groups.len() - 1,
            attribute: self.attribute,
            definition: self.definition,
        }
    }

    /// Add an alternative attribute filter on a single attribute.
    pub fn and_attribute(self, name: impl Into<String>) -> AwaitingPredicate {
        AwaitingPredicate::push_attribute(self.definition, AttributeFilter::new([name]))
    }

    /// Add an alternative attribute filter matching any of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::EmptyAttributes`] when `names` is empty.
    pub fn and_attributes<I, S>(self, names: I) -> Result<AwaitingPredicate, BuilderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = non_empty_filter(names)?;
        Ok(AwaitingPredicate::push_attribute(self.definition, filter))
    }

    #[must_use]
    pub fn definition(&self) -> &DeviceTriggerDefinition {
        &self.definition
    }
}

impl Buildable for WithAttributes {
    fn build(self) -> TriggerDefinition {
        TriggerDefinition::Device(self.definition)
    }
}

fn non_empty_filter<I, S>(names: I) -> Result<AttributeFilter, BuilderError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let filter = AttributeFilter::new(names);
    if filter.attribute_names.is_empty() {
        return Err(BuilderError::EmptyAttributes);
    }
    Ok(filter)
}

fn last_cursor(definition: &DeviceTriggerDefinition) -> Result<(usize, usize), BuilderError> {
    let attribute = definition
        .attributes
        .len()
        .checked_sub(1)
        .ok_or(BuilderError::NoAttributeFilter)?;
    let group = definition.attributes[attribute]
        .change_groups
        .len()
        .checked_sub(1)
        .ok_or(BuilderError::NoChangeGroup)?;
    Ok((attribute, group))
}

// Cursors are only created by this module and always point inside the
// definition they travel with.
fn attribute_at(definition: &mut DeviceTriggerDefinition, attribute: usize) -> &mut AttributeFilter {
    &mut definition.attributes[attribute]
}

fn group_at(
    definition: &mut DeviceTriggerDefinition,
    attribute: usize,
    group: usize,
) -> &mut ChangeGroup {
    &mut attribute_at(definition, attribute).change_groups[group]
}
