//! Attribute filter: attribute names plus an OR of change groups.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::change_group::ChangeGroup;
use crate::event::DeviceEvent;

/// Matches an event whose attribute is one of `attribute_names` and for which
/// at least one change group matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub attribute_names: BTreeSet<String>,
    pub change_groups: Vec<ChangeGroup>,
}

impl AttributeFilter {
    /// Create a filter holding a single empty change group.
    pub fn new<I, S>(attribute_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute_names: attribute_names.into_iter().map(Into::into).collect(),
            change_groups: vec![ChangeGroup::new()],
        }
    }

    #[must_use]
    pub fn last_group(&self) -> Option<&ChangeGroup> {
        self.change_groups.last()
    }

    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        self.attribute_names.contains(&event.attribute_name)
            && self.change_groups.iter().any(|group| group.matches(event))
    }
}
