//! Change group: an AND of change filters.

use serde::{Deserialize, Serialize};

use super::change_filter::ChangeFilter;
use crate::event::DeviceEvent;

/// Filters that must all match. An empty group matches every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeGroup {
    pub filters: Vec<ChangeFilter>,
}

impl ChangeGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: ChangeFilter) {
        self.filters.push(filter);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub fn last_filter(&self) -> Option<&ChangeFilter> {
        self.filters.last()
    }

    /// The caller is expected to have checked the attribute name already.
    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        self.filters.iter().all(|filter| filter.matches(event))
    }
}

impl FromIterator<ChangeFilter> for ChangeGroup {
    fn from_iter<T: IntoIterator<Item = ChangeFilter>>(iter: T) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}
