//! Subscriber collections keyed by automation name.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use crate::automation::RegisteredAutomation;

/// Automations ordered by name, at most one per name.
#[derive(Debug, Clone, Default)]
pub struct SubscribersSet {
    members: BTreeMap<Arc<str>, Arc<RegisteredAutomation>>,
}

impl SubscribersSet {
    /// Add `automation`; returns `false` if its name was already present.
    pub fn insert(&mut self, automation: Arc<RegisteredAutomation>) -> bool {
        let name = Arc::clone(automation.name());
        self.members.insert(name, automation).is_none()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<RegisteredAutomation>> {
        self.members.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredAutomation>> {
        self.members.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredAutomation>> {
        self.members.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.members.keys()
    }

    /// Add every member of `other` not already present.
    pub fn extend_from(&mut self, other: &SubscribersSet) {
        for automation in other.iter() {
            self.members
                .entry(Arc::clone(automation.name()))
                .or_insert_with(|| Arc::clone(automation));
        }
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

/// Subscriber sets grouped by key. Empty sets are dropped.
#[derive(Debug, Clone)]
pub struct SubscribersMap<K> {
    buckets: HashMap<K, SubscribersSet>,
}

impl<K> Default for SubscribersMap<K> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> SubscribersMap<K> {
    pub fn subscribe(&mut self, key: K, automation: Arc<RegisteredAutomation>) -> bool {
        self.buckets.entry(key).or_default().insert(automation)
    }

    /// Remove `name` from the set under `key`; returns whether it was there.
    pub fn unsubscribe<Q>(&mut self, key: &Q, name: &str) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let Some(set) = self.buckets.get_mut(key) else {
            return false;
        };
        let removed = set.remove(name).is_some();
        if set.is_empty() {
            self.buckets.remove(key);
        }
        removed
    }

    /// Remove `name` from every set.
    pub fn unsubscribe_everywhere(&mut self, name: &str) {
        self.buckets.retain(|_, set| {
            set.remove(name);
            !set.is_empty()
        });
    }

    #[must_use]
    pub fn subscribers<Q>(&self, key: &Q) -> Option<&SubscribersSet>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.buckets.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.buckets.keys()
    }

    pub fn sets(&self) -> impl Iterator<Item = &SubscribersSet> {
        self.buckets.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{SpyAutomation, registered};

    fn automation(name: &str) -> Arc<RegisteredAutomation> {
        registered(&SpyAutomation::new(name, vec![]))
    }

    #[test]
    fn should_keep_one_member_per_name() {
        let mut set = SubscribersSet::default();
        assert!(set.insert(automation("a")));
        assert!(!set.insert(automation("a")));
        assert!(set.insert(automation("b")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn should_iterate_in_name_order() {
        let mut set = SubscribersSet::default();
        set.insert(automation("night"));
        set.insert(automation("dawn"));
        let names: Vec<_> = set.names().map(|name| &**name).collect();
        assert_eq!(names, ["dawn", "night"]);
    }

    #[test]
    fn should_union_sets_without_duplicates() {
        let mut left = SubscribersSet::default();
        left.insert(automation("a"));
        let mut right = SubscribersSet::default();
        right.insert(automation("a"));
        right.insert(automation("b"));

        left.extend_from(&right);
        assert_eq!(left.len(), 2);
    }

    #[test]
    fn should_drop_empty_bucket_on_unsubscribe() {
        let mut map = SubscribersMap::default();
        map.subscribe("level".to_string(), automation("a"));
        map.subscribe("level".to_string(), automation("b"));

        assert!(map.unsubscribe("level", "a"));
        assert_eq!(map.subscribers("level").map(SubscribersSet::len), Some(1));
        assert!(map.unsubscribe("level", "b"));
        assert!(map.subscribers("level").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn should_report_unknown_key_or_name_on_unsubscribe() {
        let mut map = SubscribersMap::default();
        map.subscribe(1_i64, automation("a"));
        assert!(!map.unsubscribe(&2_i64, "a"));
        assert!(!map.unsubscribe(&1_i64, "b"));
    }

    #[test]
    fn should_unsubscribe_from_every_bucket() {
        let mut map = SubscribersMap::default();
        map.subscribe(1_i64, automation("a"));
        map.subscribe(2_i64, automation("a"));
        map.subscribe(2_i64, automation("b"));

        map.unsubscribe_everywhere("a");

        assert!(map.subscribers(&1_i64).is_none());
        assert_eq!(map.subscribers(&2_i64).map(SubscribersSet::len), Some(1));
    }
}
