//! Snapshot of the tag-assignment relation
//!
//! Built wholesale from every `ObjectTag` row and thrown away when it
//! expires or when the owning manager changes an assignment. There is no
//! incremental patching.

use cairn_core::model::ObjectTag;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

type ValueIndex = HashMap<String, HashMap<String, HashSet<i64>>>;

#[derive(Debug)]
pub struct MembershipCache {
    built: Instant,
    handles: HashSet<i64>,
    by_tag: ValueIndex,
    /// `by_tag` with lower-cased names and values
    by_tag_folded: ValueIndex,
    by_handle: HashMap<i64, BTreeMap<String, BTreeSet<String>>>,
}

impl MembershipCache {
    pub fn build(rows: impl IntoIterator<Item = ObjectTag>) -> Self {
        let mut cache = Self {
            built: Instant::now(),
            handles: HashSet::new(),
            by_tag: HashMap::new(),
            by_tag_folded: HashMap::new(),
            by_handle: HashMap::new(),
        };
        for row in rows {
            cache.handles.insert(row.handle);
            cache
                .by_tag_folded
                .entry(row.name.to_lowercase())
                .or_default()
                .entry(row.value.to_lowercase())
                .or_default()
                .insert(row.handle);
            cache
                .by_handle
                .entry(row.handle)
                .or_default()
                .entry(row.name.clone())
                .or_default()
                .insert(row.value.clone());
            cache
                .by_tag
                .entry(row.name)
                .or_default()
                .entry(row.value)
                .or_default()
                .insert(row.handle);
        }
        cache
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.built.elapsed() < ttl
    }

    /// Handles carrying at least one tag
    pub fn tagged_handles(&self) -> &HashSet<i64> {
        &self.handles
    }

    fn index(&self, ignore_case: bool) -> &ValueIndex {
        if ignore_case {
            &self.by_tag_folded
        } else {
            &self.by_tag
        }
    }

    fn fold(text: &str, ignore_case: bool) -> String {
        if ignore_case {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }

    pub fn contains(&self, handle: i64, name: &str, value: &str, ignore_case: bool) -> bool {
        self.index(ignore_case)
            .get(&Self::fold(name, ignore_case))
            .and_then(|values| values.get(&Self::fold(value, ignore_case)))
            .is_some_and(|handles| handles.contains(&handle))
    }

    /// Handles tagged `name=value`, ascending
    pub fn handles_with(&self, name: &str, value: &str, ignore_case: bool) -> Vec<i64> {
        let mut handles: Vec<i64> = self
            .index(ignore_case)
            .get(&Self::fold(name, ignore_case))
            .and_then(|values| values.get(&Self::fold(value, ignore_case)))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        handles.sort_unstable();
        handles
    }

    /// Tag names and values assigned to `handle`
    pub fn tags_of(&self, handle: i64) -> BTreeMap<String, BTreeSet<String>> {
        self.by_handle.get(&handle).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MembershipCache {
        MembershipCache::build(vec![
            ObjectTag::new(7, "Genre", "Comedy"),
            ObjectTag::new(7, "Genre", "Drama"),
            ObjectTag::new(9, "Genre", "Comedy"),
            ObjectTag::new(9, "Season", "1.2"),
        ])
    }

    #[test]
    fn test_three_indexes_agree() {
        let cache = sample();
        assert_eq!(cache.tagged_handles().len(), 2);
        assert_eq!(cache.handles_with("Genre", "Comedy", false), vec![7, 9]);
        assert!(cache.contains(9, "Season", "1.2", false));
        assert!(!cache.contains(7, "Season", "1.2", false));

        let tags = cache.tags_of(7);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["Genre"].len(), 2);
        assert!(cache.tags_of(42).is_empty());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let cache = sample();
        assert!(!cache.contains(7, "genre", "COMEDY", false));
        assert!(cache.contains(7, "genre", "COMEDY", true));
        assert_eq!(cache.handles_with("GENRE", "comedy", true), vec![7, 9]);
    }

    #[test]
    fn test_expiry() {
        let cache = MembershipCache::build(Vec::new());
        assert!(cache.is_fresh(Duration::from_secs(60)));
        assert!(!cache.is_fresh(Duration::ZERO));
    }
}
