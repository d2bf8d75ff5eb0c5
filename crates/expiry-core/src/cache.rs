//! Per-record memo of resolved policies and display strings.
//!
//! Entries are keyed by [`RecordId`], filled lazily on query, and dropped when
//! a mutation notification says they may be stale. There is no TTL: an entry
//! lives until something invalidates it.

use std::collections::HashMap;

use serde::Serialize;

use crate::policy::{PolicyValue, UnitLabels};
use crate::resolver::InheritanceResolver;
use crate::tree::{ContainerId, NodeRef, PolicyTree, RecordId, TreeEvent};

#[derive(Debug, Clone, Copy)]
struct Resolved {
    /// The record's own value.
    own: PolicyValue,
    /// What the record would inherit from its ancestors.
    inherited: PolicyValue,
}

impl Resolved {
    fn effective(&self, recursive: bool) -> PolicyValue {
        if recursive && self.own.is_inherit() {
            self.inherited
        } else {
            self.own
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    resolved: Option<Resolved>,
    display: Option<String>,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over total lookups, 0.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memo of policy resolutions per record.
#[derive(Debug, Default)]
pub struct PolicyCache {
    entries: HashMap<RecordId, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl PolicyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective policy of a record.
    ///
    /// With `recursive` false the record's own value is returned, which may
    /// be `Inherit`.
    pub fn effective_policy<T: PolicyTree + ?Sized>(
        &mut self,
        tree: &T,
        record: RecordId,
        recursive: bool,
    ) -> PolicyValue {
        self.resolved(tree, record).effective(recursive)
    }

    /// Policy the record would take from its ancestors.
    pub fn inherited<T: PolicyTree + ?Sized>(&mut self, tree: &T, record: RecordId) -> PolicyValue {
        self.resolved(tree, record).inherited
    }

    /// Human-readable policy, with the inherit marker appended when the
    /// value came from an ancestor.
    pub fn display_string<T: PolicyTree + ?Sized>(
        &mut self,
        tree: &T,
        record: RecordId,
        labels: &UnitLabels,
    ) -> String {
        if let Some(display) = self.entries.get(&record).and_then(|e| e.display.clone()) {
            self.hits += 1;
            return display;
        }
        let resolved = self.resolved(tree, record);
        let display = if resolved.own.is_inherit() {
            format!(
                "{}{}",
                resolved.inherited.to_display(labels),
                labels.inherit_marker
            )
        } else {
            resolved.own.to_display(labels)
        };
        self.entries.entry(record).or_default().display = Some(display.clone());
        display
    }

    /// Drop one record's entry.
    pub fn invalidate_record(&mut self, record: RecordId) -> bool {
        let removed = self.entries.remove(&record).is_some();
        if removed {
            tracing::trace!(%record, "Invalidated cached policy");
        }
        removed
    }

    /// Drop every entry for a record below `container`, at any depth, and
    /// every entry for a record the tree no longer knows.
    pub fn invalidate_container<T: PolicyTree + ?Sized>(
        &mut self,
        tree: &T,
        container: ContainerId,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|record, _| {
            let node = NodeRef::Record(*record);
            tree.contains(node) && !tree.is_contained_in(node, container)
        });
        let dropped = before - self.entries.len();
        if dropped > 0 {
            tracing::debug!(%container, dropped, "Invalidated cached policies below container");
        }
        dropped
    }

    /// Apply a mutation notification. Returns how many entries were dropped.
    ///
    /// Non-modifying touches and container moves leave the cache alone.
    pub fn on_mutation<T: PolicyTree + ?Sized>(&mut self, tree: &T, event: &TreeEvent) -> usize {
        if !event.modified {
            return 0;
        }
        match event.target {
            NodeRef::Record(record) => usize::from(self.invalidate_record(record)),
            NodeRef::Container(_) if event.parents_touched => 0,
            NodeRef::Container(container) => self.invalidate_container(tree, container),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, record: RecordId) -> bool {
        self.entries.contains_key(&record)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    fn resolved<T: PolicyTree + ?Sized>(&mut self, tree: &T, record: RecordId) -> Resolved {
        if let Some(resolved) = self.entries.get(&record).and_then(|e| e.resolved) {
            self.hits += 1;
            return resolved;
        }
        self.misses += 1;
        let resolver = InheritanceResolver::new(tree);
        let node = NodeRef::Record(record);
        let resolved = Resolved {
            own: resolver.own_policy(node),
            inherited: resolver.resolve_inherited(node),
        };
        tracing::trace!(%record, own = %resolved.own, inherited = %resolved.inherited, "Cached policy");
        self.entries.entry(record).or_default().resolved = Some(resolved);
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTree;
    use crate::tree::RecordVersion;

    struct Fixture {
        tree: MemoryTree,
        root: ContainerId,
        mid: ContainerId,
        record: RecordId,
        sibling: RecordId,
    }

    fn fixture() -> Fixture {
        let mut tree = MemoryTree::new();
        let root = tree.add_root();
        tree.set_container_policy(root, Some("Off"));
        let mid = tree.add_container(root, Some("15 Days"));
        let leaf = tree.add_container(mid, None);
        let record = tree.add_record(leaf, RecordVersion::new("a"));
        let sibling = tree.add_record(root, RecordVersion::new("b"));
        Fixture {
            tree,
            root,
            mid,
            record,
            sibling,
        }
    }

    // ── Lookup tests ──────────────────────────────────────────────────

    #[test]
    fn second_lookup_hits() {
        let f = fixture();
        let mut cache = PolicyCache::new();

        let first = cache.effective_policy(&f.tree, f.record, true);
        let second = cache.effective_policy(&f.tree, f.record, true);
        assert_eq!(first, second);
        assert_eq!(first.to_token(), "15 Days");

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_recursive_returns_own_value() {
        let f = fixture();
        let mut cache = PolicyCache::new();
        assert!(cache.effective_policy(&f.tree, f.record, false).is_inherit());
        assert_eq!(cache.inherited(&f.tree, f.record).to_token(), "15 Days");
    }

    #[test]
    fn display_marks_inherited_values() {
        let mut f = fixture();
        let mut cache = PolicyCache::new();
        let labels = UnitLabels::default();
        assert_eq!(cache.display_string(&f.tree, f.record, &labels), "15 days*");
        assert_eq!(cache.display_string(&f.tree, f.sibling, &labels), "Inactive*");

        f.tree.set_record_policy(f.sibling, Some("2 Weeks"));
        cache.invalidate_record(f.sibling);
        assert_eq!(cache.display_string(&f.tree, f.sibling, &labels), "2 weeks");
    }

    // ── Invalidation tests ────────────────────────────────────────────

    #[test]
    fn container_invalidation_reaches_grandchildren() {
        let mut f = fixture();
        let mut cache = PolicyCache::new();
        assert_eq!(cache.effective_policy(&f.tree, f.record, true).to_token(), "15 Days");
        cache.effective_policy(&f.tree, f.sibling, true);

        f.tree.set_container_policy(f.mid, Some("2 Months"));
        assert_eq!(cache.invalidate_container(&f.tree, f.mid), 1);

        assert_eq!(cache.effective_policy(&f.tree, f.record, true).to_token(), "2 Months");
        assert!(cache.contains(f.sibling));
    }

    #[test]
    fn unknown_records_are_dropped() {
        let mut f = fixture();
        let mut cache = PolicyCache::new();
        cache.effective_policy(&f.tree, f.sibling, true);
        f.tree.remove_record(f.sibling);
        assert_eq!(cache.invalidate_container(&f.tree, f.mid), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn mutation_filtering() {
        let f = fixture();
        let mut cache = PolicyCache::new();
        cache.effective_policy(&f.tree, f.record, true);

        assert_eq!(cache.on_mutation(&f.tree, &TreeEvent::accessed(f.record)), 0);
        assert_eq!(cache.on_mutation(&f.tree, &TreeEvent::moved(f.root)), 0);
        assert!(cache.contains(f.record));

        assert_eq!(cache.on_mutation(&f.tree, &TreeEvent::modified(f.root)), 1);
        assert!(!cache.contains(f.record));

        cache.effective_policy(&f.tree, f.record, true);
        assert_eq!(cache.on_mutation(&f.tree, &TreeEvent::moved(f.record)), 1);
    }

    #[test]
    fn clear_empties() {
        let f = fixture();
        let mut cache = PolicyCache::new();
        cache.effective_policy(&f.tree, f.record, true);
        cache.effective_policy(&f.tree, f.sibling, true);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
