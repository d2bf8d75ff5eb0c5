//! In-memory host.
//!
//! [`MemoryTree`] implements every host trait over plain maps. Touches queue
//! [`TreeEvent`]s, history snapshots are kept per record, and refresh
//! requests are counted. The unit and integration tests drive the engine
//! through it.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::tree::{
    ContainerId, EventSource, NodeRef, PolicyTree, RecordId, RecordSource, RecordVersion,
    TreeEvent, TreeWriter,
};

#[derive(Debug, Clone, Default)]
struct ContainerNode {
    parent: Option<ContainerId>,
    policy_token: Option<String>,
    records: Vec<RecordId>,
    containers: Vec<ContainerId>,
}

#[derive(Debug, Clone)]
struct RecordNode {
    parent: ContainerId,
    current: RecordVersion,
    history: Vec<RecordVersion>,
}

/// Container tree held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTree {
    containers: HashMap<ContainerId, ContainerNode>,
    records: HashMap<RecordId, RecordNode>,
    events: VecDeque<TreeEvent>,
    refreshes: usize,
    writes: usize,
}

impl MemoryTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parentless container.
    pub fn add_root(&mut self) -> ContainerId {
        let id = ContainerId::new_v4();
        self.containers.insert(id, ContainerNode::default());
        id
    }

    /// Add a container below `parent` with an optional raw policy token.
    pub fn add_container(&mut self, parent: ContainerId, token: Option<&str>) -> ContainerId {
        let id = ContainerId::new_v4();
        self.containers.insert(
            id,
            ContainerNode {
                parent: Some(parent),
                policy_token: token.map(str::to_string),
                ..ContainerNode::default()
            },
        );
        if let Some(node) = self.containers.get_mut(&parent) {
            node.containers.push(id);
        }
        id
    }

    /// Add a record below `parent`. No history, no notification.
    pub fn add_record(&mut self, parent: ContainerId, version: RecordVersion) -> RecordId {
        let id = RecordId::new_v4();
        self.records.insert(
            id,
            RecordNode {
                parent,
                current: version,
                history: Vec::new(),
            },
        );
        if let Some(node) = self.containers.get_mut(&parent) {
            node.records.push(id);
        }
        id
    }

    pub fn remove_record(&mut self, record: RecordId) -> Option<RecordVersion> {
        let node = self.records.remove(&record)?;
        if let Some(parent) = self.containers.get_mut(&node.parent) {
            parent.records.retain(|r| *r != record);
        }
        Some(node.current)
    }

    /// Replace a container's raw token without notification.
    pub fn set_container_policy(&mut self, container: ContainerId, token: Option<&str>) {
        if let Some(node) = self.containers.get_mut(&container) {
            node.policy_token = token.map(str::to_string);
        }
    }

    /// Replace a record's raw token without notification.
    pub fn set_record_policy(&mut self, record: RecordId, token: Option<&str>) {
        if let Some(node) = self.records.get_mut(&record) {
            node.current.policy_token = token.map(str::to_string);
        }
    }

    /// Edit a record the way a user would: snapshot, change, touch.
    pub fn edit_record<F>(&mut self, record: RecordId, edit: F) -> bool
    where
        F: FnOnce(&mut RecordVersion),
    {
        let Some(node) = self.records.get_mut(&record) else {
            return false;
        };
        node.history.push(node.current.clone());
        edit(&mut node.current);
        self.events.push_back(TreeEvent::modified(record));
        true
    }

    /// Move a record into another container.
    pub fn move_record(&mut self, record: RecordId, to: ContainerId) -> bool {
        if !self.containers.contains_key(&to) {
            return false;
        }
        let Some(node) = self.records.get_mut(&record) else {
            return false;
        };
        let from = std::mem::replace(&mut node.parent, to);
        if let Some(old) = self.containers.get_mut(&from) {
            old.records.retain(|r| *r != record);
        }
        if let Some(new) = self.containers.get_mut(&to) {
            new.records.push(record);
        }
        self.events.push_back(TreeEvent::moved(record));
        true
    }

    /// Move a container below another one. Refuses moves that would create
    /// a cycle.
    ///
    /// Queues the parent-link notification followed by a modification of the
    /// moved container, so records below it pick up their new ancestry.
    pub fn move_container(&mut self, container: ContainerId, to: ContainerId) -> bool {
        if container == to
            || !self.containers.contains_key(&to)
            || self.is_contained_in(NodeRef::Container(to), container)
        {
            return false;
        }
        let Some(node) = self.containers.get_mut(&container) else {
            return false;
        };
        let from = node.parent.replace(to);
        if let Some(old) = from.and_then(|f| self.containers.get_mut(&f)) {
            old.containers.retain(|c| *c != container);
        }
        if let Some(new) = self.containers.get_mut(&to) {
            new.containers.push(container);
        }
        self.events.push_back(TreeEvent::moved(container));
        self.events.push_back(TreeEvent::modified(container));
        true
    }

    /// Current version of a record.
    #[must_use]
    pub fn record(&self, record: RecordId) -> Option<&RecordVersion> {
        self.records.get(&record).map(|node| &node.current)
    }

    /// History snapshots, oldest first.
    #[must_use]
    pub fn history(&self, record: RecordId) -> &[RecordVersion] {
        self.records
            .get(&record)
            .map_or(&[][..], |node| node.history.as_slice())
    }

    /// All record ids, unordered.
    #[must_use]
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }

    #[must_use]
    pub const fn refresh_requests(&self) -> usize {
        self.refreshes
    }

    /// Writes performed through [`TreeWriter`].
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl PolicyTree for MemoryTree {
    fn policy_token(&self, node: NodeRef) -> Option<&str> {
        match node {
            NodeRef::Record(id) => self.records.get(&id)?.current.policy_token.as_deref(),
            NodeRef::Container(id) => self.containers.get(&id)?.policy_token.as_deref(),
        }
    }

    fn parent(&self, node: NodeRef) -> Option<ContainerId> {
        match node {
            NodeRef::Record(id) => self.records.get(&id).map(|n| n.parent),
            NodeRef::Container(id) => self.containers.get(&id)?.parent,
        }
    }

    fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Record(id) => self.records.contains_key(&id),
            NodeRef::Container(id) => self.containers.contains_key(&id),
        }
    }

    fn child_records(&self, container: ContainerId) -> Vec<RecordId> {
        self.containers
            .get(&container)
            .map(|n| n.records.clone())
            .unwrap_or_default()
    }

    fn child_containers(&self, container: ContainerId) -> Vec<ContainerId> {
        self.containers
            .get(&container)
            .map(|n| n.containers.clone())
            .unwrap_or_default()
    }
}

impl RecordSource for MemoryTree {
    fn current(&self, record: RecordId) -> Option<&RecordVersion> {
        self.record(record)
    }

    fn previous(&self, record: RecordId) -> Option<&RecordVersion> {
        self.records.get(&record)?.history.last()
    }
}

impl TreeWriter for MemoryTree {
    fn set_expiry(&mut self, record: RecordId, expiry: DateTime<Utc>) {
        if let Some(node) = self.records.get_mut(&record) {
            node.current.expiry = expiry;
            self.writes += 1;
        }
    }

    fn set_expires(&mut self, record: RecordId, expires: bool) {
        if let Some(node) = self.records.get_mut(&record) {
            node.current.expires = expires;
            self.writes += 1;
        }
    }

    fn touch(&mut self, record: RecordId) {
        if self.records.contains_key(&record) {
            self.writes += 1;
            self.events.push_back(TreeEvent::modified(record));
        }
    }

    fn touch_container(&mut self, container: ContainerId) {
        if self.containers.contains_key(&container) {
            self.writes += 1;
            self.events.push_back(TreeEvent::modified(container));
        }
    }

    fn create_backup(&mut self, record: RecordId) {
        if let Some(node) = self.records.get_mut(&record) {
            node.history.push(node.current.clone());
        }
    }

    fn set_policy_token(&mut self, node: NodeRef, token: Option<String>) {
        let slot = match node {
            NodeRef::Record(id) => self.records.get_mut(&id).map(|n| &mut n.current.policy_token),
            NodeRef::Container(id) => self.containers.get_mut(&id).map(|n| &mut n.policy_token),
        };
        if let Some(slot) = slot {
            *slot = token;
            self.writes += 1;
        }
    }

    fn request_refresh(&mut self) {
        self.refreshes += 1;
    }
}

impl EventSource for MemoryTree {
    fn drain_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain(..).collect()
    }

    fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }
}
