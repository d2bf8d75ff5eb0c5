//! Host-facing view of the container tree.
//!
//! The engine never owns the tree. It reads through [`PolicyTree`] and
//! [`RecordSource`], writes through the narrow [`TreeWriter`] capability, and
//! receives mutation notifications from an [`EventSource`] queue.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Stable identity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

/// Stable identity of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(Uuid);

macro_rules! impl_node_id {
    ($ty:ident) => {
        impl $ty {
            /// Fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Deterministic identifier, handy for fixtures.
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $ty {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

impl_node_id!(RecordId);
impl_node_id!(ContainerId);

/// Either kind of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Record(RecordId),
    Container(ContainerId),
}

impl NodeRef {
    #[must_use]
    pub const fn as_record(&self) -> Option<RecordId> {
        match self {
            Self::Record(id) => Some(*id),
            Self::Container(_) => None,
        }
    }

    #[must_use]
    pub const fn as_container(&self) -> Option<ContainerId> {
        match self {
            Self::Container(id) => Some(*id),
            Self::Record(_) => None,
        }
    }
}

impl From<RecordId> for NodeRef {
    fn from(id: RecordId) -> Self {
        Self::Record(id)
    }
}

impl From<ContainerId> for NodeRef {
    fn from(id: ContainerId) -> Self {
        Self::Container(id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => write!(f, "record {id}"),
            Self::Container(id) => write!(f, "container {id}"),
        }
    }
}

/// Mutation notification raised when a node is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEvent {
    pub target: NodeRef,
    /// The node's content changed (as opposed to a plain access).
    pub modified: bool,
    /// Only the node's parent links changed (moves).
    pub parents_touched: bool,
}

impl TreeEvent {
    /// A content modification of `target`.
    #[must_use]
    pub fn modified(target: impl Into<NodeRef>) -> Self {
        Self {
            target: target.into(),
            modified: true,
            parents_touched: false,
        }
    }

    /// A touch that did not modify content.
    #[must_use]
    pub fn accessed(target: impl Into<NodeRef>) -> Self {
        Self {
            target: target.into(),
            modified: false,
            parents_touched: false,
        }
    }

    /// A move: only parent links changed.
    #[must_use]
    pub fn moved(target: impl Into<NodeRef>) -> Self {
        Self {
            target: target.into(),
            modified: true,
            parents_touched: true,
        }
    }
}

/// Secret bytes of a record version. Zeroed on drop, never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Byte-exact comparison in constant time for equal lengths.
    #[must_use]
    pub fn ct_eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Fields of one record version that change detection looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordVersion {
    pub secret: Secret,
    /// Raw policy token stored on the record, if any.
    pub policy_token: Option<String>,
    pub expiry: DateTime<Utc>,
    /// Expiry-enabled flag.
    pub expires: bool,
}

impl RecordVersion {
    #[must_use]
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
            policy_token: None,
            expiry: crate::policy::EXPIRY_SENTINEL,
            expires: false,
        }
    }

    #[must_use]
    pub fn with_policy_token(mut self, token: impl Into<String>) -> Self {
        self.policy_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = expiry;
        self.expires = true;
        self
    }
}

/// Read access to tree structure and raw policy tokens.
pub trait PolicyTree {
    /// Raw policy token stored on a node.
    fn policy_token(&self, node: NodeRef) -> Option<&str>;

    /// Parent container of a node; `None` at the root or for unknown nodes.
    fn parent(&self, node: NodeRef) -> Option<ContainerId>;

    /// Whether the tree knows the node.
    fn contains(&self, node: NodeRef) -> bool;

    /// Records directly inside a container.
    fn child_records(&self, container: ContainerId) -> Vec<RecordId>;

    /// Containers directly inside a container.
    fn child_containers(&self, container: ContainerId) -> Vec<ContainerId>;

    /// Whether `container` is a proper ancestor of `node`.
    fn is_contained_in(&self, node: NodeRef, container: ContainerId) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == container {
                return true;
            }
            if !visited.insert(parent) {
                return false;
            }
            current = self.parent(NodeRef::Container(parent));
        }
        false
    }

    /// Every record below a container, at any depth.
    fn descendant_records(&self, container: ContainerId) -> Vec<RecordId> {
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![container];
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            records.extend(self.child_records(next));
            stack.extend(self.child_containers(next));
        }
        records
    }
}

/// Current and previous versions of records.
pub trait RecordSource: PolicyTree {
    fn current(&self, record: RecordId) -> Option<&RecordVersion>;

    /// Most recent history snapshot.
    fn previous(&self, record: RecordId) -> Option<&RecordVersion>;
}

/// Write capability the engine uses for its write-backs.
///
/// Touching a node is expected to queue a [`TreeEvent`] on the host's
/// [`EventSource`].
pub trait TreeWriter {
    fn set_expiry(&mut self, record: RecordId, expiry: DateTime<Utc>);

    fn set_expires(&mut self, record: RecordId, expires: bool);

    /// Mark a record modified.
    fn touch(&mut self, record: RecordId);

    /// Mark a container modified.
    fn touch_container(&mut self, container: ContainerId);

    /// Snapshot the record's current version into its history.
    fn create_backup(&mut self, record: RecordId);

    /// Store (`Some`) or remove (`None`) a node's raw policy token.
    fn set_policy_token(&mut self, node: NodeRef, token: Option<String>);

    /// Ask the host UI to redraw.
    fn request_refresh(&mut self) {}
}

/// Queue of pending mutation notifications.
pub trait EventSource {
    fn drain_events(&mut self) -> Vec<TreeEvent>;

    fn has_pending(&self) -> bool;
}

/// Everything the engine needs from a host.
pub trait ExpiryHost: RecordSource + TreeWriter + EventSource {}

impl<T: RecordSource + TreeWriter + EventSource + ?Sized> ExpiryHost for T {}
