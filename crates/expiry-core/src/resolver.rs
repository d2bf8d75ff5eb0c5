//! Upward policy resolution.
//!
//! A node whose own token is `Inherit` takes the policy of its nearest
//! ancestor with a concrete value. Inheriting at the root yields `Off`.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::policy::PolicyValue;
use crate::tree::{NodeRef, PolicyTree};

/// Resolves effective policies against a borrowed tree.
pub struct InheritanceResolver<'t, T: PolicyTree + ?Sized> {
    tree: &'t T,
}

impl<'t, T: PolicyTree + ?Sized> InheritanceResolver<'t, T> {
    #[must_use]
    pub const fn new(tree: &'t T) -> Self {
        Self { tree }
    }

    /// The node's own token, parsed.
    #[must_use]
    pub fn own_policy(&self, node: NodeRef) -> PolicyValue {
        PolicyValue::from_token(self.tree.policy_token(node))
    }

    /// Effective policy of `node`.
    ///
    /// Non-recursive lookups return the node's own value unchanged, `Inherit`
    /// included. A cycle in the parent links is logged and resolves to `Off`.
    #[must_use]
    pub fn resolve(&self, node: NodeRef, recursive: bool) -> PolicyValue {
        match self.try_resolve(node, recursive) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, %node, "Policy resolution hit a cycle; treating as off");
                PolicyValue::off()
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but reports cycles.
    pub fn try_resolve(&self, node: NodeRef, recursive: bool) -> Result<PolicyValue> {
        let value = self.own_policy(node);
        if !recursive || !value.is_inherit() {
            return Ok(value);
        }

        let mut visited = HashSet::new();
        visited.insert(node);
        let mut current = node;
        loop {
            let Some(parent) = self.tree.parent(current) else {
                return Ok(PolicyValue::off());
            };
            let parent = NodeRef::Container(parent);
            if !visited.insert(parent) {
                return Err(Error::CycleDetected { node: parent });
            }
            let value = self.own_policy(parent);
            if !value.is_inherit() {
                return Ok(value);
            }
            current = parent;
        }
    }

    /// Policy `node` would inherit: the recursive resolution of its parent,
    /// or `Off` without one.
    #[must_use]
    pub fn resolve_inherited(&self, node: NodeRef) -> PolicyValue {
        self.tree.parent(node).map_or_else(PolicyValue::off, |parent| {
            self.resolve(NodeRef::Container(parent), true)
        })
    }
}
