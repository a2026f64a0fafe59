//! Hash-consing dictionary keyed by `(kind, bit-size, children-ids)`.

use std::collections::HashMap;

use super::node::{Children, NodeId, NodeKind};

type Key = (NodeKind, u32, Children);

/// Interns structurally-equal nodes to a single canonical [`NodeId`].
///
/// Disabled entirely when [`crate::symbolic::Optimization::AstDictionaries`]
/// is off — callers then always allocate a fresh node.
#[derive(Debug, Default, Clone)]
pub struct AstDictionary {
    entries: HashMap<Key, NodeId>,
    enabled: bool,
}

impl AstDictionary {
    /// A dictionary with hash-consing enabled by default (matches the
    /// teacher's `optimized` default feature).
    pub fn new(enabled: bool) -> Self {
        Self { entries: HashMap::new(), enabled }
    }

    /// Toggle hash-consing. Disabling does not evict existing entries; it
    /// only stops `lookup`/`intern` from consulting them.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(super) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the canonical id for `key` if hash-consing is enabled and a
    /// representative already exists.
    pub(super) fn lookup(&self, kind: &NodeKind, size: u32, children: &Children) -> Option<NodeId> {
        if !self.enabled {
            return None;
        }
        self.entries.get(&(kind.clone(), size, children.clone())).copied()
    }

    /// Registers `id` as the canonical representative for `key`.
    pub(super) fn insert(&mut self, kind: NodeKind, size: u32, children: Children, id: NodeId) {
        if self.enabled {
            self.entries.insert((kind, size, children), id);
        }
    }

    /// Removes the dictionary entry for a freed node, if hash-consing was on
    /// when it was created.
    pub(super) fn remove(&mut self, kind: &NodeKind, size: u32, children: &Children) {
        self.entries.remove(&(kind.clone(), size, children.clone()));
    }

    /// Number of interned entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no node is interned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}
