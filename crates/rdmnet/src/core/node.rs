// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Containment-hierarchy arena (spec.md §9, "Deep class inheritance for
//! network items").
//!
//! The original implementation models broker → client → endpoint →
//! responder containment as a `QStandardItem` subclass tree owned by a
//! GUI model. This core has no GUI: the hierarchy is represented as a
//! tagged-variant [`NetworkNode`] stored in a flat [`NodeArena`] with
//! stable indices; parent/children are index pairs, never pointers, so
//! the arena can be introspected (admin/debug tooling) without touching
//! protocol state.

use crate::core::cid::Cid;
use crate::core::uid::Uid;

/// Stable index into a [`NodeArena`]. Never reused while the node it
/// names is still present — indices are only ever appended, and removal
/// tombstones rather than compacts.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeId(usize);

/// One node of the broker/client/endpoint/responder containment tree.
#[derive(Debug, Clone)]
pub enum NetworkNode {
    Broker { cid: Cid, listen_addr: std::net::SocketAddr },
    Client { cid: Cid, uid: Uid },
    Endpoint { id: u16, endpoint_type: EndpointType },
    Responder { uid: Uid, binding_uid: Option<Uid>, control: u16 },
}

/// Endpoint kind (spec.md §3, "Endpoint (device-side)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    Virtual,
    Physical,
    /// Always present; numeric id 0.
    Null,
}

struct Entry {
    node: NetworkNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Tombstoned entries are skipped by iteration but keep their slot so
    /// no previously-issued `NodeId` is ever reused.
    live: bool,
}

/// Flat, index-stable arena for [`NetworkNode`]s.
#[derive(Default)]
pub struct NodeArena {
    entries: Vec<Entry>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert a root node (e.g. a `Broker`) with no parent.
    pub fn insert_root(&mut self, node: NetworkNode) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry { node, parent: None, children: Vec::new(), live: true });
        id
    }

    /// Insert `node` as a child of `parent`.
    ///
    /// # Panics
    /// Panics if `parent` does not name a live node — an internal
    /// invariant violation, not a recoverable condition.
    pub fn insert_child(&mut self, parent: NodeId, node: NetworkNode) -> NodeId {
        assert!(self.entries[parent.0].live, "insert_child on a removed parent");
        let id = NodeId(self.entries.len());
        self.entries.push(Entry { node, parent: Some(parent), children: Vec::new(), live: true });
        self.entries[parent.0].children.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NetworkNode> {
        self.entries.get(id.0).filter(|e| e.live).map(|e| &e.node)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries.get(id.0).map_or(&[], |e| &e.children)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.0).and_then(|e| e.parent)
    }

    /// Remove a node and, recursively, every descendant. Tombstones
    /// rather than compacting, so sibling `NodeId`s stay valid.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(entry) = self.entries.get(id.0) {
            if !entry.live {
                return;
            }
            let children = entry.children.clone();
            for child in children {
                self.remove(child);
            }
            self.entries[id.0].live = false;
            self.entries[id.0].children.clear();
        }
    }
}
