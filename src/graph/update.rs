//! Structural mutations of the forest.
//!
//! Every mutation keeps the forest invariant: hierarchy edges stay 1:1 with
//! non-root nodes and no node can end up under its own descendant. Missing ids
//! are silent no-ops.

use super::model::Graph;
use super::types::{Edge, EdgeId, EdgeKind, Node, NodeId};
use crate::layout::handles::closest_handles;

/// Engine-owned id and label generator.
#[derive(Debug, Clone, Default)]
pub struct IdSequence {
    next_node: u64,
    next_edge: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `node-{n}` id not already present in `graph`.
    pub fn next_node_id(&mut self, graph: &Graph) -> NodeId {
        loop {
            self.next_node += 1;
            let id = NodeId(format!("node-{}", self.next_node));
            if !graph.contains(&id) {
                return id;
            }
        }
    }

    /// Next `edge-{n}` id not already present in `graph`.
    pub fn next_edge_id(&mut self, graph: &Graph) -> EdgeId {
        loop {
            self.next_edge += 1;
            let id = EdgeId(format!("edge-{}", self.next_edge));
            if !graph.contains_edge(&id) {
                return id;
            }
        }
    }

    /// Label for the node most recently handed out by `next_node_id`.
    pub fn current_label(&self) -> String {
        format!("Node {}", self.next_node)
    }
}

impl Graph {
    /// Insert `node` and, when it has a parent, its hierarchy edge.
    pub fn add_node(&mut self, mut node: Node, edge_id: EdgeId) {
        node.order = self.next_order(node.parent_id.as_ref());
        let has_parent = node.parent_id.is_some();
        let id = node.id.clone();
        self.insert_node(node);
        if has_parent {
            self.link_to_parent(&id, edge_id);
        }
    }

    /// One past the highest `order` in the group under `parent`.
    pub fn next_order(&self, parent: Option<&NodeId>) -> i64 {
        self.group(parent)
            .iter()
            .filter_map(|id| self.node(id))
            .map(|n| n.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// (Re)create the hierarchy edge from `child`'s parent to `child`.
    pub fn link_to_parent(&mut self, child: &NodeId, edge_id: EdgeId) -> bool {
        let Some(node) = self.node(child) else {
            return false;
        };
        let Some(parent) = node.parent_id.as_ref().and_then(|p| self.node(p)) else {
            return false;
        };
        let (source_handle, target_handle) = closest_handles(parent, node);
        let edge = Edge {
            id: edge_id,
            source: parent.id.clone(),
            target: child.clone(),
            source_handle,
            target_handle,
            kind: EdgeKind::Hierarchy,
        };
        self.insert_edge(edge);
        true
    }

    /// True if `id` may be moved under `new_parent`.
    pub fn can_reparent(&self, id: &NodeId, new_parent: &NodeId) -> bool {
        id != new_parent
            && self.contains(id)
            && self.contains(new_parent)
            && !self.is_descendant_of(new_parent, id)
    }

    /// Move `id` under `new_parent`, replacing its hierarchy edge.
    /// Returns the previous parent (None for a former root), or None without
    /// mutating anything when the move would break the forest.
    pub fn reparent(&mut self, id: &NodeId, new_parent: &NodeId, edge_id: EdgeId) -> Option<Option<NodeId>> {
        if !self.can_reparent(id, new_parent) {
            return None;
        }
        let old_parent = self.parent(id).cloned();
        if let Some(old_edge) = self.hierarchy_edge_id_of(id).cloned() {
            self.remove_edge(&old_edge);
        }
        let order = self.next_order(Some(new_parent));
        self.set_parent(id, Some(new_parent.clone()));
        if let Some(node) = self.node_mut(id) {
            node.order = order;
        }
        self.link_to_parent(id, edge_id);
        Some(old_parent)
    }

    /// Turn `id` into a root, keeping its subtree. Returns the former parent.
    pub fn detach(&mut self, id: &NodeId) -> Option<NodeId> {
        let old_parent = self.parent(id)?.clone();
        if let Some(edge) = self.hierarchy_edge_id_of(id).cloned() {
            self.remove_edge(&edge);
        }
        let order = self.next_order(None);
        self.set_parent(id, None);
        if let Some(node) = self.node_mut(id) {
            node.order = order;
            node.collapsed = false;
        }
        Some(old_parent)
    }

    /// Remove `id`, every descendant and every edge touching them.
    pub fn delete_subtree(&mut self, id: &NodeId) -> (Vec<NodeId>, Vec<EdgeId>) {
        let doomed = self.subtree(id);
        let mut removed_edges = Vec::new();
        for member in &doomed {
            for edge in self.edges_touching(member) {
                if self.remove_edge(&edge).is_some() {
                    removed_edges.push(edge);
                }
            }
        }
        // Children first so each removal only unlinks from a live parent list.
        for member in doomed.iter().rev() {
            self.remove_node_only(member);
        }
        (doomed, removed_edges)
    }

    /// Free-form cross link; excluded from layout.
    pub fn add_reference_edge(&mut self, source: &NodeId, target: &NodeId, edge_id: EdgeId) -> bool {
        let (Some(a), Some(b)) = (self.node(source), self.node(target)) else {
            return false;
        };
        if source == target {
            return false;
        }
        let (source_handle, target_handle) = closest_handles(a, b);
        self.insert_edge(Edge {
            id: edge_id,
            source: source.clone(),
            target: target.clone(),
            source_handle,
            target_handle,
            kind: EdgeKind::Reference,
        });
        true
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        match self.edge(id)?.kind {
            // Hierarchy edges go away only with detach/reparent/delete.
            EdgeKind::Hierarchy => None,
            EdgeKind::Reference => self.remove_edge(id),
        }
    }
}
