// Id-indexed forest.
//
// Nodes and edges live in flat ordered maps keyed by their stable ids. Parent
// relationships are ids, never references; a child index keyed by parent id
// (None for roots) keeps child lookups O(1). Insertion order is preserved so
// every traversal is deterministic.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::types::{Edge, EdgeId, EdgeKind, Node, NodeId};
use crate::layout::Side;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
    /// child id -> id of its hierarchy edge
    hierarchy_edges: HashMap<NodeId, EdgeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    /// Direct children in insertion order. Empty for leaves and missing ids.
    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.children
            .get(&Some(id.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct children sorted by their persisted `order`.
    pub fn children_by_order(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = self.children(id).to_vec();
        out.sort_by_key(|c| self.nodes.get(c).map(|n| n.order).unwrap_or(0));
        out
    }

    pub fn roots(&self) -> &[NodeId] {
        self.children.get(&None).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes sharing `parent` (roots when `parent` is None).
    pub fn group(&self, parent: Option<&NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => self.children(p),
            None => self.roots(),
        }
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id)?.parent_id.as_ref()
    }

    /// Root of the tree containing `id`.
    pub fn root_of(&self, id: &NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(id)?;
        while let Some(parent) = &current.parent_id {
            current = self.nodes.get(parent)?;
        }
        Some(current.id.clone())
    }

    /// Number of ancestors (0 for roots).
    pub fn depth(&self, id: &NodeId) -> Option<usize> {
        let mut current = self.nodes.get(id)?;
        let mut depth = 0;
        while let Some(parent) = &current.parent_id {
            current = self.nodes.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Ancestor of `id` that is a direct child of its root, if `id` is not a root.
    pub fn top_level_ancestor(&self, id: &NodeId) -> Option<NodeId> {
        let mut current = self.nodes.get(id)?;
        loop {
            let parent = self.nodes.get(current.parent_id.as_ref()?)?;
            if parent.is_root() {
                return Some(current.id.clone());
            }
            current = parent;
        }
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// `id` followed by its descendants.
    pub fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = vec![id.clone()];
        out.extend(self.descendants(id));
        out
    }

    /// True if `ancestor` appears on the parent chain of `id`.
    pub fn is_descendant_of(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Side of a non-root node relative to its tree's root. None for roots.
    pub fn side_of(&self, id: &NodeId) -> Option<Side> {
        let node = self.nodes.get(id)?;
        if node.is_root() {
            return None;
        }
        let root = self.nodes.get(&self.root_of(id)?)?;
        Some(Side::of(node.center().x, root.center().x))
    }

    /// True if a collapsed ancestor (or a collapsed root side) hides `id`.
    pub fn is_hidden_by_collapse(&self, id: &NodeId) -> bool {
        let Some(mut current) = self.nodes.get(id) else {
            return false;
        };
        while let Some(parent_id) = &current.parent_id {
            let Some(parent) = self.nodes.get(parent_id) else {
                return false;
            };
            if parent.is_root() {
                let side = Side::of(current.center().x, parent.center().x);
                return match side {
                    Side::Left => parent.collapsed_left,
                    Side::Right => parent.collapsed_right,
                };
            }
            if parent.collapsed {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Deepest depth present in the forest.
    pub fn max_depth(&self) -> usize {
        fn walk(graph: &Graph, id: &NodeId, depth: usize) -> usize {
            graph
                .children(id)
                .iter()
                .map(|c| walk(graph, c, depth + 1))
                .max()
                .unwrap_or(depth)
        }
        self.roots().iter().map(|r| walk(self, r, 0)).max().unwrap_or(0)
    }

    /// Rigidly move `id` and all its descendants.
    pub fn translate_subtree(&mut self, id: &NodeId, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        for member in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(&member) {
                node.x += dx;
                node.y += dy;
            }
        }
    }

    /// Mirror `id` and its descendants across the vertical line `axis_x`.
    pub fn mirror_subtree(&mut self, id: &NodeId, axis_x: f64) {
        for member in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(&member) {
                let center = node.center();
                node.x = 2.0 * axis_x - center.x - node.width / 2.0;
            }
        }
    }

    pub fn hierarchy_edge_of(&self, child: &NodeId) -> Option<&Edge> {
        self.edges.get(self.hierarchy_edges.get(child)?)
    }

    pub fn hierarchy_edge_id_of(&self, child: &NodeId) -> Option<&EdgeId> {
        self.hierarchy_edges.get(child)
    }

    /// Insert a node and index it under its `parent_id`. Replaces any node
    /// with the same id.
    pub(crate) fn insert_node(&mut self, node: Node) {
        if self.nodes.contains_key(&node.id) {
            self.remove_node_only(&node.id.clone());
        }
        self.children
            .entry(node.parent_id.clone())
            .or_default()
            .push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Remove a single node from the maps and indices, leaving its children
    /// pointing at a missing parent. Callers remove whole subtrees.
    pub(crate) fn remove_node_only(&mut self, id: &NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(id)?;
        if let Some(list) = self.children.get_mut(&node.parent_id) {
            list.retain(|c| c != id);
        }
        self.children.remove(&Some(id.clone()));
        Some(node)
    }

    /// Re-index `id` under `new_parent`. Does not touch edges.
    pub(crate) fn set_parent(&mut self, id: &NodeId, new_parent: Option<NodeId>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let old_parent = std::mem::replace(&mut node.parent_id, new_parent.clone());
        if let Some(list) = self.children.get_mut(&old_parent) {
            list.retain(|c| c != id);
        }
        self.children.entry(new_parent).or_default().push(id.clone());
    }

    pub(crate) fn insert_edge(&mut self, edge: Edge) {
        if edge.kind == EdgeKind::Hierarchy {
            if let Some(previous) = self.hierarchy_edges.insert(edge.target.clone(), edge.id.clone()) {
                if previous != edge.id {
                    self.edges.shift_remove(&previous);
                }
            }
        }
        self.edges.insert(edge.id.clone(), edge);
    }

    pub(crate) fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(id)?;
        if edge.kind == EdgeKind::Hierarchy
            && self.hierarchy_edges.get(&edge.target) == Some(&edge.id)
        {
            self.hierarchy_edges.remove(&edge.target);
        }
        Some(edge)
    }

    /// Ids of every edge touching `id`.
    pub fn edges_touching(&self, id: &NodeId) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|e| &e.source == id || &e.target == id)
            .map(|e| e.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parent: Option<&str>, x: f64, y: f64) -> Node {
        let mut n = Node::new(NodeId::new(id), id, x, y, 100.0, 40.0);
        n.parent_id = parent.map(NodeId::new);
        n
    }

    fn sample() -> Graph {
        //        R
        //      /   \
        //     A     B
        //     |
        //     C
        let mut g = Graph::new();
        g.insert_node(node("R", None, 0.0, 0.0));
        g.insert_node(node("A", Some("R"), -200.0, -50.0));
        g.insert_node(node("B", Some("R"), 200.0, 0.0));
        g.insert_node(node("C", Some("A"), -400.0, -50.0));
        g
    }

    #[test]
    fn test_children_and_roots() {
        let g = sample();
        assert_eq!(g.roots(), &[NodeId::new("R")]);
        assert_eq!(g.children(&NodeId::new("R")), &[NodeId::new("A"), NodeId::new("B")]);
        assert!(g.children(&NodeId::new("missing")).is_empty());
    }

    #[test]
    fn test_depth_root_and_descendants() {
        let g = sample();
        let c = NodeId::new("C");
        assert_eq!(g.depth(&c), Some(2));
        assert_eq!(g.root_of(&c), Some(NodeId::new("R")));
        assert_eq!(g.top_level_ancestor(&c), Some(NodeId::new("A")));
        assert_eq!(g.top_level_ancestor(&NodeId::new("R")), None);
        assert_eq!(
            g.descendants(&NodeId::new("R")),
            vec![NodeId::new("A"), NodeId::new("C"), NodeId::new("B")]
        );
        assert!(g.is_descendant_of(&c, &NodeId::new("R")));
        assert!(!g.is_descendant_of(&NodeId::new("B"), &NodeId::new("A")));
        assert_eq!(g.max_depth(), 2);
    }

    #[test]
    fn test_side_of() {
        let g = sample();
        assert_eq!(g.side_of(&NodeId::new("A")), Some(Side::Left));
        assert_eq!(g.side_of(&NodeId::new("B")), Some(Side::Right));
        assert_eq!(g.side_of(&NodeId::new("R")), None);
    }

    #[test]
    fn test_hidden_by_root_side_collapse() {
        let mut g = sample();
        g.node_mut(&NodeId::new("R")).unwrap().collapsed_left = true;
        assert!(g.is_hidden_by_collapse(&NodeId::new("A")));
        assert!(g.is_hidden_by_collapse(&NodeId::new("C")));
        assert!(!g.is_hidden_by_collapse(&NodeId::new("B")));
    }

    #[test]
    fn test_translate_and_mirror_subtree() {
        let mut g = sample();
        g.translate_subtree(&NodeId::new("A"), 10.0, 5.0);
        assert_eq!(g.node(&NodeId::new("C")).unwrap().position().x, -390.0);
        assert_eq!(g.node(&NodeId::new("R")).unwrap().position().x, 0.0);

        // Root center x is 50; C center x is -340 -> 440.
        g.mirror_subtree(&NodeId::new("A"), 50.0);
        assert_eq!(g.node(&NodeId::new("C")).unwrap().center().x, 440.0);
        assert_eq!(g.side_of(&NodeId::new("A")), Some(Side::Right));
    }

    #[test]
    fn test_set_parent_reindexes() {
        let mut g = sample();
        g.set_parent(&NodeId::new("C"), Some(NodeId::new("B")));
        assert!(g.children(&NodeId::new("A")).is_empty());
        assert_eq!(g.children(&NodeId::new("B")), &[NodeId::new("C")]);
    }
}
