// Subtree bounding rects.
//
// A node's bounding rect is its own rect unioned with the bounding rects of
// its visible children, padded by half the configured spacing on each side.
// Collapsed nodes contribute only their own rect; a root excludes children on
// a collapsed side. Two non-overlapping bounding rects therefore keep at least
// one full spacing between the nodes they contain.

use serde::Serialize;

use super::{LayoutConfig, Rect, Side};
use crate::graph::{Graph, Node, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub owner_id: NodeId,
}

impl BoundingRect {
    pub fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }
}

pub fn own_rect(graph: &Graph, id: &NodeId) -> Option<Rect> {
    graph.node(id).map(Node::rect)
}

/// Bounding rect of `id`'s visible subtree, or None if `id` is missing.
pub fn bounding_rect(graph: &Graph, id: &NodeId, cfg: &LayoutConfig) -> Option<BoundingRect> {
    let rect = subtree_rect(graph, id, cfg)?;
    Some(BoundingRect {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        owner_id: id.clone(),
    })
}

pub(crate) fn subtree_rect(graph: &Graph, id: &NodeId, cfg: &LayoutConfig) -> Option<Rect> {
    let node = graph.node(id)?;
    // Half per side: two touching bounding rects keep one full spacing apart.
    let (pad_x, pad_y) = (cfg.horizontal_spacing / 2.0, cfg.vertical_spacing / 2.0);
    if node.collapsed && !node.is_root() {
        return Some(node.rect());
    }

    let mut bb = node.rect();
    for child in visible_children(graph, node) {
        if let Some(r) = subtree_rect(graph, child, cfg) {
            bb = bb.union(&r);
        }
    }
    Some(bb.pad(pad_x, pad_y))
}

/// Children that are not hidden by their parent's collapse state.
pub(crate) fn visible_children<'a>(graph: &'a Graph, node: &'a Node) -> impl Iterator<Item = &'a NodeId> + 'a {
    let collapsed = node.collapsed && !node.is_root();
    let center_x = node.center().x;
    graph.children(&node.id).iter().filter(move |child| {
        if collapsed {
            return false;
        }
        if !node.is_root() {
            return true;
        }
        match graph.node(child) {
            Some(c) => match Side::of(c.center().x, center_x) {
                Side::Left => !node.collapsed_left,
                Side::Right => !node.collapsed_right,
            },
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, Node};

    fn graph() -> Graph {
        let mut g = Graph::new();
        let mut add = |id: &str, parent: Option<&str>, x: f64, y: f64| {
            let mut n = Node::new(NodeId::new(id), id, x, y, 100.0, 40.0);
            n.parent_id = parent.map(NodeId::new);
            g.add_node(n, EdgeId::new(format!("e-{id}")));
        };
        add("R", None, 0.0, 0.0);
        add("A", Some("R"), 200.0, -60.0);
        add("B", Some("R"), 200.0, 60.0);
        add("C", Some("A"), 400.0, -60.0);
        add("L", Some("R"), -200.0, 0.0);
        g
    }

    fn cfg() -> LayoutConfig {
        LayoutConfig { horizontal_spacing: 40.0, vertical_spacing: 20.0, ..LayoutConfig::default() }
    }

    #[test]
    fn test_leaf_is_padded() {
        let g = graph();
        let r = bounding_rect(&g, &NodeId::new("C"), &cfg()).unwrap();
        assert_eq!(r.rect(), Rect::new(380.0, -70.0, 140.0, 60.0));
        assert_eq!(r.owner_id, NodeId::new("C"));
    }

    #[test]
    fn test_containment() {
        let g = graph();
        let c = cfg();
        for node in g.nodes() {
            let outer = bounding_rect(&g, &node.id, &c).unwrap().rect();
            for desc in g.descendants(&node.id) {
                let inner = bounding_rect(&g, &desc, &c).unwrap().rect();
                assert!(outer.contains_rect(&inner), "{} should contain {}", node.id, desc);
            }
        }
    }

    #[test]
    fn test_collapsed_node_uses_own_rect() {
        let mut g = graph();
        g.node_mut(&NodeId::new("A")).unwrap().collapsed = true;
        let r = bounding_rect(&g, &NodeId::new("A"), &cfg()).unwrap();
        assert_eq!(r.rect(), Rect::new(200.0, -60.0, 100.0, 40.0));
    }

    #[test]
    fn test_root_side_collapse_excludes_that_side() {
        let mut g = graph();
        let full = bounding_rect(&g, &NodeId::new("R"), &cfg()).unwrap();
        assert_eq!(full.x, -240.0);

        g.node_mut(&NodeId::new("R")).unwrap().collapsed_left = true;
        let right_only = bounding_rect(&g, &NodeId::new("R"), &cfg()).unwrap();
        assert_eq!(right_only.x, -20.0);
        assert_eq!(right_only.rect().right(), full.rect().right());
    }

    #[test]
    fn test_missing_id() {
        assert!(bounding_rect(&graph(), &NodeId::new("nope"), &cfg()).is_none());
    }
}
