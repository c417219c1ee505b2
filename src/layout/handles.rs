// Connector endpoint selection.
//
// A hierarchy edge leaves its parent on the side facing the child and enters
// the child on the opposite side. The dominant axis of the center-to-center
// vector decides between a horizontal (right/left) and vertical (bottom/top)
// pair. Reference edges pick their sides the same way, source to target.

use crate::graph::{EdgeKind, Graph, Handle, HandleSide, Node, NodeId};

/// Handles for an edge from `parent` to `child`.
pub fn closest_handles(parent: &Node, child: &Node) -> (Handle, Handle) {
    let (source, target) = closest_sides(parent, child);
    (Handle::source(source), Handle::target(target))
}

pub fn closest_sides(parent: &Node, child: &Node) -> (HandleSide, HandleSide) {
    let a = parent.center();
    let b = child.center();
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            (HandleSide::Right, HandleSide::Left)
        } else {
            (HandleSide::Left, HandleSide::Right)
        }
    } else if dy > 0.0 {
        (HandleSide::Bottom, HandleSide::Top)
    } else {
        (HandleSide::Top, HandleSide::Bottom)
    }
}

/// Recompute the edge handles of `id` and every descendant.
pub fn update_branch_handles(graph: &mut Graph, id: &NodeId) {
    for member in graph.subtree(id) {
        update_node_handles(graph, &member);
    }
}

/// Recompute the edge handles of every node in the forest.
pub fn update_all_handles(graph: &mut Graph) {
    let roots = graph.roots().to_vec();
    for root in roots {
        update_branch_handles(graph, &root);
    }
}

/// Recompute the handles of the edges attached to `id`: its incoming
/// hierarchy edge and every reference edge touching it.
pub fn update_node_handles(graph: &mut Graph, id: &NodeId) {
    update_reference_handles(graph, id);
    let Some(edge_id) = graph.hierarchy_edge_id_of(id).cloned() else {
        return;
    };
    let handles = {
        let Some(child) = graph.node(id) else { return };
        let Some(parent) = child.parent_id.as_ref().and_then(|p| graph.node(p)) else {
            return;
        };
        closest_handles(parent, child)
    };
    if let Some(edge) = graph.edge_mut(&edge_id) {
        edge.source_handle = handles.0;
        edge.target_handle = handles.1;
    }
}

fn update_reference_handles(graph: &mut Graph, id: &NodeId) {
    for edge_id in graph.edges_touching(id) {
        let handles = {
            let Some(edge) = graph.edge(&edge_id).filter(|e| e.kind == EdgeKind::Reference) else {
                continue;
            };
            let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target)) else {
                continue;
            };
            closest_handles(source, target)
        };
        if let Some(edge) = graph.edge_mut(&edge_id) {
            edge.source_handle = handles.0;
            edge.target_handle = handles.1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeId;

    fn at(id: &str, x: f64, y: f64) -> Node {
        Node::new(NodeId::new(id), id, x, y, 100.0, 40.0)
    }

    #[test]
    fn test_horizontal_and_vertical_pairs() {
        let parent = at("p", 0.0, 0.0);
        assert_eq!(closest_sides(&parent, &at("c", 300.0, 10.0)), (HandleSide::Right, HandleSide::Left));
        assert_eq!(closest_sides(&parent, &at("c", -300.0, 10.0)), (HandleSide::Left, HandleSide::Right));
        assert_eq!(closest_sides(&parent, &at("c", 10.0, 300.0)), (HandleSide::Bottom, HandleSide::Top));
        assert_eq!(closest_sides(&parent, &at("c", 10.0, -300.0)), (HandleSide::Top, HandleSide::Bottom));
    }

    #[test]
    fn test_tie_prefers_vertical() {
        let parent = at("p", 0.0, 0.0);
        assert_eq!(closest_sides(&parent, &at("c", 100.0, 100.0)), (HandleSide::Bottom, HandleSide::Top));
    }

    #[test]
    fn test_branch_update_after_move() {
        let mut g = Graph::new();
        g.add_node(at("r", 0.0, 0.0), EdgeId::new("unused"));
        let mut a = at("a", 300.0, 0.0);
        a.parent_id = Some(NodeId::new("r"));
        g.add_node(a, EdgeId::new("e-a"));
        let mut b = at("b", 600.0, 0.0);
        b.parent_id = Some(NodeId::new("a"));
        g.add_node(b, EdgeId::new("e-b"));

        g.mirror_subtree(&NodeId::new("a"), 50.0);
        update_branch_handles(&mut g, &NodeId::new("a"));

        let ea = g.edge(&EdgeId::new("e-a")).unwrap();
        assert_eq!(ea.source_handle.to_string(), "left-source");
        let eb = g.edge(&EdgeId::new("e-b")).unwrap();
        assert_eq!(eb.target_handle.to_string(), "right-target");
    }

    #[test]
    fn test_reference_edge_follows_moved_branch() {
        let mut g = Graph::new();
        g.add_node(at("r", 0.0, 0.0), EdgeId::new("unused"));
        let mut a = at("a", 300.0, 0.0);
        a.parent_id = Some(NodeId::new("r"));
        g.add_node(a, EdgeId::new("e-a"));
        let mut b = at("b", 600.0, 0.0);
        b.parent_id = Some(NodeId::new("a"));
        g.add_node(b, EdgeId::new("e-b"));
        g.add_node(at("x", 300.0, 100.0), EdgeId::new("unused-x"));
        let reference = EdgeId::new("ref");
        assert!(g.add_reference_edge(&NodeId::new("b"), &NodeId::new("x"), reference.clone()));
        assert_eq!(g.edge(&reference).unwrap().source_handle.to_string(), "left-source");

        // b's center lands at x=-550, left of x.
        g.mirror_subtree(&NodeId::new("a"), 50.0);
        update_branch_handles(&mut g, &NodeId::new("a"));

        let edge = g.edge(&reference).unwrap();
        assert_eq!(edge.source_handle.to_string(), "right-source");
        assert_eq!(edge.target_handle.to_string(), "left-target");
    }
}
