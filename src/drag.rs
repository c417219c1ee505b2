//! Drag and reparent interaction.
//!
//! A drag session moves one or more nodes with the pointer. Descendants keep
//! their offset to the dragged node, except that crossing to the other side of
//! the tree's root mirrors them horizontally. A single dragged node whose
//! pointer enters the outer third of another node becomes a reparent
//! candidate; releasing it there moves the node under that candidate.

use log::debug;

use crate::graph::{Graph, IdSequence, NodeId};
use crate::layout::handles::{update_branch_handles, update_node_handles};
use crate::layout::orientation::reorder_siblings;
use crate::layout::overlap::{ResolveScope, resolve_roots_scoped, resolve_scoped};
use crate::layout::{LayoutConfig, LodFilter, Point, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    /// Dragging with a reparent candidate under the pointer.
    Reparenting,
}

#[derive(Debug, Clone)]
struct DraggedNode {
    id: NodeId,
    start: Point,
    /// Side relative to the tree's root; None when the dragged node is a root.
    current_side: Option<Side>,
    /// Descendant center minus dragged node center.
    offsets: Vec<(NodeId, Point)>,
}

#[derive(Debug, Clone)]
struct DragSession {
    nodes: Vec<DraggedNode>,
    pointer_start: Point,
    potential_parent: Option<NodeId>,
}

/// Result of releasing a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// No session was active.
    Ignored,
    Committed {
        nodes: Vec<NodeId>,
        reordered: Vec<(Option<NodeId>, Vec<NodeId>)>,
    },
    Reparented {
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: NodeId,
        reordered: Vec<(Option<NodeId>, Vec<NodeId>)>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    phase: DragPhase,
    session: Option<DragSession>,
    refresh_requested: bool,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn potential_parent(&self) -> Option<&NodeId> {
        self.session.as_ref()?.potential_parent.as_ref()
    }

    /// Ids being dragged, after folding nodes whose ancestor is also dragged.
    pub fn dragged(&self) -> Vec<NodeId> {
        self.session
            .as_ref()
            .map(|s| s.nodes.iter().map(|n| n.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Stored descendant offsets of a dragged node.
    pub fn descendant_offsets(&self, id: &NodeId) -> Option<&[(NodeId, Point)]> {
        let session = self.session.as_ref()?;
        let node = session.nodes.iter().find(|n| &n.id == id)?;
        Some(&node.offsets)
    }

    /// Whether a commit asked for off-screen subtrees to be recomputed.
    /// Reading clears the flag.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    pub fn refresh_requested(&self) -> bool {
        self.refresh_requested
    }

    /// Begin dragging `ids` with the pointer at `pointer`. Returns false when
    /// none of the ids exist.
    pub fn start(&mut self, graph: &Graph, ids: &[NodeId], pointer: Point) -> bool {
        let present: Vec<&NodeId> = ids.iter().filter(|id| graph.contains(id)).collect();
        let mut nodes = Vec::new();
        for id in &present {
            if present.iter().any(|other| other != id && graph.is_descendant_of(id, other)) {
                continue;
            }
            if nodes.iter().any(|n: &DraggedNode| &n.id == *id) {
                continue;
            }
            let Some(node) = graph.node(id) else { continue };
            let center = node.center();
            let offsets = graph
                .descendants(id)
                .into_iter()
                .filter_map(|d| {
                    let c = graph.node(&d)?.center();
                    Some((d, Point::new(c.x - center.x, c.y - center.y)))
                })
                .collect();
            nodes.push(DraggedNode {
                id: (*id).clone(),
                start: node.position(),
                current_side: graph.side_of(id),
                offsets,
            });
        }
        if nodes.is_empty() {
            return false;
        }
        debug!("drag start: {:?}", nodes.iter().map(|n| n.id.0.as_str()).collect::<Vec<_>>());
        self.session = Some(DragSession { nodes, pointer_start: pointer, potential_parent: None });
        self.phase = DragPhase::Dragging;
        true
    }

    /// Follow the pointer. Returns the ids whose positions changed.
    pub fn move_to(&mut self, graph: &mut Graph, pointer: Point) -> Vec<NodeId> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let (dx, dy) = (pointer.x - session.pointer_start.x, pointer.y - session.pointer_start.y);
        let mut moved = Vec::new();

        for dragged in &mut session.nodes {
            let Some(node) = graph.node_mut(&dragged.id) else { continue };
            node.x = dragged.start.x + dx;
            node.y = dragged.start.y + dy;
            let center = node.center();
            moved.push(dragged.id.clone());

            let new_side = graph.side_of(&dragged.id);
            let flipped = dragged.current_side.is_some() && new_side != dragged.current_side;
            if flipped {
                for (_, offset) in &mut dragged.offsets {
                    offset.x = -offset.x;
                }
                dragged.current_side = new_side;
                debug!("drag: {} crossed to {:?}", dragged.id, new_side);
            }
            for (id, offset) in &dragged.offsets {
                if let Some(d) = graph.node_mut(id) {
                    d.set_center(Point::new(center.x + offset.x, center.y + offset.y));
                    moved.push(id.clone());
                }
            }
            if flipped {
                update_branch_handles(graph, &dragged.id);
            } else {
                update_node_handles(graph, &dragged.id);
            }
        }

        let candidate = match session.nodes.as_slice() {
            [single] => find_potential_parent(graph, &single.id, pointer),
            _ => None,
        };
        if candidate != session.potential_parent {
            debug!("drag: potential parent {:?}", candidate.as_ref().map(|c| c.0.as_str()));
        }
        self.phase = if candidate.is_some() { DragPhase::Reparenting } else { DragPhase::Dragging };
        session.potential_parent = candidate;
        moved
    }

    /// Release the drag: reparent onto the candidate if there is one,
    /// otherwise commit the positions and resolve overlaps around them.
    pub fn stop(&mut self, graph: &mut Graph, ids: &mut IdSequence, cfg: &LayoutConfig, lod: LodFilter) -> DragOutcome {
        self.phase = DragPhase::Idle;
        let Some(session) = self.session.take() else {
            return DragOutcome::Ignored;
        };
        if let (Some(parent), [single]) = (&session.potential_parent, session.nodes.as_slice()) {
            if let Some(outcome) = reparent(graph, ids, &single.id, parent, cfg) {
                return outcome;
            }
        }

        let mut reordered = Vec::new();
        let mut nodes = Vec::with_capacity(session.nodes.len());
        for dragged in &session.nodes {
            let Some(root) = graph.root_of(&dragged.id) else { continue };
            let scope = ResolveScope {
                root,
                side: dragged.current_side,
                max_depth: lod.max_depth,
            };
            resolve_scoped(graph, &scope, cfg);
            update_branch_handles(graph, &dragged.id);
            let parent = graph.parent(&dragged.id).cloned();
            if let Some(order) = reorder_siblings(graph, parent.as_ref(), cfg.orientation_mode) {
                reordered.push((parent, order));
            }
            nodes.push(dragged.id.clone());
        }
        self.refresh_requested = true;
        debug!("drag commit: {} nodes", nodes.len());
        DragOutcome::Committed { nodes, reordered }
    }

    /// Drop the session without restoring positions.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("drag cancelled");
        }
        self.phase = DragPhase::Idle;
    }
}

/// Node whose attach zone contains `pointer`, if any. The attach zone is the
/// outer third of a candidate's width on the side it faces relative to its
/// root; for a root candidate, the side the dragged node is on.
pub(crate) fn find_potential_parent(graph: &Graph, dragged: &NodeId, pointer: Point) -> Option<NodeId> {
    let dragged_center = graph.node(dragged)?.center();
    graph
        .nodes()
        .filter(|c| &c.id != dragged && !graph.is_descendant_of(&c.id, dragged))
        .filter(|c| !graph.is_hidden_by_collapse(&c.id))
        .filter(|c| c.rect().contains_point(pointer))
        .filter(|c| {
            let rect = c.rect();
            let side = graph
                .side_of(&c.id)
                .unwrap_or_else(|| Side::of(dragged_center.x, rect.center().x));
            match side {
                Side::Right => pointer.x >= rect.x + rect.width * 2.0 / 3.0,
                Side::Left => pointer.x <= rect.x + rect.width / 3.0,
            }
        })
        .last()
        .map(|c| c.id.clone())
}

/// Move `node` under `new_parent`, placing it beside the parent on the parent's side.
pub(crate) fn reparent(graph: &mut Graph, ids: &mut IdSequence, node: &NodeId, new_parent: &NodeId, cfg: &LayoutConfig) -> Option<DragOutcome> {
    let old_root = graph.root_of(node)?;
    let edge_id = ids.next_edge_id(graph);
    let old_parent = graph.reparent(node, new_parent, edge_id)?;

    let parent = graph.node(new_parent)?.rect();
    let current = graph.node(node)?.rect();
    let side = graph
        .side_of(new_parent)
        .unwrap_or_else(|| Side::of(current.center().x, parent.center().x));
    let x = match side {
        Side::Right => parent.right() + cfg.horizontal_spacing,
        Side::Left => parent.x - cfg.horizontal_spacing - current.width,
    };
    let y = parent.center().y - current.height / 2.0;
    graph.translate_subtree(node, x - current.x, y - current.y);

    // Children left behind on the parent-facing side are mirrored outwards.
    let axis = graph.node(node)?.center().x;
    for child in graph.children(node).to_vec() {
        let on_side = graph.node(&child).map(|c| Side::of(c.center().x, axis));
        if on_side.is_some_and(|s| s != side) {
            graph.mirror_subtree(&child, axis);
        }
    }

    let new_root = graph.root_of(node)?;
    resolve_roots_scoped(graph, &[old_root, new_root], cfg);
    update_branch_handles(graph, node);

    let mut reordered = Vec::new();
    if let Some(order) = reorder_siblings(graph, Some(new_parent), cfg.orientation_mode) {
        reordered.push((Some(new_parent.clone()), order));
    }
    if let Some(order) = reorder_siblings(graph, old_parent.as_ref(), cfg.orientation_mode) {
        reordered.push((old_parent.clone(), order));
    }
    debug!("drag reparent: {node} from {old_parent:?} to {new_parent}");
    Some(DragOutcome::Reparented {
        node: node.clone(),
        old_parent,
        new_parent: new_parent.clone(),
        reordered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, Node};
    use crate::layout::bounds::subtree_rect;

    fn add(g: &mut Graph, id: &str, parent: Option<&str>, x: f64, y: f64) {
        let mut n = Node::new(NodeId::new(id), id, x, y, 100.0, 40.0);
        n.parent_id = parent.map(NodeId::new);
        g.add_node(n, EdgeId::new(format!("e-{id}")));
    }

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    /// Root `r` with `a` (which has child `a1`) and `b` on its right.
    fn tree() -> Graph {
        let mut g = Graph::new();
        add(&mut g, "r", None, 0.0, 0.0);
        add(&mut g, "a", Some("r"), 300.0, 0.0);
        add(&mut g, "a1", Some("a"), 500.0, 0.0);
        add(&mut g, "b", Some("r"), 300.0, 200.0);
        g
    }

    #[test]
    fn test_crossing_the_root_mirrors_descendants() {
        let mut g = tree();
        let mut drag = DragController::new();
        assert!(drag.start(&g, &[id("a")], Point::new(350.0, 20.0)));
        assert_eq!(drag.descendant_offsets(&id("a")).unwrap()[0].1.x, 200.0);

        drag.move_to(&mut g, Point::new(-250.0, 20.0));
        let a = g.node(&id("a")).unwrap().center();
        let a1 = g.node(&id("a1")).unwrap().center();
        assert_eq!(a.x, -250.0);
        assert_eq!(a1.x, -450.0);
        assert_eq!(drag.descendant_offsets(&id("a")).unwrap()[0].1.x, -200.0);
        assert_eq!(g.hierarchy_edge_of(&id("a1")).unwrap().source_handle.to_string(), "left-source");
        assert_eq!(g.hierarchy_edge_of(&id("a")).unwrap().target_handle.to_string(), "right-target");

        // Moving further on the same side does not flip again.
        drag.move_to(&mut g, Point::new(-300.0, 20.0));
        assert_eq!(drag.descendant_offsets(&id("a")).unwrap()[0].1.x, -200.0);

        drag.move_to(&mut g, Point::new(350.0, 20.0));
        assert_eq!(g.node(&id("a1")).unwrap().center().x, 550.0);
    }

    #[test]
    fn test_dragged_root_keeps_offsets() {
        let mut g = tree();
        let mut drag = DragController::new();
        drag.start(&g, &[id("r")], Point::new(50.0, 20.0));
        drag.move_to(&mut g, Point::new(-950.0, 20.0));
        assert_eq!(g.node(&id("r")).unwrap().x, -1000.0);
        assert_eq!(g.node(&id("a1")).unwrap().x, -500.0);
    }

    #[test]
    fn test_nested_selection_is_folded() {
        let g = tree();
        let mut drag = DragController::new();
        drag.start(&g, &[id("a1"), id("a"), id("missing")], Point::new(0.0, 0.0));
        assert_eq!(drag.dragged(), vec![id("a")]);
        assert!(!DragController::new().start(&g, &[id("missing")], Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_reparent_gating() {
        let mut g = tree();
        let mut drag = DragController::new();
        drag.start(&g, &[id("b")], Point::new(350.0, 220.0));

        // Outer third of `a` (which faces right).
        drag.move_to(&mut g, Point::new(390.0, 20.0));
        assert_eq!(drag.potential_parent(), Some(&id("a")));
        assert_eq!(drag.phase(), DragPhase::Reparenting);

        // Inner part of `a`.
        drag.move_to(&mut g, Point::new(310.0, 20.0));
        assert_eq!(drag.potential_parent(), None);
        assert_eq!(drag.phase(), DragPhase::Dragging);
    }

    #[test]
    fn test_descendants_are_never_candidates() {
        let g = tree();
        assert_eq!(find_potential_parent(&g, &id("a"), Point::new(590.0, 20.0)), None);
        assert_eq!(find_potential_parent(&g, &id("b"), Point::new(590.0, 20.0)), Some(id("a1")));
    }

    #[test]
    fn test_hidden_nodes_are_never_candidates() {
        let mut g = tree();
        g.node_mut(&id("a")).unwrap().collapsed = true;
        assert_eq!(find_potential_parent(&g, &id("b"), Point::new(590.0, 20.0)), None);
    }

    #[test]
    fn test_root_attach_zone_follows_dragged_side() {
        let g = tree();
        // `b` is right of the root, so the root's right third attaches.
        assert_eq!(find_potential_parent(&g, &id("b"), Point::new(90.0, 20.0)), Some(id("r")));
        assert_eq!(find_potential_parent(&g, &id("b"), Point::new(10.0, 20.0)), None);
    }

    #[test]
    fn test_stop_on_candidate_reparents() {
        let mut g = tree();
        let mut ids = IdSequence::new();
        let cfg = LayoutConfig::default();
        let mut drag = DragController::new();
        drag.start(&g, &[id("b")], Point::new(350.0, 220.0));
        drag.move_to(&mut g, Point::new(390.0, 20.0));

        let outcome = drag.stop(&mut g, &mut ids, &cfg, LodFilter::unlimited());
        match outcome {
            DragOutcome::Reparented { node, old_parent, new_parent, .. } => {
                assert_eq!(node, id("b"));
                assert_eq!(old_parent, Some(id("r")));
                assert_eq!(new_parent, id("a"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert_eq!(g.parent(&id("b")), Some(&id("a")));
        assert_eq!(g.children(&id("r")), &[id("a")]);

        // Placed beside `a`, then pushed vertically away from `a1`.
        assert_eq!(g.node(&id("b")).unwrap().x, 440.0);
        let siblings = [id("a1"), id("b")];
        assert!(crate::layout::overlap::overlapping_pairs(&g, &siblings, &cfg).is_empty());
        let edge = g.hierarchy_edge_of(&id("b")).unwrap();
        assert_eq!(edge.source, id("a"));
        assert_eq!(edge.source_handle.to_string(), "right-source");
        assert_eq!(edge.target_handle.to_string(), "left-target");
        for sib in [id("a1"), id("b")] {
            assert!(!subtree_rect(&g, &sib, &cfg).unwrap().overlaps(&g.node(&id("a")).unwrap().rect()));
        }
    }

    #[test]
    fn test_reparent_mirrors_children_onto_new_side() {
        let mut g = tree();
        add(&mut g, "l", Some("r"), -300.0, 0.0);
        add(&mut g, "b1", Some("b"), 500.0, 200.0);
        let mut ids = IdSequence::new();
        let cfg = LayoutConfig::default();

        let outcome = reparent(&mut g, &mut ids, &id("b"), &id("l"), &cfg);
        assert!(matches!(outcome, Some(DragOutcome::Reparented { .. })));

        let b = g.node(&id("b")).unwrap();
        let b1 = g.node(&id("b1")).unwrap();
        assert_eq!(b.x, -300.0 - 40.0 - 100.0);
        assert_eq!(b1.center().x, b.center().x - 200.0);
        assert_eq!(g.side_of(&id("b1")), Some(Side::Left));
        assert_eq!(g.hierarchy_edge_of(&id("b1")).unwrap().source_handle.to_string(), "left-source");
    }

    #[test]
    fn test_reparent_onto_own_descendant_is_rejected() {
        let mut g = tree();
        let mut ids = IdSequence::new();
        assert!(reparent(&mut g, &mut ids, &id("a"), &id("a1"), &LayoutConfig::default()).is_none());
        assert_eq!(g.parent(&id("a1")), Some(&id("a")));
    }

    #[test]
    fn test_stop_without_candidate_commits() {
        let mut g = tree();
        let mut ids = IdSequence::new();
        let cfg = LayoutConfig::default();
        let mut drag = DragController::new();
        drag.start(&g, &[id("b")], Point::new(350.0, 220.0));
        drag.move_to(&mut g, Point::new(350.0, 30.0));
        assert_eq!(drag.potential_parent(), None);

        let outcome = drag.stop(&mut g, &mut ids, &cfg, LodFilter::unlimited());
        assert!(matches!(outcome, DragOutcome::Committed { ref nodes, .. } if nodes == &vec![id("b")]));
        let a = subtree_rect(&g, &id("a"), &cfg).unwrap();
        let b = subtree_rect(&g, &id("b"), &cfg).unwrap();
        assert!(!a.overlaps(&b));
        assert!(drag.take_refresh_request());
        assert!(!drag.take_refresh_request());
    }

    #[test]
    fn test_cancel_keeps_positions() {
        let mut g = tree();
        let mut drag = DragController::new();
        drag.start(&g, &[id("b")], Point::new(350.0, 220.0));
        drag.move_to(&mut g, Point::new(360.0, 420.0));
        drag.cancel();
        assert!(!drag.is_active());
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert_eq!(g.node(&id("b")).unwrap().y, 400.0);
        let mut ids = IdSequence::new();
        assert_eq!(drag.stop(&mut g, &mut ids, &LayoutConfig::default(), LodFilter::unlimited()), DragOutcome::Ignored);
    }
}
