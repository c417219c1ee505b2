// Angular sibling ordering.
//
// Siblings are ranked by the clockwise angle of their center around a
// reference point: the parent's center, or the center of the whole forest for
// roots. Each orientation mode maps that angle to a sort key; the index of a
// node in the key order is its persisted `order`.
//
// Switching modes rewrites positions with a short sequence of mirror/reverse
// operations so the node that was i-th under the old mode is i-th under the
// new one.

use serde::{Deserialize, Serialize};

use super::{Point, Rect, Side};
use crate::graph::{Graph, NodeId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationMode {
    #[default]
    Clockwise,
    CounterClockwise,
    LeftRight,
    RightLeft,
}

impl OrientationMode {
    pub const ALL: [OrientationMode; 4] = [
        OrientationMode::Clockwise,
        OrientationMode::CounterClockwise,
        OrientationMode::LeftRight,
        OrientationMode::RightLeft,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransitionOp {
    /// Mirror every child subtree across the vertical line through the root.
    SwapSides,
    /// Reverse the vertical order of the children left of their parent.
    ReverseLeft,
    /// Reverse the vertical order of the children right of their parent.
    ReverseRight,
}

/// Clockwise angle in degrees from 12 o'clock, in [0, 360).
pub fn angle_from(reference: Point, center: Point) -> f64 {
    let dx = center.x - reference.x;
    let dy = center.y - reference.y;
    // y grows downwards, so "up" is -y.
    dx.atan2(-dy).to_degrees().rem_euclid(360.0)
}

pub fn sort_key(angle: f64, mode: OrientationMode) -> f64 {
    match mode {
        OrientationMode::Clockwise => angle,
        OrientationMode::CounterClockwise => (360.0 - angle).rem_euclid(360.0),
        OrientationMode::LeftRight => {
            if angle >= 180.0 { 360.0 - angle } else { 180.0 + angle }
        }
        OrientationMode::RightLeft => {
            if angle < 180.0 { angle } else { 540.0 - angle }
        }
    }
}

/// Operation sequence turning a `from` layout into the equivalent `to` layout.
pub fn transition_ops(from: OrientationMode, to: OrientationMode) -> &'static [TransitionOp] {
    use OrientationMode::*;
    use TransitionOp::*;
    match (from, to) {
        (Clockwise, CounterClockwise) => &[SwapSides],
        (Clockwise, LeftRight) => &[SwapSides, ReverseRight],
        (Clockwise, RightLeft) => &[ReverseLeft],
        (CounterClockwise, Clockwise) => &[SwapSides],
        (CounterClockwise, LeftRight) => &[ReverseRight],
        (CounterClockwise, RightLeft) => &[SwapSides, ReverseLeft],
        (LeftRight, Clockwise) => &[SwapSides, ReverseLeft],
        (LeftRight, CounterClockwise) => &[ReverseRight],
        (LeftRight, RightLeft) => &[SwapSides],
        (RightLeft, Clockwise) => &[ReverseLeft],
        (RightLeft, CounterClockwise) => &[SwapSides, ReverseRight],
        (RightLeft, LeftRight) => &[SwapSides],
        _ => &[],
    }
}

/// Center of the union of all root rects.
pub fn forest_center(graph: &Graph) -> Option<Point> {
    graph
        .roots()
        .iter()
        .filter_map(|r| graph.node(r).map(|n| n.rect()))
        .reduce(|a: Rect, b| a.union(&b))
        .map(|r| r.center())
}

/// Reference point for ordering the group under `parent`.
pub fn reference_point(graph: &Graph, parent: Option<&NodeId>) -> Option<Point> {
    match parent {
        Some(p) => graph.node(p).map(|n| n.center()),
        None => forest_center(graph),
    }
}

/// Group under `parent` sorted by the `mode` key. Ties keep the persisted order.
pub fn canonical_order(graph: &Graph, parent: Option<&NodeId>, mode: OrientationMode) -> Vec<NodeId> {
    let Some(reference) = reference_point(graph, parent) else {
        return Vec::new();
    };
    let mut keyed: Vec<(f64, i64, NodeId)> = graph
        .group(parent)
        .iter()
        .filter_map(|id| {
            let node = graph.node(id)?;
            let key = sort_key(angle_from(reference, node.center()), mode);
            Some((key, node.order, id.clone()))
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, _, id)| id).collect()
}

/// Rewrite `order` for the group under `parent`. Returns the new order when
/// any rank changed.
pub fn reorder_siblings(graph: &mut Graph, parent: Option<&NodeId>, mode: OrientationMode) -> Option<Vec<NodeId>> {
    let ordered = canonical_order(graph, parent, mode);
    let mut changed = false;
    for (rank, id) in ordered.iter().enumerate() {
        if let Some(node) = graph.node_mut(id) {
            let rank = rank as i64;
            if node.order != rank {
                node.order = rank;
                changed = true;
            }
        }
    }
    changed.then_some(ordered)
}

/// Reorder every sibling group in the forest. Returns the groups that changed,
/// keyed by parent (None for the roots).
pub fn reorder_all(graph: &mut Graph, mode: OrientationMode) -> Vec<(Option<NodeId>, Vec<NodeId>)> {
    let mut changed = Vec::new();
    if let Some(order) = reorder_siblings(graph, None, mode) {
        changed.push((None, order));
    }
    let parents: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !graph.children(&n.id).is_empty())
        .map(|n| n.id.clone())
        .collect();
    for parent in parents {
        if let Some(order) = reorder_siblings(graph, Some(&parent), mode) {
            changed.push((Some(parent), order));
        }
    }
    changed
}

/// Rewrite positions of every tree so its `from` ordering reads the same
/// under `to`.
pub fn apply_transition(graph: &mut Graph, from: OrientationMode, to: OrientationMode) {
    let roots = graph.roots().to_vec();
    for op in transition_ops(from, to) {
        for root in &roots {
            apply_op(graph, root, *op);
        }
    }
}

fn apply_op(graph: &mut Graph, root: &NodeId, op: TransitionOp) {
    match op {
        TransitionOp::SwapSides => {
            let Some(axis) = graph.node(root).map(|n| n.center().x) else {
                return;
            };
            for child in graph.children(root).to_vec() {
                graph.mirror_subtree(&child, axis);
            }
        }
        TransitionOp::ReverseLeft => reverse_in_tree(graph, root, Side::Left),
        TransitionOp::ReverseRight => reverse_in_tree(graph, root, Side::Right),
    }
}

/// Reverse the `side` children of every parent in the tree, parents first.
fn reverse_in_tree(graph: &mut Graph, root: &NodeId, side: Side) {
    for parent in graph.subtree(root) {
        reverse_side(graph, &parent, side);
    }
}

/// Swap the vertical centers of the `side` children of `parent`: the topmost
/// takes the bottommost's place and so on. Subtrees move rigidly.
pub fn reverse_side(graph: &mut Graph, parent: &NodeId, side: Side) {
    let Some(axis) = graph.node(parent).map(|n| n.center().x) else {
        return;
    };
    let mut members: Vec<(NodeId, f64)> = graph
        .children(parent)
        .iter()
        .filter_map(|id| {
            let c = graph.node(id)?.center();
            (Side::of(c.x, axis) == side).then(|| (id.clone(), c.y))
        })
        .collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1));

    let ys: Vec<f64> = members.iter().map(|(_, y)| *y).collect();
    let n = members.len();
    for (i, (id, y)) in members.into_iter().enumerate() {
        graph.translate_subtree(&id, 0.0, ys[n - 1 - i] - y);
    }
}
