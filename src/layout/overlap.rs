// Sibling overlap resolution.
//
// Siblings (nodes sharing a parent, or all roots) must not have intersecting
// bounding rects, and no child may sit on top of its parent's own rect.
//
// Each pass:
// 1. Ask the strategy for candidate pairs (all pairs, or R-tree hits).
// 2. For every pair still overlapping, push both apart along the axis with
//    the smaller penetration, half each, capped at MAX_DISPLACEMENT per pair.
//    Subtrees move rigidly with their owner.
// 3. Push children off the parent's own rect with a PARENT_MARGIN extra gap.
//
// At most MAX_ITERATIONS passes run. Dense inputs may still overlap afterwards;
// that bounded approximation is accepted.
//
// Trees are resolved bottom-up so a parent's group always sees final child
// subtree extents.

use log::debug;
use serde::{Deserialize, Serialize};

use super::bounds::{own_rect, subtree_rect, visible_children};
use super::spatial_index::SpatialIndexStrategy;
use super::{LayoutConfig, Rect, Side};
use crate::graph::{Graph, NodeId};

pub const MAX_ITERATIONS: usize = 5;
pub const MAX_DISPLACEMENT: f64 = 200.0;
pub const PARENT_MARGIN: f64 = 10.0;
/// Node count above which `ResolverKind::Auto` switches to the R-tree.
pub const AUTO_SPATIAL_THRESHOLD: usize = 500;
/// Extra distance added to every push so separated rects do not touch.
const SEPARATION: f64 = 1.0;

/// Finds the sibling pairs worth testing for overlap.
pub trait OverlapStrategy {
    /// Index pairs `(i, j)` with `i < j`, in ascending order.
    fn candidate_pairs(&self, rects: &[Rect]) -> Vec<(usize, usize)>;
}

/// Tests every unordered pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseStrategy;

impl OverlapStrategy for PairwiseStrategy {
    fn candidate_pairs(&self, rects: &[Rect]) -> Vec<(usize, usize)> {
        let n = rects.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }
}

static PAIRWISE: PairwiseStrategy = PairwiseStrategy;
static SPATIAL: SpatialIndexStrategy = SpatialIndexStrategy;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    #[default]
    Pairwise,
    SpatialIndex,
    /// Pairwise for small forests, spatial index above AUTO_SPATIAL_THRESHOLD nodes.
    Auto,
}

impl ResolverKind {
    pub fn strategy(self, node_count: usize) -> &'static dyn OverlapStrategy {
        match self {
            ResolverKind::Pairwise => &PAIRWISE,
            ResolverKind::SpatialIndex => &SPATIAL,
            ResolverKind::Auto if node_count > AUTO_SPATIAL_THRESHOLD => &SPATIAL,
            ResolverKind::Auto => &PAIRWISE,
        }
    }
}

/// Restricts a resolution to one tree, optionally one side of its root and a
/// maximum depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveScope {
    pub root: NodeId,
    pub side: Option<Side>,
    /// Deepest depth whose sibling groups are resolved.
    pub max_depth: Option<usize>,
}

/// Separate one sibling group. Returns false if overlaps may remain after the
/// iteration cap.
pub fn resolve_siblings(
    graph: &mut Graph,
    siblings: &[NodeId],
    parent: Option<&NodeId>,
    cfg: &LayoutConfig,
    strategy: &dyn OverlapStrategy,
) -> bool {
    let ids: Vec<NodeId> = siblings.iter().filter(|id| graph.contains(id)).cloned().collect();
    if ids.is_empty() || (ids.len() < 2 && parent.is_none()) {
        return true;
    }

    for _ in 0..MAX_ITERATIONS {
        let mut rects: Vec<Rect> = ids
            .iter()
            .map(|id| subtree_rect(graph, id, cfg).unwrap_or_default())
            .collect();
        let mut moved = false;

        for (i, j) in strategy.candidate_pairs(&rects) {
            if !rects[i].overlaps(&rects[j]) {
                continue;
            }
            let (ox, oy) = rects[i].overlap_depth(&rects[j]);
            let (ci, cj) = (rects[i].center(), rects[j].center());
            let (di, dj) = if ox < oy {
                let half = (ox + SEPARATION).min(MAX_DISPLACEMENT) / 2.0;
                if ci.x <= cj.x { ((-half, 0.0), (half, 0.0)) } else { ((half, 0.0), (-half, 0.0)) }
            } else {
                let half = (oy + SEPARATION).min(MAX_DISPLACEMENT) / 2.0;
                if ci.y <= cj.y { ((0.0, -half), (0.0, half)) } else { ((0.0, half), (0.0, -half)) }
            };
            graph.translate_subtree(&ids[i], di.0, di.1);
            graph.translate_subtree(&ids[j], dj.0, dj.1);
            rects[i] = rects[i].translate(di.0, di.1);
            rects[j] = rects[j].translate(dj.0, dj.1);
            moved = true;
        }

        if let Some(parent_rect) = parent.and_then(|p| own_rect(graph, p)) {
            for (i, id) in ids.iter().enumerate() {
                if !rects[i].overlaps(&parent_rect) {
                    continue;
                }
                let (dx, dy) = push_off_parent(&rects[i], &parent_rect);
                graph.translate_subtree(id, dx, dy);
                rects[i] = rects[i].translate(dx, dy);
                moved = true;
            }
        }

        if !moved {
            return true;
        }
    }

    debug!(
        "overlap resolution for {} siblings under {:?} stopped after {} iterations",
        ids.len(),
        parent.map(|p| p.0.as_str()),
        MAX_ITERATIONS
    );
    false
}

fn push_off_parent(child: &Rect, parent: &Rect) -> (f64, f64) {
    let (ox, oy) = child.overlap_depth(parent);
    let (cc, pc) = (child.center(), parent.center());
    if ox < oy {
        let push = (ox + PARENT_MARGIN).min(MAX_DISPLACEMENT);
        (if cc.x < pc.x { -push } else { push }, 0.0)
    } else {
        let push = (oy + PARENT_MARGIN).min(MAX_DISPLACEMENT);
        (0.0, if cc.y < pc.y { -push } else { push })
    }
}

/// Resolve the groups below `id`, deepest first. `depth` is `id`'s depth.
fn resolve_below(
    graph: &mut Graph,
    id: &NodeId,
    depth: usize,
    max_depth: Option<usize>,
    cfg: &LayoutConfig,
    strategy: &dyn OverlapStrategy,
) {
    if max_depth.is_some_and(|limit| depth + 1 > limit) {
        return;
    }
    let children: Vec<NodeId> = match graph.node(id) {
        Some(node) => visible_children(graph, node).cloned().collect(),
        None => return,
    };
    if children.is_empty() {
        return;
    }
    for child in &children {
        resolve_below(graph, child, depth + 1, max_depth, cfg, strategy);
    }
    resolve_siblings(graph, &children, Some(id), cfg, strategy);
}

/// Resolve one tree bottom-up, without touching other roots.
pub fn resolve_tree(graph: &mut Graph, root: &NodeId, cfg: &LayoutConfig) {
    let strategy = cfg.resolver.strategy(graph.len());
    resolve_below(graph, root, 0, None, cfg, strategy);
}

/// Resolve the root group only.
pub fn resolve_roots(graph: &mut Graph, cfg: &LayoutConfig) -> bool {
    let strategy = cfg.resolver.strategy(graph.len());
    let roots = graph.roots().to_vec();
    resolve_siblings(graph, &roots, None, cfg, strategy)
}

/// Resolve the whole forest: every tree bottom-up, then the roots together.
pub fn resolve_all(graph: &mut Graph, cfg: &LayoutConfig) -> bool {
    let strategy = cfg.resolver.strategy(graph.len());
    let roots = graph.roots().to_vec();
    for root in &roots {
        resolve_below(graph, root, 0, None, cfg, strategy);
    }
    resolve_siblings(graph, &roots, None, cfg, strategy)
}

/// Resolve only the trees in `touched`, then the roots together. A shift at
/// one root can only collide with other roots, never with their interiors.
pub fn resolve_roots_scoped(graph: &mut Graph, touched: &[NodeId], cfg: &LayoutConfig) -> bool {
    let strategy = cfg.resolver.strategy(graph.len());
    let mut done: Vec<&NodeId> = Vec::new();
    for root in touched {
        if done.contains(&root) || !graph.contains(root) {
            continue;
        }
        done.push(root);
        resolve_below(graph, root, 0, None, cfg, strategy);
    }
    let roots = graph.roots().to_vec();
    resolve_siblings(graph, &roots, None, cfg, strategy)
}

/// Resolve part of one tree: the children on `scope.side` of the root (all
/// children when None), down to `scope.max_depth`, then the roots together.
pub fn resolve_scoped(graph: &mut Graph, scope: &ResolveScope, cfg: &LayoutConfig) -> bool {
    let strategy = cfg.resolver.strategy(graph.len());
    let Some(root) = graph.node(&scope.root) else {
        return true;
    };
    let axis = root.center().x;
    let children: Vec<NodeId> = visible_children(graph, root)
        .filter(|c| match (scope.side, graph.node(c)) {
            (Some(side), Some(n)) => Side::of(n.center().x, axis) == side,
            (None, Some(_)) => true,
            (_, None) => false,
        })
        .cloned()
        .collect();

    if !scope.max_depth.is_some_and(|limit| limit < 1) {
        for child in &children {
            resolve_below(graph, child, 1, scope.max_depth, cfg, strategy);
        }
        resolve_siblings(graph, &children, Some(&scope.root), cfg, strategy);
    }
    let roots = graph.roots().to_vec();
    resolve_siblings(graph, &roots, None, cfg, strategy)
}

/// Every overlapping pair within one sibling group; used by diagnostics and tests.
pub fn overlapping_pairs(graph: &Graph, siblings: &[NodeId], cfg: &LayoutConfig) -> Vec<(NodeId, NodeId)> {
    let rects: Vec<(NodeId, Rect)> = siblings
        .iter()
        .filter_map(|id| Some((id.clone(), subtree_rect(graph, id, cfg)?)))
        .collect();
    let mut out = Vec::new();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].1.overlaps(&rects[j].1) {
                out.push((rects[i].0.clone(), rects[j].0.clone()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, Node};

    fn add(g: &mut Graph, id: &str, parent: Option<&str>, x: f64, y: f64) {
        let mut n = Node::new(NodeId::new(id), id, x, y, 100.0, 40.0);
        n.parent_id = parent.map(NodeId::new);
        g.add_node(n, EdgeId::new(format!("e-{id}")));
    }

    fn cfg(resolver: ResolverKind) -> LayoutConfig {
        LayoutConfig { horizontal_spacing: 40.0, vertical_spacing: 20.0, resolver, ..LayoutConfig::default() }
    }

    /// Parent at the origin with three well separated pairs of overlapping
    /// children to its right; `a1` has a child of its own.
    fn crowded() -> Graph {
        let mut g = Graph::new();
        add(&mut g, "p", None, 0.0, 0.0);
        add(&mut g, "a1", Some("p"), 300.0, 0.0);
        add(&mut g, "a2", Some("p"), 300.0, 30.0);
        add(&mut g, "b1", Some("p"), 300.0, 400.0);
        add(&mut g, "b2", Some("p"), 320.0, 420.0);
        add(&mut g, "c1", Some("p"), 300.0, -400.0);
        add(&mut g, "c2", Some("p"), 310.0, -380.0);
        add(&mut g, "a1x", Some("a1"), 500.0, 0.0);
        g
    }

    fn children(g: &Graph, id: &str) -> Vec<NodeId> {
        g.children(&NodeId::new(id)).to_vec()
    }

    #[test]
    fn test_siblings_separate_and_subtrees_move_rigidly() {
        for kind in [ResolverKind::Pairwise, ResolverKind::SpatialIndex] {
            let c = cfg(kind);
            let mut g = crowded();
            let siblings = children(&g, "p");
            let before = g.node(&NodeId::new("a1x")).unwrap().y - g.node(&NodeId::new("a1")).unwrap().y;

            let strategy = kind.strategy(g.len());
            let converged = resolve_siblings(&mut g, &siblings, Some(&NodeId::new("p")), &c, strategy);
            assert!(converged);
            assert!(overlapping_pairs(&g, &siblings, &c).is_empty(), "{kind:?}");

            let after = g.node(&NodeId::new("a1x")).unwrap().y - g.node(&NodeId::new("a1")).unwrap().y;
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_strategies_agree_on_sparse_input() {
        let mut pairwise = crowded();
        let mut spatial = crowded();
        resolve_all(&mut pairwise, &cfg(ResolverKind::Pairwise));
        resolve_all(&mut spatial, &cfg(ResolverKind::SpatialIndex));
        for node in pairwise.nodes() {
            let other = spatial.node(&node.id).unwrap();
            assert_eq!(node.position(), other.position(), "{}", node.id);
        }
    }

    /// `n` children of `p` stacked at x=300, `step` apart vertically, every
    /// other one shifted right by `jitter`.
    fn stack(n: usize, step: f64, jitter: f64) -> Graph {
        let mut g = Graph::new();
        add(&mut g, "p", None, 0.0, 0.0);
        for k in 0..n {
            let x = 300.0 + if k % 2 == 1 { jitter } else { 0.0 };
            add(&mut g, &format!("s{k}"), Some("p"), x, k as f64 * step);
        }
        g
    }

    #[test]
    fn test_strategies_agree_on_dense_stacks() {
        let c = LayoutConfig::default();
        for n in 2..=5 {
            for step in [0.0, 10.0, 20.0, 30.0] {
                for jitter in [0.0, 5.0] {
                    let mut results = Vec::new();
                    for kind in [ResolverKind::Pairwise, ResolverKind::SpatialIndex] {
                        let mut g = stack(n, step, jitter);
                        let siblings = children(&g, "p");
                        let strategy = kind.strategy(g.len());
                        resolve_siblings(&mut g, &siblings, Some(&NodeId::new("p")), &c, strategy);
                        let positions: Vec<_> = g.nodes().map(|node| node.position()).collect();
                        results.push((positions, overlapping_pairs(&g, &siblings, &c).len()));
                    }
                    assert_eq!(results[0], results[1], "n={n} step={step} jitter={jitter}");
                }
            }
        }
    }

    #[test]
    fn test_three_stacked_siblings_fully_separate() {
        let c = LayoutConfig::default();
        for kind in [ResolverKind::Pairwise, ResolverKind::SpatialIndex] {
            let mut g = stack(3, 20.0, 0.0);
            let siblings = children(&g, "p");
            let strategy = kind.strategy(g.len());
            resolve_siblings(&mut g, &siblings, Some(&NodeId::new("p")), &c, strategy);
            assert!(overlapping_pairs(&g, &siblings, &c).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn test_child_pushed_off_parent_rect() {
        let mut g = Graph::new();
        add(&mut g, "p", None, 0.0, 0.0);
        add(&mut g, "c", Some("p"), 60.0, 5.0);
        let c = cfg(ResolverKind::Pairwise);
        resolve_tree(&mut g, &NodeId::new("p"), &c);

        let parent = g.node(&NodeId::new("p")).unwrap().rect();
        let child_bounds = subtree_rect(&g, &NodeId::new("c"), &c).unwrap();
        assert!(!child_bounds.overlaps(&parent));
        assert!(!g.node(&NodeId::new("c")).unwrap().rect().overlaps(&parent));
    }

    #[test]
    fn test_push_is_capped_per_iteration() {
        let mut g = Graph::new();
        g.add_node(Node::new(NodeId::new("a"), "a", 0.0, 0.0, 3000.0, 3000.0), EdgeId::new("unused"));
        g.add_node(Node::new(NodeId::new("b"), "b", 0.0, 0.0, 3000.0, 3000.0), EdgeId::new("unused"));

        let converged = resolve_roots(&mut g, &cfg(ResolverKind::Pairwise));
        assert!(!converged);
        let a = g.node(&NodeId::new("a")).unwrap();
        assert!(a.y.abs() <= MAX_ITERATIONS as f64 * MAX_DISPLACEMENT / 2.0);
        assert!(a.y < 0.0);
    }

    #[test]
    fn test_collapsed_children_are_skipped() {
        let mut g = crowded();
        g.node_mut(&NodeId::new("p")).unwrap().collapsed_right = true;
        let before: Vec<_> = g.nodes().map(|n| n.position()).collect();
        resolve_tree(&mut g, &NodeId::new("p"), &cfg(ResolverKind::Pairwise));
        let after: Vec<_> = g.nodes().map(|n| n.position()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_scoped_resolution_leaves_other_side() {
        let mut g = crowded();
        add(&mut g, "l1", Some("p"), -300.0, 0.0);
        add(&mut g, "l2", Some("p"), -300.0, 10.0);
        let c = cfg(ResolverKind::Pairwise);
        let scope = ResolveScope { root: NodeId::new("p"), side: Some(Side::Right), max_depth: None };
        resolve_scoped(&mut g, &scope, &c);

        assert!(overlapping_pairs(&g, &[NodeId::new("a1"), NodeId::new("a2")], &c).is_empty());
        assert_eq!(overlapping_pairs(&g, &[NodeId::new("l1"), NodeId::new("l2")], &c).len(), 1);
    }

    #[test]
    fn test_auto_picks_strategy_by_size() {
        let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(1_000.0, 0.0, 10.0, 10.0)];
        assert_eq!(ResolverKind::Auto.strategy(10).candidate_pairs(&rects), vec![(0, 1)]);
        assert!(ResolverKind::Auto.strategy(10_000).candidate_pairs(&rects).is_empty());
    }
}
