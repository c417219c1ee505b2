// Level-of-detail filtering.
//
// Zoom thresholds start at `lod_start_percent` and grow by
// `lod_increment_percent`, one per tree depth. The number of thresholds at or
// below the current zoom is the deepest visible depth; at or beyond the last
// threshold every depth is shown. Nodes cut off by depth (not by a manual
// collapse) are summarized by a badge on their nearest visible ancestor.

use std::collections::HashSet;

use serde::Serialize;

use super::bounds::{subtree_rect, visible_children};
use super::{LayoutConfig, Rect, Side, Viewport};
use crate::graph::{Graph, NodeId};

/// Ascending zoom percentages, `max_depth + 1` entries.
pub fn lod_thresholds(start_percent: f64, increment_percent: f64, max_depth: usize) -> Vec<f64> {
    (0..=max_depth)
        .map(|level| start_percent + level as f64 * increment_percent)
        .collect()
}

/// Deepest visible depth at `zoom_percent`, or None when every depth shows.
pub fn max_visible_depth(thresholds: &[f64], zoom_percent: f64) -> Option<usize> {
    match thresholds.last() {
        None => None,
        Some(last) if zoom_percent >= *last => None,
        Some(_) => Some(thresholds.iter().filter(|t| **t <= zoom_percent).count()),
    }
}

/// Placeholder for children hidden by the depth cut.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LodBadge {
    /// Visible node whose children are hidden.
    pub owner_id: NodeId,
    /// Set for root badges, which are computed per side.
    pub side: Option<Side>,
    /// Union of the hidden children's bounding rects.
    pub anchor_rect: Rect,
    /// Hidden descendants behind this badge.
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodFilter {
    pub max_depth: Option<usize>,
}

impl LodFilter {
    /// A filter that shows every depth.
    pub fn unlimited() -> Self {
        Self { max_depth: None }
    }

    pub fn for_viewport(graph: &Graph, cfg: &LayoutConfig, viewport: &Viewport) -> Self {
        if !cfg.lod_enabled {
            return Self::unlimited();
        }
        let thresholds = lod_thresholds(cfg.lod_start_percent, cfg.lod_increment_percent, graph.max_depth());
        Self { max_depth: max_visible_depth(&thresholds, viewport.zoom_percent()) }
    }

    fn allows(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|limit| depth <= limit)
    }

    /// Nodes neither collapsed away nor cut by depth, parents before children.
    pub fn visible_nodes(&self, graph: &Graph) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = graph.roots().iter().rev().map(|r| (r.clone(), 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if !self.allows(depth) {
                continue;
            }
            let Some(node) = graph.node(&id) else { continue };
            let children: Vec<NodeId> = visible_children(graph, node).cloned().collect();
            out.push(id);
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }

    pub fn visible_set(&self, graph: &Graph) -> HashSet<NodeId> {
        self.visible_nodes(graph).into_iter().collect()
    }

    /// Badges for every visible node at the depth cut that still has
    /// uncollapsed children.
    pub fn badges(&self, graph: &Graph, cfg: &LayoutConfig) -> Vec<LodBadge> {
        let Some(limit) = self.max_depth else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for id in self.visible_nodes(graph) {
            if graph.depth(&id) != Some(limit) {
                continue;
            }
            let Some(node) = graph.node(&id) else { continue };
            if node.is_root() {
                let axis = node.center().x;
                for side in [Side::Left, Side::Right] {
                    let hidden: Vec<NodeId> = visible_children(graph, node)
                        .filter(|c| graph.node(c).is_some_and(|n| Side::of(n.center().x, axis) == side))
                        .cloned()
                        .collect();
                    if let Some(badge) = badge_for(graph, &id, Some(side), &hidden, cfg) {
                        out.push(badge);
                    }
                }
            } else {
                let hidden: Vec<NodeId> = visible_children(graph, node).cloned().collect();
                if let Some(badge) = badge_for(graph, &id, None, &hidden, cfg) {
                    out.push(badge);
                }
            }
        }
        out
    }
}

fn badge_for(graph: &Graph, owner: &NodeId, side: Option<Side>, hidden: &[NodeId], cfg: &LayoutConfig) -> Option<LodBadge> {
    let anchor_rect = hidden
        .iter()
        .filter_map(|c| subtree_rect(graph, c, cfg))
        .reduce(|a, b| a.union(&b))?;
    let count = hidden.iter().map(|c| 1 + graph.descendants(c).len()).sum();
    Some(LodBadge { owner_id: owner.clone(), side, anchor_rect, count })
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

    /// Depth-4 chain on the right of the root plus a depth-2 branch on the left.
    fn deep() -> Graph {
        let mut g = Graph::new();
        add(&mut g, "r", None, 0.0, 0.0);
        add(&mut g, "a", Some("r"), 200.0, 0.0);
        add(&mut g, "b", Some("a"), 400.0, 0.0);
        add(&mut g, "c", Some("b"), 600.0, 0.0);
        add(&mut g, "d", Some("c"), 800.0, 0.0);
        add(&mut g, "l", Some("r"), -200.0, 0.0);
        add(&mut g, "m", Some("l"), -400.0, 0.0);
        g
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(lod_thresholds(10.0, 20.0, 4), vec![10.0, 30.0, 50.0, 70.0, 90.0]);
    }

    #[test]
    fn test_zoom_to_depth() {
        let t = [10.0, 30.0, 50.0, 70.0, 90.0];
        assert_eq!(max_visible_depth(&t, 5.0), Some(0));
        assert_eq!(max_visible_depth(&t, 25.0), Some(1));
        assert_eq!(max_visible_depth(&t, 70.0), Some(4));
        assert_eq!(max_visible_depth(&t, 90.0), None);
        assert_eq!(max_visible_depth(&t, 95.0), None);
        assert_eq!(max_visible_depth(&[], 1.0), None);
    }

    #[test]
    fn test_filter_at_25_percent_shows_two_depths() {
        let g = deep();
        let cfg = LayoutConfig { lod_enabled: true, ..LayoutConfig::default() };
        let filter = LodFilter::for_viewport(&g, &cfg, &Viewport { zoom: 0.25, ..Viewport::default() });
        assert_eq!(filter.max_depth, Some(1));

        let visible = filter.visible_set(&g);
        let mut names: Vec<&str> = visible.iter().map(|id| id.0.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "l", "r"]);

        let all = LodFilter::for_viewport(&g, &cfg, &Viewport { zoom: 0.95, ..Viewport::default() });
        assert_eq!(all.visible_nodes(&g).len(), g.len());
    }

    #[test]
    fn test_disabled_lod_shows_everything() {
        let g = deep();
        let filter = LodFilter::for_viewport(&g, &LayoutConfig::default(), &Viewport { zoom: 0.01, ..Viewport::default() });
        assert_eq!(filter.visible_nodes(&g).len(), g.len());
        assert!(filter.badges(&g, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn test_badges_count_hidden_descendants() {
        let g = deep();
        let cfg = LayoutConfig::default();
        let filter = LodFilter { max_depth: Some(1) };
        let badges = filter.badges(&g, &cfg);
        assert_eq!(badges.len(), 2);

        let a = badges.iter().find(|b| b.owner_id == NodeId::new("a")).unwrap();
        assert_eq!(a.count, 3);
        assert_eq!(a.side, None);
        assert_eq!(a.anchor_rect, subtree_rect(&g, &NodeId::new("b"), &cfg).unwrap());

        let l = badges.iter().find(|b| b.owner_id == NodeId::new("l")).unwrap();
        assert_eq!(l.count, 1);
    }

    #[test]
    fn test_root_badges_per_side() {
        let mut g = deep();
        let cfg = LayoutConfig::default();
        let filter = LodFilter { max_depth: Some(0) };
        let badges = filter.badges(&g, &cfg);
        assert_eq!(badges.len(), 2);
        let right = badges.iter().find(|b| b.side == Some(Side::Right)).unwrap();
        assert_eq!(right.count, 4);
        let left = badges.iter().find(|b| b.side == Some(Side::Left)).unwrap();
        assert_eq!(left.count, 2);

        // A manually collapsed side gets no badge.
        g.node_mut(&NodeId::new("r")).unwrap().collapsed_left = true;
        let badges = filter.badges(&g, &cfg);
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].side, Some(Side::Right));
    }

    #[test]
    fn test_collapsed_node_gets_no_badge() {
        let mut g = deep();
        g.node_mut(&NodeId::new("a")).unwrap().collapsed = true;
        let badges = LodFilter { max_depth: Some(1) }.badges(&g, &LayoutConfig::default());
        assert!(badges.iter().all(|b| b.owner_id != NodeId::new("a")));
    }
}
