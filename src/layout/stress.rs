// Level-by-level bulk construction of large forests.
//
// The shape is planned up front (root count, fanout, total). Each `step` adds
// one depth level, lays every tree out tidily and packs the roots into rows,
// so the host can render between levels. The last step resolves overlaps
// bottom-up per tree and repacks the roots from their final bounding rects.
//
// Tidy layout: every subtree gets a vertical band as tall as its children's
// bands stacked with vertical spacing; a node is centered on its band and its
// children sit one column further out on the node's side.

use log::debug;
use serde::{Deserialize, Serialize};

use super::bounds::subtree_rect;
use super::handles::update_all_handles;
use super::orientation::reorder_all;
use super::overlap::{resolve_roots, resolve_tree};
use super::{LayoutConfig, Side};
use crate::graph::{Graph, IdSequence, Node, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressPlan {
    pub roots: usize,
    /// Children created under every node of the previous level.
    pub fanout: usize,
    /// Total nodes including the roots.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Roots,
    Levels,
    Finish,
    Done,
}

#[derive(Debug, Clone)]
pub struct StressBuilder {
    plan: StressPlan,
    phase: Phase,
    roots: Vec<NodeId>,
    frontier: Vec<NodeId>,
    created: usize,
}

impl StressBuilder {
    pub fn new(plan: StressPlan) -> Self {
        let plan = StressPlan {
            roots: plan.roots.max(1),
            fanout: plan.fanout.max(1),
            total: plan.total,
        };
        Self {
            plan,
            phase: Phase::Roots,
            roots: Vec::new(),
            frontier: Vec::new(),
            created: 0,
        }
    }

    pub fn plan(&self) -> StressPlan {
        self.plan
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Run one construction step. Returns the ids created by this step.
    pub fn step(&mut self, graph: &mut Graph, ids: &mut IdSequence, cfg: &LayoutConfig) -> Vec<NodeId> {
        match self.phase {
            Phase::Roots => {
                let count = self.plan.roots.min(self.plan.total);
                let mut added = Vec::with_capacity(count);
                for _ in 0..count {
                    added.push(self.create(graph, ids, cfg, None, 0.0));
                }
                self.roots = added.clone();
                self.frontier = added.clone();
                self.relayout(graph, cfg);
                self.phase = if self.created >= self.plan.total { Phase::Finish } else { Phase::Levels };
                added
            }
            Phase::Levels => {
                let parents = std::mem::take(&mut self.frontier);
                let mut added = Vec::new();
                'outer: for parent in &parents {
                    let Some(origin) = graph.node(parent).map(|n| n.rect()) else {
                        continue;
                    };
                    let parent_side = graph.side_of(parent);
                    for k in 0..self.plan.fanout {
                        if self.created >= self.plan.total {
                            break 'outer;
                        }
                        // Root children alternate sides; deeper ones follow their parent.
                        let side = parent_side.unwrap_or(if k % 2 == 0 { Side::Right } else { Side::Left });
                        let x = match side {
                            Side::Right => origin.right() + 2.0 * cfg.horizontal_spacing,
                            Side::Left => origin.x - 2.0 * cfg.horizontal_spacing - cfg.default_node_width,
                        };
                        added.push(self.create(graph, ids, cfg, Some(parent), x));
                    }
                }
                if added.is_empty() {
                    self.phase = Phase::Finish;
                    return added;
                }
                self.frontier = added.clone();
                self.relayout(graph, cfg);
                debug!("stress level added {} nodes ({}/{})", added.len(), self.created, self.plan.total);
                if self.created >= self.plan.total {
                    self.phase = Phase::Finish;
                }
                added
            }
            Phase::Finish => {
                for root in &self.roots {
                    resolve_tree(graph, root, cfg);
                }
                pack_roots(graph, &self.roots, cfg);
                let converged = resolve_roots(graph, cfg);
                update_all_handles(graph);
                reorder_all(graph, cfg.orientation_mode);
                debug!("stress build finished with {} nodes, roots converged: {converged}", self.created);
                self.phase = Phase::Done;
                Vec::new()
            }
            Phase::Done => Vec::new(),
        }
    }

    /// Step until done.
    pub fn run(&mut self, graph: &mut Graph, ids: &mut IdSequence, cfg: &LayoutConfig) {
        while !self.is_done() {
            self.step(graph, ids, cfg);
        }
    }

    fn create(
        &mut self,
        graph: &mut Graph,
        ids: &mut IdSequence,
        cfg: &LayoutConfig,
        parent: Option<&NodeId>,
        x: f64,
    ) -> NodeId {
        let id = ids.next_node_id(graph);
        let label = ids.current_label();
        let y = parent.and_then(|p| graph.node(p)).map(|n| n.y).unwrap_or(0.0);
        let mut node = Node::new(id.clone(), label, x, y, cfg.default_node_width, cfg.default_node_height);
        node.parent_id = parent.cloned();
        let edge_id = ids.next_edge_id(graph);
        graph.add_node(node, edge_id);
        self.created += 1;
        id
    }

    fn relayout(&self, graph: &mut Graph, cfg: &LayoutConfig) {
        for root in &self.roots {
            tidy_tree(graph, root, cfg);
        }
        pack_roots(graph, &self.roots, cfg);
        update_all_handles(graph);
    }
}

fn subtree_extent(graph: &Graph, id: &NodeId, cfg: &LayoutConfig) -> f64 {
    let height = graph.node(id).map(|n| n.height).unwrap_or(0.0);
    height.max(group_extent(graph, graph.children(id), cfg)) + cfg.vertical_spacing
}

fn group_extent(graph: &Graph, ids: &[NodeId], cfg: &LayoutConfig) -> f64 {
    if ids.is_empty() {
        return 0.0;
    }
    let stacked: f64 = ids.iter().map(|id| subtree_extent(graph, id, cfg)).sum();
    stacked + cfg.vertical_spacing * (ids.len() - 1) as f64
}

/// Lay out one tree around its root, keeping every child on its current side.
pub fn tidy_tree(graph: &mut Graph, root: &NodeId, cfg: &LayoutConfig) {
    let (right, left): (Vec<NodeId>, Vec<NodeId>) = graph
        .children(root)
        .iter()
        .cloned()
        .partition(|c| graph.side_of(c) != Some(Side::Left));
    place_group(graph, root, &right, Side::Right, cfg);
    place_group(graph, root, &left, Side::Left, cfg);
}

fn place_group(graph: &mut Graph, parent: &NodeId, children: &[NodeId], side: Side, cfg: &LayoutConfig) {
    let Some(parent_rect) = graph.node(parent).map(|n| n.rect()) else {
        return;
    };
    let mut top = parent_rect.center().y - group_extent(graph, children, cfg) / 2.0;
    for child in children {
        let extent = subtree_extent(graph, child, cfg);
        if let Some(node) = graph.node_mut(child) {
            node.x = match side {
                Side::Right => parent_rect.right() + 2.0 * cfg.horizontal_spacing,
                Side::Left => parent_rect.x - 2.0 * cfg.horizontal_spacing - node.width,
            };
            node.y = top + (extent - node.height) / 2.0;
        }
        let grandchildren = graph.children(child).to_vec();
        place_group(graph, child, &grandchildren, side, cfg);
        top += extent + cfg.vertical_spacing;
    }
}

/// Arrange trees in rows of roughly equal count, separated by a wide gap.
fn pack_roots(graph: &mut Graph, roots: &[NodeId], cfg: &LayoutConfig) {
    let gap = 4.0 * cfg.horizontal_spacing.max(cfg.vertical_spacing);
    let per_row = (roots.len() as f64).sqrt().ceil().max(1.0) as usize;
    let (mut cursor_x, mut cursor_y, mut row_height) = (0.0, 0.0, 0.0_f64);

    for (i, root) in roots.iter().enumerate() {
        if i > 0 && i % per_row == 0 {
            cursor_x = 0.0;
            cursor_y += row_height + gap;
            row_height = 0.0;
        }
        let Some(bounds) = subtree_rect(graph, root, cfg) else {
            continue;
        };
        graph.translate_subtree(root, cursor_x - bounds.x, cursor_y - bounds.y);
        cursor_x += bounds.width + gap;
        row_height = row_height.max(bounds.height);
    }
}
