//! The host-facing engine.
//!
//! `MindMapEngine` owns the forest, the layout configuration, the viewport and
//! the drag controller. Every mutation bumps `version` and appends change
//! events that the host drains to decide what to persist.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::drag::{self, DragController, DragOutcome, DragPhase};
use crate::error::Result;
use crate::graph::{EdgeId, Graph, GraphSnapshot, IdSequence, Node, NodeId};
use crate::layout::handles::{update_all_handles, update_branch_handles};
use crate::layout::orientation::{apply_transition, reorder_all, reorder_siblings};
use crate::layout::overlap::{resolve_all, resolve_roots_scoped};
use crate::layout::stress::{StressBuilder, StressPlan};
use crate::layout::{LayoutConfig, LodFilter, OrientationMode, Point, Side, Viewport, bounding_rect};
use crate::output::Projection;

/// Structural change reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChangeEvent {
    NodeAdded { id: NodeId },
    /// Label, size or collapse state changed.
    NodeUpdated { id: NodeId },
    NodesMoved { ids: Vec<NodeId> },
    NodeReparented {
        id: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    },
    SiblingsReordered {
        parent: Option<NodeId>,
        order: Vec<NodeId>,
    },
    NodesDeleted { ids: Vec<NodeId> },
    EdgeAdded { id: EdgeId },
    EdgeDeleted { id: EdgeId },
}

#[derive(Debug, Clone)]
pub struct MindMapEngine {
    graph: Graph,
    config: LayoutConfig,
    viewport: Viewport,
    drag: DragController,
    ids: IdSequence,
    changes: Vec<ChangeEvent>,
    version: u64,
    drag_origin: HashMap<NodeId, Point>,
    stress: Option<StressBuilder>,
}

impl Default for MindMapEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl MindMapEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            graph: Graph::new(),
            config,
            viewport: Viewport::default(),
            drag: DragController::new(),
            ids: IdSequence::new(),
            changes: Vec::new(),
            version: 0,
            drag_origin: HashMap::new(),
            stress: None,
        }
    }

    pub fn from_snapshot(snapshot: GraphSnapshot, config: LayoutConfig) -> Result<Self> {
        let mut engine = Self::new(config);
        engine.load_snapshot(snapshot)?;
        Ok(engine)
    }

    /// Replace the forest. On error the current forest is kept.
    pub fn load_snapshot(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        let mut ids = IdSequence::new();
        let graph = Graph::from_snapshot(snapshot, &mut ids)?;
        debug!("loaded snapshot with {} nodes and {} edges", graph.len(), graph.edges().count());
        self.graph = graph;
        self.ids = ids;
        self.drag.cancel();
        self.drag_origin.clear();
        self.stress = None;
        self.changes.clear();
        self.bump();
        Ok(())
    }

    pub fn export_snapshot(&self) -> GraphSnapshot {
        self.graph.to_snapshot()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    /// Replace the configuration. A new orientation mode goes through the
    /// orientation transition.
    pub fn set_config(&mut self, config: LayoutConfig) {
        let mode = config.orientation_mode;
        self.config = LayoutConfig { orientation_mode: self.config.orientation_mode, ..config };
        self.set_orientation(mode);
        self.bump();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.bump();
    }

    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }

    pub fn lod_filter(&self) -> LodFilter {
        LodFilter::for_viewport(&self.graph, &self.config, &self.viewport)
    }

    pub fn projection(&self) -> Projection {
        let mut projection = Projection::build(&self.graph, &self.config, self.lod_filter(), self.version);
        projection.potential_parent_id = self.drag.potential_parent().cloned();
        projection.refresh_requested = self.drag.refresh_requested();
        projection
    }

    /// Acknowledge a refresh request from the last drag commit.
    pub fn take_refresh_request(&mut self) -> bool {
        self.drag.take_refresh_request()
    }

    /// Visible nodes that need measuring at the current zoom. They are marked
    /// as measured.
    pub fn take_dirty_nodes(&mut self) -> Vec<NodeId> {
        let zoom = self.viewport.zoom;
        let mut dirty = Vec::new();
        for id in self.lod_filter().visible_nodes(&self.graph) {
            let Some(node) = self.graph.node_mut(&id) else { continue };
            if node.is_dirty || node.last_calculated_zoom != Some(zoom) {
                node.is_dirty = false;
                node.last_calculated_zoom = Some(zoom);
                dirty.push(id);
            }
        }
        dirty
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    fn positions(&self) -> HashMap<NodeId, Point> {
        self.graph.nodes().map(|n| (n.id.clone(), n.position())).collect()
    }

    fn record_moves(&mut self, before: &HashMap<NodeId, Point>) {
        let ids: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|n| before.get(&n.id).is_some_and(|p| *p != n.position()))
            .map(|n| n.id.clone())
            .collect();
        if !ids.is_empty() {
            self.changes.push(ChangeEvent::NodesMoved { ids });
        }
    }

    fn record_reorders(&mut self, groups: Vec<(Option<NodeId>, Vec<NodeId>)>) {
        for (parent, order) in groups {
            self.changes.push(ChangeEvent::SiblingsReordered { parent, order });
        }
    }

    fn reorder_group(&mut self, parent: Option<&NodeId>) {
        if let Some(order) = reorder_siblings(&mut self.graph, parent, self.config.orientation_mode) {
            self.changes.push(ChangeEvent::SiblingsReordered { parent: parent.cloned(), order });
        }
    }

    fn insert_node(&mut self, parent: Option<&NodeId>, x: f64, y: f64) -> NodeId {
        let id = self.ids.next_node_id(&self.graph);
        let label = self.ids.current_label();
        let size = self.config.default_node_size();
        let mut node = Node::new(id.clone(), label, x, y, size.width, size.height);
        node.parent_id = parent.cloned();
        let edge_id = self.ids.next_edge_id(&self.graph);
        self.graph.add_node(node, edge_id);

        self.changes.push(ChangeEvent::NodeAdded { id: id.clone() });
        if let Some(edge) = self.graph.hierarchy_edge_id_of(&id) {
            self.changes.push(ChangeEvent::EdgeAdded { id: edge.clone() });
        }
        id
    }

    /// Add a new tree whose root sits at `(x, y)`.
    pub fn add_root(&mut self, x: f64, y: f64) -> NodeId {
        let before = self.positions();
        let id = self.insert_node(None, x, y);
        resolve_roots_scoped(&mut self.graph, std::slice::from_ref(&id), &self.config);
        self.reorder_group(None);
        self.record_moves(&before);
        self.bump();
        id
    }

    /// Add a child under `parent`. `side` picks the half of a root's tree and
    /// is ignored for non-root parents, whose children follow their side.
    /// The child goes below the lowest existing child on that side, or level
    /// with the parent when it is the first.
    pub fn add_child(&mut self, parent: &NodeId, side: Option<Side>) -> Option<NodeId> {
        let parent_node = self.graph.node(parent)?;
        let parent_rect = parent_node.rect();
        let side = match parent_node.is_root() {
            true => side.unwrap_or(Side::Right),
            false => self.graph.side_of(parent).unwrap_or(Side::Right),
        };
        let axis = parent_rect.center().x;
        let lowest = self
            .graph
            .children(parent)
            .iter()
            .filter_map(|c| self.graph.node(c))
            .filter(|c| Side::of(c.center().x, axis) == side)
            .map(|c| c.rect().bottom())
            .reduce(f64::max);

        let before = self.positions();
        if let Some(p) = self.graph.node_mut(parent) {
            let flag = match (p.is_root(), side) {
                (true, Side::Left) => &mut p.collapsed_left,
                (true, Side::Right) => &mut p.collapsed_right,
                (false, _) => &mut p.collapsed,
            };
            if std::mem::take(flag) {
                self.changes.push(ChangeEvent::NodeUpdated { id: parent.clone() });
            }
        }

        let size = self.config.default_node_size();
        let x = match side {
            Side::Right => parent_rect.right() + self.config.horizontal_spacing,
            Side::Left => parent_rect.x - self.config.horizontal_spacing - size.width,
        };
        let y = match lowest {
            Some(bottom) => bottom + self.config.vertical_spacing,
            None => parent_rect.center().y - size.height / 2.0,
        };
        let id = self.insert_node(Some(parent), x, y);

        if let Some(root) = self.graph.root_of(parent) {
            resolve_roots_scoped(&mut self.graph, std::slice::from_ref(&root), &self.config);
            update_branch_handles(&mut self.graph, &root);
        }
        self.reorder_group(Some(parent));
        self.record_moves(&before);
        self.bump();
        Some(id)
    }

    /// Add a node next to `id`: under the same parent on the same side, or a
    /// new root below `id`'s tree when `id` is a root.
    pub fn add_sibling(&mut self, id: &NodeId) -> Option<NodeId> {
        let node = self.graph.node(id)?;
        match node.parent_id.clone() {
            Some(parent) => {
                let side = self.graph.side_of(id);
                self.add_child(&parent, side)
            }
            None => {
                let x = node.x;
                let bounds = bounding_rect(&self.graph, id, &self.config)?;
                let y = bounds.y + bounds.height + self.config.vertical_spacing;
                Some(self.add_root(x, y))
            }
        }
    }

    /// Delete `id` with its whole subtree and every edge touching it.
    pub fn delete(&mut self, id: &NodeId) -> bool {
        if !self.graph.contains(id) {
            return false;
        }
        if self.drag.dragged().iter().any(|d| d == id || self.graph.is_descendant_of(d, id)) {
            self.drag.cancel();
        }
        let parent = self.graph.parent(id).cloned();
        let (nodes, edges) = self.graph.delete_subtree(id);
        debug!("deleted {} nodes and {} edges under {id}", nodes.len(), edges.len());
        self.changes.push(ChangeEvent::NodesDeleted { ids: nodes });
        for edge in edges {
            self.changes.push(ChangeEvent::EdgeDeleted { id: edge });
        }
        self.reorder_group(parent.as_ref());
        self.bump();
        true
    }

    /// Turn `id` into the root of its own tree, in place.
    pub fn detach(&mut self, id: &NodeId) -> bool {
        let Some(old_root) = self.graph.root_of(id) else {
            return false;
        };
        let old_edge = self.graph.hierarchy_edge_id_of(id).cloned();
        let before = self.positions();
        let Some(old_parent) = self.graph.detach(id) else {
            return false;
        };
        if let Some(edge) = old_edge {
            self.changes.push(ChangeEvent::EdgeDeleted { id: edge });
        }
        self.changes.push(ChangeEvent::NodeReparented {
            id: id.clone(),
            old_parent: Some(old_parent.clone()),
            new_parent: None,
        });
        resolve_roots_scoped(&mut self.graph, &[old_root, id.clone()], &self.config);
        update_branch_handles(&mut self.graph, id);
        self.reorder_group(Some(&old_parent));
        self.reorder_group(None);
        self.record_moves(&before);
        self.bump();
        true
    }

    /// Move `id` under `new_parent` as if dropped onto it.
    pub fn reparent(&mut self, id: &NodeId, new_parent: &NodeId) -> bool {
        let old_edge = self.graph.hierarchy_edge_id_of(id).cloned();
        let before = self.positions();
        let Some(outcome) = drag::reparent(&mut self.graph, &mut self.ids, id, new_parent, &self.config) else {
            return false;
        };
        self.record_outcome(outcome, old_edge);
        self.record_moves(&before);
        self.bump();
        true
    }

    fn record_outcome(&mut self, outcome: DragOutcome, old_edge: Option<EdgeId>) {
        match outcome {
            DragOutcome::Ignored => {}
            DragOutcome::Committed { reordered, .. } => self.record_reorders(reordered),
            DragOutcome::Reparented { node, old_parent, new_parent, reordered } => {
                if let Some(edge) = old_edge {
                    self.changes.push(ChangeEvent::EdgeDeleted { id: edge });
                }
                if let Some(edge) = self.graph.hierarchy_edge_id_of(&node) {
                    self.changes.push(ChangeEvent::EdgeAdded { id: edge.clone() });
                }
                self.changes.push(ChangeEvent::NodeReparented {
                    id: node,
                    old_parent,
                    new_parent: Some(new_parent),
                });
                self.record_reorders(reordered);
            }
        }
    }

    /// Flip the collapse state of a non-root node. Positions are untouched.
    pub fn toggle_collapsed(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        if node.is_root() {
            return false;
        }
        node.collapsed = !node.collapsed;
        self.changes.push(ChangeEvent::NodeUpdated { id: id.clone() });
        self.bump();
        true
    }

    /// Flip the collapse state of one side of a root. Positions are untouched.
    pub fn toggle_root_side(&mut self, id: &NodeId, side: Side) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        if !node.is_root() {
            return false;
        }
        let flag = match side {
            Side::Left => &mut node.collapsed_left,
            Side::Right => &mut node.collapsed_right,
        };
        *flag = !*flag;
        self.changes.push(ChangeEvent::NodeUpdated { id: id.clone() });
        self.bump();
        true
    }

    /// Switch orientation mode, rearranging every tree so that sibling
    /// sequences read the same under the new mode.
    pub fn set_orientation(&mut self, mode: OrientationMode) {
        let from = self.config.orientation_mode;
        if from == mode {
            return;
        }
        let before = self.positions();
        apply_transition(&mut self.graph, from, mode);
        self.config.orientation_mode = mode;
        update_all_handles(&mut self.graph);
        resolve_all(&mut self.graph, &self.config);
        let reordered = reorder_all(&mut self.graph, mode);
        self.record_reorders(reordered);
        self.record_moves(&before);
        debug!("orientation {from:?} -> {mode:?}");
        self.bump();
    }

    /// Apply a measured size from the host and make room for it.
    pub fn set_node_size(&mut self, id: &NodeId, width: f64, height: f64) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        if node.width == width && node.height == height {
            return false;
        }
        node.width = width;
        node.height = height;
        let before = self.positions();
        if let Some(root) = self.graph.root_of(id) {
            resolve_roots_scoped(&mut self.graph, std::slice::from_ref(&root), &self.config);
            update_branch_handles(&mut self.graph, &root);
        }
        self.changes.push(ChangeEvent::NodeUpdated { id: id.clone() });
        self.record_moves(&before);
        self.bump();
        true
    }

    /// Rename a node; it needs measuring again.
    pub fn set_label(&mut self, id: &NodeId, label: impl Into<String>) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        node.label = label.into();
        node.is_dirty = true;
        self.changes.push(ChangeEvent::NodeUpdated { id: id.clone() });
        self.bump();
        true
    }

    pub fn add_reference_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<EdgeId> {
        let edge_id = self.ids.next_edge_id(&self.graph);
        if !self.graph.add_reference_edge(source, target, edge_id.clone()) {
            return None;
        }
        self.changes.push(ChangeEvent::EdgeAdded { id: edge_id.clone() });
        self.bump();
        Some(edge_id)
    }

    /// Delete a reference edge. Hierarchy edges go away with their child only.
    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        if self.graph.delete_edge(id).is_none() {
            return false;
        }
        self.changes.push(ChangeEvent::EdgeDeleted { id: id.clone() });
        self.bump();
        true
    }

    pub fn start_drag(&mut self, ids: &[NodeId], pointer: Point) -> bool {
        let origin = self.positions();
        if !self.drag.start(&self.graph, ids, pointer) {
            return false;
        }
        self.drag_origin = origin;
        self.bump();
        true
    }

    pub fn drag_to(&mut self, pointer: Point) {
        if self.drag.move_to(&mut self.graph, pointer).is_empty() && !self.drag.is_active() {
            return;
        }
        self.bump();
    }

    pub fn stop_drag(&mut self) -> DragOutcome {
        let old_edge = match self.drag.dragged().as_slice() {
            [single] => self.graph.hierarchy_edge_id_of(single).cloned(),
            _ => None,
        };
        let lod = self.lod_filter();
        let outcome = self.drag.stop(&mut self.graph, &mut self.ids, &self.config, lod);
        if outcome == DragOutcome::Ignored {
            return outcome;
        }
        self.record_outcome(outcome.clone(), old_edge);
        let origin = std::mem::take(&mut self.drag_origin);
        self.record_moves(&origin);
        self.bump();
        outcome
    }

    /// Abandon the drag. Nodes stay where the pointer left them.
    pub fn cancel_drag(&mut self) {
        if !self.drag.is_active() {
            return;
        }
        self.drag.cancel();
        self.drag_origin.clear();
        self.bump();
    }

    /// Begin building a planned forest one level per `stress_step`.
    pub fn start_stress(&mut self, plan: StressPlan) {
        self.stress = Some(StressBuilder::new(plan));
    }

    /// Run one construction step. Returns true while more steps remain.
    pub fn stress_step(&mut self) -> bool {
        let before = self.positions();
        let Some(builder) = self.stress.as_mut() else {
            return false;
        };
        let added = builder.step(&mut self.graph, &mut self.ids, &self.config);
        let done = builder.is_done();
        for id in added {
            let edge = self.graph.hierarchy_edge_id_of(&id).cloned();
            self.changes.push(ChangeEvent::NodeAdded { id });
            if let Some(edge) = edge {
                self.changes.push(ChangeEvent::EdgeAdded { id: edge });
            }
        }
        if done {
            self.stress = None;
        }
        self.record_moves(&before);
        self.bump();
        !done
    }
}
