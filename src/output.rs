//! Output types for the host renderer.
//!
//! A projection is the visible slice of the forest at the current viewport:
//! nodes that are neither collapsed away nor cut by the level-of-detail depth,
//! the edges between them, and badges standing in for hidden subtrees.

use serde::Serialize;

use crate::graph::{EdgeId, EdgeKind, Graph, Handle, NodeId};
use crate::layout::{LayoutConfig, LodBadge, LodFilter};

/// A node ready for the host to display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleNode {
    pub id: NodeId,
    pub label: String,
    pub parent_id: Option<NodeId>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub depth: usize,
    pub order: i64,
    pub collapsed: bool,
    pub collapsed_left: bool,
    pub collapsed_right: bool,
}

/// An edge whose endpoints are both visible
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub kind: EdgeKind,
}

/// The combined output sent to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Engine version this projection was built from.
    pub version: u64,
    pub nodes: Vec<VisibleNode>,
    pub edges: Vec<VisibleEdge>,
    pub badges: Vec<LodBadge>,
    pub potential_parent_id: Option<NodeId>,
    /// Off-screen subtrees should be recomputed after the last drag commit.
    pub refresh_requested: bool,
}

impl Projection {
    pub fn build(graph: &Graph, cfg: &LayoutConfig, filter: LodFilter, version: u64) -> Self {
        let visible = filter.visible_nodes(graph);
        let mut depths = std::collections::HashMap::with_capacity(visible.len());
        let nodes: Vec<VisibleNode> = visible
            .iter()
            .filter_map(|id| {
                let node = graph.node(id)?;
                let depth = match &node.parent_id {
                    Some(p) => depths.get(p).map(|d| d + 1).unwrap_or(0),
                    None => 0,
                };
                depths.insert(id.clone(), depth);
                Some(VisibleNode {
                    id: id.clone(),
                    label: node.label.clone(),
                    parent_id: node.parent_id.clone(),
                    x: node.x,
                    y: node.y,
                    width: node.width,
                    height: node.height,
                    depth,
                    order: node.order,
                    collapsed: node.collapsed,
                    collapsed_left: node.collapsed_left,
                    collapsed_right: node.collapsed_right,
                })
            })
            .collect();

        let edges = graph
            .edges()
            .filter(|e| depths.contains_key(&e.source) && depths.contains_key(&e.target))
            .map(|e| VisibleEdge {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                source_handle: e.source_handle,
                target_handle: e.target_handle,
                kind: e.kind,
            })
            .collect();

        Projection {
            version,
            nodes,
            edges,
            badges: filter.badges(graph, cfg),
            potential_parent_id: None,
            refresh_requested: false,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
