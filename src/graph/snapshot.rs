//! Import/export of the host's `{nodes, edges}` graph.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use super::model::Graph;
use super::types::{Edge, EdgeKind, Node, NodeId};
use super::update::IdSequence;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

impl Graph {
    /// Build a forest from host data, validating ids and parent chains.
    ///
    /// Dangling parent ids become roots. Hierarchy edges that disagree with
    /// `parent_id` are dropped and missing ones are synthesized, so the
    /// result always has exactly one hierarchy edge per non-root node.
    pub fn from_snapshot(snapshot: GraphSnapshot, ids: &mut IdSequence) -> Result<Graph> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        for node in &snapshot.nodes {
            if !seen.insert(node.id.clone()) {
                return Err(Error::DuplicateNode { id: node.id.clone() });
            }
        }

        let mut nodes = snapshot.nodes;
        for node in &mut nodes {
            if let Some(parent) = &node.parent_id {
                if !seen.contains(parent) {
                    warn!("node {} references missing parent {}; treating it as a root", node.id, parent);
                    node.parent_id = None;
                }
            }
        }
        check_acyclic(&nodes)?;

        let mut graph = Graph::new();
        for node in nodes {
            graph.insert_node(node);
        }

        for edge in snapshot.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !graph.contains(endpoint) {
                    return Err(Error::UnknownNode { edge_id: edge.id.0.clone(), id: endpoint.clone() });
                }
            }
            if edge.kind == EdgeKind::Hierarchy && graph.parent(&edge.target) != Some(&edge.source) {
                warn!("dropping hierarchy edge {} that disagrees with parent of {}", edge.id, edge.target);
                continue;
            }
            graph.insert_edge(edge);
        }

        let orphans: Vec<NodeId> = graph
            .nodes()
            .filter(|n| !n.is_root() && graph.hierarchy_edge_of(&n.id).is_none())
            .map(|n| n.id.clone())
            .collect();
        for child in orphans {
            let edge_id = ids.next_edge_id(&graph);
            graph.link_to_parent(&child, edge_id);
        }

        Ok(graph)
    }

    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }
}

fn check_acyclic(nodes: &[Node]) -> Result<()> {
    let parents: std::collections::HashMap<&NodeId, Option<&NodeId>> =
        nodes.iter().map(|n| (&n.id, n.parent_id.as_ref())).collect();
    let mut known_good: HashSet<&NodeId> = HashSet::new();

    for node in nodes {
        let mut path: HashSet<&NodeId> = HashSet::new();
        let mut current = Some(&node.id);
        while let Some(id) = current {
            if known_good.contains(id) {
                break;
            }
            if !path.insert(id) {
                return Err(Error::CyclicParent { id: node.id.clone() });
            }
            current = parents.get(id).copied().flatten();
        }
        known_good.extend(path);
    }
    Ok(())
}
