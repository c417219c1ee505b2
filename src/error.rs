//! Errors raised at the host boundary.
//!
//! Layout and interaction operations never fail: a missing id is a no-op.
//! Only decoding host input (snapshots, configuration) can be rejected.

use crate::graph::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("duplicate node id: {id}")]
    DuplicateNode { id: NodeId },

    #[error("parent chain of node {id} forms a cycle")]
    CyclicParent { id: NodeId },

    #[error("edge {edge_id} references unknown node {id}")]
    UnknownNode { edge_id: String, id: NodeId },
}
