//! Graph model: an id-indexed forest of nodes plus hierarchy and reference edges.

mod model;
mod snapshot;
mod types;
mod update;

pub use model::Graph;
pub use snapshot::GraphSnapshot;
pub use types::*;
pub use update::IdSequence;
