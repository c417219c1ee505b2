//! Layout and interaction core for mind maps.
//!
//! The crate keeps a forest of sized nodes, separates overlapping sibling
//! subtrees, orders siblings by their angle around the parent, drives drag
//! and reparent gestures, and projects the visible slice of the forest for a
//! zoom level. Rendering and persistence stay with the host.

pub mod drag;
pub mod engine;
pub mod error;
pub mod graph;
pub mod layout;
pub mod output;
pub mod wasm;

pub use drag::{DragController, DragOutcome, DragPhase};
pub use engine::{ChangeEvent, MindMapEngine};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeId, EdgeKind, Graph, GraphSnapshot, Handle, IdSequence, Node, NodeId};
pub use layout::{LayoutConfig, OrientationMode, Point, Rect, ResolverKind, Side, Viewport};
pub use output::{Projection, VisibleEdge, VisibleNode};
