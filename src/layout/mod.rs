// Geometry and configuration shared by the layout passes.
//
// Everything here works in canvas coordinates: x grows to the right, y grows
// downwards, and a node's (x, y) is its top-left corner.
//
// Submodules:
// - bounds: recursive subtree bounding rects
// - overlap: sibling overlap resolution (pairwise and R-tree strategies)
// - spatial_index: R-tree candidate pair queries
// - orientation: angular sibling ordering and orientation transitions
// - handles: connector endpoint selection
// - lod: zoom-driven depth filtering and hidden-subtree badges
// - stress: level-by-level bulk construction

use serde::{Deserialize, Serialize};

pub mod bounds;
pub mod handles;
pub mod lod;
pub mod orientation;
pub mod overlap;
pub mod spatial_index;
pub mod stress;

pub use bounds::{BoundingRect, bounding_rect};
pub use handles::{closest_handles, update_branch_handles};
pub use lod::{LodBadge, LodFilter, lod_thresholds, max_visible_depth};
pub use orientation::{OrientationMode, TransitionOp, angle_from, sort_key, transition_ops};
pub use overlap::{ResolveScope, ResolverKind};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 { self.x + self.width }
    pub fn bottom(&self) -> f64 { self.y + self.height }

    pub fn center(&self) -> Point {
        Point { x: self.x + self.width / 2.0, y: self.y + self.height / 2.0 }
    }

    /// Strict intersection: rects that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Penetration depth along each axis. Only meaningful when `overlaps` holds.
    pub fn overlap_depth(&self, other: &Rect) -> (f64, f64) {
        let dx = self.right().min(other.right()) - self.x.max(other.x);
        let dy = self.bottom().min(other.bottom()) - self.y.max(other.y);
        (dx, dy)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect { x: x0, y: y0, width: x1 - x0, height: y1 - y0 }
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    pub fn pad(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x - dx,
            y: self.y - dy,
            width: self.width + 2.0 * dx,
            height: self.height + 2.0 * dy,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect { x: self.x + dx, y: self.y + dy, ..*self }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Which half of a tree a node sits in, relative to the tree's root.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Side of `center_x` relative to the vertical line through `ref_x`.
    /// A center exactly on the line counts as right.
    pub fn of(center_x: f64, ref_x: f64) -> Side {
        if center_x < ref_x { Side::Left } else { Side::Right }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Horizontal separation reserved around every subtree.
    pub horizontal_spacing: f64,
    /// Vertical separation reserved around every subtree.
    pub vertical_spacing: f64,
    pub orientation_mode: OrientationMode,
    pub lod_enabled: bool,
    /// Zoom percentage at which depth 1 becomes visible.
    pub lod_start_percent: f64,
    /// Zoom percentage added per additional depth level.
    pub lod_increment_percent: f64,
    pub resolver: ResolverKind,
    /// Size given to nodes created by the engine until the host measures them.
    pub default_node_width: f64,
    pub default_node_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 40.0,
            vertical_spacing: 20.0,
            orientation_mode: OrientationMode::Clockwise,
            lod_enabled: false,
            lod_start_percent: 10.0,
            lod_increment_percent: 20.0,
            resolver: ResolverKind::Pairwise,
            default_node_width: 160.0,
            default_node_height: 40.0,
        }
    }
}

impl LayoutConfig {
    pub fn default_node_size(&self) -> Size {
        Size { width: self.default_node_width, height: self.default_node_height }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewport {
    /// Zoom factor, 1.0 = 100%.
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, pan_x: 0.0, pan_y: 0.0 }
    }
}

impl Viewport {
    pub fn zoom_percent(&self) -> f64 {
        self.zoom * 100.0
    }
}
