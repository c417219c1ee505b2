use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::layout::{Point, Rect};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }
}

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Hides all children. Ignored on roots, which collapse per side.
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub collapsed_left: bool,
    #[serde(default)]
    pub collapsed_right: bool,
    /// Persisted rank among siblings.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default)]
    pub last_calculated_zoom: Option<f64>,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            label: label.into(),
            parent_id: None,
            x,
            y,
            width,
            height,
            collapsed: false,
            collapsed_left: false,
            collapsed_right: false,
            order: 0,
            is_dirty: true,
            last_calculated_zoom: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    pub fn position(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    /// Move so that the node's center lands on `center`.
    pub fn set_center(&mut self, center: Point) {
        self.x = center.x - self.width / 2.0;
        self.y = center.y - self.height / 2.0;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Hierarchy,
    Reference,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandleSide {
    fn as_str(self) -> &'static str {
        match self {
            HandleSide::Top => "top",
            HandleSide::Right => "right",
            HandleSide::Bottom => "bottom",
            HandleSide::Left => "left",
        }
    }
}

/// Bi-directional connector points carry a role suffix (`right-source`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HandleRole {
    Source,
    Target,
}

/// A connector endpoint: one of the four sides, optionally with a role suffix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub side: HandleSide,
    pub role: Option<HandleRole>,
}

impl Handle {
    pub fn plain(side: HandleSide) -> Self {
        Self { side, role: None }
    }

    pub fn source(side: HandleSide) -> Self {
        Self { side, role: Some(HandleRole::Source) }
    }

    pub fn target(side: HandleSide) -> Self {
        Self { side, role: Some(HandleRole::Target) }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.side.as_str())?;
        match self.role {
            Some(HandleRole::Source) => f.write_str("-source"),
            Some(HandleRole::Target) => f.write_str("-target"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidHandle(pub String);

impl fmt::Display for InvalidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid handle '{}'", self.0)
    }
}

impl FromStr for Handle {
    type Err = InvalidHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, role) = match s.split_once('-') {
            Some((side, "source")) => (side, Some(HandleRole::Source)),
            Some((side, "target")) => (side, Some(HandleRole::Target)),
            Some(_) => return Err(InvalidHandle(s.to_string())),
            None => (s, None),
        };
        let side = match side {
            "top" => HandleSide::Top,
            "right" => HandleSide::Right,
            "bottom" => HandleSide::Bottom,
            "left" => HandleSide::Left,
            _ => return Err(InvalidHandle(s.to_string())),
        };
        Ok(Handle { side, role })
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub kind: EdgeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_parse_and_display() {
        let h: Handle = "right-source".parse().unwrap();
        assert_eq!(h, Handle::source(HandleSide::Right));
        assert_eq!(h.to_string(), "right-source");

        let plain: Handle = "top".parse().unwrap();
        assert_eq!(plain, Handle::plain(HandleSide::Top));

        assert!("middle".parse::<Handle>().is_err());
        assert!("left-both".parse::<Handle>().is_err());
    }

    #[test]
    fn test_edge_json_shape() {
        let edge = Edge {
            id: EdgeId::new("e1"),
            source: NodeId::new("a"),
            target: NodeId::new("b"),
            source_handle: Handle::source(HandleSide::Bottom),
            target_handle: Handle::target(HandleSide::Top),
            kind: EdgeKind::Hierarchy,
        };
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["sourceHandle"], "bottom-source");
        assert_eq!(json["targetHandle"], "top-target");
        assert_eq!(json["kind"], "hierarchy");
    }
}
