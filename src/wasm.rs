//! WASM bindings for the mindmap-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Structured values cross the boundary as JSON strings; malformed input is
//! reported through `console.error` and leaves the engine unchanged.

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::engine::MindMapEngine;
use crate::error::Result;
use crate::graph::{EdgeId, GraphSnapshot, NodeId};
use crate::layout::stress::StressPlan;
use crate::layout::{LayoutConfig, OrientationMode, Point, Side, Viewport};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        match record.level() {
            Level::Error | Level::Warn => console_error(&line),
            _ => console_log(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Raise console logging to debug level (drag phases, resolver diagnostics).
#[wasm_bindgen]
pub fn set_debug_logging(enabled: bool) {
    log::set_max_level(if enabled { LevelFilter::Debug } else { LevelFilter::Info });
}

fn parse<T: for<'de> Deserialize<'de>>(what: &str, input: &str) -> Option<T> {
    let parsed: Result<T> = serde_json::from_str(input).map_err(Into::into);
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            console_error(&format!("Error parsing {what}: {e}"));
            None
        }
    }
}

fn parse_side(side: &str) -> Option<Side> {
    match side {
        "left" => Some(Side::Left),
        "right" => Some(Side::Right),
        _ => None,
    }
}

#[wasm_bindgen]
pub struct MindMap {
    engine: MindMapEngine,
}

#[wasm_bindgen]
impl MindMap {
    /// Create an engine from a `{nodes, edges}` snapshot and a config, both JSON.
    /// An empty config string uses the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot_json: &str, config_json: &str) -> MindMap {
        let config = if config_json.trim().is_empty() {
            LayoutConfig::default()
        } else {
            parse::<LayoutConfig>("config", config_json).unwrap_or_default()
        };
        let mut engine = MindMapEngine::new(config);
        if !snapshot_json.trim().is_empty() {
            let loaded = GraphSnapshot::from_json(snapshot_json).and_then(|s| engine.load_snapshot(s));
            if let Err(e) = loaded {
                console_error(&format!("Error loading snapshot: {e}"));
            }
        }
        MindMap { engine }
    }

    pub fn load_snapshot(&mut self, snapshot_json: &str) -> bool {
        match GraphSnapshot::from_json(snapshot_json).and_then(|s| self.engine.load_snapshot(s)) {
            Ok(()) => true,
            Err(e) => {
                console_error(&format!("Error loading snapshot: {e}"));
                false
            }
        }
    }

    pub fn export_snapshot(&self) -> String {
        serde_json::to_string(&self.engine.export_snapshot()).unwrap_or_else(|_| String::from("{}"))
    }

    pub fn set_config(&mut self, config_json: &str) -> bool {
        let Some(config) = parse::<LayoutConfig>("config", config_json) else {
            return false;
        };
        self.engine.set_config(config);
        true
    }

    pub fn set_viewport(&mut self, viewport_json: &str) -> bool {
        let Some(viewport) = parse::<Viewport>("viewport", viewport_json) else {
            return false;
        };
        self.engine.set_viewport(viewport);
        true
    }

    pub fn set_orientation(&mut self, mode: &str) -> bool {
        let Some(mode) = parse::<OrientationMode>("orientation mode", &format!("\"{mode}\"")) else {
            return false;
        };
        self.engine.set_orientation(mode);
        true
    }

    pub fn version(&self) -> f64 {
        self.engine.version() as f64
    }

    /// Visible nodes, edges and badges as JSON.
    pub fn projection(&self) -> String {
        self.engine.projection().to_json()
    }

    /// Pending change events as a JSON array; clears the queue.
    pub fn drain_changes(&mut self) -> String {
        serde_json::to_string(&self.engine.drain_changes()).unwrap_or_else(|_| String::from("[]"))
    }

    pub fn take_refresh_request(&mut self) -> bool {
        self.engine.take_refresh_request()
    }

    /// Ids of visible nodes that need measuring, as a JSON array.
    pub fn take_dirty_nodes(&mut self) -> String {
        serde_json::to_string(&self.engine.take_dirty_nodes()).unwrap_or_else(|_| String::from("[]"))
    }

    pub fn add_root(&mut self, x: f64, y: f64) -> String {
        self.engine.add_root(x, y).0
    }

    /// Returns the new id, or an empty string when `parent_id` is unknown.
    /// `side` is "left", "right" or empty.
    pub fn add_child(&mut self, parent_id: &str, side: &str) -> String {
        self.engine
            .add_child(&NodeId::new(parent_id), parse_side(side))
            .map(|id| id.0)
            .unwrap_or_default()
    }

    pub fn add_sibling(&mut self, id: &str) -> String {
        self.engine.add_sibling(&NodeId::new(id)).map(|id| id.0).unwrap_or_default()
    }

    pub fn delete_node(&mut self, id: &str) -> bool {
        self.engine.delete(&NodeId::new(id))
    }

    pub fn detach(&mut self, id: &str) -> bool {
        self.engine.detach(&NodeId::new(id))
    }

    pub fn reparent(&mut self, id: &str, new_parent_id: &str) -> bool {
        self.engine.reparent(&NodeId::new(id), &NodeId::new(new_parent_id))
    }

    pub fn toggle_collapsed(&mut self, id: &str) -> bool {
        self.engine.toggle_collapsed(&NodeId::new(id))
    }

    pub fn toggle_root_side(&mut self, id: &str, side: &str) -> bool {
        match parse_side(side) {
            Some(side) => self.engine.toggle_root_side(&NodeId::new(id), side),
            None => {
                console_error(&format!("Unknown side '{side}'"));
                false
            }
        }
    }

    pub fn set_node_size(&mut self, id: &str, width: f64, height: f64) -> bool {
        self.engine.set_node_size(&NodeId::new(id), width, height)
    }

    pub fn set_label(&mut self, id: &str, label: &str) -> bool {
        self.engine.set_label(&NodeId::new(id), label)
    }

    pub fn add_reference_edge(&mut self, source: &str, target: &str) -> String {
        self.engine
            .add_reference_edge(&NodeId::new(source), &NodeId::new(target))
            .map(|id| id.0)
            .unwrap_or_default()
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        self.engine.delete_edge(&EdgeId::new(id))
    }

    /// `ids_json` is a JSON array of node ids.
    pub fn start_drag(&mut self, ids_json: &str, x: f64, y: f64) -> bool {
        let Some(ids) = parse::<Vec<NodeId>>("drag ids", ids_json) else {
            return false;
        };
        self.engine.start_drag(&ids, Point::new(x, y))
    }

    pub fn drag_to(&mut self, x: f64, y: f64) {
        self.engine.drag_to(Point::new(x, y));
    }

    /// "ignored", "committed" or "reparented".
    pub fn stop_drag(&mut self) -> String {
        use crate::drag::DragOutcome;
        match self.engine.stop_drag() {
            DragOutcome::Ignored => "ignored",
            DragOutcome::Committed { .. } => "committed",
            DragOutcome::Reparented { .. } => "reparented",
        }
        .to_string()
    }

    pub fn cancel_drag(&mut self) {
        self.engine.cancel_drag();
    }

    /// `plan_json` is `{roots, fanout, total}`.
    pub fn start_stress(&mut self, plan_json: &str) -> bool {
        let Some(plan) = parse::<StressPlan>("stress plan", plan_json) else {
            return false;
        };
        self.engine.start_stress(plan);
        true
    }

    /// One level per call; returns true while more steps remain.
    pub fn stress_step(&mut self) -> bool {
        self.engine.stress_step()
    }
}
