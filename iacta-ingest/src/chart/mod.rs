//! Chart-note (AFF) model
//!
//! A chart is a block of `Key:Value` headers terminated by `-`, followed by
//! the main timing group's events and any number of
//! `timinggroup(params){ ... };` blocks. Only the events the pipeline
//! inspects are modelled; everything else round-trips as raw text.

mod parser;
mod writer;

pub use parser::parse_chart;
pub use writer::write_chart;

use crate::error::ChartError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Header holding the timing-point density factor
pub const TPDF_HEADER: &str = "TimingPointDensityFactor";

/// Hit-sound value meaning "no custom sound"
pub const NO_HITSOUND: &str = "none";

/// Parsed chart
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Headers in file order
    pub headers: Vec<(String, String)>,
    /// `groups[0]` is the main group; later entries are `timinggroup` blocks
    pub groups: Vec<TimingGroup>,
}

/// A timing group and its events
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingGroup {
    /// Underscore-separated parameter tokens, e.g. `noinput`, `anglex3600`
    pub params: Vec<String>,
    pub events: Vec<Event>,
}

impl TimingGroup {
    /// Whether any parameter token belongs to `name` (`anglex3600` → `anglex`)
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| param_name(p) == name)
    }
}

/// Alphabetic prefix of a group parameter token
pub fn param_name(token: &str) -> &str {
    let end = token
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(token.len());
    &token[..end]
}

/// Chart event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Timing { time: i64, bpm: f64, beats: f64 },
    Tap { time: i64, lane: i32 },
    Hold { start: i64, end: i64, lane: i32 },
    Arc(Arc),
    /// Any other event, kept verbatim without its trailing `;`
    Other(String),
}

impl Event {
    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Timing { .. } => "Timing",
            Event::Tap { .. } => "Tap",
            Event::Hold { .. } => "Hold",
            Event::Arc(_) => "Arc",
            Event::Other(_) => "Other",
        }
    }
}

/// Arc event with optional arctaps
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub start: i64,
    pub end: i64,
    pub x_start: f64,
    pub x_end: f64,
    pub easing: String,
    pub y_start: f64,
    pub y_end: f64,
    pub color: i32,
    pub hitsound: String,
    /// `true` (trace), `false` (solid) or an extended kind such as `designant`
    pub kind: String,
    pub smoothness: Option<f64>,
    pub arctaps: Vec<i64>,
}

impl Arc {
    /// Custom hit-sound filename, if this arc references one
    pub fn custom_hitsound(&self) -> Option<&str> {
        if self.hitsound.is_empty() || self.hitsound == NO_HITSOUND {
            None
        } else {
            Some(&self.hitsound)
        }
    }
}

impl Chart {
    /// Read and parse a chart file
    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let text = std::fs::read_to_string(path)?;
        parse_chart(&text)
    }

    /// Write the chart in canonical form
    pub fn save(&self, path: &Path) -> Result<(), ChartError> {
        std::fs::write(path, write_chart(self))?;
        Ok(())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Timing-point density factor; 1.0 when the header is absent
    pub fn density_factor(&self) -> Result<f64, ChartError> {
        match self.header(TPDF_HEADER) {
            None => Ok(1.0),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ChartError::InvalidHeader {
                    key: TPDF_HEADER.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.groups.iter().flat_map(|g| g.events.iter()).filter_map(|e| match e {
            Event::Arc(arc) => Some(arc),
            _ => None,
        })
    }

    /// Custom hit-sound filenames referenced by arcs, minus `builtin` names
    pub fn custom_hitsounds(&self, builtin: &[String]) -> BTreeSet<String> {
        self.arcs()
            .filter_map(Arc::custom_hitsound)
            .filter(|name| !builtin.iter().any(|b| b == name))
            .map(str::to_string)
            .collect()
    }

    /// Rewrite hit-sound references per `renames` (old → new); returns the count changed
    pub fn rename_hitsounds(&mut self, renames: &BTreeMap<String, String>) -> usize {
        let mut changed = 0;
        for group in &mut self.groups {
            for event in &mut group.events {
                if let Event::Arc(arc) = event {
                    if let Some(new_name) = renames.get(&arc.hitsound) {
                        arc.hitsound = new_name.clone();
                        changed += 1;
                    }
                }
            }
        }
        changed
    }
}
