//! Event scheduling
//!
//! After deduplication every accepted bundle gets a per-category index and a
//! live session. The result is exported as `stream_info.json` in the work
//! root, keyed by bundle id in batch order.

use crate::bundle::Bundle;
use crate::error::Result;
use crate::manifest::{to_pretty_json, Category, EventInfo, OUTPUT_INDENT};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Exported file name
pub const STREAM_INFO_FILE: &str = "stream_info.json";

/// Shuffle `items` and split them into `n` near-equal groups
///
/// The first `len % n` groups receive one extra item. `n == 0` yields no
/// groups.
pub fn random_distribute<T, R: Rng + ?Sized>(mut items: Vec<T>, n: usize, rng: &mut R) -> Vec<Vec<T>> {
    if n == 0 {
        return Vec::new();
    }
    items.shuffle(rng);

    let (q, r) = (items.len() / n, items.len() % n);
    let mut groups = Vec::with_capacity(n);
    let mut rest = items.into_iter();
    for i in 0..n {
        let count = q + usize::from(i < r);
        groups.push(rest.by_ref().take(count).collect());
    }
    groups
}

/// Assign `category_idx` and `live_session` to every bundle
pub fn schedule<R: Rng + ?Sized>(bundles: &mut [Bundle], sessions: usize, rng: &mut R) {
    let mut order: Vec<usize> = (0..bundles.len()).collect();
    order.shuffle(rng);

    let mut counters: BTreeMap<Category, usize> = BTreeMap::new();
    for &i in &order {
        let category = bundles[i].category();
        let counter = counters.entry(category).or_insert(0);
        *counter += 1;

        let event_info = bundles[i].event_info_mut();
        event_info.category = Some(category);
        event_info.category_idx = Some(*counter);
    }

    for (session, group) in random_distribute(order, sessions, rng).into_iter().enumerate() {
        for i in group {
            bundles[i].event_info_mut().live_session = Some(session + 1);
        }
    }

    info!(
        bundles = bundles.len(),
        sessions,
        a = counters.get(&Category::A).copied().unwrap_or(0),
        b = counters.get(&Category::B).copied().unwrap_or(0),
        c = counters.get(&Category::C).copied().unwrap_or(0),
        "Event scheduled"
    );
}

struct StreamInfo<'a>(&'a [Bundle]);

impl Serialize for StreamInfo<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|b| (b.id(), b.event_info())))
    }
}

/// Text of `stream_info.json` for `bundles`
pub fn stream_info_json(bundles: &[Bundle]) -> Result<String> {
    Ok(to_pretty_json(&StreamInfo(bundles), OUTPUT_INDENT)?)
}

/// Write `stream_info.json` into `work_root`
pub fn export_stream_info(bundles: &[Bundle], work_root: &Path) -> Result<PathBuf> {
    let path = work_root.join(STREAM_INFO_FILE);
    fs::write(&path, stream_info_json(bundles)?)?;
    info!(path = %path.display(), entries = bundles.len(), "Stream info exported");
    Ok(path)
}

/// Read back an exported `stream_info.json`
pub fn read_stream_info(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Batch-assigned fields of `event_info` as they appear in the export
pub fn live_label(event_info: &EventInfo) -> String {
    match (event_info.live_session, event_info.live_id()) {
        (Some(session), Some(id)) => format!("session {} / {}", session, id),
        _ => "unscheduled".to_string(),
    }
}
