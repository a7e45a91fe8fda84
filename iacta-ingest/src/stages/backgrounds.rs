//! Stage 6: background images

use super::{not_found, Staged};
use crate::manifest::Manifest;
use crate::media::imaging;
use iacta_common::{ErrorAggregate, Failure, Policy};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// Custom background identifiers the bundle must ship
pub fn required_backgrounds(manifest: &Manifest, builtin: &BTreeSet<String>) -> BTreeSet<String> {
    let mut ids: BTreeSet<String> = manifest
        .difficulties
        .iter()
        .filter_map(|d| d.bg.clone())
        .collect();
    if !manifest.difficulties.iter().all(|d| d.bg.is_some()) {
        ids.insert(manifest.bg.clone());
    }
    ids.retain(|id| !id.is_empty() && !builtin.contains(id));
    ids
}

pub fn run(root: &Path, policy: &Policy, manifest: &Manifest) -> Staged<BTreeMap<String, String>> {
    let mut errors = ErrorAggregate::new();
    let mut backgrounds = BTreeMap::new();

    for id in required_backgrounds(manifest, &policy.backgrounds.builtin) {
        let name = format!("{}.jpg", id);
        let path = root.join(&name);
        if !path.is_file() {
            errors.add(name, not_found(&path));
            continue;
        }

        let result = imaging::open_rgb(&path).and_then(|image| {
            let resized = imaging::resize(&image, policy.backgrounds.size);
            imaging::write_jpeg(&path, &resized, policy.backgrounds.jpeg_quality)
        });
        match result {
            Ok(()) => {
                backgrounds.insert(id, name);
            }
            Err(e) => errors.add(name, Failure::fault("Media", e)),
        }
    }

    info!(count = backgrounds.len(), "Backgrounds normalized");
    Staged::new(backgrounds, errors)
}
