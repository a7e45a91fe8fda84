//! Stage 3: custom hit-sound samples
//!
//! Samples referenced by arcs are renamed to the canonical `.wav` extension
//! (chart references follow), then resampled and re-encoded as 16-bit WAV.

use super::charts::LoadedCharts;
use super::{not_found, Staged};
use crate::media::audio;
use iacta_common::{ErrorAggregate, Failure, Policy};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Extension every hit-sound sample ends up with
pub const CANONICAL_EXTENSION: &str = "wav";

/// `clap.mp3` → `clap.wav`; `None` if already canonical
pub fn canonical_name(name: &str) -> Option<String> {
    let path = Path::new(name);
    if path.extension().and_then(|e| e.to_str()) == Some(CANONICAL_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_string_lossy();
    Some(format!("{}.{}", stem, CANONICAL_EXTENSION))
}

pub fn run(root: &Path, policy: &Policy, loaded: &mut LoadedCharts) -> Staged<BTreeSet<String>> {
    let mut errors = ErrorAggregate::new();

    let referenced: BTreeSet<String> = loaded
        .charts
        .values()
        .flat_map(|chart| chart.custom_hitsounds(&policy.charts.builtin_hitsounds))
        .collect();

    let mut present = BTreeSet::new();
    for name in referenced {
        let path = root.join(&name);
        if path.is_file() {
            present.insert(name);
        } else {
            errors.add(name, not_found(&path));
        }
    }

    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    let mut hitsounds = BTreeSet::new();
    for name in present {
        let Some(target) = canonical_name(&name) else {
            hitsounds.insert(name);
            continue;
        };

        let dst = root.join(&target);
        if dst.exists() {
            errors.add(
                name,
                Failure::fault("RenameConflict", format!("Failed to rename to {}: already exists", target)),
            );
            continue;
        }

        match fs::rename(root.join(&name), &dst) {
            Ok(()) => {
                debug!(from = %name, to = %target, "Hit-sound renamed");
                renames.insert(name, target.clone());
                hitsounds.insert(target);
            }
            Err(e) => errors.add(name, Failure::fault("Io", e)),
        }
    }

    if !renames.is_empty() {
        for chart in loaded.charts.values_mut() {
            chart.rename_hitsounds(&renames);
        }
    }

    let sampling_rate = policy.hitsounds.sampling_rate;
    let mut normalized = BTreeSet::new();
    for name in hitsounds {
        let path = root.join(&name);
        let result = audio::decode_file(&path)
            .and_then(|pcm| pcm.resampled(sampling_rate))
            .and_then(|pcm| audio::write_wav(&path, &pcm));
        match result {
            Ok(()) => {
                normalized.insert(name);
            }
            Err(e) => errors.add(name, Failure::fault("Media", e)),
        }
    }

    info!(count = normalized.len(), renamed = renames.len(), "Hit-sounds normalized");
    Staged::new(normalized, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("clap.mp3").as_deref(), Some("clap.wav"));
        assert_eq!(canonical_name("clap.ogg").as_deref(), Some("clap.wav"));
        assert_eq!(canonical_name("clap.wav"), None);
        assert_eq!(canonical_name("clap").as_deref(), Some("clap.wav"));
    }
}
