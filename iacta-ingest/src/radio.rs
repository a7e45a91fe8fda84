//! Radio file collection
//!
//! Gathers every accepted bundle's audio tracks and its largest cover per
//! variant into one flat directory, named after the variant title so the
//! files can be played back during the event:
//! - `<title> <audio name>` (e.g. `Song base.ogg`)
//! - `<title> <key>.jpg` (e.g. `Song base.jpg`, `Other Title 2.jpg`)

use crate::bundle::Bundle;
use crate::media::imaging::pick_largest;
use iacta_common::{AssetKey, ErrorAggregate, Failure};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Title shown for a variant: the difficulty's own title if it has one
pub fn variant_title(bundle: &Bundle, key: AssetKey) -> &str {
    let manifest = bundle.manifest();
    let own = match key {
        AssetKey::Base => None,
        AssetKey::Class(class) => manifest
            .difficulty(class)
            .and_then(|d| d.title_localized.as_ref())
            .map(|t| t.en.as_str()),
    };
    own.unwrap_or(manifest.title_localized.en.as_str())
}

/// Titles become file names; keep them inside the radio directory
fn file_safe(title: &str) -> String {
    title.replace(['/', '\\'], "_")
}

/// Source → destination pairs for one bundle
fn radio_assets(bundle: &Bundle, radio_dir: &Path) -> Vec<(PathBuf, PathBuf)> {
    let root = bundle.root();
    let assets = bundle.assets();
    let mut pairs = Vec::new();

    for (&key, name) in &assets.audio {
        let title = file_safe(variant_title(bundle, key));
        pairs.push((root.join(name), radio_dir.join(format!("{} {}", title, name))));
    }

    for (&key, names) in &assets.covers {
        let candidates: Vec<PathBuf> = names.iter().map(|name| root.join(name)).collect();
        if let Some(largest) = pick_largest(candidates.iter().map(PathBuf::as_path)) {
            let title = file_safe(variant_title(bundle, key));
            pairs.push((largest.to_path_buf(), radio_dir.join(format!("{} {}.jpg", title, key))));
        }
    }
    pairs
}

/// Recreate `radio_dir` and copy the radio files of every bundle into it
pub fn collect_radio_files(bundles: &[Bundle], radio_dir: &Path) -> ErrorAggregate {
    let mut errors = ErrorAggregate::new();

    if radio_dir.exists() {
        if let Err(e) = fs::remove_dir_all(radio_dir) {
            errors.add(radio_dir.display().to_string(), Failure::fault("Io", e));
            return errors;
        }
    }
    if let Err(e) = fs::create_dir_all(radio_dir) {
        errors.add(radio_dir.display().to_string(), Failure::fault("Io", e));
        return errors;
    }

    let mut copied = 0;
    for bundle in bundles {
        for (src, dst) in radio_assets(bundle, radio_dir) {
            match fs::copy(&src, &dst) {
                Ok(_) => {
                    debug!(bundle = %bundle.id(), to = %dst.display(), "Radio file copied");
                    copied += 1;
                }
                Err(e) => errors.add(src.display().to_string(), Failure::fault("Io", e)),
            }
        }
    }

    info!(dir = %radio_dir.display(), files = copied, problems = errors.len(), "Radio files collected");
    errors
}
