//! Stage 4: cover images

use super::{asset_keys, Staged};
use crate::manifest::Manifest;
use crate::media::imaging;
use iacta_common::{AssetKey, ErrorAggregate, Failure, Policy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn label(key: AssetKey) -> String {
    format!("covers for {}", key.name())
}

pub fn run(root: &Path, policy: &Policy, manifest: &Manifest) -> Staged<BTreeMap<AssetKey, Vec<String>>> {
    let mut errors = ErrorAggregate::new();
    let mut covers = BTreeMap::new();

    for key in asset_keys(manifest, |d| d.overrides_jacket()) {
        match normalize_key(root, policy, key, &mut errors) {
            Ok(names) => {
                covers.insert(key, names);
            }
            Err(failure) => errors.add(label(key), failure),
        }
    }

    info!(keys = covers.len(), "Covers normalized");
    Staged::new(covers, errors)
}

/// Normalize one key's cover; per-output failures go to `errors`,
/// a failure for the key as a whole is returned
fn normalize_key(
    root: &Path,
    policy: &Policy,
    key: AssetKey,
    errors: &mut ErrorAggregate,
) -> Result<Vec<String>, Failure> {
    let mut tried = Vec::new();
    let mut candidates: Vec<PathBuf> = Vec::new();
    for template in &policy.covers.accepts {
        let name = template
            .build_simple(key)
            .map_err(|e| Failure::fault("Template", e))?;
        let path = root.join(&name);
        if path.is_file() && !candidates.contains(&path) {
            candidates.push(path);
        }
        tried.push(name);
    }

    if candidates.is_empty() {
        return Err(Failure::fault(
            "PathNotFound",
            format!("None of these exist: {}", tried.join(", ")),
        ));
    }

    let source = imaging::pick_largest(candidates.iter().map(PathBuf::as_path))
        .ok_or_else(|| Failure::from("No valid cover image found"))?;
    let image = imaging::open_rgb(source).map_err(|_| Failure::from("No valid cover image found"))?;
    debug!(key = %key, source = %source.display(), "Cover source picked");

    let mut names = Vec::new();
    for target in &policy.covers.normalize_to {
        let name = match target.template.build_simple(key) {
            Ok(name) => name,
            Err(e) => {
                errors.add(target.template.as_str().to_string(), Failure::fault("Template", e));
                continue;
            }
        };
        let resized = imaging::resize(&image, target.size);
        match imaging::write_jpeg(&root.join(&name), &resized, policy.covers.jpeg_quality) {
            Ok(()) => names.push(name),
            Err(e) => errors.add(name, Failure::fault("Media", e)),
        }
    }

    if names.is_empty() {
        return Err(Failure::from("No normalized cover image saved"));
    }
    Ok(names)
}
