//! Stage 1: locate, repair, validate and rewrite the manifest

use super::Staged;
use crate::error::{IngestError, ManifestError};
use crate::manifest::{validate::validate, Manifest};
use iacta_common::config::{ManifestChoice, TrailingComma};
use iacta_common::{ErrorAggregate, Failure, Policy};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Manifest accepted by stage 1
#[derive(Debug, Clone)]
pub struct LocatedManifest {
    /// Filename after normalization
    pub name: String,
    pub manifest: Manifest,
}

/// Label for problems that concern the manifest as a whole
pub const MANIFEST_LABEL: &str = "manifest";

pub fn run(root: &Path, policy: &Policy) -> Result<Staged<Option<LocatedManifest>>, IngestError> {
    let mut errors = ErrorAggregate::new();

    let name = match locate(root, policy, &mut errors)? {
        Some(name) => name,
        None => return Ok(Staged::new(None, errors)),
    };
    debug!(root = %root.display(), manifest = %name, "Manifest located");

    let manifest = match load(&root.join(&name), policy.manifest.trailing_comma) {
        Ok(manifest) => manifest,
        Err(e) => {
            errors.add(name, Failure::fault("InvalidManifest", e));
            return Ok(Staged::new(None, errors));
        }
    };

    errors.merge(validate(&manifest, &policy.manifest, &policy.technical.digest_salts));
    if !errors.is_empty() {
        return Ok(Staged::new(None, errors));
    }

    let normalized = &policy.manifest.normalize_to;
    if let Err(e) = rewrite(root, &name, normalized, &manifest, policy.manifest.trailing_comma) {
        errors.add(normalized.clone(), Failure::fault("Io", e));
        return Ok(Staged::new(None, errors));
    }

    info!(id = %manifest.id, manifest = %normalized, "Manifest accepted");
    Ok(Staged::new(
        Some(LocatedManifest {
            name: normalized.clone(),
            manifest,
        }),
        errors,
    ))
}

/// Pick the manifest file among accepted names present in `root`
fn locate(root: &Path, policy: &Policy, errors: &mut ErrorAggregate) -> Result<Option<String>, IngestError> {
    let accepts = &policy.manifest.accepts;

    let mut found: Vec<String> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if accepts.contains(&name) {
            found.push(name);
        }
    }
    found.sort();

    match found.len() {
        0 => {
            errors.add(
                MANIFEST_LABEL,
                Failure::fault(
                    "MissingManifest",
                    format!("No manifest found in {} (accepted: {})", root.display(), accepts.join(", ")),
                ),
            );
            Ok(None)
        }
        1 => Ok(found.pop()),
        _ => match policy.manifest.choosing {
            ManifestChoice::ByPriority => Ok(accepts.iter().find(|a| found.contains(a)).cloned()),
            ManifestChoice::TakeFirst => Ok(found.into_iter().next()),
            ManifestChoice::Forbid => {
                errors.add(
                    MANIFEST_LABEL,
                    Failure::fault(
                        "AmbiguousManifest",
                        format!("Several manifest files found: {}", found.join(", ")),
                    ),
                );
                Ok(None)
            }
            ManifestChoice::Ask => Err(IngestError::UnresolvedChoice("manifest.choosing")),
        },
    }
}

/// Read, apply the trailing-comma policy, parse
pub fn load(path: &Path, trailing_comma: TrailingComma) -> Result<Manifest, ManifestError> {
    let raw = fs::read_to_string(path)?;
    let text = strip_trailing_comma(raw.trim(), trailing_comma)?;
    Ok(Manifest::from_json(text)?)
}

/// Apply the trailing-comma policy to trimmed manifest text
pub fn strip_trailing_comma(text: &str, policy: TrailingComma) -> Result<&str, ManifestError> {
    match policy {
        TrailingComma::Require => text
            .strip_suffix(',')
            .ok_or(ManifestError::MissingTrailingComma),
        TrailingComma::Allow => Ok(text.strip_suffix(',').unwrap_or(text)),
        // Left in place; the JSON parser rejects it
        TrailingComma::Forbid => Ok(text),
    }
}

/// Canonical on-disk text; re-reading it under the same policy yields the same manifest
pub fn canonical_text(manifest: &Manifest, trailing_comma: TrailingComma) -> serde_json::Result<String> {
    let mut text = manifest.to_canonical_json()?;
    if trailing_comma == TrailingComma::Require {
        text.push(',');
    }
    text.push('\n');
    Ok(text)
}

fn rewrite(
    root: &Path,
    current: &str,
    normalized: &str,
    manifest: &Manifest,
    trailing_comma: TrailingComma,
) -> Result<(), IngestError> {
    let text = canonical_text(manifest, trailing_comma)?;
    fs::write(root.join(normalized), text)?;
    if current != normalized {
        fs::remove_file(root.join(current))?;
        debug!(from = %current, to = %normalized, "Manifest renamed");
    }
    Ok(())
}
