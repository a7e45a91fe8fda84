//! Bundle ingestion
//!
//! [`ingest_bundle`] drives one bundle directory through the seven stages in
//! order. Problems are accumulated; the bundle is rejected at the first
//! checkpoint that finds any:
//! - after the manifest stage (later stages need a manifest)
//! - after the backgrounds stage (cleanup never runs on a rejected bundle)
//! - after cleanup

use crate::error::{IngestError, Result};
use crate::manifest::{Category, EventInfo, Manifest};
use crate::stages::{self, audio::AudioAssets, Staged};
use iacta_common::{AssetKey, ErrorAggregate, Policy, RatingClass};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Filenames of every asset kept in a bundle root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetNames {
    pub manifest: String,
    pub charts: BTreeMap<RatingClass, String>,
    pub hitsounds: BTreeSet<String>,
    pub audio: BTreeMap<AssetKey, String>,
    pub previews: BTreeMap<AssetKey, String>,
    pub covers: BTreeMap<AssetKey, Vec<String>>,
    pub backgrounds: BTreeMap<String, String>,
}

impl AssetNames {
    /// Every kept filename
    pub fn all(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        names.insert(self.manifest.clone());
        names.extend(self.charts.values().cloned());
        names.extend(self.hitsounds.iter().cloned());
        names.extend(self.audio.values().cloned());
        names.extend(self.previews.values().cloned());
        names.extend(self.covers.values().flatten().cloned());
        names.extend(self.backgrounds.values().cloned());
        names
    }
}

/// Accepted, normalized bundle
#[derive(Debug, Clone)]
pub struct Bundle {
    id: String,
    root: PathBuf,
    manifest: Manifest,
    assets: AssetNames,
    id_reassigned: bool,
    root_reassigned: bool,
}

impl Bundle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn assets(&self) -> &AssetNames {
        &self.assets
    }

    pub fn event_info(&self) -> &EventInfo {
        &self.manifest.event_info
    }

    pub(crate) fn event_info_mut(&mut self) -> &mut EventInfo {
        &mut self.manifest.event_info
    }

    pub fn is_bonus(&self) -> bool {
        self.manifest.event_info.is_bonus
    }

    /// Category derived at acceptance
    pub fn category(&self) -> Category {
        self.manifest
            .event_info
            .category
            .unwrap_or_else(|| Category::derive(&self.manifest.event_info))
    }

    /// Replace the identifier; allowed once
    pub fn reassign_id(&mut self, new_id: impl Into<String>) -> Result<()> {
        let new_id = new_id.into();
        if new_id == self.id {
            return Ok(());
        }
        if self.id_reassigned {
            return Err(IngestError::IdentityLocked(self.id.clone()));
        }
        info!(from = %self.id, to = %new_id, "Bundle id reassigned");
        self.manifest.id = new_id.clone();
        self.id = new_id;
        self.id_reassigned = true;
        Ok(())
    }

    /// Rename the root directory to `name` within its parent; allowed once
    pub fn reset_root(&mut self, name: &str) -> Result<()> {
        if self.root.file_name() == Some(OsStr::new(name)) {
            return Ok(());
        }
        if self.root_reassigned {
            return Err(IngestError::IdentityLocked(self.id.clone()));
        }
        self.move_root(name)?;
        self.root_reassigned = true;
        Ok(())
    }

    /// Move the root aside under a temporary name before the final rename
    pub(crate) fn park_root(&mut self, temp_name: &str) -> Result<()> {
        if self.root_reassigned {
            return Err(IngestError::IdentityLocked(self.id.clone()));
        }
        self.move_root(temp_name)
    }

    fn move_root(&mut self, name: &str) -> Result<()> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain {
            return Err(IngestError::InvalidRootName(name.to_string()));
        }

        let parent = self.root.parent().unwrap_or_else(|| Path::new(""));
        let new_root = parent.join(name);
        if new_root.exists() {
            return Err(IngestError::RootTaken(new_root));
        }
        fs::rename(&self.root, &new_root)?;
        info!(from = %self.root.display(), to = %new_root.display(), "Bundle root renamed");
        self.root = new_root;
        Ok(())
    }
}

fn reject(root: &Path, errors: ErrorAggregate) -> IngestError {
    warn!(root = %root.display(), problems = errors.len(), "Bundle rejected");
    IngestError::BadBundle {
        root: root.to_path_buf(),
        errors,
    }
}

/// Validate and normalize the bundle at `root` in place
pub fn ingest_bundle(root: &Path, policy: &Policy) -> Result<Bundle> {
    info!(root = %root.display(), "Ingesting bundle");
    let mut errors = ErrorAggregate::new();

    let located = stages::manifest::run(root, policy)?.merge_into(&mut errors);
    let located = match located {
        Some(located) if errors.is_empty() => located,
        _ => return Err(reject(root, errors)),
    };
    let mut manifest = located.manifest;

    let mut loaded = stages::charts::run(root, policy, &manifest).merge_into(&mut errors);
    let hitsounds = stages::hitsounds::run(root, policy, &mut loaded).merge_into(&mut errors);
    let charts = stages::charts::persist(root, loaded).merge_into(&mut errors);

    let covers = stages::covers::run(root, policy, &manifest).merge_into(&mut errors);
    let AudioAssets { tracks, previews } = stages::audio::run(root, policy, &manifest).merge_into(&mut errors);
    let backgrounds = stages::backgrounds::run(root, policy, &manifest).merge_into(&mut errors);

    if !errors.is_empty() {
        return Err(reject(root, errors));
    }

    let assets = AssetNames {
        manifest: located.name,
        charts,
        hitsounds,
        audio: tracks,
        previews,
        covers,
        backgrounds,
    };

    let Staged { value: removed, errors: cleanup_errors } = stages::cleanup::run(root, &assets.all());
    errors.merge(cleanup_errors);
    if !errors.is_empty() {
        return Err(reject(root, errors));
    }

    manifest.event_info.category = Some(Category::derive(&manifest.event_info));
    info!(
        id = %manifest.id,
        category = %Category::derive(&manifest.event_info),
        removed = removed.len(),
        "Bundle accepted"
    );

    Ok(Bundle {
        id: manifest.id.clone(),
        root: root.to_path_buf(),
        manifest,
        assets,
        id_reassigned: false,
        root_reassigned: false,
    })
}
