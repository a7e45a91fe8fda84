//! Bundle pipeline stages
//!
//! Each stage reads the policy, the bundle root and whatever earlier stages
//! produced, and returns its product together with the problems it found.
//! Stages never fail fast on data problems; only run-level conditions
//! (such as an unresolved `ask` setting) abort.

pub mod audio;
pub mod backgrounds;
pub mod charts;
pub mod cleanup;
pub mod covers;
pub mod hitsounds;
pub mod manifest;

use crate::manifest::{Difficulty, Manifest};
use iacta_common::{AssetKey, ErrorAggregate, Failure};
use std::path::Path;

/// Stage product plus the problems recorded while producing it
#[derive(Debug)]
pub struct Staged<T> {
    pub value: T,
    pub errors: ErrorAggregate,
}

impl<T> Staged<T> {
    pub fn new(value: T, errors: ErrorAggregate) -> Self {
        Self { value, errors }
    }

    /// Move the problems into `sink` and return the product
    pub fn merge_into(self, sink: &mut ErrorAggregate) -> T {
        sink.merge(self.errors);
        self.value
    }
}

/// Failure for a required file that is absent
pub(crate) fn not_found(path: &Path) -> Failure {
    Failure::fault("PathNotFound", format!("Path does not exist: {}", path.display()))
}

/// Keys for a per-variant asset class: every difficulty that overrides it,
/// then `Base` unless all difficulties override
pub(crate) fn asset_keys(manifest: &Manifest, overrides: impl Fn(&Difficulty) -> bool) -> Vec<AssetKey> {
    let mut keys: Vec<AssetKey> = Vec::new();
    for difficulty in manifest.difficulties.iter().filter(|d| overrides(d)) {
        let key = AssetKey::from(difficulty.rating_class);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if !manifest.difficulties.iter().all(|d| overrides(d)) {
        keys.push(AssetKey::Base);
    }
    keys
}
