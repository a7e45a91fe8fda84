//! Test helper utilities
//!
//! Shared fixtures for the iacta-ingest integration tests: a small policy,
//! signed manifests, AFF charts, generated audio and images.

#![allow(dead_code)]

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    write_bundle, write_chart, write_image, write_manifest, write_signed_manifest, write_tone, BundleSpec,
    TEST_POLICY,
};

use iacta_common::Policy;

/// Parsed [`TEST_POLICY`]
pub fn test_policy() -> Policy {
    Policy::from_toml_str(TEST_POLICY).expect("test policy must be valid")
}

/// Sorted names of the regular files directly in `dir`
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Sorted names of the directories directly in `dir`
pub fn dir_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
