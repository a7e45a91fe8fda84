//! Bundle directory scanner
//!
//! Every immediate subdirectory of the input directory is a bundle
//! candidate. Regular files sitting next to them are stray items, handled
//! according to the preparation policy. System clutter (`.DS_Store`,
//! `Thumbs.db`, VCS directories) is skipped silently.

use iacta_common::config::StrayItemStrategy;
use iacta_common::{ErrorAggregate, Failure};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Stray items are forbidden and some were found
    #[error("Stray items found next to bundles:\n{0}")]
    StrayItems(#[source] ErrorAggregate),

    /// `ask` reached the scanner without being resolved
    #[error("Stray item strategy 'ask' was not resolved")]
    UnresolvedStrayItems,

    /// Directory traversal failed
    #[error("Traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Removing a stray item failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Bundle candidate directories, sorted by name
    pub bundles: Vec<PathBuf>,
    /// Stray regular files found (and possibly removed)
    pub stray_items: Vec<PathBuf>,
}

/// Bundle directory scanner
pub struct BundleScanner {
    ignore_patterns: Vec<String>,
}

impl Default for BundleScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleScanner {
    /// Create scanner with default ignore patterns
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "__MACOSX".to_string(),
            ],
        }
    }

    /// Scan `input` for bundle directories, applying `stray` to loose files
    pub fn scan(&self, input: &Path, stray: StrayItemStrategy) -> Result<ScanResult, ScanError> {
        if !input.exists() {
            return Err(ScanError::PathNotFound(input.to_path_buf()));
        }
        if !input.is_dir() {
            return Err(ScanError::NotADirectory(input.to_path_buf()));
        }
        if stray == StrayItemStrategy::Ask {
            return Err(ScanError::UnresolvedStrayItems);
        }

        let mut result = ScanResult::default();
        let walker = WalkDir::new(input)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                result.bundles.push(entry.into_path());
            } else if entry.file_type().is_file() {
                result.stray_items.push(entry.into_path());
            }
        }

        match stray {
            StrayItemStrategy::Ignore | StrayItemStrategy::Ask => {}
            StrayItemStrategy::Remove => {
                for path in &result.stray_items {
                    std::fs::remove_file(path)?;
                    tracing::info!(path = %path.display(), "Removed stray item");
                }
            }
            StrayItemStrategy::Forbid => {
                if !result.stray_items.is_empty() {
                    let mut errors = ErrorAggregate::new();
                    for path in &result.stray_items {
                        errors.add(
                            file_label(path),
                            Failure::fault("StrayItem", format!("Not a bundle directory: {}", path.display())),
                        );
                    }
                    return Err(ScanError::StrayItems(errors));
                }
            }
        }

        tracing::debug!(
            bundles = result.bundles.len(),
            stray_items = result.stray_items.len(),
            "Scan complete"
        );
        Ok(result)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        !self.ignore_patterns.iter().any(|p| file_name == p.as_str())
    }
}

/// Final path component as text
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
