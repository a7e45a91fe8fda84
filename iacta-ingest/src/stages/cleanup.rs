//! Stage 7: remove every entry in the root that is not a kept asset

use super::Staged;
use iacta_common::{ErrorAggregate, Failure};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Delete non-asset entries directly under `root`, directories included;
/// returns the removed names
pub fn run(root: &Path, keep: &BTreeSet<String>) -> Staged<Vec<String>> {
    let mut errors = ErrorAggregate::new();
    let mut removed = Vec::new();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            errors.add(root.display().to_string(), Failure::fault("Io", e));
            return Staged::new(removed, errors);
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if keep.contains(&name) {
            continue;
        }

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let removal = if is_dir {
            fs::remove_dir_all(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        match removal {
            Ok(()) => {
                debug!(file = %name, "Removed redundant entry");
                removed.push(name);
            }
            Err(e) => {
                warn!(file = %name, "Could not remove redundant entry: {}", e);
                errors.add(name, Failure::fault("Io", e));
            }
        }
    }

    removed.sort();
    Staged::new(removed, errors)
}
