//! Batch driver
//!
//! Prepares the work root, copies every bundle directory from the input into
//! it, ingests the copies one after another, then deduplicates identifiers,
//! schedules the event and optionally collects the radio files. Any rejected bundle halts the run once every bundle
//! has been tried, so a single run reports all problems.

use crate::bundle::{ingest_bundle, Bundle};
use crate::dedup::deduplicate_ids;
use crate::error::{IngestError, Result};
use crate::radio::collect_radio_files;
use crate::scanner::{file_label, BundleScanner};
use crate::schedule::{export_stream_info, schedule};
use iacta_common::config::{CleanRootStrategy, MissingRootStrategy, PreparationPolicy};
use iacta_common::{ErrorAggregate, Failure, Policy};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of a successful batch run
#[derive(Debug)]
pub struct BatchReport {
    pub bundles: Vec<Bundle>,
    pub stream_info: PathBuf,
}

/// Whether `path` is an existing directory with any entries
pub fn has_content(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path)?.next().is_some())
}

/// Make sure `path` exists and is empty according to `policy`
pub fn prepare_work_root(path: &Path, policy: &PreparationPolicy) -> Result<()> {
    if !path.exists() {
        return match policy.no_root_found {
            MissingRootStrategy::Create => {
                fs::create_dir_all(path)?;
                info!(path = %path.display(), "Work root created");
                Ok(())
            }
            MissingRootStrategy::Fail => Err(IngestError::WorkRootMissing(path.to_path_buf())),
        };
    }

    if !has_content(path)? {
        return Ok(());
    }

    match policy.cleaning_root {
        CleanRootStrategy::Force => {
            fs::remove_dir_all(path)?;
            fs::create_dir_all(path)?;
            info!(path = %path.display(), "Work root emptied");
            Ok(())
        }
        CleanRootStrategy::RequireEmpty => Err(IngestError::WorkRootNotEmpty(path.to_path_buf())),
        CleanRootStrategy::Ask => Err(IngestError::UnresolvedChoice("preparation.cleaning_root")),
    }
}

/// Canonical form of `path`, resolving the longest existing ancestor
fn resolved(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => resolved(parent).join(name),
        _ => path.to_path_buf(),
    }
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Recursively copy directory `from` to `to`
pub fn copy_dir(from: &Path, to: &Path) -> Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| IngestError::Io(e.into()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Run the whole batch: prepare, copy, ingest, deduplicate, schedule and,
/// given a `radio` directory, collect radio files
pub fn run_batch<R: Rng + ?Sized>(
    input: &Path,
    work_root: &Path,
    radio: Option<&Path>,
    policy: &Policy,
    rng: &mut R,
) -> Result<BatchReport> {
    if overlaps(&resolved(input), &resolved(work_root)) {
        return Err(IngestError::WorkRootOverlapsInput {
            work_root: work_root.to_path_buf(),
            input: input.to_path_buf(),
        });
    }
    if let Some(radio) = radio {
        for other in [input, work_root] {
            if overlaps(&resolved(radio), &resolved(other)) {
                return Err(IngestError::RadioOverlaps {
                    radio: radio.to_path_buf(),
                    other: other.to_path_buf(),
                });
            }
        }
    }

    prepare_work_root(work_root, &policy.preparation)?;

    let scan = BundleScanner::new().scan(input, policy.preparation.stray_items)?;
    info!(input = %input.display(), bundles = scan.bundles.len(), "Input scanned");

    let mut bundles = Vec::with_capacity(scan.bundles.len());
    let mut rejected = ErrorAggregate::new();
    for source in &scan.bundles {
        let name = file_label(source);
        let root = work_root.join(&name);
        let files = copy_dir(source, &root)?;
        tracing::debug!(bundle = %name, files, "Bundle copied into work root");

        match ingest_bundle(&root, policy) {
            Ok(bundle) => bundles.push(bundle),
            Err(IngestError::BadBundle { errors, .. }) => {
                warn!(bundle = %name, problems = errors.len(), "Bundle rejected");
                rejected.add(name, Failure::fault("BadBundle", errors));
            }
            Err(e) => return Err(e),
        }
    }
    if !rejected.is_empty() {
        return Err(IngestError::Batch {
            step: "ingest",
            errors: rejected,
        });
    }

    let errors = deduplicate_ids(&mut bundles, rng);
    if !errors.is_empty() {
        return Err(IngestError::Batch {
            step: "deduplicate",
            errors,
        });
    }

    schedule(&mut bundles, policy.event.sessions, rng);
    let stream_info = export_stream_info(&bundles, work_root)?;

    if let Some(radio) = radio {
        let errors = collect_radio_files(&bundles, radio);
        if !errors.is_empty() {
            return Err(IngestError::Batch { step: "radio", errors });
        }
    }

    info!(bundles = bundles.len(), "Batch complete");
    Ok(BatchReport { bundles, stream_info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iacta_common::config::StrayItemStrategy;

    fn preparation(missing: MissingRootStrategy, clean: CleanRootStrategy) -> PreparationPolicy {
        PreparationPolicy {
            no_root_found: missing,
            cleaning_root: clean,
            stray_items: StrayItemStrategy::Ignore,
        }
    }

    #[test]
    fn test_missing_root_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("work");
        prepare_work_root(&root, &preparation(MissingRootStrategy::Create, CleanRootStrategy::RequireEmpty))
            .unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("work");
        let err = prepare_work_root(&root, &preparation(MissingRootStrategy::Fail, CleanRootStrategy::Force))
            .unwrap_err();
        assert!(matches!(err, IngestError::WorkRootMissing(_)));
    }

    #[test]
    fn test_non_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("left_over.txt"), "x").unwrap();

        let err = prepare_work_root(dir.path(), &preparation(MissingRootStrategy::Fail, CleanRootStrategy::RequireEmpty))
            .unwrap_err();
        assert!(matches!(err, IngestError::WorkRootNotEmpty(_)));

        let err = prepare_work_root(dir.path(), &preparation(MissingRootStrategy::Fail, CleanRootStrategy::Ask))
            .unwrap_err();
        assert!(matches!(err, IngestError::UnresolvedChoice("preparation.cleaning_root")));

        prepare_work_root(dir.path(), &preparation(MissingRootStrategy::Fail, CleanRootStrategy::Force)).unwrap();
        assert!(dir.path().is_dir());
        assert!(!has_content(dir.path()).unwrap());
    }

    #[test]
    fn test_empty_root_passes_even_with_ask() {
        let dir = tempfile::tempdir().unwrap();
        prepare_work_root(dir.path(), &preparation(MissingRootStrategy::Fail, CleanRootStrategy::Ask)).unwrap();
    }

    #[test]
    fn test_copy_dir() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("nested")).unwrap();
        fs::write(from.join("a.txt"), "a").unwrap();
        fs::write(from.join("nested/b.txt"), "b").unwrap();

        let to = dir.path().join("to");
        assert_eq!(copy_dir(&from, &to).unwrap(), 2);
        assert_eq!(fs::read_to_string(to.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_overlap() {
        assert!(overlaps(Path::new("/a/b"), Path::new("/a")));
        assert!(overlaps(Path::new("/a"), Path::new("/a/b/c")));
        assert!(!overlaps(Path::new("/a/b"), Path::new("/a/c")));
    }
}
