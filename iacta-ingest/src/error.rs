//! Error types for iacta-ingest
//!
//! Two shapes of failure exist. Run-level errors (unresolved interactive
//! choices, work-root problems, policy errors) abort the whole run.
//! Data-quality problems are collected into an [`ErrorAggregate`] and surface
//! as [`IngestError::BadBundle`] or [`IngestError::Batch`] with the aggregate
//! preserved as the error source.

use iacta_common::ErrorAggregate;
use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::ScanError;

/// Ingestion error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// Bundle rejected; every recorded problem is kept
    #[error("Bad bundle {}:\n{errors}", root.display())]
    BadBundle {
        root: PathBuf,
        #[source]
        errors: ErrorAggregate,
    },

    /// A batch step finished with problems
    #[error("Batch step '{step}' failed:\n{errors}")]
    Batch {
        step: &'static str,
        #[source]
        errors: ErrorAggregate,
    },

    /// A policy setting was left as `ask` and reached the non-interactive core
    #[error("Policy setting '{0}' is 'ask' but was not resolved before ingestion")]
    UnresolvedChoice(&'static str),

    /// Work root does not exist and the policy forbids creating it
    #[error("Work root not found: {0}")]
    WorkRootMissing(PathBuf),

    /// Work root has content and the policy requires it empty
    #[error("Work root is not empty: {0}")]
    WorkRootNotEmpty(PathBuf),

    /// Work root and input directory overlap
    #[error("Work root {} overlaps input directory {}", work_root.display(), input.display())]
    WorkRootOverlapsInput { work_root: PathBuf, input: PathBuf },

    /// Radio directory overlaps the input or the work root
    #[error("Radio directory {} overlaps {}", radio.display(), other.display())]
    RadioOverlaps { radio: PathBuf, other: PathBuf },

    /// Bundle identifier or root was already reassigned once
    #[error("Identity of bundle '{0}' was already reassigned")]
    IdentityLocked(String),

    /// Root rename target is not a single plain directory name
    #[error("Invalid bundle directory name: {0:?}")]
    InvalidRootName(String),

    /// Root rename target already exists
    #[error("Cannot rename bundle root: {} already exists", .0.display())]
    RootTaken(PathBuf),

    /// Input scanning error
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// iacta-common error (policy, templates)
    #[error("Common error: {0}")]
    Common(#[from] iacta_common::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Aggregate behind a rejection, if any
    pub fn aggregate(&self) -> Option<&ErrorAggregate> {
        match self {
            IngestError::BadBundle { errors, .. } | IngestError::Batch { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Result type for ingestion
pub type Result<T> = std::result::Result<T, IngestError>;

/// Chart (AFF) parse error
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Header '{key}' has invalid value {value:?}")]
    InvalidHeader { key: String, value: String },

    #[error("Missing header terminator '-'")]
    MissingHeaderEnd,

    #[error("Unclosed timing group opened on line {0}")]
    UnclosedGroup(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio and image codec error
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Resample failed: {0}")]
    Resample(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Manifest load error
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest must end with a comma")]
    MissingTrailingComma,

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
