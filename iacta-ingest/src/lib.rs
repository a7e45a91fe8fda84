//! iacta-ingest library interface
//!
//! Chart-bundle ingestion: every bundle directory is validated against a
//! policy, normalized in place and either accepted as a [`Bundle`] or
//! rejected with every problem found.

pub mod batch;
pub mod bundle;
pub mod chart;
pub mod dedup;
pub mod error;
pub mod manifest;
pub mod media;
pub mod radio;
pub mod scanner;
pub mod schedule;
pub mod stages;

pub use crate::batch::{run_batch, BatchReport};
pub use crate::bundle::{ingest_bundle, Bundle};
pub use crate::dedup::deduplicate_ids;
pub use crate::error::{IngestError, Result};
pub use iacta_common::{digest, TemplateStr};
