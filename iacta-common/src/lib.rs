//! # Iacta Common Library
//!
//! Shared, filesystem-free building blocks for chart-bundle ingestion:
//! - Manifest digest (tamper detection)
//! - Filename template mini-language
//! - Labelled error aggregation
//! - Millisecond durations and fade curves
//! - Rating classes and asset keys
//! - Policy (configuration) model and loading

pub mod aggregate;
pub mod config;
pub mod digest;
pub mod duration;
pub mod error;
pub mod fade_curves;
pub mod rating;
pub mod template;

pub use aggregate::{ErrorAggregate, Failure};
pub use config::Policy;
pub use digest::digest;
pub use duration::DurationMs;
pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use rating::{AssetKey, RatingClass};
pub use template::TemplateStr;
