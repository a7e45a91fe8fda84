//! Policy loading and resolution
//!
//! The policy is the read-only configuration every pipeline stage consults:
//! accepted names, thresholds, ranges, codecs and sizes. It is loaded once
//! from TOML, validated, and then passed explicitly into each stage.
//!
//! Policy file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `IACTA_POLICY` environment variable
//! 3. `<config dir>/iacta/policy.toml` (e.g. `~/.config/iacta/policy.toml`)

use crate::{DurationMs, Error, FadeCurve, RatingClass, Result, TemplateStr};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the policy file
pub const POLICY_ENV_VAR: &str = "IACTA_POLICY";

/// Complete ingestion policy
#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    /// Event name, used by downstream naming templates
    pub event_name: String,
    #[serde(default)]
    pub preparation: PreparationPolicy,
    pub manifest: ManifestPolicy,
    pub charts: ChartPolicy,
    pub hitsounds: HitsoundPolicy,
    pub covers: CoverPolicy,
    pub audio: AudioPolicy,
    pub backgrounds: BackgroundPolicy,
    #[serde(default)]
    pub event: EventPolicy,
    pub technical: TechnicalPolicy,
}

/// What to do when the work root is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRootStrategy {
    #[default]
    Create,
    Fail,
}

/// What to do when the work root already has content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanRootStrategy {
    Force,
    #[default]
    RequireEmpty,
    /// Resolved by the command-line layer before the core runs
    Ask,
}

/// What to do with regular files sitting next to bundle directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrayItemStrategy {
    Remove,
    Forbid,
    #[default]
    Ignore,
    /// Resolved by the command-line layer before the core runs
    Ask,
}

/// Batch preparation policy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreparationPolicy {
    #[serde(default)]
    pub no_root_found: MissingRootStrategy,
    #[serde(default)]
    pub cleaning_root: CleanRootStrategy,
    #[serde(default)]
    pub stray_items: StrayItemStrategy,
}

/// How to pick among several accepted manifest files in one bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestChoice {
    /// First name in `accepts` order that is present
    ByPriority,
    /// Ambiguity rejects the bundle
    Forbid,
    /// First file in directory order
    TakeFirst,
    /// Resolved by the command-line layer before the core runs
    Ask,
}

/// Trailing-comma repair policy for manifest text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingComma {
    Require,
    Allow,
    Forbid,
}

/// Manifest fields that must hold exactly the configured value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixedFields {
    pub set: Option<String>,
    pub purchase: Option<String>,
    pub date: Option<u64>,
    pub version: Option<String>,
    pub comment: Option<String>,
}

/// Manifest location, repair and validation policy
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestPolicy {
    pub accepts: Vec<String>,
    pub normalize_to: String,
    pub choosing: ManifestChoice,
    pub trailing_comma: TrailingComma,
    #[serde(default = "default_true")]
    pub digest_check: bool,
    #[serde(default)]
    pub fixed_fields: FixedFields,
    pub sides: BTreeSet<u8>,
    pub ratings: BTreeSet<i32>,
    pub ratings_with_plus: BTreeSet<i32>,
    pub rating_classes: BTreeSet<RatingClass>,
    pub custom_string_max_lines: usize,
    pub custom_string_max_line_length: usize,
}

/// Chart (AFF) policy
#[derive(Debug, Clone, Deserialize)]
pub struct ChartPolicy {
    /// Inclusive `TimingPointDensityFactor` range for non-bonus bundles
    pub density_range: (f64, f64),
    #[serde(default = "default_banned_group_params")]
    pub banned_group_params: Vec<String>,
    #[serde(default = "default_banned_arc_kinds")]
    pub banned_arc_kinds: Vec<String>,
    #[serde(default = "default_true")]
    pub ban_arc_smoothness: bool,
    /// Hit-sound names provided by the game client, never looked up on disk
    #[serde(default = "default_builtin_hitsounds")]
    pub builtin_hitsounds: Vec<String>,
}

/// Hit-sound sample policy
#[derive(Debug, Clone, Deserialize)]
pub struct HitsoundPolicy {
    pub sampling_rate: u32,
}

/// One normalized cover output
#[derive(Debug, Clone, Deserialize)]
pub struct CoverTarget {
    pub template: TemplateStr,
    pub size: (u32, u32),
}

/// Cover image policy
#[derive(Debug, Clone, Deserialize)]
pub struct CoverPolicy {
    pub accepts: Vec<TemplateStr>,
    pub normalize_to: Vec<CoverTarget>,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// Audio track and preview policy
#[derive(Debug, Clone, Deserialize)]
pub struct AudioPolicy {
    pub sampling_rate: u32,
    /// Inclusive duration range for non-bonus bundles
    pub time_range: (DurationMs, DurationMs),
    pub fade_in: DurationMs,
    pub fade_out: DurationMs,
    #[serde(default)]
    pub fade_curve: FadeCurve,
    #[serde(default = "default_vorbis_quality")]
    pub vorbis_quality: f32,
}

/// Background image policy
#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundPolicy {
    pub size: (u32, u32),
    /// Background identifiers shipped with the game client
    #[serde(default)]
    pub builtin: BTreeSet<String>,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// Live event scheduling policy
#[derive(Debug, Clone, Deserialize)]
pub struct EventPolicy {
    pub sessions: usize,
}

impl Default for EventPolicy {
    fn default() -> Self {
        Self { sessions: 1 }
    }
}

/// Technical constants
#[derive(Debug, Clone, Deserialize)]
pub struct TechnicalPolicy {
    pub digest_salts: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_vorbis_quality() -> f32 {
    0.5
}

fn default_banned_group_params() -> Vec<String> {
    vec!["anglex".to_string(), "angley".to_string()]
}

fn default_banned_arc_kinds() -> Vec<String> {
    vec!["designant".to_string()]
}

fn default_builtin_hitsounds() -> Vec<String> {
    vec![
        "glass_wav".to_string(),
        "voice_wav".to_string(),
        "kick_wav".to_string(),
    ]
}

impl Policy {
    /// Parse and validate a policy from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let policy: Policy = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Read, parse and validate a policy file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read policy {} failed: {}", path.display(), e)))?;
        let policy = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "Policy loaded");
        Ok(policy)
    }

    /// Cross-field checks serde cannot express
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.manifest.accepts.is_empty() {
            problems.push("manifest.accepts must not be empty".to_string());
        }
        if self.manifest.normalize_to.trim().is_empty() {
            problems.push("manifest.normalize_to must not be empty".to_string());
        }
        if self.manifest.custom_string_max_lines == 0 || self.manifest.custom_string_max_line_length == 0 {
            problems.push("manifest custom string limits must be positive".to_string());
        }

        let (min_density, max_density) = self.charts.density_range;
        if !(min_density.is_finite() && max_density.is_finite()) || min_density <= 0.0 {
            problems.push(format!(
                "charts.density_range {:?} must be positive and finite",
                self.charts.density_range
            ));
        } else if min_density > max_density {
            problems.push(format!(
                "charts.density_range {:?}: maximum (latter) must be no smaller than minimum (former)",
                self.charts.density_range
            ));
        }

        let (min_len, max_len) = self.audio.time_range;
        if min_len > max_len {
            problems.push(format!(
                "audio.time_range ({}, {}): maximum (latter) must be no smaller than minimum (former)",
                min_len, max_len
            ));
        }
        if !(-0.1..=1.0).contains(&self.audio.vorbis_quality) {
            problems.push("audio.vorbis_quality must lie in [-0.1, 1.0]".to_string());
        }
        if self.audio.sampling_rate == 0 || self.hitsounds.sampling_rate == 0 {
            problems.push("sampling rates must be positive".to_string());
        }

        if self.covers.accepts.is_empty() {
            problems.push("covers.accepts must not be empty".to_string());
        }
        if self.covers.normalize_to.is_empty() {
            problems.push("covers.normalize_to must not be empty".to_string());
        }
        for template in &self.covers.accepts {
            if !template.is_simple() {
                problems.push(format!("covers.accepts template {:?} must use a single '{{}}'", template.as_str()));
            }
        }
        for target in &self.covers.normalize_to {
            if !target.template.is_simple() {
                problems.push(format!(
                    "covers.normalize_to template {:?} must use a single '{{}}'",
                    target.template.as_str()
                ));
            }
            if target.size.0 == 0 || target.size.1 == 0 {
                problems.push(format!("covers.normalize_to size {:?} must be positive", target.size));
            }
        }
        if self.backgrounds.size.0 == 0 || self.backgrounds.size.1 == 0 {
            problems.push("backgrounds.size must be positive".to_string());
        }

        if self.event.sessions == 0 {
            problems.push("event.sessions must be at least 1".to_string());
        }
        if self.technical.digest_salts.is_empty() {
            problems.push("technical.digest_salts must not be empty".to_string());
        }

        if problems.is_empty() {
            debug!("Policy validated");
            Ok(())
        } else {
            Err(Error::Config(format!("Invalid policy:\n  {}", problems.join("\n  "))))
        }
    }
}

/// Resolve the policy file path following the priority order above
pub fn resolve_policy_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(POLICY_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = default_policy_path() {
        if path.exists() {
            return Ok(path);
        }
    }

    Err(Error::Config(format!(
        "No policy file found. Please provide one using one of:\n\
         1. Command line: --policy <path>\n\
         2. Environment: {}=<path>\n\
         3. Config file: {}",
        POLICY_ENV_VAR,
        default_policy_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<config dir>/iacta/policy.toml".to_string())
    )))
}

/// Platform default policy location
pub fn default_policy_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("iacta").join("policy.toml"))
}
