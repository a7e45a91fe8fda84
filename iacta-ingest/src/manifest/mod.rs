//! Song manifest model
//!
//! A manifest describes one song and its difficulties in the client's
//! songlist format, plus a handful of restricted fields used only during
//! ingestion (`_comment`, `just_kidding`, `event_info`, `digest`). The
//! restricted fields are removed by [`Manifest::public_form`].
//!
//! Field order in these structs is the canonical serialization order and
//! feeds the integrity digest, so it must not be rearranged. Absent optional
//! fields are omitted from written manifests but appear as `null` in the
//! digest source.

pub mod validate;

use iacta_common::{digest, RatingClass};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Field names stripped to produce the public manifest
pub const RESTRICTED_FIELDS: [&str; 4] = ["_comment", "just_kidding", "event_info", "digest"];

/// Indent used for the digest's canonical serialization
pub const DIGEST_INDENT: &[u8] = b"     ";

/// Indent used when writing manifests and exported JSON
pub const OUTPUT_INDENT: &[u8] = b"    ";

thread_local! {
    static KEEP_NULLS: Cell<bool> = const { Cell::new(false) };
}

fn omitted<T>(value: &Option<T>) -> bool {
    value.is_none() && !KEEP_NULLS.with(Cell::get)
}

/// Serializes absent optional fields as `null` while alive
struct KeepNulls {
    previous: bool,
}

impl KeepNulls {
    fn enter() -> Self {
        Self {
            previous: KEEP_NULLS.with(|keep| keep.replace(true)),
        }
    }
}

impl Drop for KeepNulls {
    fn drop(&mut self) {
        KEEP_NULLS.with(|keep| keep.set(self.previous));
    }
}

/// Localized text; `en` is mandatory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    pub en: String,
    #[serde(default, skip_serializing_if = "omitted")]
    pub ja: Option<String>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub ko: Option<String>,
    #[serde(rename = "zh-Hans", default, skip_serializing_if = "omitted")]
    pub zh_hans: Option<String>,
    #[serde(rename = "zh-Hant", default, skip_serializing_if = "omitted")]
    pub zh_hant: Option<String>,
}

/// One playable variant of a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    #[serde(rename = "ratingClass")]
    pub rating_class: RatingClass,
    #[serde(rename = "chartDesigner")]
    pub chart_designer: String,
    #[serde(rename = "jacketDesigner")]
    pub jacket_designer: String,
    pub rating: i32,
    #[serde(rename = "ratingPlus", default, skip_serializing_if = "omitted")]
    pub rating_plus: Option<bool>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub title_localized: Option<Localized>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub bpm: Option<String>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub bpm_base: Option<f64>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub bg: Option<String>,
    #[serde(rename = "jacketOverride", default, skip_serializing_if = "omitted")]
    pub jacket_override: Option<bool>,
    #[serde(rename = "audioOverride", default, skip_serializing_if = "omitted")]
    pub audio_override: Option<bool>,
    #[serde(rename = "audioPreview", default, skip_serializing_if = "omitted")]
    pub audio_preview: Option<u64>,
    #[serde(rename = "audioPreviewEnd", default, skip_serializing_if = "omitted")]
    pub audio_preview_end: Option<u64>,
}

impl Difficulty {
    /// A negative rating marks a placeholder difficulty
    pub fn is_activated(&self) -> bool {
        self.rating >= 0
    }

    pub fn is_plus(&self) -> bool {
        self.rating_plus.unwrap_or(false)
    }

    pub fn overrides_jacket(&self) -> bool {
        self.jacket_override.unwrap_or(false)
    }

    pub fn overrides_audio(&self) -> bool {
        self.audio_override.unwrap_or(false)
    }

    /// Preview window if both markers are set
    pub fn preview_window(&self) -> Option<(u64, u64)> {
        self.audio_preview.zip(self.audio_preview_end)
    }
}

/// Event category derived once a bundle is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Regular entry by a single charter
    A,
    /// Bonus entry
    B,
    /// Collaboration of two or more charters
    C,
}

impl Category {
    pub fn derive(event_info: &EventInfo) -> Self {
        if event_info.is_bonus {
            Category::B
        } else if event_info.charters.len() >= 2 {
            Category::C
        } else {
            Category::A
        }
    }

    pub fn letter(self) -> char {
        match self {
            Category::A => 'A',
            Category::B => 'B',
            Category::C => 'C',
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Event metadata carried in the manifest
///
/// The batch-assigned fields are never read from the manifest; they start
/// absent and are filled in after acceptance and by event scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub is_bonus: bool,
    pub charters: Vec<String>,
    #[serde(skip_deserializing, skip_serializing_if = "omitted")]
    pub live_session: Option<usize>,
    #[serde(skip_deserializing, skip_serializing_if = "omitted")]
    pub category: Option<Category>,
    #[serde(skip_deserializing, skip_serializing_if = "omitted")]
    pub category_idx: Option<usize>,
}

impl EventInfo {
    /// Category letter plus two-digit index, e.g. `A01`
    pub fn live_id(&self) -> Option<String> {
        let category = self.category?;
        let idx = self.category_idx?;
        Some(format!("{}{:02}", category, idx))
    }
}

/// Complete manifest including restricted fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "omitted")]
    pub idx: Option<u32>,
    pub id: String,
    pub title_localized: Localized,
    pub artist: String,
    pub bpm: String,
    pub bpm_base: f64,
    pub set: String,
    pub purchase: String,
    #[serde(rename = "audioPreview")]
    pub audio_preview: u64,
    #[serde(rename = "audioPreviewEnd")]
    pub audio_preview_end: u64,
    pub side: u8,
    pub bg: String,
    #[serde(default, skip_serializing_if = "omitted")]
    pub bg_inverse: Option<String>,
    pub date: u64,
    pub version: String,
    pub difficulties: Vec<Difficulty>,

    #[serde(rename = "_comment", default, skip_serializing_if = "omitted")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "omitted")]
    pub just_kidding: Option<bool>,
    pub event_info: EventInfo,
    // Never part of its own digest source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Manifest {
    /// Parse manifest JSON (trailing comma already handled)
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn activated(&self) -> impl Iterator<Item = &Difficulty> {
        self.difficulties.iter().filter(|d| d.is_activated())
    }

    pub fn difficulty(&self, class: RatingClass) -> Option<&Difficulty> {
        self.difficulties.iter().find(|d| d.rating_class == class)
    }

    /// Text the digest is computed over: everything but the digest itself,
    /// 5-space indent, non-ASCII kept literal, absent optional fields as `null`
    pub fn digest_source(&self) -> serde_json::Result<String> {
        let mut unsigned = self.clone();
        unsigned.digest = None;

        let _nulls = KeepNulls::enter();
        to_pretty_json(&unsigned, DIGEST_INDENT)
    }

    /// Digest this manifest should carry
    pub fn expected_digest(&self, salts: &[String]) -> serde_json::Result<String> {
        Ok(digest(&self.digest_source()?, salts))
    }

    /// Complete manifest as written back into the bundle
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        to_pretty_json(self, OUTPUT_INDENT)
    }

    /// Public form with restricted fields removed
    pub fn public_form(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            for field in RESTRICTED_FIELDS {
                object.remove(field);
            }
        }
        Ok(value)
    }
}

/// Pretty JSON with a custom indent
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T, indent: &[u8]) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
