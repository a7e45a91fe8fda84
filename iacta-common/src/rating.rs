//! Rating classes and asset keys
//!
//! Difficulties are tagged with a rating class stored numerically in
//! manifests (`"ratingClass": 2`) and used verbatim in filenames (`2.aff`,
//! `2.ogg`). Song-level assets use the synthetic `base` key instead.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RatingClass {
    Past = 0,
    Present = 1,
    Future = 2,
    Beyond = 3,
    Eternal = 4,
}

impl RatingClass {
    pub const ALL: [RatingClass; 5] = [
        RatingClass::Past,
        RatingClass::Present,
        RatingClass::Future,
        RatingClass::Beyond,
        RatingClass::Eternal,
    ];

    /// Numeric tag used in manifests and filenames
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            RatingClass::Past => "Past",
            RatingClass::Present => "Present",
            RatingClass::Future => "Future",
            RatingClass::Beyond => "Beyond",
            RatingClass::Eternal => "Eternal",
        }
    }
}

impl TryFrom<u8> for RatingClass {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        RatingClass::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("Unknown rating class: {}", value)))
    }
}

impl From<RatingClass> for u8 {
    fn from(value: RatingClass) -> Self {
        value.value()
    }
}

impl fmt::Display for RatingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Key for per-variant assets: a difficulty's override or the song-level base
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKey {
    Base,
    Class(RatingClass),
}

impl AssetKey {
    pub fn name(self) -> &'static str {
        match self {
            AssetKey::Base => "Base",
            AssetKey::Class(class) => class.name(),
        }
    }
}

impl From<RatingClass> for AssetKey {
    fn from(class: RatingClass) -> Self {
        AssetKey::Class(class)
    }
}

impl fmt::Display for AssetKey {
    /// Filename stem: `base` or the rating class number
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKey::Base => f.write_str("base"),
            AssetKey::Class(class) => write!(f, "{}", class),
        }
    }
}
