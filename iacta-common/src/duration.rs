//! Millisecond durations
//!
//! Policy files may write durations either as plain milliseconds (`5000`)
//! or as clock text (`"5"`, `"1:30.5"`, `"1:02:03.250"`). Display always uses
//! clock text, `M:SS.mmm` below one hour and `H:MM:SS.mmm` above.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Duration in whole milliseconds
///
/// Parsed values (policy input) must be positive; measured values such as a
/// decoded track length may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DurationMs(pub u64);

impl DurationMs {
    pub fn as_millis(self) -> u64 {
        self.0
    }

    fn positive(ms: u64) -> Result<Self> {
        if ms == 0 {
            return Err(Error::InvalidInput("Invalid duration: value must be positive".to_string()));
        }
        Ok(Self(ms))
    }
}

impl FromStr for DurationMs {
    type Err = Error;

    /// Parse `S`, `M:S` or `H:M:S`, where the seconds part may be fractional
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidInput(format!("Invalid duration {:?}: {}", s, reason));

        let segs: Vec<&str> = s.trim().split(':').collect();
        let (hrs, mins, secs) = match segs.as_slice() {
            [secs] => ("0", "0", *secs),
            [mins, secs] => ("0", *mins, *secs),
            [hrs, mins, secs] => (*hrs, *mins, *secs),
            _ => return Err(invalid("expected at most H:M:S")),
        };

        let hrs: u64 = hrs.trim().parse().map_err(|_| invalid("hours must be a nonnegative integer"))?;
        let mins: u64 = mins.trim().parse().map_err(|_| invalid("minutes must be a nonnegative integer"))?;
        let secs: f64 = secs.trim().parse().map_err(|_| invalid("seconds must be a number"))?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(invalid("seconds must be finite and nonnegative"));
        }

        let sec_millis = (secs * MS_PER_SECOND as f64).round();
        if sec_millis >= u64::MAX as f64 {
            return Err(invalid("out of range"));
        }
        let millis = hrs
            .checked_mul(MS_PER_HOUR)
            .zip(mins.checked_mul(MS_PER_MINUTE))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(sec_millis as u64))
            .ok_or_else(|| invalid("out of range"))?;
        Self::positive(millis)
    }
}

impl fmt::Display for DurationMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0 % MS_PER_SECOND;
        let secs = (self.0 / MS_PER_SECOND) % 60;
        let mins = (self.0 / MS_PER_MINUTE) % 60;
        let hrs = self.0 / MS_PER_HOUR;

        if hrs > 0 {
            write!(f, "{}:{:02}:{:02}.{:03}", hrs, mins, secs, millis)
        } else {
            write!(f, "{}:{:02}.{:03}", mins, secs, millis)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for DurationMs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Millis(ms) => Self::positive(ms).map_err(serde::de::Error::custom),
            RawDuration::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for DurationMs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}
