//! Labelled error aggregation
//!
//! Stages record every isolated problem under a label instead of failing
//! fast, so one diagnostic pass reports everything wrong with a bundle.
//! A later `add` under an existing label replaces the earlier failure, so
//! stages must pick distinct labels.

use std::fmt;

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Plain human-readable reason
    Reason(String),
    /// Structured failure with a short kind tag (e.g. `PathNotFound`)
    Fault { kind: String, message: String },
}

impl Failure {
    /// Structured failure from any displayable error
    pub fn fault(kind: impl Into<String>, error: impl fmt::Display) -> Self {
        Failure::Fault {
            kind: kind.into(),
            message: error.to_string(),
        }
    }

    /// Kind tag, if structured
    pub fn kind(&self) -> Option<&str> {
        match self {
            Failure::Reason(_) => None,
            Failure::Fault { kind, .. } => Some(kind),
        }
    }

    /// Message text regardless of shape
    pub fn message(&self) -> &str {
        match self {
            Failure::Reason(reason) => reason,
            Failure::Fault { message, .. } => message,
        }
    }
}

impl From<String> for Failure {
    fn from(reason: String) -> Self {
        Failure::Reason(reason)
    }
}

impl From<&str> for Failure {
    fn from(reason: &str) -> Self {
        Failure::Reason(reason.to_string())
    }
}

/// Insertion-ordered label → failure map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAggregate {
    entries: Vec<(String, Failure)>,
}

impl ErrorAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `failure` under `label`, replacing any earlier entry in place
    pub fn add(&mut self, label: impl Into<String>, failure: impl Into<Failure>) {
        let label = label.into();
        let failure = failure.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = failure,
            None => self.entries.push((label, failure)),
        }
    }

    /// Fold another aggregate into this one (same overwrite rule as `add`)
    pub fn merge(&mut self, other: ErrorAggregate) {
        for (label, failure) in other.entries {
            self.add(label, failure);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, label: &str) -> Option<&Failure> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, failure)| failure)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.entries
            .iter()
            .map(|(label, failure)| (label.as_str(), failure))
    }

    /// `Ok(())` when empty, otherwise the aggregate itself as the error
    pub fn into_result(self) -> std::result::Result<(), ErrorAggregate> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn indent(text: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    format!("{}{}", pad, text.replace('\n', &format!("\n{}", pad)))
}

impl fmt::Display for ErrorAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s) found:", self.entries.len())?;
        for (label, failure) in &self.entries {
            write!(f, "\n{}", indent(label, 4))?;
            if let Failure::Fault { kind, .. } = failure {
                write!(f, "\n{}", indent(kind, 8))?;
            }
            write!(f, "\n{}", indent(failure.message(), 8))?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorAggregate {}
