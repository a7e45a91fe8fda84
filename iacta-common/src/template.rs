//! Filename template mini-language
//!
//! Patterns contain `{name}` placeholders. A pattern whose only placeholder
//! name is empty (`"{}.jpg"`, `"1080_{}.jpg"`) is *simple* and is built from a
//! single positional value; every other pattern is built from named values.
//!
//! ```
//! use iacta_common::template::TemplateStr;
//!
//! let simple = TemplateStr::parse("{}_256.jpg").unwrap();
//! assert_eq!(simple.build_simple("base").unwrap(), "base_256.jpg");
//!
//! let named = TemplateStr::parse("{event} {live_id}").unwrap();
//! assert_eq!(
//!     named.build(&[("event", "Iacta"), ("live_id", "A01")]).unwrap(),
//!     "Iacta A01"
//! );
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Parsed filename template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateStr {
    template: String,
    /// Literal text around placeholders; always `vars.len() + 1` entries
    segments: Vec<String>,
    vars: Vec<String>,
    is_simple: bool,
}

impl TemplateStr {
    /// Parse a pattern. An unterminated `{` is rejected here, not at build time.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut vars = Vec::new();

        let mut rest = template;
        loop {
            match rest.split_once('{') {
                None => {
                    segments.push(rest.to_string());
                    break;
                }
                Some((literal, after)) => {
                    segments.push(literal.to_string());
                    let (name, tail) = after.split_once('}').ok_or_else(|| {
                        Error::Template(format!(
                            "Unclosed placeholder in template {:?}",
                            template
                        ))
                    })?;
                    vars.push(name.to_string());
                    rest = tail;
                }
            }
        }

        let distinct: BTreeSet<&str> = vars.iter().map(String::as_str).collect();
        let is_simple = distinct.len() == 1 && distinct.contains("");

        Ok(Self {
            template: template.to_string(),
            segments,
            vars,
            is_simple,
        })
    }

    /// True if the pattern takes exactly one positional value (`{}`)
    pub fn is_simple(&self) -> bool {
        self.is_simple
    }

    /// Placeholder names in pattern order (repeats included)
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// Raw pattern text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Build a simple pattern by substituting every `{}` with `value`
    pub fn build_simple(&self, value: impl fmt::Display) -> Result<String> {
        if !self.is_simple {
            return Err(Error::Template(format!(
                "Template {:?} takes named values, not a positional one",
                self.template
            )));
        }
        Ok(self.template.replace("{}", &value.to_string()))
    }

    /// Build a named pattern. Every placeholder must be supplied; all missing
    /// names are reported together.
    pub fn build(&self, values: &[(&str, &str)]) -> Result<String> {
        if self.is_simple {
            return Err(Error::Template(format!(
                "Template {:?} takes one positional value",
                self.template
            )));
        }

        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };

        let missing: BTreeSet<&str> = self
            .vars
            .iter()
            .map(String::as_str)
            .filter(|name| lookup(name).is_none())
            .collect();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.into_iter().collect();
            return Err(Error::Template(format!(
                "Missing variables: {}",
                names.join(", ")
            )));
        }

        let mut out = String::with_capacity(self.template.len());
        for (i, segment) in self.segments.iter().enumerate() {
            out.push_str(segment);
            if let Some(name) = self.vars.get(i) {
                // Presence checked above
                out.push_str(lookup(name).unwrap_or_default());
            }
        }
        Ok(out)
    }
}

impl TryFrom<String> for TemplateStr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TemplateStr> for String {
    fn from(value: TemplateStr) -> Self {
        value.template
    }
}

impl fmt::Display for TemplateStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
