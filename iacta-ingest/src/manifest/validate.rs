//! Manifest validation against the policy
//!
//! Every violation is recorded under its own label so a single pass reports
//! everything wrong with the manifest.

use super::{Difficulty, Manifest};
use iacta_common::config::{FixedFields, ManifestPolicy};
use iacta_common::ErrorAggregate;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::debug;

/// Validate `manifest`; an empty aggregate means it passed
pub fn validate(manifest: &Manifest, policy: &ManifestPolicy, salts: &[String]) -> ErrorAggregate {
    let mut errors = ErrorAggregate::new();

    if let Err(reason) = check_id(&manifest.id) {
        errors.add("id", reason);
    }

    check_fixed_fields(manifest, &policy.fixed_fields, &mut errors);

    if !policy.sides.contains(&manifest.side) {
        errors.add(
            "side",
            format!("'side' must be one of {:?} (got {})", policy.sides, manifest.side),
        );
    }

    if manifest.audio_preview >= manifest.audio_preview_end {
        errors.add(
            "audioPreview",
            format!(
                "'audioPreview' ({}) must be less than 'audioPreviewEnd' ({})",
                manifest.audio_preview, manifest.audio_preview_end
            ),
        );
    }

    if manifest.event_info.charters.is_empty() {
        errors.add("event_info.charters", "At least one charter must be credited");
    }

    let mut seen = BTreeSet::new();
    for difficulty in &manifest.difficulties {
        check_difficulty(difficulty, manifest.event_info.is_bonus, policy, &mut errors);

        if difficulty.is_activated() && !seen.insert(difficulty.rating_class) {
            errors.add(
                format!("{}: ratingClass", difficulty.rating_class.name()),
                format!(
                    "Rating class {} appears on more than one activated difficulty",
                    difficulty.rating_class
                ),
            );
        }
    }

    if policy.digest_check {
        check_digest(manifest, salts, &mut errors);
    }

    errors
}

/// Identifiers name the bundle directory: nonempty, lowercase ASCII letters,
/// digits and `_` only
pub fn check_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("'id' must not be empty".to_string());
    }
    if let Some(ch) = id
        .chars()
        .find(|&ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'))
    {
        return Err(format!(
            "'id' may only contain lowercase ASCII letters, digits and '_' (found {:?})",
            ch
        ));
    }
    Ok(())
}

fn check_fixed_fields(manifest: &Manifest, fixed: &FixedFields, errors: &mut ErrorAggregate) {
    check_fixed(errors, "set", Some(&manifest.set), fixed.set.as_ref());
    check_fixed(errors, "purchase", Some(&manifest.purchase), fixed.purchase.as_ref());
    check_fixed(errors, "date", Some(&manifest.date), fixed.date.as_ref());
    check_fixed(errors, "version", Some(&manifest.version), fixed.version.as_ref());
    check_fixed(errors, "_comment", manifest.comment.as_ref(), fixed.comment.as_ref());
}

fn check_fixed<T: PartialEq + Debug>(errors: &mut ErrorAggregate, field: &str, actual: Option<&T>, expected: Option<&T>) {
    if let Some(expected) = expected {
        if actual != Some(expected) {
            errors.add(field, format!("Value should be exactly {:?}", expected));
        }
    }
}

fn check_difficulty(difficulty: &Difficulty, is_bonus: bool, policy: &ManifestPolicy, errors: &mut ErrorAggregate) {
    let name = difficulty.rating_class.name();

    if !policy.rating_classes.contains(&difficulty.rating_class) {
        errors.add(
            format!("{}: ratingClass", name),
            format!("Rating class {} is not allowed", difficulty.rating_class),
        );
    }

    if let Err(reason) = check_custom_str(&difficulty.chart_designer, policy) {
        errors.add(format!("{}: chartDesigner", name), reason);
    }
    if let Err(reason) = check_custom_str(&difficulty.jacket_designer, policy) {
        errors.add(format!("{}: jacketDesigner", name), reason);
    }

    if let Some((begin, end)) = difficulty.preview_window() {
        if begin >= end {
            errors.add(
                format!("{}: audioPreview", name),
                format!("'audioPreview' ({}) must be less than 'audioPreviewEnd' ({})", begin, end),
            );
        }
    }

    if is_bonus || !difficulty.is_activated() {
        return;
    }

    let allowed = if difficulty.is_plus() {
        &policy.ratings_with_plus
    } else {
        &policy.ratings
    };
    if !allowed.contains(&difficulty.rating) {
        errors.add(
            format!("{}: rating", name),
            format!(
                "'rating' must be one of {:?} if 'ratingPlus' is {} (got {})",
                allowed,
                difficulty.is_plus(),
                difficulty.rating
            ),
        );
    }
}

/// Check line count and visual line width; non-ASCII characters count as two
pub fn check_custom_str(text: &str, policy: &ManifestPolicy) -> Result<(), String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() > policy.custom_string_max_lines {
        return Err(format!(
            "Custom string may contain at most {} line(s) (got {})",
            policy.custom_string_max_lines,
            lines.len()
        ));
    }

    for (ln, line) in lines.iter().enumerate() {
        let width = visual_width(line);
        if width > policy.custom_string_max_line_length {
            return Err(format!(
                "Line #{} exceeds the maximum width {} (got {})",
                ln, policy.custom_string_max_line_length, width
            ));
        }
    }
    Ok(())
}

fn visual_width(line: &str) -> usize {
    line.chars().map(|ch| if ch.is_ascii() { 1 } else { 2 }).sum()
}

fn check_digest(manifest: &Manifest, salts: &[String], errors: &mut ErrorAggregate) {
    match manifest.expected_digest(salts) {
        Ok(expected) => {
            if manifest.digest.as_deref() != Some(expected.as_str()) {
                debug!(id = %manifest.id, expected = %expected, "Digest mismatch");
                errors.add("digest", "Digest verification failed");
            }
        }
        Err(e) => errors.add("digest", format!("Digest source could not be serialized: {}", e)),
    }
}
