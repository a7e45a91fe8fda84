//! Batch-level identifier deduplication
//!
//! Bundles sharing an identifier each get a random lowercase suffix
//! (`foo` → `foo_kq`), then every root directory is renamed to its id.
//! Roots are first moved aside, so ids may swap directory names.

use crate::bundle::Bundle;
use iacta_common::{ErrorAggregate, Failure};
use rand::Rng;
use std::collections::HashSet;
use std::ffi::OsStr;
use tracing::{debug, info};

const ALPHABET_LEN: usize = 26;

/// `ceil(group_size / 26) + 1` random lowercase letters
pub fn random_suffix<R: Rng + ?Sized>(group_size: usize, rng: &mut R) -> String {
    let letters = group_size.div_ceil(ALPHABET_LEN) + 1;
    (0..letters).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Make identifiers unique across `bundles` and rename their roots to match
pub fn deduplicate_ids<R: Rng + ?Sized>(bundles: &mut [Bundle], rng: &mut R) -> ErrorAggregate {
    let mut errors = ErrorAggregate::new();

    // Groups in first-seen order
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, bundle) in bundles.iter().enumerate() {
        match groups.iter_mut().find(|(id, _)| id.as_str() == bundle.id()) {
            Some((_, members)) => members.push(i),
            None => groups.push((bundle.id().to_string(), vec![i])),
        }
    }

    let mut taken: HashSet<String> = groups.iter().map(|(id, _)| id.clone()).collect();
    for (id, members) in &groups {
        if members.len() < 2 {
            continue;
        }
        debug!(id = %id, count = members.len(), "Duplicate identifier");

        for &i in members {
            let new_id = loop {
                let candidate = format!("{}_{}", id, random_suffix(members.len(), rng));
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            if let Err(e) = bundles[i].reassign_id(new_id.clone()) {
                errors.add(new_id, Failure::fault("Identity", e));
            }
        }
    }

    // Two phases so that bundles may take over each other's directory names
    let mut parked = vec![false; bundles.len()];
    for (i, bundle) in bundles.iter_mut().enumerate() {
        if bundle.root().file_name() == Some(OsStr::new(bundle.id())) {
            continue;
        }
        let id = bundle.id().to_string();
        match bundle.park_root(&format!(".{}.renaming-{}", id, i)) {
            Ok(()) => parked[i] = true,
            Err(e) => errors.add(id, Failure::fault("Io", e)),
        }
    }
    for (bundle, _) in bundles.iter_mut().zip(parked).filter(|(_, parked)| *parked) {
        let id = bundle.id().to_string();
        if let Err(e) = bundle.reset_root(&id) {
            errors.add(id, Failure::fault("Io", e));
        }
    }

    info!(bundles = bundles.len(), problems = errors.len(), "Identifiers deduplicated");
    errors
}
