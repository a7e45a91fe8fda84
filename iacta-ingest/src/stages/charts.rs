//! Stage 2: chart-note files
//!
//! Charts are parsed and checked here, held in memory while the hit-sound
//! stage rewrites their sample references, then persisted by [`persist`].

use super::{not_found, Staged};
use crate::chart::{Chart, Event};
use crate::manifest::Manifest;
use iacta_common::config::ChartPolicy;
use iacta_common::{ErrorAggregate, Failure, Policy, RatingClass};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Charts parsed in stage 2 and still held in memory
#[derive(Debug, Default)]
pub struct LoadedCharts {
    pub names: BTreeMap<RatingClass, String>,
    pub charts: BTreeMap<RatingClass, Chart>,
}

/// Canonical chart filename for a rating class
pub fn chart_name(class: RatingClass) -> String {
    format!("{}.aff", class)
}

pub fn run(root: &Path, policy: &Policy, manifest: &Manifest) -> Staged<LoadedCharts> {
    let mut errors = ErrorAggregate::new();
    let mut loaded = LoadedCharts::default();

    for difficulty in manifest.activated() {
        let class = difficulty.rating_class;
        let name = chart_name(class);
        let path = root.join(&name);

        if !path.is_file() {
            errors.add(name, not_found(&path));
            continue;
        }

        match Chart::load(&path) {
            Ok(chart) => {
                debug!(chart = %name, groups = chart.groups.len(), "Chart parsed");
                loaded.names.insert(class, name);
                loaded.charts.insert(class, chart);
            }
            Err(e) => {
                warn!(chart = %name, "Chart rejected: {}", e);
                errors.add(name, Failure::fault("ChartSyntax", e));
            }
        }
    }

    for (class, chart) in &loaded.charts {
        let name = &loaded.names[class];
        check_banned(name, chart, &policy.charts, &mut errors);
        if !manifest.event_info.is_bonus {
            check_density(name, chart, &policy.charts, &mut errors);
        }
    }

    Staged::new(loaded, errors)
}

/// Record banned group parameters and arc features
fn check_banned(name: &str, chart: &Chart, policy: &ChartPolicy, errors: &mut ErrorAggregate) {
    for (i, group) in chart.groups.iter().enumerate() {
        let group_label = format!("{} [tg #{}]", name, i);

        let banned: Vec<String> = policy
            .banned_group_params
            .iter()
            .filter(|param| group.has_param(param))
            .map(|param| format!("Parameter '{}' is banned", param))
            .collect();
        if !banned.is_empty() {
            errors.add(group_label.clone(), banned.join("\n"));
        }

        for (j, event) in group.events.iter().enumerate() {
            let Event::Arc(arc) = event else {
                continue;
            };

            let mut problems = Vec::new();
            if policy.banned_arc_kinds.iter().any(|kind| *kind == arc.kind) {
                problems.push(format!("Arc kind '{}' is banned", arc.kind));
            }
            if policy.ban_arc_smoothness && arc.smoothness.is_some() {
                problems.push("Parameter 'smoothness' is banned".to_string());
            }
            if !problems.is_empty() {
                let label = format!("{} [event #{}] ({})", group_label, j, event.kind());
                errors.add(label, problems.join("\n"));
            }
        }
    }
}

fn check_density(name: &str, chart: &Chart, policy: &ChartPolicy, errors: &mut ErrorAggregate) {
    let tpdf = match chart.density_factor() {
        Ok(tpdf) => tpdf,
        Err(e) => {
            errors.add(name, Failure::fault("ChartHeader", e));
            return;
        }
    };

    let (min, max) = policy.density_range;
    if tpdf < min {
        errors.add(name, format!("TPDF falls under minimum {} (got {})", min, tpdf));
    } else if tpdf > max {
        errors.add(name, format!("TPDF exceeds maximum {} (got {})", max, tpdf));
    }
}

/// Write every held chart back in canonical form and release them
pub fn persist(root: &Path, loaded: LoadedCharts) -> Staged<BTreeMap<RatingClass, String>> {
    let mut errors = ErrorAggregate::new();
    let mut names = BTreeMap::new();

    for (class, chart) in loaded.charts {
        let name = chart_name(class);
        match chart.save(&root.join(&name)) {
            Ok(()) => {
                names.insert(class, name);
            }
            Err(e) => errors.add(name, Failure::fault("Io", e)),
        }
    }

    Staged::new(names, errors)
}
