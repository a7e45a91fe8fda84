//! Chart-bundle ingestion (iacta-ingest) - Main entry point
//!
//! Loads the policy, resolves every `ask` setting by prompting on the
//! terminal, then runs the batch over the input directory.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use iacta_common::config::{resolve_policy_path, CleanRootStrategy, ManifestChoice, StrayItemStrategy};
use iacta_common::Policy;
use iacta_ingest::batch::{has_content, run_batch};
use iacta_ingest::schedule::live_label;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for iacta-ingest
#[derive(Parser, Debug)]
#[command(name = "iacta-ingest")]
#[command(about = "Validate and normalize chart bundles for an event")]
#[command(version)]
struct Args {
    /// Policy file (TOML); falls back to $IACTA_POLICY, then the config directory
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Directory holding one subdirectory per bundle
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the normalized bundles are written to
    #[arg(short, long)]
    work_root: PathBuf,

    /// Collect every accepted track and cover into this directory
    #[arg(long)]
    radio: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Seed for identifier suffixes and scheduling
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iacta_ingest=info,iacta_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn prompt(question: &str) -> Result<String> {
    print!("{} ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// `y` in either case confirms
fn confirmed(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y")
}

/// Replace every `ask` strategy with a concrete one
fn resolve_interactive(policy: &mut Policy, work_root: &Path) -> Result<()> {
    let preparation = &mut policy.preparation;

    if preparation.cleaning_root == CleanRootStrategy::Ask {
        let non_empty = work_root.is_dir() && has_content(work_root)?;
        preparation.cleaning_root = if non_empty
            && confirmed(&prompt("Work root is not empty. Sure to empty? (Y/*)")?)
        {
            CleanRootStrategy::Force
        } else {
            CleanRootStrategy::RequireEmpty
        };
    }

    if preparation.stray_items == StrayItemStrategy::Ask {
        preparation.stray_items =
            match prompt("Stray files next to bundles: (r)emove, (f)orbid or (i)gnore?")?.as_str() {
                "r" | "R" => StrayItemStrategy::Remove,
                "f" | "F" => StrayItemStrategy::Forbid,
                _ => StrayItemStrategy::Ignore,
            };
    }

    if policy.manifest.choosing == ManifestChoice::Ask {
        policy.manifest.choosing =
            match prompt("Several manifests in one bundle: (p)riority, (t)ake first or (f)orbid?")?.as_str() {
                "p" | "P" => ManifestChoice::ByPriority,
                "t" | "T" => ManifestChoice::TakeFirst,
                _ => ManifestChoice::Forbid,
            };
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let policy_path = resolve_policy_path(args.policy.as_deref()).context("Failed to locate policy")?;
    let mut policy = Policy::load(&policy_path).context("Failed to load policy")?;
    info!(event = %policy.event_name, policy = %policy_path.display(), "Starting iacta-ingest");

    resolve_interactive(&mut policy, &args.work_root)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = run_batch(
        &args.input,
        &args.work_root,
        args.radio.as_deref(),
        &policy,
        &mut rng,
    )
    .context("Batch failed")?;

    for bundle in &report.bundles {
        info!(id = %bundle.id(), live = %live_label(bundle.event_info()), "Accepted");
    }
    info!(
        bundles = report.bundles.len(),
        stream_info = %report.stream_info.display(),
        "Done"
    );
    Ok(())
}
