use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use edgemesh::{RunReport, Scenario};

/// Deterministic simulator for a mesh of edge-computing stations.
#[derive(Parser, Debug)]
#[command(name = "edgemesh", version, about = "Edge-station mesh simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print a per-station summary.
    Run {
        /// Scenario file (TOML).
        scenario: PathBuf,

        /// Override the scenario seed.
        #[arg(long, env = "EDGEMESH_SEED")]
        seed: Option<u64>,

        /// Override the run length (virtual-time units).
        #[arg(long)]
        duration: Option<f64>,

        /// Drop overflow instead of forwarding it to peers.
        #[arg(long)]
        locally_managed: bool,

        /// Also write the full report as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Validate a scenario without running it.
    Check {
        /// Scenario file (TOML).
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            scenario,
            seed,
            duration,
            locally_managed,
            json,
        } => {
            let mut s = load(&scenario)?;
            if let Some(seed) = seed {
                s.seed = seed;
            }
            if let Some(duration) = duration {
                s.duration = duration;
            }
            if locally_managed {
                s.stations.locally_managed = true;
            }

            let report = s
                .run()
                .with_context(|| format!("running {}", scenario.display()))?;
            print_report(&report);

            if let Some(path) = json {
                std::fs::write(&path, report.to_json()?)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "report written");
            }
        }
        Command::Check { scenario } => {
            let s = load(&scenario)?;
            s.check()
                .with_context(|| format!("checking {}", scenario.display()))?;
            println!(
                "{}: ok ({} stations, {} clients, {} units)",
                scenario.display(),
                s.stations.count,
                s.clients.count,
                s.duration
            );
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<Scenario> {
    Scenario::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn print_report(report: &RunReport) {
    let summary = &report.summary;
    println!("═══════════════════════════════════════════════════════════════");
    println!(
        "  seed {}  ·  {} events  ·  ended at T={:.3}",
        report.seed, report.events_processed, report.end_time
    );
    println!("═══════════════════════════════════════════════════════════════");
    println!(
        "  {:<6} {:>9} {:>10} {:>10} {:>10} {:>9} {:>8}",
        "station", "completed", "resp mean", "resp ±95%", "mean queue", "forwarded", "dropped"
    );
    for (id, s) in &summary.stations {
        println!(
            "  {:<6} {:>9} {:>10.3} {:>10.3} {:>10.3} {:>9} {:>8}",
            id.to_string(),
            s.response_time.count,
            s.response_time.mean,
            s.response_time.margin,
            s.mean_queue_length,
            s.forwarded,
            s.dropped
        );
    }
    println!("───────────────────────────────────────────────────────────────");
    println!(
        "  {:<6} {:>9} {:>10.3} {:>10.3} {:>10.3} {:>9} {:>8}",
        "all",
        summary.response_time.count,
        summary.response_time.mean,
        summary.response_time.margin,
        summary.mean_queue_length,
        summary.forwarded,
        summary.dropped
    );
    println!();
    println!(
        "  tasks created {}  ·  hops {}  ·  unfinished at end {} queued, {} in service, {} in flight",
        report.tasks_created,
        report.hops,
        report.teardown.queued,
        report.teardown.in_service,
        report.in_flight
    );
}
