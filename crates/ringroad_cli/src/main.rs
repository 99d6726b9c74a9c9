//! ringroad: ring-topology traffic automaton simulator.
//!
//! Prints exactly one line on stdout (the coordinator's report); all logging
//! goes to stderr so the output contract survives `RUST_LOG`.

use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ringroad_core::{driver, SimConfig};

#[derive(Parser, Debug)]
#[command(name = "ringroad")]
#[command(version)]
#[command(about = "Distributed ring-topology traffic cellular automaton")]
struct Cli {
    /// Total number of cells on the ring
    #[arg(value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    number_of_cells: usize,

    /// Number of update steps to run
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,

    /// Number of partitions (worker threads); must divide the cell count
    #[arg(long, short)]
    partitions: Option<usize>,

    /// Seed for the initial road fill; random (and logged) when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Run the single-partition reference path instead of the ring
    #[arg(long)]
    reference: bool,

    /// Emit the report as JSON instead of the one-line summary
    #[arg(long)]
    json: bool,

    /// Bound on every exchange/reduction receive, in milliseconds
    #[arg(long, default_value_t = ringroad_core::config::DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
}

fn default_partitions() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Help and version are successful outcomes; everything else clap reports is
/// a usage error and exits 1, like the original program.
fn parse_error_is_benign(e: &clap::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

/// Runs the simulation and renders the single output line.
fn report_line(cli: &Cli) -> anyhow::Result<String> {
    let seed = cli.seed.unwrap_or_else(rand::random);
    let partitions = if cli.reference {
        1
    } else {
        cli.partitions.unwrap_or_else(default_partitions)
    };
    info!(seed, partitions, "configured");

    let mut config = SimConfig::new(cli.number_of_cells, cli.iterations, partitions, seed);
    config.timeout_ms = cli.timeout_ms;

    let run = if cli.reference {
        driver::run_reference(&config)
    } else {
        driver::run(&config)
    }
    .context("simulation failed")?;

    if cli.json {
        serde_json::to_string(&run.report).context("serializing report")
    } else {
        Ok(run.report.summary_line())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if parse_error_is_benign(&e) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    match report_line(&cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ringroad: {e:#}");
            ExitCode::FAILURE
        }
    }
}
