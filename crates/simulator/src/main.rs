//! Command-line driver for the distributed particle simulator.
//!
//! Loads a binary particle file, runs the cluster for the requested
//! number of iterations, and writes the result in input order.

mod io;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use engine::{run_cluster, ClusterConfig, StepParameters, REBUILD_GRANULARITY};
use tracing_subscriber::EnvFilter;

/// Distributed 2D short-range particle simulation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input particle file.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output particle file.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Number of iterations to simulate.
    #[arg(short = 'n', long = "iterations")]
    iterations: usize,

    /// Space size selecting the benchmark step parameters.
    #[arg(short = 's', long = "space-size", default_value_t = 1000.0)]
    space_size: f32,

    /// Worker count; must be a perfect square.
    #[arg(short = 'w', long = "workers", default_value_t = 1)]
    workers: usize,

    /// Iterations between ownership redistributions.
    #[arg(long = "rebuild-granularity", default_value_t = REBUILD_GRANULARITY)]
    rebuild_granularity: usize,

    /// JSON step-parameter file overriding the benchmark parameters.
    #[arg(long = "params")]
    params: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simulator=info,engine=info".into()),
        )
        .init();

    let args = Args::parse();

    let params = match &args.params {
        Some(path) => StepParameters::load(path)
            .with_context(|| format!("loading step parameters from {}", path.display()))?,
        None => StepParameters::for_space_size(args.space_size),
    };

    let particles = io::load_particles(&args.input)?;
    tracing::info!(
        population = particles.len(),
        workers = args.workers,
        iterations = args.iterations,
        cull_radius = params.cull_radius,
        delta_time = params.delta_time,
        "loaded particle population"
    );

    let config = ClusterConfig {
        workers: args.workers,
        iterations: args.iterations,
        params,
        rebuild_granularity: args.rebuild_granularity,
    };

    let timer = Instant::now();
    let result = run_cluster(&config, &particles)?;
    tracing::info!(elapsed = ?timer.elapsed(), "simulation complete");

    io::save_particles(&args.output, &result)?;
    Ok(())
}
