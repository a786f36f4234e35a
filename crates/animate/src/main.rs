//! Command-line fluid animation driver.
//!
//! Usage: `animate <workers> <frames> <input> [output]`, or
//! `animate --config <file.json>` with the same fields as JSON.

use kernel::{CellChecker, ExecutionPolicy, Parallel, Serial};
use orchestrator::{RunConfig, Simulation, SimulationReader, SimulationWriter};
use std::error::Error;
use std::time::Instant;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cfl-check")]
type Checker = kernel::CflChecker;
#[cfg(not(feature = "cfl-check"))]
type Checker = kernel::NoChecker;

fn parse_config() -> Result<RunConfig, Box<dyn Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag.as_str() == "--config" => Ok(RunConfig::load(path)?),
        rest => Ok(RunConfig::from_args(rest)?),
    }
}

// Send + Sync so the result can cross the rayon pool boundary.
fn run_frames<P, C>(config: &RunConfig) -> Result<(), Box<dyn Error + Send + Sync>>
where
    P: ExecutionPolicy,
    C: CellChecker,
{
    let mut reader = SimulationReader::open(&config.input)?;
    let mut simulation = Simulation::<P, C>::load(&mut reader)?;
    tracing::info!(
        particles = simulation.num_particles(),
        particles_per_meter = simulation.particles_per_meter(),
        cells = simulation.grid().num_cells(),
        frames = config.frames,
        "simulation loaded"
    );

    let start = Instant::now();
    for frame in 0..config.frames {
        let frame_start = Instant::now();
        simulation.advance_frame();
        tracing::debug!(frame, elapsed = ?frame_start.elapsed(), "frame done");
    }
    let elapsed = start.elapsed();
    tracing::info!(
        frames = config.frames,
        ?elapsed,
        per_frame = ?elapsed / config.frames,
        "simulation finished"
    );

    if let Some(output) = &config.output {
        let mut writer = SimulationWriter::create(output)?;
        simulation.write(&mut writer)?;
        tracing::info!(path = %output.display(), "final state written");
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = parse_config()?;

    if config.workers == 1 {
        tracing::info!("running single-threaded");
        run_frames::<Serial, Checker>(&config)?;
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;
        tracing::info!(workers = config.workers, "running on rayon pool");
        pool.install(|| run_frames::<Parallel, Checker>(&config))?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
