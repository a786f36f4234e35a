//! Simulation orchestration: configuration, particle file I/O, and the
//! frame-stepping driver over the physics kernel.
//!
//! Modules:
//! - [`config`]: run configuration from CLI arguments or a JSON file
//! - [`stream`]: little-endian binary particle stream codec
//! - [`simulation`]: load, step, and save one simulation

#![warn(missing_docs)]

pub mod config;
pub mod simulation;
pub mod stream;

pub use config::{ConfigError, RunConfig};
pub use simulation::{ParallelSimulation, SerialSimulation, Simulation};
pub use stream::{SimulationReader, SimulationWriter, StreamError};
