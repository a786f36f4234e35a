//! Simulation driver: load a particle population, step frames, save state.

use crate::stream::{SimulationReader, SimulationWriter, StreamError};
use kernel::{CellChecker, ExecutionPolicy, Grid, NoChecker, Parallel, Serial};
use std::io::{Read, Write};

/// A fluid simulation over one grid, tied to an execution policy.
pub struct Simulation<P: ExecutionPolicy, C: CellChecker = NoChecker> {
    particles_per_meter: f32,
    num_particles: u32,
    grid: Grid<P, C>,
}

/// Single-threaded simulation with no per-cell locking.
pub type SerialSimulation<C = NoChecker> = Simulation<Serial, C>;

/// Multi-threaded simulation with per-cell spin locks.
pub type ParallelSimulation<C = NoChecker> = Simulation<Parallel, C>;

impl<P: ExecutionPolicy, C: CellChecker> Simulation<P, C> {
    /// Build an empty simulation expecting `num_particles` particles.
    pub fn new(particles_per_meter: f32, num_particles: u32) -> Self {
        Self {
            particles_per_meter,
            num_particles,
            grid: Grid::new(particles_per_meter),
        }
    }

    /// Read the declared number of particle records into the grid.
    pub fn read<R: Read>(&mut self, reader: &mut SimulationReader<R>) -> Result<(), StreamError> {
        for _ in 0..self.num_particles {
            let position = reader.read_vec3()?;
            let hv = reader.read_vec3()?;
            let velocity = reader.read_vec3()?;
            self.grid.insert_particle(position, hv, velocity);
        }
        Ok(())
    }

    /// Read the header and full population from a particle stream.
    pub fn load<R: Read>(reader: &mut SimulationReader<R>) -> Result<Self, StreamError> {
        let (ppm, count) = reader.read_header()?;
        let mut simulation = Self::new(ppm, count);
        simulation.read(reader)?;
        Ok(simulation)
    }

    /// Run one frame of the five-phase pipeline.
    pub fn advance_frame(&mut self) {
        self.grid.rebuild_grid();
        if tracing::enabled!(tracing::Level::DEBUG) {
            let stats = self.grid.statistics();
            tracing::debug!(
                mean = stats.mean,
                std_dev = stats.std_dev,
                empty_cells = stats.empty_cells,
                "cell occupancy"
            );
        }
        self.grid.compute_forces();
        self.grid.process_collisions();
        self.grid.advance_particles();
        self.grid.reprocess_collisions();
    }

    /// Write the header and full population to a particle stream.
    ///
    /// Enumeration follows the stable flat cell order, so the record order
    /// depends on where each particle currently sits, not on load order.
    pub fn write<W: Write>(&self, writer: &mut SimulationWriter<W>) -> Result<(), StreamError> {
        writer.write_header(self.particles_per_meter, self.num_particles)?;
        self.grid.try_for_all_particles_ordered::<_, StreamError>(|p| {
            writer.write_vec3(p.position())?;
            writer.write_vec3(p.hv())?;
            writer.write_vec3(p.velocity())?;
            Ok(())
        })?;
        writer.flush()
    }

    /// Particle scale the population was generated for.
    pub fn particles_per_meter(&self) -> f32 {
        self.particles_per_meter
    }

    /// Declared particle count.
    pub fn num_particles(&self) -> u32 {
        self.num_particles
    }

    /// The underlying grid.
    pub fn grid(&self) -> &Grid<P, C> {
        &self.grid
    }
}
