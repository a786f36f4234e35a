//! SPH Fluid Simulation Kernel
//!
//! Core of the incompressible-fluid simulation: a uniform cell grid over a
//! fixed physical box, with a deadlock-free locking protocol for pairwise
//! cell interactions and a double-buffered rebuild that reassigns particles
//! to cells every frame.
//!
//! # Modules
//! - [`params`] -- Physical constants and scale-derived kernel coefficients.
//! - [`domain`] -- Physical box to cell-grid mapping with clamped lookup.
//! - [`particle`] -- Particle state and per-particle update rules.
//! - [`cell`] -- Locked particle containers and near-pair traversal.
//! - [`grid`] -- Double-buffered grid and the five-phase frame pipeline.
//! - [`sync`] -- Lock primitives and serial/parallel execution policies.

#![warn(missing_docs)]

pub mod cell;
pub mod domain;
pub mod grid;
pub mod params;
pub mod particle;
pub mod sync;

pub use cell::{Cell, CellChecker, CflChecker, NoChecker};
pub use domain::Domain;
pub use grid::{CellStatistics, Grid};
pub use params::SimParams;
pub use particle::Particle;
pub use sync::{ExecutionPolicy, NullLock, Parallel, RawLock, Serial, SpinLock};
