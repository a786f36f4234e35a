//! Grid cells: locked particle containers and pairwise neighbor traversal.

use crate::particle::Particle;
use crate::sync::{LockGuard, RawLock};
use glam::UVec3;
use std::cell::UnsafeCell;

/// Pluggable spatial-index consistency validator.
///
/// Invoked at fixed points of the cell lifecycle; the no-op implementation
/// compiles away entirely.
pub trait CellChecker: Default + Send + Sync + 'static {
    /// The cell was assigned its grid coordinate at construction.
    fn on_index_assigned(&mut self, index: UVec3) {
        let _ = index;
    }

    /// One of this cell's particles is being reinserted at `index` during
    /// rebuild.
    fn on_particle_inserted(&self, index: UVec3) {
        let _ = index;
    }
}

/// Checker that performs no validation.
#[derive(Debug, Default)]
pub struct NoChecker;

impl CellChecker for NoChecker {}

/// Courant-Friedrichs-Lewy stability net.
///
/// A particle leaving its cell's 27-neighborhood within one frame means the
/// time step is too large relative to the cell size; continuing would
/// silently corrupt the spatial index, so the violation aborts the run.
#[derive(Debug, Default)]
pub struct CflChecker {
    index: UVec3,
}

impl CellChecker for CflChecker {
    fn on_index_assigned(&mut self, index: UVec3) {
        self.index = index;
    }

    fn on_particle_inserted(&self, index: UVec3) {
        let dx = (index.x as i64 - self.index.x as i64).abs();
        let dy = (index.y as i64 - self.index.y as i64).abs();
        let dz = (index.z as i64 - self.index.z as i64).abs();
        if dx > 1 || dy > 1 || dz > 1 {
            panic!(
                "Courant-Friedrichs-Lewy condition violated: particle moved from cell \
                 {:?} to {:?} in one frame; the time step is too large for the cell size",
                self.index, index
            );
        }
    }
}

/// One cell of the uniform grid.
///
/// Owns a growable particle list behind a per-cell lock, plus a fixed list
/// of forward-neighbor cell ids established once at grid construction. Only
/// neighbors with a strictly greater flat id are registered, so every
/// unordered pair of adjacent cells appears exactly once grid-wide and
/// pairwise lock acquisition in ascending id order is a global total order.
pub struct Cell<L: RawLock, C: CellChecker> {
    particles: UnsafeCell<Vec<Particle>>,
    neighbours: Vec<u32>,
    id: u32,
    lock: L,
    checker: C,
}

// SAFETY: all shared access to `particles` goes through `lock`. With
// `NullLock` this invariant is upheld by the `Serial` policy, which never
// touches a cell from more than one thread.
unsafe impl<L: RawLock, C: CellChecker> Sync for Cell<L, C> {}

impl<L: RawLock, C: CellChecker> Cell<L, C> {
    /// Up to half of the 26-cell neighborhood is registered per cell.
    const MAX_FORWARD_NEIGHBOURS: usize = 13;

    pub(crate) fn new(id: u32) -> Self {
        Self {
            particles: UnsafeCell::new(Vec::new()),
            neighbours: Vec::with_capacity(Self::MAX_FORWARD_NEIGHBOURS),
            id,
            lock: L::default(),
            checker: C::default(),
        }
    }

    /// Flat arena id of this cell.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn assign_index(&mut self, index: UVec3) {
        self.checker.on_index_assigned(index);
    }

    pub(crate) fn add_neighbour(&mut self, id: u32) {
        debug_assert!(id > self.id, "only forward neighbours are registered");
        self.neighbours.push(id);
    }

    /// Consistency hook for rebuild: one of this cell's particles is about
    /// to be inserted at `index`.
    pub(crate) fn check_migration(&self, index: UVec3) {
        self.checker.on_particle_inserted(index);
    }

    /// Append a particle under the cell lock.
    pub fn add_particle(&self, p: Particle) {
        let _g = LockGuard::new(&self.lock);
        // SAFETY: the cell lock is held.
        unsafe { (*self.particles.get()).push(p) };
    }

    /// Remove all particles under the cell lock.
    pub fn clear_particles(&self) {
        let _g = LockGuard::new(&self.lock);
        // SAFETY: the cell lock is held.
        unsafe { (*self.particles.get()).clear() };
    }

    /// Number of particles currently owned by this cell.
    pub fn num_particles(&self) -> usize {
        let _g = LockGuard::new(&self.lock);
        // SAFETY: the cell lock is held.
        unsafe { (*self.particles.get()).len() }
    }

    /// Visit every particle mutably, holding the lock across the iteration.
    ///
    /// The visitor must not reenter this cell's locked operations.
    pub fn for_all_particles<F>(&self, mut f: F)
    where
        F: FnMut(&mut Particle),
    {
        let _g = LockGuard::new(&self.lock);
        // SAFETY: the cell lock is held for the whole iteration.
        let parts = unsafe { &mut *self.particles.get() };
        for p in parts.iter_mut() {
            f(p);
        }
    }

    /// Fallible read-only visit, holding the lock across the iteration.
    pub fn try_for_all_particles<F, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Particle) -> Result<(), E>,
    {
        let _g = LockGuard::new(&self.lock);
        // SAFETY: the cell lock is held for the whole iteration.
        let parts = unsafe { &*self.particles.get() };
        for p in parts.iter() {
            f(p)?;
        }
        Ok(())
    }

    /// Visit every near particle pair exactly once.
    ///
    /// Intra-cell: each particle is paired with the already-visited prefix,
    /// under this cell's lock. Cross-cell: each particle is paired with every
    /// particle of each registered forward neighbour, with both cell locks
    /// held, acquired in ascending id order and released as soon as that
    /// neighbour's list has been visited.
    ///
    /// The particle topology must be frozen while this runs (no insertion or
    /// clearing), which the grid's phase barriers guarantee.
    pub fn for_all_near_particles<F>(&self, cells: &[Self], mut f: F)
    where
        F: FnMut(&mut Particle, &mut Particle),
    {
        // SAFETY: topology is frozen during force passes, so the length and
        // backing storage are stable even without the lock.
        let n = unsafe { (*self.particles.get()).len() };

        for i in 0..n {
            {
                let _g = LockGuard::new(&self.lock);
                // SAFETY: the cell lock is held; `i < n <= len`.
                let parts = unsafe { &mut *self.particles.get() };
                let (before, rest) = parts.split_at_mut(i);
                let pi = &mut rest[0];
                for pj in before.iter_mut() {
                    f(pi, pj);
                }
            }

            for &ni in &self.neighbours {
                let nc = &cells[ni as usize];
                debug_assert!(nc.id > self.id);

                let (first, second) = if self.id < nc.id {
                    (&self.lock, &nc.lock)
                } else {
                    (&nc.lock, &self.lock)
                };
                let _g1 = LockGuard::new(first);
                let _g2 = LockGuard::new(second);

                // SAFETY: both cell locks are held and the two cells are
                // distinct, so the two particle lists never alias.
                let pi = unsafe { &mut (&mut *self.particles.get())[i] };
                let nparts = unsafe { &mut *nc.particles.get() };
                for pj in nparts.iter_mut() {
                    f(pi, pj);
                }
            }
        }
    }
}
