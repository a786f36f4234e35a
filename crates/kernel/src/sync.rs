//! Lock and execution policies for serial and parallel grid traversal.
//!
//! A single `Grid`/`Cell` implementation is parametric over an
//! [`ExecutionPolicy`] that pairs a per-cell lock primitive with an
//! apply-over-all-cells executor. [`Serial`] iterates on the calling thread
//! with no-op locks; [`Parallel`] fans work items out over the current rayon
//! pool with a spin lock per cell.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Minimal mutual-exclusion primitive guarding one cell's particle list.
pub trait RawLock: Default + Send + Sync + 'static {
    /// Block until the lock is held.
    fn lock(&self);
    /// Attempt to take the lock without blocking.
    fn try_lock(&self) -> bool;
    /// Release the lock.
    fn unlock(&self);
}

/// No-op lock for single-threaded execution.
///
/// Sound only under [`Serial`], which never hands the same cell to two
/// threads.
#[derive(Debug, Default)]
pub struct NullLock;

impl RawLock for NullLock {
    #[inline]
    fn lock(&self) {}

    #[inline]
    fn try_lock(&self) -> bool {
        true
    }

    #[inline]
    fn unlock(&self) {}
}

/// Test-and-set spin lock.
///
/// Cell critical sections are short (proportional to one cell's particle
/// count), so spinning beats parking the thread.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl RawLock for SpinLock {
    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// RAII guard over a [`RawLock`].
pub(crate) struct LockGuard<'a, L: RawLock>(&'a L);

impl<'a, L: RawLock> LockGuard<'a, L> {
    pub(crate) fn new(lock: &'a L) -> Self {
        lock.lock();
        Self(lock)
    }
}

impl<L: RawLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}

/// Strategy selecting the lock primitive and the per-phase executor.
///
/// Every pipeline phase runs as one `for_each` call; the call returning is
/// the phase barrier. Results must not depend on visitation order within a
/// phase, so serial and parallel policies are interchangeable.
pub trait ExecutionPolicy: Send + Sync + 'static {
    /// Lock primitive instantiated once per cell.
    type Lock: RawLock;

    /// Apply `f` to every item, returning only after all items are done.
    fn for_each<T, F>(items: &[T], f: F)
    where
        T: Sync,
        F: Fn(&T) + Send + Sync;
}

/// Single-threaded execution; the lock degrades to a no-op.
#[derive(Debug, Default)]
pub struct Serial;

impl ExecutionPolicy for Serial {
    type Lock = NullLock;

    fn for_each<T, F>(items: &[T], f: F)
    where
        T: Sync,
        F: Fn(&T) + Send + Sync,
    {
        items.iter().for_each(f);
    }
}

/// Rayon-pool execution with per-cell spin locks.
#[derive(Debug, Default)]
pub struct Parallel;

impl ExecutionPolicy for Parallel {
    type Lock = SpinLock;

    fn for_each<T, F>(items: &[T], f: F)
    where
        T: Sync,
        F: Fn(&T) + Send + Sync,
    {
        items.par_iter().for_each(f);
    }
}
