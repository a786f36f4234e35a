//! Serial and parallel execution policies must agree on the physics.

use glam::Vec3;
use kernel::{ExecutionPolicy, Grid, Parallel, Serial};

const PPM: f32 = 204.0;

/// 3x3x3 lattice of interacting particles around the domain center.
fn lattice(spacing: f32) -> Vec<Vec3> {
    let mut out = Vec::new();
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                out.push(Vec3::new(
                    (x as f32 - 1.0) * spacing,
                    (y as f32 - 1.0) * spacing + 0.01,
                    (z as f32 - 1.0) * spacing,
                ));
            }
        }
    }
    out
}

fn run<P: ExecutionPolicy>(positions: &[Vec3], frames: usize) -> Vec<Vec3> {
    let mut grid = Grid::<P>::new(PPM);
    for &p in positions {
        grid.insert_particle(p, Vec3::ZERO, Vec3::ZERO);
    }
    for _ in 0..frames {
        grid.rebuild_grid();
        grid.compute_forces();
        grid.process_collisions();
        grid.advance_particles();
        grid.reprocess_collisions();
    }

    let mut out = Vec::new();
    grid.try_for_all_particles_ordered::<_, std::convert::Infallible>(|p| {
        out.push(p.position());
        Ok(())
    })
    .unwrap();
    out
}

#[test]
fn serial_runs_are_deterministic() {
    let positions = lattice(0.004);
    let a = run::<Serial>(&positions, 3);
    let b = run::<Serial>(&positions, 3);
    assert_eq!(a, b);
}

#[test]
fn parallel_matches_serial() {
    let positions = lattice(0.004);
    let serial = run::<Serial>(&positions, 1);
    let mut parallel = run::<Parallel>(&positions, 1);

    // Enumeration order depends on rebuild insertion order, which the
    // parallel policy does not fix; match positions as a multiset.
    assert_eq!(serial.len(), parallel.len());
    let tol = 1e-5;
    for s in &serial {
        let found = parallel
            .iter()
            .position(|p| (*s - *p).length() < tol)
            .unwrap_or_else(|| panic!("no parallel match for serial position {s:?}"));
        parallel.swap_remove(found);
    }
    assert!(parallel.is_empty());
}

#[test]
fn particle_count_stable_across_frames() {
    let positions = lattice(0.004);
    let mut grid = Grid::<Parallel>::new(PPM);
    for &p in &positions {
        grid.insert_particle(p, Vec3::ZERO, Vec3::ZERO);
    }
    for _ in 0..3 {
        grid.rebuild_grid();
        grid.compute_forces();
        grid.process_collisions();
        grid.advance_particles();
        grid.reprocess_collisions();
        assert_eq!(grid.num_particles(), positions.len());
    }
}
