//! Single-particle frame at the domain's minimum corner: external force plus
//! wall repulsion, then pure leapfrog motion.

use glam::Vec3;
use kernel::params::consts;
use kernel::{Grid, Serial};

const PPM: f32 = 204.0;
const OFFSET: f32 = 1e-5;

#[test]
fn corner_particle_single_frame() {
    let mut grid = Grid::<Serial>::new(PPM);
    let start = consts::DOMAIN_MIN + Vec3::splat(OFFSET);
    grid.insert_particle(start, Vec3::ZERO, Vec3::ZERO);

    grid.rebuild_grid();
    grid.compute_forces();
    grid.process_collisions();

    // No neighbors within h, so the acceleration is exactly the external
    // baseline plus one wall-repulsion term per axis. The particle is at
    // rest, so the damping term vanishes and the projected next position
    // equals the current one.
    let penetration = consts::PARTICLE_SIZE - OFFSET;
    assert!(penetration > consts::EPSILON);
    let repulsion = consts::STIFFNESS_COLLISIONS * penetration;
    let expected_acc = consts::EXTERNAL_ACCELERATION + Vec3::splat(repulsion);

    let mut seen = 0;
    grid.try_for_all_particles_ordered::<_, std::convert::Infallible>(|p| {
        seen += 1;
        let acc = p.acceleration();
        assert!(
            (acc - expected_acc).length() < 1e-3 * expected_acc.length(),
            "acceleration {acc:?}, expected {expected_acc:?}"
        );
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, 1);

    grid.advance_particles();
    grid.reprocess_collisions();

    // Leapfrog of that acceleration from rest.
    let dt = consts::TIME_STEP;
    let v_half = expected_acc * dt;
    let expected_pos = start + v_half * dt;
    let expected_vel = v_half * 0.5;

    grid.try_for_all_particles_ordered::<_, std::convert::Infallible>(|p| {
        assert!(
            (p.position() - expected_pos).length() < 1e-6,
            "position {:?}, expected {expected_pos:?}",
            p.position()
        );
        assert!((p.hv() - v_half).length() < 1e-4 * v_half.length());
        assert!((p.velocity() - expected_vel).length() < 1e-4 * v_half.length());
        Ok(())
    })
    .unwrap();
}
