//! Per-particle physical state and update rules.

use crate::domain::Domain;
use crate::params::consts;
use glam::{UVec3, Vec3};

/// A single SPH particle.
///
/// Each particle is logically owned by exactly one cell at any instant;
/// rebuild migrates it by value. Acceleration and density are scratch state
/// reused frame to frame and must be reset through [`Particle::reset_frame`]
/// before the density and force passes.
#[derive(Debug, Clone)]
pub struct Particle {
    position: Vec3,
    hv: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    density: f32,
}

impl Particle {
    /// Create a particle from an input record.
    pub fn new(position: Vec3, hv: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            hv,
            velocity,
            acceleration: consts::EXTERNAL_ACCELERATION,
            density: 0.0,
        }
    }

    /// Current position (meters).
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Half-step velocity used by the leapfrog scheme.
    pub fn hv(&self) -> Vec3 {
        self.hv
    }

    /// Full-step velocity.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Accumulated acceleration.
    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    /// Accumulated (or transformed) density.
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Cell coordinate this particle belongs to.
    pub fn grid_position(&self, domain: &Domain) -> UVec3 {
        domain.grid_position(self.position)
    }

    /// Reset per-frame scratch state to the external-force baseline.
    ///
    /// Must run before density accumulation each frame; skipping it would
    /// leak forces across frames.
    pub fn reset_frame(&mut self) {
        self.density = 0.0;
        self.acceleration = consts::EXTERNAL_ACCELERATION;
    }

    /// Symmetric density kernel contribution for a particle pair.
    pub fn increase_densities(&mut self, other: &mut Particle, hsq: f32) {
        let distsq = self.position.distance_squared(other.position);
        if distsq < hsq {
            let t = hsq - distsq;
            let tc = t * t * t;
            self.density += tc;
            other.density += tc;
        }
    }

    /// Final density transform: `(density + h^6) * density_coeff`.
    pub fn transform_density(&mut self, density_coeff: f32, h6: f32) {
        self.density = (self.density + h6) * density_coeff;
    }

    /// Symmetric pressure + viscosity contribution for a particle pair.
    ///
    /// Adds the contribution to `self` and subtracts it from `other`
    /// (Newton's third law). The distance is floored before dividing.
    pub fn transfer_acceleration(
        &mut self,
        other: &mut Particle,
        h: f32,
        hsq: f32,
        pressure_coeff: f32,
        viscosity_coeff: f32,
    ) {
        let disp = self.position - other.position;
        let distsq = disp.length_squared();
        if distsq < hsq {
            let dist = distsq.max(1e-12).sqrt();
            let hmr = h - dist;

            let mut acc = disp * pressure_coeff * (hmr * hmr / dist);
            acc *= self.density + other.density - consts::DOUBLE_REST_DENSITY;
            acc += (other.velocity - self.velocity) * viscosity_coeff * hmr;
            acc /= self.density * other.density;

            self.acceleration += acc;
            other.acceleration -= acc;
        }
    }

    /// Leapfrog integration step.
    pub fn advance(&mut self) {
        let v_half = self.hv + self.acceleration * consts::TIME_STEP;
        self.position += v_half * consts::TIME_STEP;
        self.velocity = (self.hv + v_half) * 0.5;
        self.hv = v_half;
    }

    /// Projected next position along `axis`, before integration applies it.
    fn next_position(&self, axis: usize) -> f32 {
        self.position[axis] + self.hv[axis] * consts::TIME_STEP
    }

    fn distance_to_lower_limit(&self, pos: f32, axis: usize) -> f32 {
        pos - consts::DOMAIN_MIN[axis]
    }

    fn distance_to_upper_limit(&self, pos: f32, axis: usize) -> f32 {
        consts::DOMAIN_MAX[axis] - pos
    }

    /// Wall repulsion: stiffness on penetration depth minus velocity damping.
    fn increase_acceleration(&mut self, diff: f32, axis: usize) {
        self.acceleration[axis] +=
            consts::STIFFNESS_COLLISIONS * diff - consts::DAMPING * self.velocity[axis];
    }

    /// Repel from the lower wall on `axis` if the projected next position
    /// penetrates closer than the particle radius. Adjusts acceleration only.
    pub fn process_collision_lower(&mut self, axis: usize) {
        let diff =
            consts::PARTICLE_SIZE - self.distance_to_lower_limit(self.next_position(axis), axis);
        if diff > consts::EPSILON {
            self.increase_acceleration(diff, axis);
        }
    }

    /// Repel from the upper wall on `axis`; mirror of the lower case.
    pub fn process_collision_upper(&mut self, axis: usize) {
        let diff =
            consts::PARTICLE_SIZE - self.distance_to_upper_limit(self.next_position(axis), axis);
        if diff > consts::EPSILON {
            self.increase_acceleration(-diff, axis);
        }
    }

    /// Elastic reflection at a wall: place the particle at the mirrored
    /// position and negate velocity and half-step velocity on that axis.
    #[cfg(feature = "impenetrable-wall")]
    fn reflect(&mut self, wall_pos: f32, axis: usize) {
        self.position[axis] = wall_pos;
        self.velocity[axis] = -self.velocity[axis];
        self.hv[axis] = -self.hv[axis];
    }

    /// Hard-wall correction below the lower wall, after integration.
    #[cfg(feature = "impenetrable-wall")]
    pub fn reprocess_collision_lower(&mut self, axis: usize) {
        let diff = self.distance_to_lower_limit(self.position[axis], axis);
        if diff < 0.0 {
            self.reflect(consts::DOMAIN_MIN[axis] - diff, axis);
        }
    }

    /// Hard-wall correction above the upper wall, after integration.
    #[cfg(feature = "impenetrable-wall")]
    pub fn reprocess_collision_upper(&mut self, axis: usize) {
        let diff = self.distance_to_upper_limit(self.position[axis], axis);
        if diff < 0.0 {
            self.reflect(consts::DOMAIN_MAX[axis] + diff, axis);
        }
    }
}
