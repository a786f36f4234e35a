//! Physical constants and scale-derived smoothing-kernel coefficients.

use std::f32::consts::PI;

/// Fixed physical constants of the simulated fluid and its box.
pub mod consts {
    use glam::Vec3;

    /// Smoothing radius in units of the inter-particle spacing.
    pub const KERNEL_RADIUS_MULTIPLIER: f32 = 1.695;
    /// Twice the rest density of the fluid (kg/m^3).
    pub const DOUBLE_REST_DENSITY: f32 = 2000.0;
    /// Pressure stiffness of the equation of state.
    pub const STIFFNESS_PRESSURE: f32 = 3.0;
    /// Dynamic viscosity.
    pub const VISCOSITY: f32 = 0.4;
    /// Particle radius used for wall-collision tests (meters).
    pub const PARTICLE_SIZE: f32 = 0.0002;
    /// Penetration threshold below which wall repulsion is skipped.
    pub const EPSILON: f32 = 1e-10;
    /// Integration time step (seconds).
    pub const TIME_STEP: f32 = 0.001;
    /// Wall repulsion stiffness.
    pub const STIFFNESS_COLLISIONS: f32 = 30000.0;
    /// Wall repulsion velocity damping.
    pub const DAMPING: f32 = 128.0;
    /// Constant external acceleration (gravity).
    pub const EXTERNAL_ACCELERATION: Vec3 = Vec3::new(0.0, -9.8, 0.0);
    /// Lower corner of the simulated box (meters).
    pub const DOMAIN_MIN: Vec3 = Vec3::new(-0.065, -0.08, -0.065);
    /// Upper corner of the simulated box (meters).
    pub const DOMAIN_MAX: Vec3 = Vec3::new(0.065, 0.1, 0.065);

    /// Extent of the simulated box per axis.
    pub fn domain_range() -> Vec3 {
        DOMAIN_MAX - DOMAIN_MIN
    }
}

/// Coefficients derived from the particle scale of the loaded population.
///
/// All of them depend only on `particles_per_meter`, so they are computed
/// once per run and shared read-only by every phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    /// Particle scale the population was generated for.
    pub particles_per_meter: f32,
    /// Smoothing radius h (meters).
    pub h: f32,
    /// h squared, the interaction cutoff in squared distance.
    pub hsq: f32,
    /// h to the sixth power, the self-density term.
    pub h6: f32,
    /// Mass of one particle (kg).
    pub mass: f32,
    /// Poly6 density kernel coefficient times particle mass.
    pub density_coeff: f32,
    /// Spiky pressure gradient coefficient, stiffness and mass folded in.
    pub pressure_coeff: f32,
    /// Viscosity Laplacian coefficient times viscosity and mass.
    pub viscosity_coeff: f32,
}

impl SimParams {
    /// Derive all coefficients from the particle scale.
    pub fn new(particles_per_meter: f32) -> Self {
        let h = consts::KERNEL_RADIUS_MULTIPLIER / particles_per_meter;
        let hsq = h * h;
        let h6 = h.powi(6);
        let mass = 0.5 * consts::DOUBLE_REST_DENSITY / particles_per_meter.powi(3);

        let coeff1 = 315.0 / (64.0 * PI * h.powi(9));
        let coeff2 = 15.0 / (PI * h6);
        let coeff3 = 45.0 / (PI * h6);

        Self {
            particles_per_meter,
            h,
            hsq,
            h6,
            mass,
            density_coeff: mass * coeff1,
            pressure_coeff: 3.0 * coeff2 * 0.5 * consts::STIFFNESS_PRESSURE * mass,
            viscosity_coeff: consts::VISCOSITY * coeff3 * mass,
        }
    }
}
